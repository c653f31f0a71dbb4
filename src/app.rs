use crate::config::{Args, Launch, XnatTarget};
use crate::message::Message;
use crate::model::SliceView;
use crate::views::{info_panel, navigation_bar, slice_list_panel, slice_panel};
use iced::keyboard::{self, key::Named, Key};
use iced::widget::text::Wrapping;
use iced::widget::{button, column, container, row, scrollable, text};
use iced::{application, Alignment, Element, Length, Subscription, Task, Theme};
use rfd::AsyncFileDialog;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use xnat_slice_viewer::{
    Frame, LocalDirectory, ScanRef, SessionConfig, SliceSource, ViewerSession, XnatClient,
};

const APP_TITLE: &str = "XNAT Slice Viewer";

pub fn run(args: Args) -> iced::Result {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .try_init();

    let launch = args.launch();
    let config = args.session_config();
    application(APP_TITLE, App::update, App::view)
        .subscription(App::subscription)
        .theme(App::theme)
        .run_with(move || App::new(launch, config))
}

pub struct App {
    config: SessionConfig,
    generation: u64,
    session: Option<Arc<ViewerSession>>,
    view: Option<SliceView>,
    loading: bool,
    /// Listing failure: nothing can be shown until another scan is opened.
    blocking_error: Option<String>,
    /// Failure of the current slice only.
    slice_error: Option<String>,
}

impl App {
    fn new(launch: Launch, config: SessionConfig) -> (Self, Task<Message>) {
        let mut app = Self {
            config,
            generation: 0,
            session: None,
            view: None,
            loading: false,
            blocking_error: None,
            slice_error: None,
        };
        let task = match launch {
            Launch::Xnat(target) => app.open(|config| open_xnat(target, config)),
            Launch::Local(path) => app.open(|config| open_local(path, config)),
            Launch::Idle => Task::none(),
        };
        (app, task)
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickFolder => Task::perform(
                async {
                    AsyncFileDialog::new()
                        .pick_folder()
                        .await
                        .map(|handle| handle.path().to_path_buf())
                },
                Message::FolderPicked,
            ),
            Message::FolderPicked(Some(path)) => self.open(|config| open_local(path, config)),
            Message::FolderPicked(None) => Task::none(),
            Message::SessionOpened { generation, result } => {
                if generation != self.generation {
                    return Task::none();
                }
                match result {
                    Ok(session) => {
                        self.session = Some(session);
                        self.load_current()
                    }
                    Err(err) => {
                        log::error!("{err}");
                        self.loading = false;
                        self.blocking_error = Some(err);
                        Task::none()
                    }
                }
            }
            Message::Next => self.navigate(ViewerSession::next),
            Message::Previous => self.navigate(ViewerSession::previous),
            Message::Seek(index) => self.navigate(|session| session.seek(i64::from(index))),
            Message::Retry => self.load_current(),
            Message::SliceLoaded {
                generation,
                index,
                result,
            } => {
                self.show(generation, index, result);
                Task::none()
            }
        }
    }

    fn open<F>(&mut self, opener: impl FnOnce(SessionConfig) -> F) -> Task<Message>
    where
        F: Future<Output = Result<Arc<ViewerSession>, String>> + Send + 'static,
    {
        self.generation += 1;
        self.session = None;
        self.view = None;
        self.loading = true;
        self.blocking_error = None;
        self.slice_error = None;

        let generation = self.generation;
        Task::perform(opener(self.config.clone()), move |result| {
            Message::SessionOpened { generation, result }
        })
    }

    fn navigate(&mut self, step: impl FnOnce(&ViewerSession) -> usize) -> Task<Message> {
        let Some(session) = &self.session else {
            return Task::none();
        };
        let before = session.current_index();
        if step(session) == before && self.slice_error.is_none() && self.view.is_some() {
            return Task::none();
        }
        self.load_current()
    }

    fn load_current(&mut self) -> Task<Message> {
        let Some(session) = self.session.clone() else {
            return Task::none();
        };
        let index = session.current_index();
        let generation = self.generation;
        self.loading = true;
        self.slice_error = None;

        Task::perform(
            async move { session.present(index).await.map_err(|err| err.to_string()) },
            move |result| Message::SliceLoaded {
                generation,
                index,
                result,
            },
        )
    }

    fn show(&mut self, generation: u64, index: usize, result: Result<Frame, String>) {
        let Some(session) = &self.session else {
            return;
        };
        if generation != self.generation || index != session.current_index() {
            log::debug!("Dropping slice {index}, no longer selected");
            return;
        }

        self.loading = false;
        match result {
            Ok(Frame::Current(slice)) => {
                let name = session.slices().name(index).unwrap_or_default();
                self.view = Some(SliceView::new(index, name, &slice));
            }
            Ok(Frame::Stale { .. }) => {}
            Err(err) => {
                self.view = None;
                self.slice_error = Some(err);
            }
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        keyboard::on_key_press(|key, _modifiers| match key {
            Key::Named(Named::ArrowRight | Named::ArrowDown) => Some(Message::Next),
            Key::Named(Named::ArrowLeft | Named::ArrowUp) => Some(Message::Previous),
            _ => None,
        })
    }

    pub fn view(&self) -> Element<'_, Message> {
        let open_button = button("Open Folder").on_press(Message::PickFolder);

        if let Some(error) = &self.blocking_error {
            return column![open_button, text(error).size(16).wrapping(Wrapping::Word)]
                .padding(20)
                .spacing(20)
                .into();
        }

        let session = self.session.as_deref();
        let names = session
            .map(|session| session.slices().names())
            .unwrap_or(&[]);
        let current = session.map(ViewerSession::current_index);
        let len = names.len();

        let list_panel = container(scrollable(slice_list_panel(names, current)))
            .padding(16)
            .width(Length::FillPortion(2));

        let image_panel = container(slice_panel(
            self.view.as_ref(),
            self.loading,
            self.slice_error.as_deref(),
        ))
        .padding(16)
        .width(Length::FillPortion(5))
        .height(Length::Fill)
        .align_x(Alignment::Center)
        .align_y(Alignment::Center);

        let info = container(info_panel(
            session.map(ViewerSession::scan),
            self.view.as_ref(),
            session.and_then(ViewerSession::window_level),
            len,
        ))
        .padding(16)
        .width(Length::FillPortion(3));

        let mut content = column![open_button].padding(20).spacing(20);
        if let Some(current) = current {
            content = content.push(navigation_bar(current, len));
        }
        content
            .push(
                row![list_panel, image_panel, info]
                    .spacing(16)
                    .width(Length::Fill)
                    .height(Length::Fill),
            )
            .align_x(Alignment::Start)
            .into()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }
}

async fn open_xnat(
    target: XnatTarget,
    config: SessionConfig,
) -> Result<Arc<ViewerSession>, String> {
    let mut client = XnatClient::new(&target.server).map_err(|err| err.to_string())?;
    if let Some((user, password)) = &target.credentials {
        client = client.with_credentials(user, password);
    }
    client.login().await.map_err(|err| err.to_string())?;

    let source: Arc<dyn SliceSource> = Arc::new(Arc::new(client).scan(target.scan.clone()));
    open_session(target.scan, source, config).await
}

async fn open_local(path: PathBuf, config: SessionConfig) -> Result<Arc<ViewerSession>, String> {
    let scan = local_scan_ref(&path);
    let source: Arc<dyn SliceSource> = Arc::new(LocalDirectory::new(path));
    open_session(scan, source, config).await
}

async fn open_session(
    scan: ScanRef,
    source: Arc<dyn SliceSource>,
    config: SessionConfig,
) -> Result<Arc<ViewerSession>, String> {
    ViewerSession::open(scan.clone(), source, &config)
        .await
        .map(Arc::new)
        .map_err(|err| format!("{scan}: {err}"))
}

/// A folder `<experiment>/<scan>` maps onto the same identity as the archive.
fn local_scan_ref(path: &Path) -> ScanRef {
    let name = |path: Option<&Path>| {
        path.and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string())
    };
    ScanRef::new(name(path.parent()), name(Some(path)))
}
