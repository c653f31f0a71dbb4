use crate::message::Message;
use crate::model::SliceView;
use crate::utils::{format_dimensions, format_position, format_window, truncate};
use iced::widget::{column, text};
use iced::Element;
use xnat_slice_viewer::{ScanRef, WindowLevel};

pub fn info_panel<'a>(
    scan: Option<&ScanRef>,
    view: Option<&SliceView>,
    window: Option<WindowLevel>,
    len: usize,
) -> Element<'a, Message> {
    let Some(scan) = scan else {
        return text("No scan open").into();
    };

    let mut info = column![text(format!("Scan {scan}")).size(16)].spacing(8);
    if let Some(view) = view {
        info = info
            .push(text(format!("Slice {}", format_position(view.index, len))))
            .push(text(truncate(&view.name)))
            .push(text(format_dimensions(view.width, view.height)));
    }
    if let Some(window) = window {
        info = info.push(text(format!("Window {}", format_window(window))));
    }
    info.into()
}
