use crate::message::Message;
use crate::model::SliceView;
use iced::widget::image::FilterMethod;
use iced::widget::text::Wrapping;
use iced::widget::{button, column, row, slider, text, Image};
use iced::{Alignment, ContentFit, Element, Length};

pub fn slice_panel<'a>(
    view: Option<&'a SliceView>,
    loading: bool,
    error: Option<&'a str>,
) -> Element<'a, Message> {
    if let Some(error) = error {
        return column![
            text(error).wrapping(Wrapping::Word),
            button("Retry").on_press(Message::Retry),
        ]
        .spacing(12)
        .align_x(Alignment::Center)
        .into();
    }

    match view {
        // Pixels are shown as decoded; scaling to the panel uses nearest sampling.
        Some(view) => Image::new(view.image.clone())
            .filter_method(FilterMethod::Nearest)
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None if loading => text("Loading slice…").into(),
        None => text("Open a scan to view its slices").into(),
    }
}

pub fn navigation_bar<'a>(current: usize, len: usize) -> Element<'a, Message> {
    let last = len.saturating_sub(1);
    let previous = button("◀ Previous").on_press_maybe((current > 0).then_some(Message::Previous));
    let next = button("Next ▶").on_press_maybe((current < last).then_some(Message::Next));

    let mut bar = row![previous, next].spacing(12).align_y(Alignment::Center);
    if len > 1 {
        let max = u32::try_from(last).unwrap_or(u32::MAX);
        let value = u32::try_from(current).unwrap_or(max);
        bar = bar.push(slider(0..=max, value, Message::Seek).width(Length::Fill));
    }
    bar.into()
}
