use crate::message::Message;
use crate::utils::truncate;
use iced::widget::text::Wrapping;
use iced::widget::{button, column, text, Column};
use iced::Length;

pub fn slice_list_panel<'a>(names: &'a [String], current: Option<usize>) -> Column<'a, Message> {
    let root = column![text("Slices").size(20)];
    if names.is_empty() {
        return root.push(text("No slices listed"));
    }

    names
        .iter()
        .enumerate()
        .fold(root, |column, (index, name)| {
            let label = if current == Some(index) {
                format!("▶ {}", truncate(name))
            } else {
                truncate(name)
            };
            let seek = u32::try_from(index).unwrap_or(u32::MAX);

            column.push(
                button(text(label).wrapping(Wrapping::None).width(Length::Fill))
                    .on_press(Message::Seek(seek)),
            )
        })
        .spacing(6)
}
