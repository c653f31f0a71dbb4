use iced::widget::image::Handle;
use xnat_slice_viewer::DecodedSlice;

/// The slice currently on screen.
#[derive(Debug, Clone)]
pub struct SliceView {
    pub index: usize,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub image: Handle,
}

impl SliceView {
    pub fn new(index: usize, name: &str, slice: &DecodedSlice) -> Self {
        Self {
            index,
            name: name.to_string(),
            width: slice.width,
            height: slice.height,
            image: Handle::from_rgba(slice.width, slice.height, slice.pixels.clone()),
        }
    }
}
