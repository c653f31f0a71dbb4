pub mod info_panel;
pub mod slice_list;
pub mod slice_viewer;

pub use info_panel::info_panel;
pub use slice_list::slice_list_panel;
pub use slice_viewer::{navigation_bar, slice_panel};
