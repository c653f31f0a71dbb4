pub mod slice_view;

pub use slice_view::SliceView;
