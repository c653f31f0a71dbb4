pub mod formatting;

pub use formatting::{format_dimensions, format_position, format_window, truncate};
