use xnat_slice_viewer::WindowLevel;

const MAX_NAME_LEN: usize = 48;

pub fn format_position(index: usize, len: usize) -> String {
    format!("{} / {len}", index + 1)
}

pub fn format_dimensions(width: u32, height: u32) -> String {
    format!("{width} × {height}")
}

pub fn format_window(window: WindowLevel) -> String {
    format!(
        "C {} / W {}",
        format_number(window.center),
        format_number(window.width)
    )
}

/// Integral values print without a fraction, everything else with one digit.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// Keep long file names from pushing the layout around.
pub fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_NAME_LEN {
        let mut truncated = text.chars().take(MAX_NAME_LEN).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        text.to_string()
    }
}
