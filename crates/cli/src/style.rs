//! Terminal styling for CLI output.

use console::Style;

use mergewise_core::OperationStatus;

pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Prefix a run message with the marker for its status.
pub fn status_line(status: OperationStatus, msg: &str) -> String {
    match status {
        OperationStatus::Success => success(msg),
        OperationStatus::Partial => warn(msg),
        OperationStatus::Error => error(msg),
    }
}
