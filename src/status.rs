// src/status.rs
//
// Status reporter: pure presentation of driver status text and the
// baud-rate table. No state, no side effects beyond producing strings.

use crate::io::{BaudRate, DriverStatus, StatusClass, BAUD_TABLE};

/// Upper bound on driver status text handed to callers.
pub const STATUS_TEXT_MAX: usize = 100;

/// Format driver-provided text for a status code, bounded to
/// `STATUS_TEXT_MAX` bytes. An optional context prefix mirrors the log
/// style ("context: text").
pub fn status_text(context: Option<&str>, status: DriverStatus, driver_text: &str) -> String {
    if status.class == StatusClass::Ok {
        return String::new();
    }
    let text = match context {
        Some(ctx) => format!("{}: {}", ctx, driver_text),
        None => driver_text.to_string(),
    };
    truncate_to_boundary(&text, STATUS_TEXT_MAX)
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
fn truncate_to_boundary(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Render the fixed 14-row baud-rate table with the active entry marked.
///
/// Column widths match the original help screen: CMD (3), Description (13),
/// Status (6).
pub fn baud_rate_table(active: BaudRate) -> String {
    let divider = format!("+{}+{}+{}+", "-".repeat(5), "-".repeat(15), "-".repeat(8));
    let mut out = String::new();

    out.push_str(&divider);
    out.push('\n');
    out.push_str(&format!("| {:>3} | {:<13} | {:<6} |\n", "CMD", "Description", "Status"));
    out.push_str(&divider);
    out.push('\n');

    for (index, (rate, _, label)) in BAUD_TABLE.iter().enumerate() {
        let marker = if *rate == active { "Active" } else { "" };
        out.push_str(&format!("| {:>3} | {:<13} | {:<6} |\n", index, label, marker));
    }

    out.push_str(&divider);
    out
}

// ============================================================================
// Tests
// ============================================================================
