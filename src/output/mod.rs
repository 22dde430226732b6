pub mod device;
pub mod formatter;
pub mod terminal;

use crate::stream::event::{FINAL, INITIAL};
use crate::stream::LogEvent;
use colored::{Color, Colorize};
use std::io::IsTerminal;

pub use formatter::{create_formatter, OutputFormatter};
pub use terminal::{TerminalOutput, TimelineOutput};

/// Accent used for milestones and building-block names
pub const ACCENT: Color = Color::BrightCyan;

/// Glyph drawn in front of a timeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderMarker {
    pub glyph: &'static str,
    pub accent: bool,
}

/// Picks the marker for a sender. Unknown senders get a question mark.
pub fn sender_marker(sender: &str) -> SenderMarker {
    let (glyph, accent) = match sender {
        INITIAL => ("●", true),
        FINAL => ("✔", true),
        "Threat Service" | "User Service" => ("◆", false),
        "Information Mediator BB" => ("⇄", false),
        "Messaging BB" => ("✉", false),
        _ => ("?", false),
    };
    SenderMarker { glyph, accent }
}

/// Building-block names are highlighted in the timeline
pub fn is_building_block(name: &str) -> bool {
    name.contains("BB")
}

/// `dd/mm/yyyy HH:MM:SS.mmm UTC`, or the raw value when it cannot be parsed
pub fn format_log_timestamp(event: &LogEvent) -> String {
    match event.parsed_timestamp() {
        Some(ts) => ts.format("%d/%m/%Y %H:%M:%S%.3f UTC").to_string(),
        None => event.timestamp.clone(),
    }
}

/// `HH:MM` as shown on the device screen
pub fn format_device_time(event: &LogEvent) -> String {
    event
        .parsed_timestamp()
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Colours `text` when enabled, leaves it untouched otherwise
pub fn paint(text: &str, color: Color, bold: bool, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    let painted = text.color(color);
    if bold {
        painted.bold().to_string()
    } else {
        painted.to_string()
    }
}

/// Detect if the terminal supports colors
pub fn detect_color_support() -> bool {
    // Check for explicit color control
    if let Ok(no_color) = std::env::var("NO_COLOR") {
        if !no_color.is_empty() {
            return false;
        }
    }

    if let Ok(force_color) = std::env::var("FORCE_COLOR") {
        if !force_color.is_empty() && force_color != "0" {
            return true;
        }
    }

    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" || term.is_empty() {
            return false;
        }
    }

    std::io::stdout().is_terminal()
}
