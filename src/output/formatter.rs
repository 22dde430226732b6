use super::{format_log_timestamp, is_building_block, paint, sender_marker, ACCENT};
use crate::stream::LogEvent;
use anyhow::{anyhow, Result};
use colored::Color;

/// Trait for formatting timeline entries
pub trait OutputFormatter: Send + Sync {
    /// Format one event according to the formatter's rules
    fn format(&self, event: &LogEvent) -> Result<String>;

    /// Get the name of the formatter
    fn format_name(&self) -> Option<String> {
        None
    }
}

/// Human-readable timeline
pub struct TextFormatter {
    show_timestamps: bool,
    colors: bool,
}

impl TextFormatter {
    pub fn new(show_timestamps: bool, colors: bool) -> Self {
        Self { show_timestamps, colors }
    }

    fn endpoint(&self, label: &str, name: &str) -> String {
        let color = if is_building_block(name) { ACCENT } else { Color::BrightWhite };
        format!(
            "{} {}",
            paint(label, Color::BrightBlack, true, self.colors),
            paint(&name.to_uppercase(), color, true, self.colors)
        )
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, event: &LogEvent) -> Result<String> {
        let marker = sender_marker(&event.sender);
        let glyph = if marker.accent {
            paint(marker.glyph, ACCENT, false, self.colors)
        } else {
            marker.glyph.to_string()
        };

        let mut lines = Vec::new();
        if event.is_milestone() {
            lines.push(format!(
                "{} {}",
                glyph,
                paint(&event.content.to_uppercase(), ACCENT, true, self.colors)
            ));
        } else {
            lines.push(format!("{} {}", glyph, self.endpoint("FROM", &event.sender)));
            lines.push(format!("  {}", self.endpoint("TO", &event.receiver)));
            for line in event.content.lines() {
                lines.push(format!("  {}", line));
            }
        }

        if self.show_timestamps {
            lines.push(format!("  [{}]", format_log_timestamp(event)));
        }

        Ok(lines.join("\n"))
    }

    fn format_name(&self) -> Option<String> {
        Some("text".to_string())
    }
}

/// One JSON object per event, wire field names
pub struct JsonFormatter {}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {}
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, event: &LogEvent) -> Result<String> {
        serde_json::to_string(event).map_err(|e| anyhow!("Failed to serialize to JSON: {}", e))
    }

    fn format_name(&self) -> Option<String> {
        Some("json".to_string())
    }
}

/// Content only
pub struct RawFormatter {}

impl RawFormatter {
    pub fn new() -> Self {
        Self {}
    }
}

impl OutputFormatter for RawFormatter {
    fn format(&self, event: &LogEvent) -> Result<String> {
        Ok(event.content.replace(['\n', '\r'], " "))
    }

    fn format_name(&self) -> Option<String> {
        Some("raw".to_string())
    }
}

/// Create a formatter based on the output format string
pub fn create_formatter(
    format: &str,
    show_timestamps: bool,
    colors: bool,
) -> Result<Box<dyn OutputFormatter + Send + Sync>> {
    match format {
        "text" => Ok(Box::new(TextFormatter::new(show_timestamps, colors))),
        "json" => Ok(Box::new(JsonFormatter::new())),
        "raw" => Ok(Box::new(RawFormatter::new())),
        _ => Err(anyhow!("Unsupported output format: {}", format)),
    }
}
