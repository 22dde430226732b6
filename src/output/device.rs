//! Text rendition of the subscriber's phone: locked until the final event
//! arrives, then a messaging screen with the alert as an incoming bubble.

use super::format_device_time;
use crate::stream::LogEvent;

const SCREEN_WIDTH: usize = 34;

fn row(text: &str) -> String {
    let width = text.chars().count();
    let pad = SCREEN_WIDTH.saturating_sub(width);
    format!("│ {}{} │", text, " ".repeat(pad))
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Renders the phone screen for the current final event
pub fn render_device(final_event: Option<&LogEvent>) -> String {
    let border = "─".repeat(SCREEN_WIDTH + 2);
    let mut out = vec![format!("┌{}┐", border)];

    match final_event {
        None => {
            out.push(row("GovStack"));
            out.push(row(""));
            out.push(row("🔒 No new messages"));
        }
        Some(event) => {
            out.push(row(&format!("‹        Service        {}", format_device_time(event))));
            out.push(format!("├{}┤", border));
            let bubble_width = SCREEN_WIDTH - 4;
            out.push(row(&format!("╭{}", "─".repeat(bubble_width))));
            for line in wrap(&event.content, bubble_width - 1) {
                out.push(row(&format!("│ {}", line)));
            }
            out.push(row(&format!("╰{}", "─".repeat(bubble_width))));
        }
    }

    out.push(format!("└{}┘", border));
    out.join("\n")
}
