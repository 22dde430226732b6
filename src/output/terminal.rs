use anyhow::Result;
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, info};

use super::device::render_device;
use super::{paint, OutputFormatter, ACCENT};
use crate::session::ViewerStatus;
use crate::stream::LogEvent;

/// Sink for what the viewer shows
#[async_trait]
pub trait TimelineOutput: Send {
    /// A hop (or milestone) was added to the timeline
    async fn show_event(&mut self, event: &LogEvent) -> Result<()>;

    /// The final event arrived
    async fn show_final(&mut self, event: &LogEvent) -> Result<()>;

    /// The status line changed
    async fn show_status(&mut self, status: ViewerStatus) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;
}

impl std::fmt::Debug for TerminalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalOutput")
            .field("formatter", &self.formatter.format_name())
            .field("primary_writer", &"Box<dyn Write + Send>")
            .field("transcript_writer", &self.transcript_writer.as_ref().map(|_| "Box<dyn Write + Send>"))
            .finish()
    }
}

/// Writes the timeline to a terminal (or any writer) and optionally appends
/// every received event to a JSON-lines transcript.
pub struct TerminalOutput {
    formatter: Box<dyn OutputFormatter + Send + Sync>,
    primary_writer: Box<dyn Write + Send>,
    transcript_writer: Option<Box<dyn Write + Send>>,
    colors: bool,
    pipe_closed: bool,
}

impl TerminalOutput {
    pub fn new(
        formatter: Box<dyn OutputFormatter + Send + Sync>,
        primary_writer: Box<dyn Write + Send>,
        colors: bool,
    ) -> Self {
        Self {
            formatter,
            primary_writer,
            transcript_writer: None,
            colors,
            pipe_closed: false,
        }
    }

    /// Terminal output on stdout
    pub fn stdout(formatter: Box<dyn OutputFormatter + Send + Sync>, colors: bool) -> Self {
        info!("🖥️  Terminal output handler initialized");
        Self::new(formatter, Box::new(io::stdout()), colors)
    }

    pub fn with_transcript(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.transcript_writer = Some(writer);
        self
    }

    /// Appends to (or creates) a transcript file
    pub fn with_transcript_file(self, path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("   Transcript: {:?}", path);
        Ok(self.with_transcript(Box::new(file)))
    }

    fn is_text(&self) -> bool {
        self.formatter.format_name().as_deref() == Some("text")
    }

    fn write_primary(&mut self, text: &str) -> Result<()> {
        if self.pipe_closed {
            return Ok(());
        }
        if let Err(e) = writeln!(self.primary_writer, "{text}") {
            if e.kind() == io::ErrorKind::BrokenPipe {
                // e.g. `hoplog <id> | head`
                info!("Output pipe closed");
                self.pipe_closed = true;
                return Ok(());
            }
            error!("Failed to write to primary output: {:?}", e);
            return Err(anyhow::anyhow!("Failed to write to primary output: {:?}", e));
        }
        let _ = self.primary_writer.flush();
        Ok(())
    }

    fn write_transcript(&mut self, event: &LogEvent) {
        if let Some(ref mut writer) = self.transcript_writer {
            match serde_json::to_string(event) {
                Ok(line) => {
                    if let Err(e) = writeln!(writer, "{line}") {
                        error!("Failed to write to transcript: {:?}", e);
                    }
                    let _ = writer.flush();
                }
                Err(e) => error!("Failed to serialize transcript entry: {}", e),
            }
        }
    }
}

#[async_trait]
impl TimelineOutput for TerminalOutput {
    async fn show_event(&mut self, event: &LogEvent) -> Result<()> {
        let formatted = self.formatter.format(event)?;
        self.write_primary(&formatted)?;
        if !event.is_boundary() {
            self.write_transcript(event);
        }
        Ok(())
    }

    async fn show_final(&mut self, event: &LogEvent) -> Result<()> {
        self.write_transcript(event);
        if self.is_text() {
            let screen = render_device(Some(event));
            self.write_primary(&screen)
        } else {
            let formatted = self.formatter.format(event)?;
            self.write_primary(&formatted)
        }
    }

    async fn show_status(&mut self, status: ViewerStatus) -> Result<()> {
        // Machine-readable formats carry events only
        if !self.is_text() {
            return Ok(());
        }
        let line = paint(&format!("» {}", status), ACCENT, false, self.colors);
        self.write_primary(&line)
    }

    async fn flush(&mut self) -> Result<()> {
        let _ = self.primary_writer.flush();
        if let Some(ref mut writer) = self.transcript_writer {
            writer.flush()?;
        }
        Ok(())
    }
}
