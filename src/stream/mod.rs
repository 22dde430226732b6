pub mod client;
pub mod decode;
pub mod event;

pub use client::{EventStreamClient, LogStreamConnector, StreamHandle, StreamSettings};
pub use decode::{DecodePolicy, StreamError};
pub use event::LogEvent;
