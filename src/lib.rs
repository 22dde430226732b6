// Re-export modules so they can be used from tests
pub mod cli;
pub mod config;
pub mod logging;
pub mod output;
pub mod routing;
pub mod session;
pub mod stream;
