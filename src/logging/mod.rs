use anyhow::Result;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

/// Get the appropriate log level based on verbosity
pub fn get_log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initializes tracing.
///
/// Logs go to stderr so they never interleave with the timeline on stdout.
/// In dev mode they are written to `hoplog_dev_<timestamp>.log` instead and
/// at least at DEBUG level. Keep the returned guard alive until exit, it
/// flushes the file writer on drop.
pub fn init_tracing(verbosity: u8, dev: bool) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    if dev {
        use chrono::Local;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let log_file_path = format!("hoplog_dev_{}.log", timestamp);

        eprintln!("🔍 Development mode enabled. Logs will be written to: {}", log_file_path);

        let file_appender = tracing_appender::rolling::never(".", &log_file_path);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        fmt()
            .with_max_level(get_log_level(verbosity.max(3)))
            .with_ansi(false)
            .with_writer(non_blocking)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        return Ok(Some(guard));
    }

    fmt()
        .with_max_level(get_log_level(verbosity))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(None)
}

/// Resolves once the user asks to stop (Ctrl+C)
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        // Without a signal handler the viewer simply runs until the stream ends
        std::future::pending::<()>().await;
    }
}
