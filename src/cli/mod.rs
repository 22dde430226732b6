mod args;

pub use args::{parse_args, Args, Commands};

use crate::config::Config;
use crate::output::{create_formatter, detect_color_support, TerminalOutput, TimelineOutput};
use crate::routing;
use crate::session::{LifecycleCoordinator, SessionUpdate, ViewerStatus};
use crate::stream::{DecodePolicy, EventStreamClient, LogStreamConnector};
use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info};

/// Settings after merging config file, environment and flags
#[derive(Debug, Clone)]
pub struct ViewerSettings {
    pub config: Config,
    pub colors: bool,
}

impl ViewerSettings {
    pub fn resolve(args: &Args, config: Config) -> Self {
        let mut config = config.with_env();

        if let Some(url) = &args.api_url {
            config.api.log_api_url = url.clone();
        }
        if let Some(format) = &args.output {
            config.output.format = format.to_lowercase();
        }
        if args.no_timestamps {
            config.output.timestamps = false;
        }
        if args.dev {
            config.stream.decode_policy = DecodePolicy::Strict;
        }

        let colors = config.output.colors && detect_color_support();
        Self { config, colors }
    }
}

fn handle_config_command(command: &Commands) -> Result<()> {
    let mut config = Config::load()?;
    match command {
        Commands::SetConfig { key, value } => {
            config.set_value(key, value)?;
            let path = config.save()?;
            println!("✅ {} = {}", key, config.get_value(key)?);
            println!("Configuration saved to: {}", path.display());
        }
        Commands::GetConfig { key } => {
            print!("{}", config.display(key.as_deref())?);
            if key.is_none() {
                if let Ok(path) = Config::config_file_path() {
                    println!("\nConfig file: {}", path.display());
                }
            }
        }
    }
    Ok(())
}

/// Points the coordinator at the CLI target
fn apply_target<C: LogStreamConnector>(coordinator: &mut LifecycleCoordinator<C>, target: &str) {
    if routing::looks_like_location(target) {
        coordinator.navigate(target);
    } else {
        coordinator.observe(target.trim());
    }
}

async fn show_update<O: TimelineOutput>(output: &mut O, update: &SessionUpdate, status: ViewerStatus) -> Result<()> {
    match update {
        SessionUpdate::Appended(event) => output.show_event(event).await,
        SessionUpdate::Completed(event) => {
            output.show_final(event).await?;
            output.show_status(status).await
        }
        SessionUpdate::StreamEnded => output.show_status(status).await,
        SessionUpdate::Ignored | SessionUpdate::Idle => Ok(()),
    }
}

/// Prints the current session from the top: log so far, then status
async fn show_session<C: LogStreamConnector, O: TimelineOutput>(
    coordinator: &LifecycleCoordinator<C>,
    output: &mut O,
) -> Result<()> {
    for event in coordinator.log() {
        output.show_event(event).await?;
    }
    if let Some(last) = coordinator.final_event() {
        output.show_final(last).await?;
    }
    output.show_status(coordinator.status()).await
}

/// Applies one navigation and reprints what it changed: the whole session
/// for a new broadcast, otherwise just the status line.
async fn follow_location<C: LogStreamConnector, O: TimelineOutput>(
    coordinator: &mut LifecycleCoordinator<C>,
    output: &mut O,
    location: &str,
) -> Result<()> {
    let before = coordinator.broadcast_id().map(String::from);
    let status = coordinator.status();

    coordinator.navigate(location);
    debug!("VIEWER: Navigated to {}", location);

    if coordinator.broadcast_id() != before.as_deref() {
        show_session(coordinator, output).await
    } else if coordinator.status() != status {
        output.show_status(coordinator.status()).await
    } else {
        Ok(())
    }
}

/// Drives the coordinator until the stream is done (or stdin closes in
/// navigate mode) or the user interrupts.
pub async fn watch<C: LogStreamConnector, O: TimelineOutput>(
    coordinator: &mut LifecycleCoordinator<C>,
    output: &mut O,
    navigate: bool,
) -> Result<()> {
    let mut locations = if navigate {
        Some(LinesStream::new(BufReader::new(tokio::io::stdin()).lines()))
    } else {
        None
    };

    let shutdown = crate::logging::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        if locations.is_none() && !coordinator.is_streaming() {
            break;
        }

        let streaming = coordinator.is_streaming();
        tokio::select! {
            _ = &mut shutdown => {
                info!("VIEWER: Interrupted");
                break;
            }
            line = async {
                match locations.as_mut() {
                    Some(lines) => lines.next().await,
                    None => std::future::pending().await,
                }
            } => {
                match line {
                    Some(Ok(location)) => {
                        let location = location.trim();
                        if location.is_empty() {
                            continue;
                        }
                        follow_location(coordinator, output, location).await?;
                    }
                    Some(Err(e)) => {
                        info!("VIEWER: Stopped reading locations: {}", e);
                        locations = None;
                    }
                    None => {
                        debug!("VIEWER: No more locations");
                        locations = None;
                    }
                }
            }
            update = coordinator.next_update(), if streaming => {
                show_update(output, &update, coordinator.status()).await?;
            }
        }
    }

    coordinator.teardown();
    output.flush().await
}

pub async fn run(args: Args) -> Result<()> {
    if let Some(command) = &args.command {
        return handle_config_command(command);
    }

    if args.target.is_none() && !args.navigate {
        println!("No broadcast specified. Pass a broadcast id or a /broadcasts/<id> path.");
        println!("Example: hoplog 0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10");
        println!("Run with --help for more information.");
        return Ok(());
    }

    let settings = ViewerSettings::resolve(&args, Config::load()?);
    info!("VIEWER: Log service at {}", settings.config.api.log_api_url);

    let client = EventStreamClient::new(settings.config.stream_settings())?;
    let formatter = create_formatter(
        &settings.config.output.format,
        settings.config.output.timestamps,
        settings.colors,
    )?;
    let mut output = TerminalOutput::stdout(formatter, settings.colors);
    if let Some(path) = &args.transcript {
        output = output
            .with_transcript_file(path)
            .with_context(|| format!("Failed to open transcript {:?}", path))?;
    }

    let mut coordinator = LifecycleCoordinator::new(client);
    if let Some(target) = &args.target {
        apply_target(&mut coordinator, target);
    }
    show_session(&coordinator, &mut output).await?;

    watch(&mut coordinator, &mut output, args.navigate).await
}
