use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Real-time delivery trace of early-warning broadcasts",
    long_about = "Hoplog follows a broadcast through the delivery pipeline as the log service pushes each hop.\n\
The timeline is printed as hops arrive; once the alert reaches the device channel the simulated phone\n\
screen is shown and the stream is closed.\n\
---\n\
Targets:\n\
  hoplog 0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10                 # Follow one broadcast\n\
  hoplog /broadcasts/0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10     # Same, resolved from an admin page path\n\
  hoplog --navigate                                          # Read page locations from stdin, one per line\n\
---\n\
Configuration Examples:\n\
  hoplog setconfig api.log_api_url https://logs.example.org  # Log service base URL\n\
  hoplog setconfig stream.decode_policy strict               # Stop on malformed events\n\
  hoplog getconfig                                           # Show all current configuration\n\
  hoplog getconfig output                                    # Show only output settings"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Broadcast id, or an admin page location such as /broadcasts/<id>
    pub target: Option<String>,

    /// Base URL of the log service (overrides config and HOPLOG_API_URL)
    #[arg(short = 'u', long = "api-url")]
    pub api_url: Option<String>,

    /// Output format (text, json, raw)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Hide hop timestamps
    #[arg(long = "no-timestamps")]
    pub no_timestamps: bool,

    /// Treat each stdin line as a page navigation
    #[arg(short = 'N', long)]
    pub navigate: bool,

    /// Append every received event to this file as JSON lines
    #[arg(short = 'w', long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    /// Enable development mode - logs to a file and stops on malformed events
    #[arg(long)]
    pub dev: bool,

    /// Verbosity level for debug output
    #[arg(short, long, default_value = "0")]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Configure hoplog settings
    #[command(name = "setconfig")]
    SetConfig {
        /// Configuration key to set (dot notation, e.g. api.log_api_url)
        key: String,
        /// Configuration value to set
        value: String,
    },
    /// Display current hoplog configuration
    #[command(name = "getconfig")]
    GetConfig {
        /// Optional key or section to display (e.g. output)
        key: Option<String>,
    },
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["hoplog"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.target.is_none());
        assert!(!args.navigate);
        assert!(!args.no_timestamps);
        assert_eq!(args.verbosity, 0);
    }

    #[test]
    fn test_target_and_flags() {
        let args = Args::try_parse_from([
            "hoplog",
            "/broadcasts/0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10",
            "-u",
            "http://logs:9000",
            "-o",
            "json",
            "-w",
            "trace.jsonl",
            "-v",
            "3",
        ])
        .unwrap();
        assert_eq!(args.target.as_deref(), Some("/broadcasts/0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10"));
        assert_eq!(args.api_url.as_deref(), Some("http://logs:9000"));
        assert_eq!(args.output.as_deref(), Some("json"));
        assert_eq!(args.transcript, Some(PathBuf::from("trace.jsonl")));
        assert_eq!(args.verbosity, 3);
    }

    #[test]
    fn test_config_subcommands() {
        let args = Args::try_parse_from(["hoplog", "setconfig", "output.format", "raw"]).unwrap();
        match args.command {
            Some(Commands::SetConfig { key, value }) => {
                assert_eq!(key, "output.format");
                assert_eq!(value, "raw");
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::try_parse_from(["hoplog", "getconfig"]).unwrap();
        assert!(matches!(args.command, Some(Commands::GetConfig { key: None })));
    }
}
