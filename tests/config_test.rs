use anyhow::Result;
use hoplog::config::Config;
use hoplog::stream::DecodePolicy;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_saved_config_loads_back() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.set_value("api.log_api_url", "https://logs.example.org")?;
    config.set_value("output.format", "json")?;
    config.set_value("stream.decode_policy", "strict")?;
    config.save_to(&path)?;

    let loaded = Config::load_from(&path)?;
    assert_eq!(loaded.api.log_api_url, "https://logs.example.org");
    assert_eq!(loaded.output.format, "json");
    assert_eq!(loaded.stream.decode_policy, DecodePolicy::Strict);

    let settings = loaded.stream_settings();
    assert_eq!(settings.log_api_url, "https://logs.example.org");
    assert_eq!(settings.connect_timeout, Duration::from_secs(loaded.api.connect_timeout_seconds));
    Ok(())
}

#[test]
fn test_missing_file_gives_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let loaded = Config::load_from(&dir.path().join("absent.toml"))?;
    assert_eq!(loaded.api.log_api_url, Config::default().api.log_api_url);
    assert_eq!(loaded.stream.decode_policy, DecodePolicy::Drop);
    Ok(())
}

#[test]
fn test_broken_file_gives_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[api\nlog_api_url = ")?;

    let loaded = Config::load_from(&path)?;
    assert_eq!(loaded.output.format, Config::default().output.format);
    Ok(())
}

#[test]
fn test_partial_file_keeps_other_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[output]\ntimestamps = false\n")?;

    let loaded = Config::load_from(&path)?;
    assert!(!loaded.output.timestamps);
    assert_eq!(loaded.api.log_api_url, Config::default().api.log_api_url);
    assert_eq!(loaded.stream.channel_capacity, Config::default().stream.channel_capacity);
    Ok(())
}
