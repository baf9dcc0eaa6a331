//! Runtime configuration from environment variables plus file-based source
//! lists.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_CHANNELS_PATH: &str = "YOUTUBE_CHANNELS_PATH";

/// Everything the runner binary needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub window_hours: i64,
    pub top_n: usize,
    pub recipients: Vec<String>,
    pub enrich_concurrency: usize,
    pub digest_concurrency: usize,
    pub call_timeout_secs: u64,
}

impl AppConfig {
    /// Read from the environment. `DIGEST_RECIPIENTS` is required
    /// (comma-separated); everything else has a default.
    pub fn from_env() -> Result<Self> {
        let recipients = std::env::var("DIGEST_RECIPIENTS")
            .context("DIGEST_RECIPIENTS missing")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        anyhow::ensure!(!recipients.is_empty(), "DIGEST_RECIPIENTS is empty");

        Ok(Self {
            db_path: env_or("DIGEST_DB_PATH", "data/digest.db"),
            window_hours: env_parsed("DIGEST_WINDOW_HOURS", 24)?,
            top_n: env_parsed("DIGEST_TOP_N", 10)?,
            recipients,
            enrich_concurrency: env_parsed("ENRICH_CONCURRENCY", 4)?,
            digest_concurrency: env_parsed("DIGEST_CONCURRENCY", 4)?,
            call_timeout_secs: env_parsed("CALL_TIMEOUT_SECS", 30)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("parsing {key}={raw}")),
        Err(_) => Ok(default),
    }
}

/// Load the YouTube channel-id list from an explicit path. Supports TOML
/// (`channels = [...]`) or a bare JSON array.
pub fn load_channels_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading channel list from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_channels(&content, ext.as_str())
}

/// Load the channel list using env var + fallbacks:
/// 1) $YOUTUBE_CHANNELS_PATH
/// 2) config/youtube_channels.toml
/// 3) config/youtube_channels.json
pub fn load_channels_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_CHANNELS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_channels_from(&pb);
        } else {
            return Err(anyhow!("YOUTUBE_CHANNELS_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/youtube_channels.toml");
    if toml_p.exists() {
        return load_channels_from(&toml_p);
    }
    let json_p = PathBuf::from("config/youtube_channels.json");
    if json_p.exists() {
        return load_channels_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_channels(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("channels");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported channel list format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlChannels {
        channels: Vec<String>,
    }
    let v: TomlChannels = toml::from_str(s)?;
    Ok(clean_list(v.channels))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"channels = [" UCabc ", "", "UCdef", "UCdef"]"#;
        let json = r#"["UCghi", "  UCabc  ", ""]"#;
        let toml_out = parse_toml(toml).unwrap();
        assert_eq!(toml_out, vec!["UCabc".to_string(), "UCdef".to_string()]);
        let json_out = parse_json(json).unwrap();
        assert_eq!(json_out, vec!["UCabc".to_string(), "UCghi".to_string()]);
    }

    #[test]
    fn explicit_path_honors_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("channels.toml");
        let mut f = std::fs::File::create(&p).unwrap();
        writeln!(f, r#"channels = ["UCx"]"#).unwrap();
        assert_eq!(load_channels_from(&p).unwrap(), vec!["UCx".to_string()]);
    }
}
