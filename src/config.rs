//! Configuration loading and management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::recognizer::RecognizerConfig;
use crate::source::InputMode;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Recognizer thresholds and input semantics
    pub recognizer: RecognizerConfig,

    /// Output level the software volume starts at
    pub initial_volume: f32,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("volkey");

        let socket_path = lookup("VOLKEY_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let defaults = RecognizerConfig::default();
        let recognizer = RecognizerConfig {
            double_click_threshold: parse_millis(&lookup, "VOLKEY_DOUBLE_CLICK_MS")?
                .unwrap_or(defaults.double_click_threshold),
            hold_threshold: parse_millis(&lookup, "VOLKEY_HOLD_MS")?
                .unwrap_or(defaults.hold_threshold),
            repeat_gap: parse_millis(&lookup, "VOLKEY_REPEAT_GAP_MS")?
                .unwrap_or(defaults.repeat_gap),
            mode: match lookup("VOLKEY_INPUT_MODE") {
                Some(raw) => InputMode::from_str(&raw)
                    .map_err(|e| anyhow!(e))
                    .context("invalid VOLKEY_INPUT_MODE")?,
                None => defaults.mode,
            },
        };

        let initial_volume = match lookup("VOLKEY_INITIAL_VOLUME") {
            Some(raw) => {
                let level: f32 = raw
                    .parse()
                    .with_context(|| format!("invalid VOLKEY_INITIAL_VOLUME: {raw}"))?;
                if !(0.0..=1.0).contains(&level) {
                    return Err(anyhow!("VOLKEY_INITIAL_VOLUME must be within 0.0..=1.0, got {level}"));
                }
                level
            }
            None => 0.5,
        };

        Ok(Self {
            socket_path,
            data_dir,
            recognizer,
            initial_volume,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let millis: u64 = raw
        .parse()
        .with_context(|| format!("invalid {key}: {raw}"))?;
    if millis == 0 {
        return Err(anyhow!("{key} must be greater than zero"));
    }
    Ok(Some(Duration::from_millis(millis)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[("HOME", "/home/test")]).unwrap();
        assert!(config.socket_path.to_string_lossy().contains("volkey"));
        assert_eq!(config.recognizer, RecognizerConfig::default());
        assert_eq!(config.initial_volume, 0.5);
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("HOME", "/home/test"),
            ("VOLKEY_SOCKET", "/tmp/volkey.sock"),
            ("VOLKEY_DOUBLE_CLICK_MS", "1000"),
            ("VOLKEY_HOLD_MS", "3000"),
            ("VOLKEY_REPEAT_GAP_MS", "250"),
            ("VOLKEY_INPUT_MODE", "analog"),
            ("VOLKEY_INITIAL_VOLUME", "0.25"),
        ])
        .unwrap();

        assert_eq!(config.socket_path, PathBuf::from("/tmp/volkey.sock"));
        assert_eq!(config.recognizer.double_click_threshold, Duration::from_secs(1));
        assert_eq!(config.recognizer.hold_threshold, Duration::from_secs(3));
        assert_eq!(config.recognizer.repeat_gap, Duration::from_millis(250));
        assert_eq!(config.recognizer.mode, InputMode::Analog);
        assert_eq!(config.initial_volume, 0.25);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[]).is_err());
        assert!(load(&[("HOME", "/h"), ("VOLKEY_HOLD_MS", "soon")]).is_err());
        assert!(load(&[("HOME", "/h"), ("VOLKEY_DOUBLE_CLICK_MS", "0")]).is_err());
        assert!(load(&[("HOME", "/h"), ("VOLKEY_INPUT_MODE", "touch")]).is_err());
        assert!(load(&[("HOME", "/h"), ("VOLKEY_INITIAL_VOLUME", "2")]).is_err());
    }
}
