// Grader configuration
// Loaded from config/grader.json, then overridden from the environment
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/grader.json";

pub const ENV_PYTHON: &str = "GABARITO_PYTHON";
pub const ENV_TIME_LIMIT_MS: &str = "GABARITO_TIME_LIMIT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Interpreter used to host candidate programs
    pub python_command: String,
    /// Wall-clock ceiling for one whole grading call
    pub time_limit_ms: u64,
    /// Upper bound for per-request overrides of `time_limit_ms`
    pub max_time_limit_ms: u64,
    pub max_source_bytes: usize,
    pub max_fixture_bytes: usize,
    /// Candidate error details are cut to this many characters
    pub max_error_chars: usize,
    /// Report fixtures finished before a timeout instead of dropping them
    pub keep_partial_results: bool,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            python_command: "python3".to_string(),
            time_limit_ms: 5000,
            max_time_limit_ms: 30_000,
            max_source_bytes: 1024 * 1024,
            max_fixture_bytes: 10 * 1024 * 1024,
            max_error_chars: 500,
            keep_partial_results: true,
        }
    }
}

impl GraderConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Grader config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: GraderConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load config/grader.json if present, defaults otherwise, then apply env overrides
    pub fn load_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        let config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(python) = lookup(ENV_PYTHON) {
            self.python_command = python;
        }
        if let Some(raw) = lookup(ENV_TIME_LIMIT_MS) {
            self.time_limit_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be an integer, got {:?}", ENV_TIME_LIMIT_MS, raw))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.python_command.trim().is_empty() {
            bail!("python_command cannot be empty");
        }
        if self.time_limit_ms == 0 {
            bail!("time_limit_ms must be greater than zero");
        }
        if self.time_limit_ms > self.max_time_limit_ms {
            bail!(
                "time_limit_ms ({}) exceeds max_time_limit_ms ({})",
                self.time_limit_ms,
                self.max_time_limit_ms
            );
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    /// Per-request time limit, clamped to the configured maximum
    pub fn clamp_time_limit(&self, requested_ms: Option<u64>) -> Duration {
        match requested_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms.min(self.max_time_limit_ms)),
            _ => self.time_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = GraderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.time_limit(), Duration::from_secs(5));
        assert!(config.keep_partial_results);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"time_limit_ms": 2000, "python_command": "python3.12"}}"#).unwrap();

        let config = GraderConfig::load(file.path()).unwrap();
        assert_eq!(config.time_limit_ms, 2000);
        assert_eq!(config.python_command, "python3.12");
        assert_eq!(config.max_error_chars, 500);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GraderConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(GraderConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = GraderConfig::default()
            .with_env_overrides(env(&[(ENV_PYTHON, "/usr/bin/python3"), (ENV_TIME_LIMIT_MS, "750")]))
            .unwrap();
        assert_eq!(config.python_command, "/usr/bin/python3");
        assert_eq!(config.time_limit_ms, 750);
    }

    #[test]
    fn test_env_override_must_be_numeric() {
        let result = GraderConfig::default().with_env_overrides(env(&[(ENV_TIME_LIMIT_MS, "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_and_oversized_limits() {
        let mut config = GraderConfig::default();
        config.time_limit_ms = 0;
        assert!(config.validate().is_err());

        config.time_limit_ms = config.max_time_limit_ms + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_time_limit() {
        let config = GraderConfig::default();
        assert_eq!(config.clamp_time_limit(None), Duration::from_secs(5));
        assert_eq!(config.clamp_time_limit(Some(0)), Duration::from_secs(5));
        assert_eq!(config.clamp_time_limit(Some(1500)), Duration::from_millis(1500));
        assert_eq!(config.clamp_time_limit(Some(120_000)), Duration::from_secs(30));
    }
}
