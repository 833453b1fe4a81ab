use std::str::FromStr;
use std::time::Duration;

use crate::env::{
    env_var, CTXLOG_BATCH_SIZE_ENV, CTXLOG_BUFFER_ENV, CTXLOG_COLOR_ENV,
    CTXLOG_FLUSH_INTERVAL_MS_ENV, NO_COLOR_ENV,
};
use crate::error::ConfigError;

/// Buffering configuration for [`BufferedSink`](crate::buffered::BufferedSink).
///
/// **Fields**
/// - `channel_buffer`: maximum number of records queued before new records
///   are rejected.
/// - `batch_size`: number of records sent to the backend per batch.
/// - `flush_interval`: how long the queue may stay idle before a partial
///   batch is sent anyway.
/// - `max_retries`: attempts per record after the first failure before the
///   record is given up on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_retries: 3,
        }
    }
}

impl BufferConfig {
    /// Enforce minimal thresholds to avoid degenerate configs.
    pub fn normalized(self) -> Self {
        Self {
            channel_buffer: self.channel_buffer.max(16),
            batch_size: self.batch_size.max(1),
            flush_interval: self.flush_interval.max(Duration::from_millis(10)),
            max_retries: self.max_retries,
        }
    }

    /// Defaults overridden by `CTXLOG_BUFFER`, `CTXLOG_BATCH_SIZE` and
    /// `CTXLOG_FLUSH_INTERVAL_MS` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = parse_env::<usize>(CTXLOG_BUFFER_ENV)? {
            config.channel_buffer = v;
        }
        if let Some(v) = parse_env::<usize>(CTXLOG_BATCH_SIZE_ENV)? {
            config.batch_size = v;
        }
        if let Some(v) = parse_env::<u64>(CTXLOG_FLUSH_INTERVAL_MS_ENV)? {
            config.flush_interval = Duration::from_millis(v);
        }
        Ok(config)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    env_var(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: key.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}

/// Whether the human renderer emits color codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Color when writing to a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            ColorMode::Auto => is_terminal,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

impl FromStr for ColorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(ColorMode::Auto),
            "always" | "true" | "1" => Ok(ColorMode::Always),
            "never" | "false" | "0" => Ok(ColorMode::Never),
            _ => Err(ConfigError::InvalidColorMode(s.to_string())),
        }
    }
}

/// Configuration for [`HumanSink`](crate::human::HumanSink).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HumanConfig {
    pub color: ColorMode,
}

impl HumanConfig {
    /// Reads `CTXLOG_COLOR`; `NO_COLOR` forces colors off.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env_var(CTXLOG_COLOR_ENV), env_var(NO_COLOR_ENV))
    }

    fn from_vars(color: Option<String>, no_color: Option<String>) -> Result<Self, ConfigError> {
        if no_color.is_some() {
            return Ok(Self {
                color: ColorMode::Never,
            });
        }
        let color = color.as_deref().map(str::parse::<ColorMode>).transpose()?.unwrap_or_default();
        Ok(Self { color })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_enforces_minimums() {
        let config = BufferConfig {
            channel_buffer: 1,
            batch_size: 0,
            flush_interval: Duration::from_millis(1),
            max_retries: 0,
        }
        .normalized();
        assert_eq!(config.channel_buffer, 16);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.flush_interval, Duration::from_millis(10));
    }

    #[test]
    fn color_mode_parses() {
        assert_eq!("Always".parse::<ColorMode>(), Ok(ColorMode::Always));
        assert_eq!("0".parse::<ColorMode>(), Ok(ColorMode::Never));
        assert_eq!("".parse::<ColorMode>(), Ok(ColorMode::Auto));
        assert!(matches!(
            "sometimes".parse::<ColorMode>(),
            Err(ConfigError::InvalidColorMode(_))
        ));
    }

    #[test]
    fn no_color_wins() {
        let config = HumanConfig::from_vars(Some("always".into()), Some(String::new())).unwrap();
        assert_eq!(config.color, ColorMode::Never);

        let config = HumanConfig::from_vars(Some("always".into()), None).unwrap();
        assert_eq!(config.color, ColorMode::Always);

        assert!(HumanConfig::from_vars(Some("purple".into()), None).is_err());
    }

    #[test]
    fn auto_follows_terminal() {
        assert!(ColorMode::Auto.enabled(true));
        assert!(!ColorMode::Auto.enabled(false));
        assert!(ColorMode::Always.enabled(false));
    }
}
