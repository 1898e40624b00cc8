use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::types::{
    ANOMALY_THRESHOLD, HELP_DELAY_SECS, SAMPLING_RATE, SCAN_WIDTH, WINDOW_CAPACITY,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Window capacity must be at least 1")]
    EmptyWindow,

    #[error("Invalid scan width: expected 1..={capacity}, got {scan_width}")]
    InvalidScanWidth { scan_width: usize, capacity: usize },

    #[error("Sample period must be at least 1 ms")]
    InvalidSamplePeriod,
}

/// Qué ranuras del anillo se comparan en cada muestra
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Ranuras físicas 0..K, independientes del cursor (comportamiento del reloj)
    #[default]
    FixedPrefix,
    /// Las K ranuras escritas más recientemente, relativas al cursor
    CursorRelative,
}

/// Dónde da la vuelta el cursor de escritura
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorWrap {
    /// Recorre las W ranuras; las escrituras en ranuras ≥ K no se escanean
    #[default]
    Capacity,
    /// Da la vuelta en K, como el firmware del reloj: toda muestra cae en una ranura escaneada
    ScanWidth,
}

/// Configuración del detector. Se lee una vez al arrancar y no cambia.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub window_capacity: usize,
    pub scan_width: usize,
    pub threshold: u32,
    pub scan_mode: ScanMode,
    pub cursor_wrap: CursorWrap,
    pub sample_period_ms: u64,
    pub help_delay_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_capacity: WINDOW_CAPACITY,
            scan_width: SCAN_WIDTH,
            threshold: ANOMALY_THRESHOLD,
            scan_mode: ScanMode::FixedPrefix,
            cursor_wrap: CursorWrap::Capacity,
            sample_period_ms: (1000.0 / SAMPLING_RATE) as u64,
            help_delay_secs: HELP_DELAY_SECS,
        }
    }
}

impl DetectorConfig {
    /// Carga la configuración desde un JSON; los campos ausentes toman su valor por defecto
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if self.scan_width == 0 || self.scan_width > self.window_capacity {
            return Err(ConfigError::InvalidScanWidth {
                scan_width: self.scan_width,
                capacity: self.window_capacity,
            });
        }
        if self.sample_period_ms == 0 {
            return Err(ConfigError::InvalidSamplePeriod);
        }
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn help_delay(&self) -> Duration {
        Duration::from_secs(self.help_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_watch_constants() {
        let config = DetectorConfig::default();
        assert_eq!(config.window_capacity, 8);
        assert_eq!(config.scan_width, 2);
        assert_eq!(config.threshold, 10_000_000);
        assert_eq!(config.scan_mode, ScanMode::FixedPrefix);
        assert_eq!(config.cursor_wrap, CursorWrap::Capacity);
        assert_eq!(config.sample_period(), Duration::from_millis(10));
        assert_eq!(config.help_delay(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DetectorConfig::from_json(r#"{ "threshold": 100 }"#).unwrap();
        assert_eq!(config.threshold, 100);
        assert_eq!(config.window_capacity, 8);
        assert_eq!(config.scan_width, 2);
    }

    #[test]
    fn test_scan_mode_from_json() {
        let config =
            DetectorConfig::from_json(r#"{ "scan_mode": "cursor_relative" }"#).unwrap();
        assert_eq!(config.scan_mode, ScanMode::CursorRelative);
        assert_eq!(config.cursor_wrap, CursorWrap::Capacity);
    }

    #[test]
    fn test_cursor_wrap_from_json() {
        let config = DetectorConfig::from_json(r#"{ "cursor_wrap": "scan_width" }"#).unwrap();
        assert_eq!(config.cursor_wrap, CursorWrap::ScanWidth);
        assert_eq!(config.scan_mode, ScanMode::FixedPrefix);
    }

    #[test]
    fn test_rejects_scan_wider_than_window() {
        let err = DetectorConfig::from_json(r#"{ "window_capacity": 4, "scan_width": 5 }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidScanWidth {
                scan_width: 5,
                capacity: 4
            }
        ));
    }

    #[test]
    fn test_rejects_empty_window_and_zero_period() {
        let config = DetectorConfig {
            window_capacity: 0,
            ..DetectorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyWindow)));

        let config = DetectorConfig {
            sample_period_ms: 0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSamplePeriod)
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            DetectorConfig::from_json("{ threshold: }"),
            Err(ConfigError::JsonError(_))
        ));
    }
}
