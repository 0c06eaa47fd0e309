//! Logging configuration and initialization.
//!
//! The monitoring sink for the whole subsystem: structured, fire-and-forget
//! `tracing` events under `shopchat::*` targets. Presets trade detail for
//! noise; `RUST_LOG` always wins when set.

use std::collections::HashMap;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Production: minimal logging, only important events
    #[default]
    Production,
    /// Verbose: more operational detail
    Verbose,
    /// Debug: detailed info for troubleshooting
    Debug,
    /// Trace: everything including per-fragment data
    Trace,
    /// Quiet: warnings and errors only
    Quiet,
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Base preset to use
    pub preset: LogPreset,
    /// Per-target level overrides (e.g., "anchor" -> DEBUG)
    pub overrides: HashMap<String, Level>,
    /// Output format
    pub format: LogFormat,
}

impl LogConfig {
    pub fn with_preset(preset: LogPreset) -> Self {
        Self {
            preset,
            ..Default::default()
        }
    }

    /// Override one target's level. Bare targets are namespaced under
    /// `shopchat::`.
    pub fn with_override(mut self, target: &str, level: Level) -> Self {
        let full_target = if target.starts_with("shopchat::") {
            target.to_string()
        } else {
            format!("shopchat::{}", target)
        };
        self.overrides.insert(full_target, level);
        self
    }

    /// Build an EnvFilter from this configuration.
    pub fn build_filter(&self) -> EnvFilter {
        // RUST_LOG takes precedence when present
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }

        let mut directives: Vec<String> = match self.preset {
            LogPreset::Production => vec![
                "shopchat::session=info".into(),
                "shopchat::stream=info".into(),
                "shopchat::transport=warn".into(),
                "shopchat::decoder=warn".into(),
                "shopchat::anchor=warn".into(),
                "shopchat::locator=warn".into(),
                "shopchat::widget=info".into(),
            ],
            LogPreset::Verbose => vec!["shopchat=info".into()],
            LogPreset::Debug => vec!["shopchat=debug".into()],
            LogPreset::Trace => vec!["shopchat=trace".into()],
            LogPreset::Quiet => vec!["shopchat=warn".into()],
        };

        // Overrides take precedence over the preset
        for (target, level) in &self.overrides {
            directives.push(format!("{}={}", target, level_to_str(*level)));
        }

        let filter_str = directives.join(",");
        EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Convert a Level to its filter string representation.
fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Initialize the tracing subscriber with the given configuration.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("invalid".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_override_namespacing() {
        let config = LogConfig::default()
            .with_override("anchor", Level::DEBUG)
            .with_override("shopchat::stream", Level::TRACE);

        assert_eq!(config.overrides.get("shopchat::anchor"), Some(&Level::DEBUG));
        assert_eq!(config.overrides.get("shopchat::stream"), Some(&Level::TRACE));
    }

    #[test]
    fn test_build_filter_does_not_panic() {
        for preset in [
            LogPreset::Production,
            LogPreset::Verbose,
            LogPreset::Debug,
            LogPreset::Trace,
            LogPreset::Quiet,
        ] {
            let _ = LogConfig::with_preset(preset).build_filter();
        }
    }
}
