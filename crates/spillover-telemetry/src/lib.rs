use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "spillover_store" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// JSON lines when true, human-readable text otherwise.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: true,
        }
    }
}

impl TelemetryConfig {
    /// Build from a level name such as `"debug"`; unknown names fall back to INFO.
    pub fn from_level_name(level: &str, json: bool) -> Self {
        Self {
            log_level: level.parse().unwrap_or(Level::INFO),
            json,
            ..Self::default()
        }
    }

    /// Filter directive string, e.g. `info,spillover_engine=debug`.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter
    }
}

/// Initialize the global tracing subscriber. Call once at startup.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_include_module_overrides() {
        let config = TelemetryConfig {
            log_level: Level::WARN,
            module_levels: vec![("spillover_engine".into(), Level::DEBUG)],
            json: false,
        };
        assert_eq!(config.filter_directives(), "warn,spillover_engine=debug");
    }

    #[test]
    fn level_name_parsing() {
        assert_eq!(TelemetryConfig::from_level_name("debug", true).log_level, Level::DEBUG);
        assert_eq!(TelemetryConfig::from_level_name("nonsense", true).log_level, Level::INFO);
    }

    #[test]
    fn second_init_reports_false() {
        let config = TelemetryConfig::default();
        let _ = init_telemetry(&config);
        assert!(!init_telemetry(&config));
    }
}
