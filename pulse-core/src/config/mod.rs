pub mod constants;
pub mod types;

pub use types::*;

use crate::core::EngineError;
use anyhow::{Context, Result};
use config::{Config as ConfigLoader, Environment, File, FileFormat};
use constants::{MAX_TICK_PERIOD_MS, MIN_TICK_PERIOD_MS};
use std::collections::HashSet;
use std::path::Path;

impl Config {
    /// Load configuration from file with optional environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();

        let loader = ConfigLoader::builder()
            .set_default("metrics.log_level", "info")?
            .set_default("metrics.json_logs", false)?
            // Load from TOML file
            .add_source(File::from(config_path))
            // Override with environment variables (PULSE__ENGINE__TICK_PERIOD_MS=500)
            .add_source(Environment::with_prefix("PULSE").separator("__"))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", config_path.display()))?;

        Self::finish(loader)
    }

    /// Parse configuration from a TOML string (no environment overrides)
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let loader = ConfigLoader::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .context("Failed to parse configuration")?;

        Self::finish(loader)
    }

    fn finish(loader: ConfigLoader) -> Result<Self> {
        let cfg: Config = loader
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        cfg.validate().context("Invalid configuration")?;

        Ok(cfg)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_tick_period(self.engine.tick_period_ms)?;

        if !self.engine.volatility.is_finite() || self.engine.volatility < 0.0 {
            return Err(EngineError::invalid(
                "engine.volatility",
                format!("must be a non-negative finite number, got {}", self.engine.volatility),
            ));
        }

        if !(0.0..=1.0).contains(&self.engine.trade_probability) {
            return Err(EngineError::invalid(
                "engine.trade_probability",
                format!("must be within [0, 1], got {}", self.engine.trade_probability),
            ));
        }

        validate_fraction("book.spread_fraction", self.book.spread_fraction)?;
        validate_fraction("book.step_fraction", self.book.step_fraction)?;
        if self.book.spread_fraction == 0.0 {
            // A zero spread would place the nearest levels on the reference price
            return Err(EngineError::invalid(
                "book.spread_fraction",
                "must be greater than zero",
            ));
        }
        if self.book.depth > 1 && self.book.step_fraction == 0.0 {
            return Err(EngineError::invalid(
                "book.step_fraction",
                "must be greater than zero when depth > 1",
            ));
        }

        if self.book.depth > 0 {
            // Deepest bid sits at reference * (1 - spread - (depth - 1) * step)
            let reach =
                self.book.spread_fraction + (self.book.depth - 1) as f64 * self.book.step_fraction;
            if reach >= 1.0 {
                return Err(EngineError::invalid(
                    "book.depth",
                    format!(
                        "{} levels at step {} reach {:.4} of the reference price; bids would be non-positive",
                        self.book.depth, self.book.step_fraction, reach
                    ),
                ));
            }
        }

        validate_capacity("chart.capacity", self.chart.capacity)?;
        if self.chart.bucket_ms == 0 {
            return Err(EngineError::invalid("chart.bucket_ms", "must be greater than zero"));
        }
        if !(0.0..1.0).contains(&self.chart.prediction_noise) {
            return Err(EngineError::invalid(
                "chart.prediction_noise",
                format!("must be within [0, 1), got {}", self.chart.prediction_noise),
            ));
        }

        validate_capacity("logs.trade_capacity", self.logs.trade_capacity)?;
        validate_capacity("logs.insight_capacity", self.logs.insight_capacity)?;
        validate_capacity("metrics.history_capacity", self.metrics.history_capacity)?;

        if self.sources.poll_interval_ms == 0 {
            return Err(EngineError::invalid(
                "sources.poll_interval_ms",
                "must be greater than zero",
            ));
        }
        if self.sources.timeout_ms == 0 {
            return Err(EngineError::invalid("sources.timeout_ms", "must be greater than zero"));
        }
        if self.sources.circuit_failure_threshold == 0 {
            return Err(EngineError::invalid(
                "sources.circuit_failure_threshold",
                "must be greater than zero",
            ));
        }

        if !(0.0..1.0).contains(&self.metrics.fallback_jitter) {
            return Err(EngineError::invalid(
                "metrics.fallback_jitter",
                format!("must be within [0, 1), got {}", self.metrics.fallback_jitter),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.metrics.log_level.as_str()) {
            return Err(EngineError::invalid(
                "metrics.log_level",
                format!("must be one of {:?}, got '{}'", valid_log_levels, self.metrics.log_level),
            ));
        }

        if self.instruments.is_empty() {
            return Err(EngineError::invalid("instruments", "at least one instrument is required"));
        }
        let mut seen = HashSet::new();
        for inst in &self.instruments {
            if inst.symbol.trim().is_empty() {
                return Err(EngineError::invalid("instruments", "symbol must not be empty"));
            }
            if !seen.insert(inst.symbol.as_str()) {
                return Err(EngineError::DuplicateSymbol(inst.symbol.clone()));
            }
            if !inst.baseline_price.is_finite() || inst.baseline_price <= 0.0 {
                return Err(EngineError::invalid(
                    "instruments",
                    format!("{} baseline price must be positive, got {}", inst.symbol, inst.baseline_price),
                ));
            }
        }

        Ok(())
    }
}

/// Reject tick periods outside the supported range
pub fn validate_tick_period(period_ms: u64) -> Result<(), EngineError> {
    if !(MIN_TICK_PERIOD_MS..=MAX_TICK_PERIOD_MS).contains(&period_ms) {
        return Err(EngineError::TickPeriodOutOfRange {
            period_ms,
            min_ms: MIN_TICK_PERIOD_MS,
            max_ms: MAX_TICK_PERIOD_MS,
        });
    }
    Ok(())
}

fn validate_capacity(field: &'static str, capacity: usize) -> Result<(), EngineError> {
    if capacity == 0 {
        return Err(EngineError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn validate_fraction(field: &'static str, value: f64) -> Result<(), EngineError> {
    if !value.is_finite() || !(0.0..0.5).contains(&value) {
        return Err(EngineError::invalid(
            field,
            format!("must be within [0, 0.5), got {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Instrument;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Zero capacities
        config.chart.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { field: "chart.capacity", .. })
        ));
        config.chart.capacity = 120;

        config.logs.trade_capacity = 0;
        assert!(config.validate().is_err());
        config.logs.trade_capacity = 50;

        // Tick period
        config.engine.tick_period_ms = 1;
        assert!(matches!(
            config.validate(),
            Err(EngineError::TickPeriodOutOfRange { .. })
        ));
        config.engine.tick_period_ms = 500;

        // Negative volatility
        config.engine.volatility = -0.1;
        assert!(config.validate().is_err());
        config.engine.volatility = 0.004;

        // Duplicate symbol
        config.instruments.push(Instrument::new("AAPL", "Dup", "Technology", 1.0));
        assert_eq!(
            config.validate(),
            Err(EngineError::DuplicateSymbol("AAPL".to_string()))
        );
        config.instruments.pop();

        // Empty registry
        let saved = std::mem::take(&mut config.instruments);
        assert!(config.validate().is_err());
        config.instruments = saved;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let cfg = Config::from_toml_str(
            r#"
            [engine]
            tick_period_ms = 250
            rng_seed = 7

            [book]
            depth = 5

            [[instruments]]
            symbol = "XYZ"
            display_name = "Xyz Corp"
            sector = "Industrials"
            baseline_price = 42.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.engine.tick_period_ms, 250);
        assert_eq!(cfg.engine.rng_seed, Some(7));
        assert_eq!(cfg.book.depth, 5);
        assert_eq!(cfg.book.spread_fraction, constants::DEFAULT_SPREAD_FRACTION);
        assert_eq!(cfg.chart.capacity, constants::DEFAULT_CHART_CAPACITY);
        assert_eq!(cfg.instruments.len(), 1);
    }

    #[test]
    fn test_negative_depth_rejected() {
        let result = Config::from_toml_str("[book]\ndepth = -3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_book_deeper_than_price_rejected() {
        let mut cfg = Config::default();
        cfg.book.spread_fraction = 0.4;
        cfg.book.step_fraction = 0.0001;
        cfg.book.depth = 6_000;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("book.depth"), "{}", err);

        // Deepest bid still above zero
        cfg.book.depth = 5_000;
        assert!(cfg.validate().is_ok());

        cfg.book.depth = 0;
        cfg.book.step_fraction = 0.4;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[chart]\ncapacity = 30\nbucket_ms = 1000").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.chart.capacity, 30);
        assert_eq!(cfg.chart.bucket_ms, 1000);
        assert_eq!(cfg.instruments.len(), default_instruments().len());
    }

    #[test]
    fn test_shipped_config_parses() {
        let cfg = Config::from_toml_str(include_str!("../../../config/pulse.toml")).unwrap();
        assert_eq!(cfg.engine.tick_period_ms, constants::DEFAULT_TICK_PERIOD_MS);
        assert_eq!(cfg.engine.rng_seed, None);
        assert!(cfg.sources.advisory_url.is_none());
        assert_eq!(cfg.instruments.len(), 3);
    }
}
