use std::env;
use std::path::PathBuf;

use crate::view::FatigueThresholds;

pub const DEFAULT_PERFORMANCE_SOURCE: &str = "data/player_performance_dropoff.csv";
pub const DEFAULT_SUBSTITUTION_SOURCE: &str = "data/substitution_optimizer.csv";
pub const DEFAULT_EXPORT_DIR: &str = "exports";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub performance_source: PathBuf,
    pub substitution_source: PathBuf,
    pub export_dir: PathBuf,
    pub fatigue: FatigueThresholds,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            performance_source: PathBuf::from(DEFAULT_PERFORMANCE_SOURCE),
            substitution_source: PathBuf::from(DEFAULT_SUBSTITUTION_SOURCE),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            fatigue: FatigueThresholds::default(),
        }
    }
}

impl DashboardConfig {
    /// Reads `.env.local` and `.env` (if present) and then the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let moderate = env_f64("FATIGUE_MODERATE").unwrap_or(defaults.fatigue.moderate);
        let high = env_f64("FATIGUE_HIGH")
            .unwrap_or(defaults.fatigue.high)
            .max(moderate);
        Self {
            performance_source: opt_env("PERFORMANCE_SOURCE")
                .map(PathBuf::from)
                .unwrap_or(defaults.performance_source),
            substitution_source: opt_env("SUBSTITUTION_SOURCE")
                .map(PathBuf::from)
                .unwrap_or(defaults.substitution_source),
            export_dir: opt_env("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            fatigue: FatigueThresholds { moderate, high },
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_f64(key: &str) -> Option<f64> {
    opt_env(key)
        .and_then(|val| val.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_data_dir() {
        let config = DashboardConfig::default();
        assert_eq!(
            config.performance_source,
            PathBuf::from("data/player_performance_dropoff.csv")
        );
        assert_eq!(
            config.substitution_source,
            PathBuf::from("data/substitution_optimizer.csv")
        );
        assert!(config.fatigue.moderate < config.fatigue.high);
    }
}
