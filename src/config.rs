use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::squad::SlotStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub home_multiplier: f64,
    pub away_base: f64,
    pub away_divisor: f64,
    pub home_advantage: bool,
    pub max_unavailable_rate: f64,
    pub forced_unavailable_min: f64,
    pub forced_unavailable_max: f64,
    pub slot_strategy: SlotStrategy,
    /// 0 lets rayon pick.
    pub worker_threads: usize,
    pub db_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            home_multiplier: 1.02,
            away_base: 0.98,
            away_divisor: 2500.0,
            home_advantage: true,
            max_unavailable_rate: 0.30,
            forced_unavailable_min: 0.80,
            forced_unavailable_max: 0.90,
            slot_strategy: SlotStrategy::BestFit,
            worker_threads: 0,
            db_path: None,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = match env::var("KEGEL_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };

        if let Some(v) = env_f64("KEGEL_HOME_MULTIPLIER") {
            cfg.home_multiplier = v.clamp(0.9, 1.1);
        }
        if let Some(v) = env_f64("KEGEL_AWAY_BASE") {
            cfg.away_base = v.clamp(0.9, 1.1);
        }
        if let Some(v) = env_f64("KEGEL_AWAY_DIVISOR") {
            cfg.away_divisor = v.max(100.0);
        }
        if let Some(v) = env_f64("KEGEL_MAX_UNAVAILABLE") {
            cfg.max_unavailable_rate = v.clamp(0.0, 1.0);
        }
        if let Ok(raw) = env::var("KEGEL_HOME_ADVANTAGE") {
            cfg.home_advantage = !matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
        if let Ok(raw) = env::var("KEGEL_SLOT_STRATEGY") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "random" => cfg.slot_strategy = SlotStrategy::Random,
                "best_fit" | "bestfit" => cfg.slot_strategy = SlotStrategy::BestFit,
                _ => {}
            }
        }
        cfg.worker_threads = env::var("KEGEL_WORKERS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(cfg.worker_threads)
            .min(64);
        if let Ok(raw) = env::var("KEGEL_DB")
            && !raw.trim().is_empty()
        {
            cfg.db_path = Some(PathBuf::from(raw.trim()));
        }

        cfg.normalize();
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let mut cfg: SimConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.normalize();
        Ok(cfg)
    }

    pub fn normalize(&mut self) {
        self.max_unavailable_rate = self.max_unavailable_rate.clamp(0.0, 1.0);
        self.forced_unavailable_min = self.forced_unavailable_min.clamp(0.0, 1.0);
        self.forced_unavailable_max = self
            .forced_unavailable_max
            .clamp(self.forced_unavailable_min, 1.0);
    }

    pub fn away_multiplier(&self, away_performance: u8) -> f64 {
        self.away_base + f64::from(away_performance) / self.away_divisor
    }
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn away_multiplier_spans_expected_band() {
        let cfg = SimConfig::default();
        assert!((cfg.away_multiplier(70) - 1.008).abs() < 1e-9);
        assert!(cfg.away_multiplier(1) > 0.98);
        assert!(cfg.away_multiplier(99) < 1.02);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: SimConfig = serde_json::from_str(r#"{"home_multiplier":1.03}"#).unwrap();
        assert_eq!(cfg.home_multiplier, 1.03);
        assert_eq!(cfg.max_unavailable_rate, 0.30);
    }

    #[test]
    fn normalize_orders_forced_band() {
        let mut cfg = SimConfig {
            max_unavailable_rate: 1.5,
            forced_unavailable_min: 0.9,
            forced_unavailable_max: 0.8,
            ..SimConfig::default()
        };
        cfg.normalize();
        assert_eq!(cfg.max_unavailable_rate, 1.0);
        assert!(cfg.forced_unavailable_min <= cfg.forced_unavailable_max);
    }
}
