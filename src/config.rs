//! Load and validate runtime configuration.

use directories::ProjectDirs;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutorCfg {
    /// Hours after which a play is timed out.
    pub timeout_hours: f64,
    /// Absolute low-water pnl fraction that triggers a reduce intervention.
    pub max_drawdown: f64,
    /// volume / avg_volume below this is an anomaly.
    pub volume_anomaly_ratio: f64,
    pub add_position_threshold: f64,
    pub reduce_position_threshold: f64,
}

impl Default for ExecutorCfg {
    fn default() -> Self {
        Self {
            timeout_hours: 24.0,
            max_drawdown: 0.15,
            volume_anomaly_ratio: 0.5,
            add_position_threshold: 0.05,
            reduce_position_threshold: -0.03,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RiskCfg {
    pub max_position_value: f64,
    pub default_confidence: f64,
    /// Fraction; replaces the confidence-tier stop when set.
    pub stop_loss_pct: Option<f64>,
    /// Fraction; replaces the confidence-tier target when set.
    pub take_profit_pct: Option<f64>,
}

impl Default for RiskCfg {
    fn default() -> Self {
        Self {
            max_position_value: 100_000.0,
            default_confidence: 0.7,
            stop_loss_pct: None,
            take_profit_pct: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StateCfg {
    pub path: Option<String>,
    pub flush_interval_sec: u64,
}

impl Default for StateCfg {
    fn default() -> Self {
        Self {
            path: None,
            flush_interval_sec: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReportCfg {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorCfg {
    pub poll_interval_ms: u64,
    pub feed_path: String,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            feed_path: "feed.json".to_string(),
        }
    }
}

/// A play to open at start-up.
#[derive(Debug, Deserialize, Clone)]
pub struct PlayCfg {
    pub symbol: String,
    pub description: String,
    pub quantity: f64,
    pub confidence: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub executor: ExecutorCfg,
    pub risk: RiskCfg,
    pub state: StateCfg,
    pub report: ReportCfg,
    pub monitor: MonitorCfg,
    pub plays: Vec<PlayCfg>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_yaml(&s)
    }

    pub fn from_yaml(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let e = &self.executor;
        if e.timeout_hours <= 0.0 {
            anyhow::bail!("executor.timeout_hours must be positive");
        }
        if e.add_position_threshold <= e.reduce_position_threshold {
            anyhow::bail!("executor.add_position_threshold must exceed reduce_position_threshold");
        }
        if self.risk.max_position_value <= 0.0 {
            anyhow::bail!("risk.max_position_value must be positive");
        }
        for p in &self.plays {
            if p.quantity <= 0.0 {
                anyhow::bail!("play for {} has non-positive quantity", p.symbol);
            }
        }
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        resolve(self.state.path.as_deref(), "plays.json")
    }

    pub fn report_path(&self) -> PathBuf {
        resolve(self.report.path.as_deref(), "reports.jsonl")
    }
}

/// Explicit path, else the platform data dir, else the working directory.
fn resolve(explicit: Option<&str>, file: &str) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }
    match ProjectDirs::from("", "", "play-engine") {
        Some(dirs) => dirs.data_dir().join(file),
        None => PathBuf::from("data").join(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gets_defaults() {
        let cfg = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(cfg.executor.timeout_hours, 24.0);
        assert_eq!(cfg.executor.volume_anomaly_ratio, 0.5);
        assert_eq!(cfg.risk.default_confidence, 0.7);
        assert!(cfg.plays.is_empty());
        assert!(cfg.state_path().ends_with("plays.json"));
    }

    #[test]
    fn partial_sections_and_plays() {
        let cfg = AppConfig::from_yaml(
            r#"
executor:
  timeout_hours: 48
risk:
  max_position_value: 5000
  stop_loss_pct: 0.04
report:
  path: /tmp/r.jsonl
plays:
  - symbol: AAPL
    description: Buy momentum breakout
    quantity: 10
"#,
        )
        .unwrap();
        assert_eq!(cfg.executor.timeout_hours, 48.0);
        assert_eq!(cfg.executor.max_drawdown, 0.15);
        assert_eq!(cfg.risk.stop_loss_pct, Some(0.04));
        assert_eq!(cfg.report_path(), PathBuf::from("/tmp/r.jsonl"));
        assert_eq!(cfg.plays[0].confidence, None);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let err = AppConfig::from_yaml(
            "executor:\n  add_position_threshold: -0.1\n  reduce_position_threshold: 0.1\n",
        );
        assert!(err.is_err());
    }
}
