//! Write-only audit sinks for play lifecycle events.

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::types::{AdaptationRecord, InterventionRecord, MarketSnapshot, PerformanceMetrics, Play};

/// Best-effort audit log. Callers swallow errors; nothing here is transactional with play state.
pub trait PlayReportingSink: Send {
    fn log_creation(&mut self, play: &Play) -> anyhow::Result<()>;
    fn log_intervention(
        &mut self,
        play_id: &str,
        intervention: &InterventionRecord,
        snapshot: &MarketSnapshot,
    ) -> anyhow::Result<()>;
    fn log_adaptation(
        &mut self,
        play_id: &str,
        adaptation: &AdaptationRecord,
        snapshot: &MarketSnapshot,
    ) -> anyhow::Result<()>;
    fn log_performance_update(
        &mut self,
        play_id: &str,
        metrics: &PerformanceMetrics,
    ) -> anyhow::Result<()>;
    fn log_completion(&mut self, play_id: &str, exit_price: f64, final_pnl: f64)
        -> anyhow::Result<()>;
}

/// One audit line.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    Creation {
        play_id: String,
        symbol: String,
        order_id: String,
        title: String,
        side: String,
    },
    Intervention {
        play_id: String,
        intervention: InterventionRecord,
        snapshot: MarketSnapshot,
    },
    Adaptation {
        play_id: String,
        adaptation: AdaptationRecord,
        snapshot: MarketSnapshot,
    },
    PerformanceUpdate {
        play_id: String,
        metrics: PerformanceMetrics,
    },
    Completion {
        play_id: String,
        exit_price: f64,
        final_pnl: f64,
    },
}

impl ReportEvent {
    pub fn play_id(&self) -> &str {
        match self {
            ReportEvent::Creation { play_id, .. }
            | ReportEvent::Intervention { play_id, .. }
            | ReportEvent::Adaptation { play_id, .. }
            | ReportEvent::PerformanceUpdate { play_id, .. }
            | ReportEvent::Completion { play_id, .. } => play_id,
        }
    }
}

/// Adapter so a sink only has to handle `ReportEvent`s.
pub trait EventSink: Send {
    fn record(&mut self, event: ReportEvent) -> anyhow::Result<()>;
}

impl<T: EventSink> PlayReportingSink for T {
    fn log_creation(&mut self, play: &Play) -> anyhow::Result<()> {
        self.record(ReportEvent::Creation {
            play_id: play.play_id.clone(),
            symbol: play.symbol.clone(),
            order_id: play.order_id.clone(),
            title: play.parsed_play.title.clone(),
            side: play.side().to_string(),
        })
    }

    fn log_intervention(
        &mut self,
        play_id: &str,
        intervention: &InterventionRecord,
        snapshot: &MarketSnapshot,
    ) -> anyhow::Result<()> {
        self.record(ReportEvent::Intervention {
            play_id: play_id.to_string(),
            intervention: intervention.clone(),
            snapshot: snapshot.clone(),
        })
    }

    fn log_adaptation(
        &mut self,
        play_id: &str,
        adaptation: &AdaptationRecord,
        snapshot: &MarketSnapshot,
    ) -> anyhow::Result<()> {
        self.record(ReportEvent::Adaptation {
            play_id: play_id.to_string(),
            adaptation: adaptation.clone(),
            snapshot: snapshot.clone(),
        })
    }

    fn log_performance_update(
        &mut self,
        play_id: &str,
        metrics: &PerformanceMetrics,
    ) -> anyhow::Result<()> {
        self.record(ReportEvent::PerformanceUpdate {
            play_id: play_id.to_string(),
            metrics: metrics.clone(),
        })
    }

    fn log_completion(
        &mut self,
        play_id: &str,
        exit_price: f64,
        final_pnl: f64,
    ) -> anyhow::Result<()> {
        self.record(ReportEvent::Completion {
            play_id: play_id.to_string(),
            exit_price,
            final_pnl,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _event: ReportEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlReportSink {
    path: PathBuf,
}

impl JsonlReportSink {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlReportSink {
    fn record(&mut self, event: ReportEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_value(&event)?;
        if let Some(obj) = line.as_object_mut() {
            obj.insert("at".to_string(), serde_json::to_value(Utc::now())?);
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open report log {}", self.path.display()))?;
        writeln!(f, "{}", line)
            .with_context(|| format!("append report for play {}", event.play_id()))?;
        Ok(())
    }
}

/// Keeps events in memory behind a shared handle; clones see the same log.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: ReportEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonl_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("r.jsonl");
        let mut sink = JsonlReportSink::new(&path).unwrap();
        sink.log_completion("p1", 101.5, 0.015).unwrap();
        sink.log_completion("p2", 99.0, -0.01).unwrap();
        let text = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(v["event"], "completion");
        assert_eq!(v["play_id"], "p1");
        assert!(v.get("at").is_some());
    }

    #[test]
    fn memory_sink_shares_log() {
        let sink = MemorySink::new();
        let mut handle = sink.clone();
        handle.log_completion("p1", 1.0, 0.0).unwrap();
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.events()[0].play_id(), "p1");
    }
}
