//! Momentum-driven resize suggestions. Only consulted when no intervention fired.

use chrono::{DateTime, Utc};

use crate::config::ExecutorCfg;
use crate::types::{AdaptationAction, AdaptationKind, AdaptationRecord, Play};

#[derive(Debug, Clone, Copy)]
pub struct AdaptationEvaluator {
    add_above: f64,
    reduce_below: f64,
}

impl Default for AdaptationEvaluator {
    fn default() -> Self {
        Self::from(&ExecutorCfg::default())
    }
}

impl From<&ExecutorCfg> for AdaptationEvaluator {
    fn from(c: &ExecutorCfg) -> Self {
        Self {
            add_above: c.add_position_threshold,
            reduce_below: c.reduce_position_threshold,
        }
    }
}

impl AdaptationEvaluator {
    pub fn evaluate(&self, play: &Play, now: DateTime<Utc>) -> Option<AdaptationRecord> {
        let pnl = play.performance_metrics.pnl_pct;
        let (kind, action, reason) = if pnl > self.add_above {
            (
                AdaptationKind::AddPosition,
                AdaptationAction::IncreasePositionSize,
                format!("pnl {:.2}% above {:.2}%", pnl * 100.0, self.add_above * 100.0),
            )
        } else if pnl < self.reduce_below {
            (
                AdaptationKind::ReducePosition,
                AdaptationAction::ReducePositionSize,
                format!("pnl {:.2}% below {:.2}%", pnl * 100.0, self.reduce_below * 100.0),
            )
        } else {
            return None;
        };
        Some(AdaptationRecord {
            kind,
            reason,
            action,
            timestamp: now,
        })
    }
}
