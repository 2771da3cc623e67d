//! Rule-based intervention checks. Rules run in priority order and the first hit wins:
//! stop-loss, take-profit, timeout, excess drawdown, volume anomaly.

use chrono::{DateTime, Utc};

use crate::config::ExecutorCfg;
use crate::types::{
    InterventionAction, InterventionKind, InterventionRecord, MarketSnapshot, Order, Play, Side,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterventionThresholds {
    pub timeout_hours: f64,
    pub max_drawdown: f64,
    pub volume_anomaly_ratio: f64,
}

impl Default for InterventionThresholds {
    fn default() -> Self {
        Self::from(&ExecutorCfg::default())
    }
}

impl From<&ExecutorCfg> for InterventionThresholds {
    fn from(c: &ExecutorCfg) -> Self {
        Self {
            timeout_hours: c.timeout_hours,
            max_drawdown: c.max_drawdown,
            volume_anomaly_ratio: c.volume_anomaly_ratio,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterventionEvaluator {
    th: InterventionThresholds,
}

impl InterventionEvaluator {
    pub fn new(th: InterventionThresholds) -> Self {
        Self { th }
    }

    /// Expects `play.performance_metrics` to be already updated for `snap`.
    pub fn evaluate(
        &self,
        play: &Play,
        order: &Order,
        snap: &MarketSnapshot,
        now: DateTime<Utc>,
    ) -> Option<InterventionRecord> {
        let side = play.side();
        let m = &play.performance_metrics;
        let hit = |kind, action, reason: String| {
            Some(InterventionRecord {
                kind,
                reason,
                action,
                timestamp: now,
            })
        };

        if let Some(sc) = &order.stop_conditions {
            let stop_hit = match side {
                Side::Buy => snap.price <= sc.stop_loss_price,
                Side::Sell => snap.price >= sc.stop_loss_price,
            };
            if stop_hit {
                return hit(
                    InterventionKind::StopLossHit,
                    InterventionAction::ExitPosition,
                    format!("price {:.4} crossed stop-loss {:.4}", snap.price, sc.stop_loss_price),
                );
            }

            let target_hit = match side {
                Side::Buy => snap.price >= sc.take_profit_price,
                Side::Sell => snap.price <= sc.take_profit_price,
            };
            if target_hit {
                return hit(
                    InterventionKind::TakeProfitHit,
                    InterventionAction::ExitPosition,
                    format!(
                        "price {:.4} reached take-profit {:.4}",
                        snap.price, sc.take_profit_price
                    ),
                );
            }
        }

        if m.time_in_play > self.th.timeout_hours {
            return hit(
                InterventionKind::Timeout,
                InterventionAction::EvaluateAndExit,
                format!(
                    "in play {:.1}h, limit {:.1}h",
                    m.time_in_play, self.th.timeout_hours
                ),
            );
        }

        if m.max_drawdown.abs() > self.th.max_drawdown {
            return hit(
                InterventionKind::MarketConditionChange,
                InterventionAction::ReducePosition,
                format!(
                    "drawdown {:.2}% beyond {:.2}%",
                    m.max_drawdown * 100.0,
                    self.th.max_drawdown * 100.0
                ),
            );
        }

        if snap.avg_volume > 0.0 {
            let ratio = snap.volume / snap.avg_volume;
            if ratio < self.th.volume_anomaly_ratio {
                return hit(
                    InterventionKind::VolumeAnomaly,
                    InterventionAction::MonitorClosely,
                    format!("volume at {:.0}% of average", ratio * 100.0),
                );
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::heuristic_parse;
    use crate::plan::{build_monitoring_conditions, build_plan};
    use crate::risk::stop_levels;
    use crate::types::{OrderStatus, PerformanceMetrics, PlayStatus, StopConditions};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 13, 30, 0).unwrap()
    }

    fn fixture(side: Side) -> (Play, Order) {
        let desc = if side == Side::Sell { "short it" } else { "buy it" };
        let spec = heuristic_parse(desc, "XYZ", &[], None);
        assert_eq!(spec.side, side);
        let (stop, target) = stop_levels(side, 100.0, 0.05, 0.10);
        let order = Order {
            order_id: "o1".into(),
            symbol: "XYZ".into(),
            side,
            quantity: 1.0,
            price: Some(100.0),
            status: OrderStatus::Open,
            stop_conditions: Some(StopConditions {
                stop_loss_price: stop,
                stop_loss_percentage: 5.0,
                take_profit_price: target,
                take_profit_percentage: 10.0,
                trailing_stop_percentage: None,
                time_based_stop: None,
                max_holding_period: None,
            }),
        };
        let play = Play {
            play_id: "p1".into(),
            order_id: "o1".into(),
            symbol: "XYZ".into(),
            status: PlayStatus::Active,
            confidence_score: 0.7,
            quantity: 1.0,
            created_at: t0(),
            updated_at: t0(),
            completed_at: None,
            execution_plan: build_plan(&spec),
            monitoring_conditions: build_monitoring_conditions(&spec),
            parsed_play: spec,
            intervention_history: vec![],
            adaptation_history: vec![],
            performance_metrics: PerformanceMetrics::at_entry(100.0),
        };
        (play, order)
    }

    fn snap(price: f64) -> MarketSnapshot {
        MarketSnapshot { price, volume: 1_000_000.0, avg_volume: 1_000_000.0 }
    }

    fn kind_at(side: Side, price: f64) -> Option<InterventionKind> {
        let (play, order) = fixture(side);
        InterventionEvaluator::default()
            .evaluate(&play, &order, &snap(price), t0())
            .map(|r| r.kind)
    }

    #[test]
    fn buy_stop_boundary() {
        assert_eq!(kind_at(Side::Buy, 94.99), Some(InterventionKind::StopLossHit));
        assert_eq!(kind_at(Side::Buy, 95.01), None);
    }

    #[test]
    fn sell_stop_boundary() {
        assert_eq!(kind_at(Side::Sell, 105.01), Some(InterventionKind::StopLossHit));
        assert_eq!(kind_at(Side::Sell, 104.99), None);
    }

    #[test]
    fn take_profit_both_sides() {
        assert_eq!(kind_at(Side::Buy, 110.5), Some(InterventionKind::TakeProfitHit));
        assert_eq!(kind_at(Side::Sell, 89.5), Some(InterventionKind::TakeProfitHit));
        assert_eq!(kind_at(Side::Sell, 91.0), None);
    }

    #[test]
    fn stop_beats_timeout() {
        let (mut play, order) = fixture(Side::Buy);
        play.performance_metrics.time_in_play = 30.0;
        let r = InterventionEvaluator::default()
            .evaluate(&play, &order, &snap(90.0), t0())
            .unwrap();
        assert_eq!(r.kind, InterventionKind::StopLossHit);
        assert_eq!(r.action, InterventionAction::ExitPosition);
    }

    #[test]
    fn timeout_then_drawdown_then_volume() {
        let ev = InterventionEvaluator::default();
        let (mut play, order) = fixture(Side::Buy);

        play.performance_metrics.time_in_play = 24.5;
        play.performance_metrics.max_drawdown = -0.2;
        let r = ev.evaluate(&play, &order, &snap(100.0), t0()).unwrap();
        assert_eq!(r.kind, InterventionKind::Timeout);
        assert_eq!(r.action, InterventionAction::EvaluateAndExit);

        play.performance_metrics.time_in_play = 2.0;
        let r = ev.evaluate(&play, &order, &snap(100.0), t0()).unwrap();
        assert_eq!(r.kind, InterventionKind::MarketConditionChange);
        assert_eq!(r.action, InterventionAction::ReducePosition);

        play.performance_metrics.max_drawdown = -0.01;
        let thin = MarketSnapshot { price: 100.0, volume: 300_000.0, avg_volume: 1_000_000.0 };
        let r = ev.evaluate(&play, &order, &thin, t0()).unwrap();
        assert_eq!(r.kind, InterventionKind::VolumeAnomaly);
        assert_eq!(r.action, InterventionAction::MonitorClosely);
    }

    #[test]
    fn zero_avg_volume_is_ignored() {
        let (play, order) = fixture(Side::Buy);
        let s = MarketSnapshot { price: 100.0, volume: 0.0, avg_volume: 0.0 };
        assert!(InterventionEvaluator::default().evaluate(&play, &order, &s, t0()).is_none());
    }

    #[test]
    fn no_stop_conditions_skips_price_rules() {
        let (play, mut order) = fixture(Side::Buy);
        order.stop_conditions = None;
        assert!(InterventionEvaluator::default()
            .evaluate(&play, &order, &snap(1.0), t0())
            .is_none());
    }
}
