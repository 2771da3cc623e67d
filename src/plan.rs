//! Static execution plan and advisory monitoring thresholds built at play creation.
//!
//! Both are templates: only the narrative text depends on the parsed play. The numeric
//! thresholds in `MonitoringConditions` are display metadata; intervention decisions
//! read the backing order's `StopConditions` instead.

use serde::{Deserialize, Serialize};

use crate::types::PlaySpec;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanPhase {
    pub name: String,
    pub description: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdjustmentRule {
    pub name: String,
    pub condition: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitTrigger {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPlan {
    pub phases: Vec<PlanPhase>,
    pub adjustment_triggers: Vec<AdjustmentRule>,
    pub exit_triggers: Vec<ExitTrigger>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAlerts {
    pub profit_target: f64,
    pub stop_loss: f64,
    pub momentum: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeAlerts {
    pub volume_drop: f64,
    pub volume_spike: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsAlerts {
    pub negative_sentiment: f64,
    pub positive_sentiment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalAlerts {
    pub support_break: f64,
    pub resistance_break: f64,
    pub correlation_break: f64,
}

/// Fractions, not percents: 0.10 == 10%.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringConditions {
    pub price_alerts: PriceAlerts,
    pub volume_alerts: VolumeAlerts,
    pub news_alerts: NewsAlerts,
    pub technical_alerts: TechnicalAlerts,
}

impl Default for MonitoringConditions {
    fn default() -> Self {
        Self {
            price_alerts: PriceAlerts {
                profit_target: 0.10,
                stop_loss: 0.05,
                momentum: 0.03,
            },
            volume_alerts: VolumeAlerts {
                volume_drop: 0.50,
                volume_spike: 2.00,
            },
            news_alerts: NewsAlerts {
                negative_sentiment: -0.5,
                positive_sentiment: 0.5,
            },
            technical_alerts: TechnicalAlerts {
                support_break: 0.02,
                resistance_break: 0.02,
                correlation_break: 0.30,
            },
        }
    }
}

fn phase(name: &str, description: String, actions: &[&str]) -> PlanPhase {
    PlanPhase {
        name: name.to_string(),
        description,
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

fn or_default<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.trim().is_empty() {
        fallback
    } else {
        text
    }
}

pub fn build_plan(spec: &PlaySpec) -> ExecutionPlan {
    let entry = or_default(&spec.entry_strategy, "Enter at market");
    let exit = or_default(&spec.exit_strategy, "Exit on stop-loss or take-profit");

    ExecutionPlan {
        phases: vec![
            phase(
                "entry",
                format!("{} ({})", entry, spec.side),
                &["validate_entry_conditions", "submit_order", "confirm_fill"],
            ),
            phase(
                "monitoring",
                format!("Track \"{}\" over {}", spec.title, spec.timeframe),
                &["update_performance", "check_interventions", "check_adaptations"],
            ),
            phase("exit", exit.to_string(), &["close_position", "record_outcome"]),
        ],
        adjustment_triggers: vec![
            AdjustmentRule {
                name: "add_on_strength".into(),
                condition: "positive momentum beyond threshold".into(),
                action: "increase_position_size".into(),
            },
            AdjustmentRule {
                name: "reduce_on_weakness".into(),
                condition: "negative momentum beyond threshold".into(),
                action: "reduce_position_size".into(),
            },
        ],
        exit_triggers: ["stop_loss", "take_profit", "timeout", "catalyst_failure"]
            .iter()
            .map(|name| ExitTrigger {
                name: name.to_string(),
                description: match *name {
                    "stop_loss" => "Price crosses the order's stop-loss level".to_string(),
                    "take_profit" => "Price crosses the order's take-profit level".to_string(),
                    "timeout" => format!("Play outlives its {} timeframe", spec.timeframe),
                    _ => "Expected catalyst fails to materialise".to_string(),
                },
            })
            .collect(),
    }
}

pub fn build_monitoring_conditions(_spec: &PlaySpec) -> MonitoringConditions {
    MonitoringConditions::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::heuristic_parse;

    #[test]
    fn plan_is_fixed_template() {
        let spec = heuristic_parse("Buy momentum breakout in NVDA", "NVDA", &[], None);
        let plan = build_plan(&spec);
        let names: Vec<_> = plan.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["entry", "monitoring", "exit"]);
        assert_eq!(plan.adjustment_triggers.len(), 2);
        let exits: Vec<_> = plan.exit_triggers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(exits, ["stop_loss", "take_profit", "timeout", "catalyst_failure"]);
    }

    #[test]
    fn monitoring_thresholds_are_constants() {
        let a = build_monitoring_conditions(&heuristic_parse("short it", "X", &[], None));
        let b = build_monitoring_conditions(&heuristic_parse("swing long", "Y", &[], None));
        assert_eq!(a, b);
        assert_eq!(a.price_alerts.profit_target, 0.10);
        assert_eq!(a.volume_alerts.volume_spike, 2.00);
        assert_eq!(a.technical_alerts.correlation_break, 0.30);
    }
}
