//! Core domain types for plays, backing orders, market snapshots and history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::{ExecutionPlan, MonitoringConditions};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    /// Lenient parse used for LLM output: anything that is not clearly a sell is a buy.
    pub fn from_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "sell" | "short" => Side::Sell,
            _ => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Closed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Cancelled)
    }
}

/// Stop-loss / take-profit / time limits attached to the backing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopConditions {
    pub stop_loss_price: f64,
    pub stop_loss_percentage: f64,
    pub take_profit_price: f64,
    pub take_profit_percentage: f64,
    pub trailing_stop_percentage: Option<f64>,
    pub time_based_stop: Option<DateTime<Utc>>,
    /// Hours.
    pub max_holding_period: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub stop_conditions: Option<StopConditions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub avg_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    #[serde(default)]
    pub sentiment: Option<f64>,
}

/// Structured play produced once by the parser and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaySpec {
    pub title: String,
    pub side: Side,
    pub entry_strategy: String,
    pub exit_strategy: String,
    pub catalysts: Vec<String>,
    pub risks: Vec<String>,
    pub success_criteria: Vec<String>,
    pub timeframe: String,
    pub priority: u8,
    pub tags: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayStatus {
    Active,
    /// Declared for reporting parity; no transition in this version assigns it.
    Paused,
    Completed,
    /// Declared for reporting parity; no transition in this version assigns it.
    Failed,
    Intervened,
    Adapted,
}

impl PlayStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayStatus::Completed | PlayStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterventionKind {
    StopLossHit,
    TakeProfitHit,
    Timeout,
    MarketConditionChange,
    VolumeAnomaly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterventionAction {
    ExitPosition,
    EvaluateAndExit,
    ReducePosition,
    MonitorClosely,
}

impl InterventionAction {
    /// Actions that end the play and close the backing order.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            InterventionAction::ExitPosition | InterventionAction::EvaluateAndExit
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterventionRecord {
    #[serde(rename = "type")]
    pub kind: InterventionKind,
    pub reason: String,
    pub action: InterventionAction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationKind {
    AddPosition,
    ReducePosition,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationAction {
    IncreasePositionSize,
    ReducePositionSize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdaptationRecord {
    #[serde(rename = "type")]
    pub kind: AdaptationKind,
    pub reason: String,
    pub action: AdaptationAction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub entry_price: f64,
    pub current_price: f64,
    pub pnl_pct: f64,
    /// High-water mark of `pnl_pct`.
    pub max_profit: f64,
    /// Signed low-water mark of `pnl_pct` (not a peak-to-trough drawdown).
    pub max_drawdown: f64,
    /// Hours since creation.
    pub time_in_play: f64,
    pub exit_price: Option<f64>,
}

impl PerformanceMetrics {
    pub fn at_entry(entry_price: f64) -> Self {
        Self {
            entry_price,
            current_price: entry_price,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Play {
    pub play_id: String,
    pub order_id: String,
    pub symbol: String,
    pub status: PlayStatus,
    pub confidence_score: f64,
    pub quantity: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub parsed_play: PlaySpec,
    pub execution_plan: ExecutionPlan,
    pub monitoring_conditions: MonitoringConditions,
    pub intervention_history: Vec<InterventionRecord>,
    pub adaptation_history: Vec<AdaptationRecord>,
    pub performance_metrics: PerformanceMetrics,
}

impl Play {
    pub fn side(&self) -> Side {
        self.parsed_play.side
    }
}
