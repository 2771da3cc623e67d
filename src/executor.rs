//! Play lifecycle: create from natural language, monitor on each snapshot, summarise.
//!
//! One `monitor_and_execute_play` call is one synchronous unit of work:
//! update performance, then the first of intervention / adaptation / completion that applies.
//! Callers must serialise calls for the same play; nothing in here locks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{path::Path, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::adaptation::AdaptationEvaluator;
use crate::broker::{Broker, OrderRequest};
use crate::clock::{Clock, SystemClock};
use crate::completion;
use crate::config::AppConfig;
use crate::error::{PlayError, Result};
use crate::intervention::{InterventionEvaluator, InterventionThresholds};
use crate::parser::{parse_timeframe_to_hours, LlmParse, NaturalLanguagePlayParser, NoLlm};
use crate::performance;
use crate::plan::{build_monitoring_conditions, build_plan};
use crate::report::PlayReportingSink;
use crate::risk::RiskEngine;
use crate::state::PlayStateStore;
use crate::types::{
    AdaptationAction, AdaptationRecord, InterventionAction, InterventionRecord, MarketSnapshot,
    NewsItem, PerformanceMetrics, Play, PlayStatus, Side,
};
use crate::utils::{best_effort, mean, sanitize_symbol};

/// Result of one monitoring tick, tagged by `status` when serialised.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MonitorOutcome {
    PlayActive {
        play_id: String,
        performance: PerformanceMetrics,
    },
    InterventionExecuted {
        play_id: String,
        intervention: InterventionRecord,
        play_status: PlayStatus,
        performance: PerformanceMetrics,
    },
    AdaptationExecuted {
        play_id: String,
        adaptation: AdaptationRecord,
        performance: PerformanceMetrics,
    },
    PlayCompleted {
        play_id: String,
        message: String,
        performance: PerformanceMetrics,
    },
    Error {
        error: String,
    },
}

impl MonitorOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            MonitorOutcome::PlayActive { .. } => "play_active",
            MonitorOutcome::InterventionExecuted { .. } => "intervention_executed",
            MonitorOutcome::AdaptationExecuted { .. } => "adaptation_executed",
            MonitorOutcome::PlayCompleted { .. } => "play_completed",
            MonitorOutcome::Error { .. } => "error",
        }
    }

    fn error(e: PlayError) -> Self {
        MonitorOutcome::Error {
            error: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaySummary {
    pub play_id: String,
    pub symbol: String,
    pub order_id: String,
    pub title: String,
    pub side: Side,
    pub status: PlayStatus,
    pub timeframe: String,
    pub priority: u8,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub performance: PerformanceMetrics,
    pub intervention_count: usize,
    pub adaptation_count: usize,
    pub last_intervention: Option<InterventionRecord>,
    pub last_adaptation: Option<AdaptationRecord>,
}

impl From<&Play> for PlaySummary {
    fn from(p: &Play) -> Self {
        Self {
            play_id: p.play_id.clone(),
            symbol: p.symbol.clone(),
            order_id: p.order_id.clone(),
            title: p.parsed_play.title.clone(),
            side: p.side(),
            status: p.status,
            timeframe: p.parsed_play.timeframe.clone(),
            priority: p.parsed_play.priority,
            tags: p.parsed_play.tags.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
            completed_at: p.completed_at,
            performance: p.performance_metrics.clone(),
            intervention_count: p.intervention_history.len(),
            adaptation_count: p.adaptation_history.len(),
            last_intervention: p.intervention_history.last().cloned(),
            last_adaptation: p.adaptation_history.last().cloned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PlayStatistics {
    pub total_plays: usize,
    pub active_count: usize,
    pub completed_count: usize,
    pub winning_plays: usize,
    pub losing_plays: usize,
    pub win_rate: f64,
    pub average_pnl_pct: f64,
    pub total_interventions: usize,
    pub total_adaptations: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AllPlaysSummary {
    pub active_plays: Vec<PlaySummary>,
    pub historical_plays: Vec<PlaySummary>,
    pub statistics: PlayStatistics,
}

pub struct PlayExecutor {
    store: PlayStateStore,
    broker: Box<dyn Broker>,
    sink: Box<dyn PlayReportingSink>,
    parser: NaturalLanguagePlayParser<Box<dyn LlmParse>>,
    clock: Arc<dyn Clock>,
    risk: RiskEngine,
    interventions: InterventionEvaluator,
    adaptations: AdaptationEvaluator,
    default_confidence: f64,
}

impl PlayExecutor {
    /// Defaults: no LLM, system clock, default thresholds, empty store.
    pub fn new(broker: Box<dyn Broker>, sink: Box<dyn PlayReportingSink>) -> Self {
        let cfg = AppConfig::default();
        Self {
            store: PlayStateStore::new(),
            broker,
            sink,
            parser: NaturalLanguagePlayParser::new(Box::new(NoLlm)),
            clock: Arc::new(SystemClock),
            risk: RiskEngine::from_cfg(&cfg.risk),
            interventions: InterventionEvaluator::new(InterventionThresholds::from(&cfg.executor)),
            adaptations: AdaptationEvaluator::from(&cfg.executor),
            default_confidence: cfg.risk.default_confidence,
        }
    }

    pub fn with_config(mut self, cfg: &AppConfig) -> Self {
        self.risk = RiskEngine::from_cfg(&cfg.risk);
        self.interventions =
            InterventionEvaluator::new(InterventionThresholds::from(&cfg.executor));
        self.adaptations = AdaptationEvaluator::from(&cfg.executor);
        self.default_confidence = cfg.risk.default_confidence;
        self
    }

    pub fn with_llm(mut self, llm: Box<dyn LlmParse>) -> Self {
        self.parser = NaturalLanguagePlayParser::new(llm);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store(mut self, store: PlayStateStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &PlayStateStore {
        &self.store
    }

    pub fn broker(&self) -> &dyn Broker {
        self.broker.as_ref()
    }

    pub fn broker_mut(&mut self) -> &mut dyn Broker {
        self.broker.as_mut()
    }

    pub fn save_state(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.store.save(path)
    }

    /// (play_id, symbol) of every active play, oldest first.
    pub fn active_plays(&self) -> Vec<(String, String)> {
        self.store
            .list_active()
            .into_iter()
            .map(|p| (p.play_id.clone(), p.symbol.clone()))
            .collect()
    }

    /// Parse -> risk check -> place backing order -> plan -> store.
    /// `confidence_score` falls back to the configured default (0.7).
    pub fn create_play_from_natural_language(
        &mut self,
        description: &str,
        symbol: &str,
        initial_quantity: f64,
        market_data: &MarketSnapshot,
        news_data: &[NewsItem],
        confidence_score: Option<f64>,
    ) -> Result<Play> {
        let symbol = sanitize_symbol(symbol);
        let confidence = confidence_score
            .unwrap_or(self.default_confidence)
            .clamp(0.0, 1.0);
        let entry_price = market_data.price;
        self.risk.pre_check(&symbol, initial_quantity, entry_price)?;

        let spec = self
            .parser
            .parse_with_context(description, &symbol, news_data, Some(confidence));
        let now = self.clock.now();
        let holding_hours = parse_timeframe_to_hours(&spec.timeframe);
        let stops = self
            .risk
            .stop_conditions(spec.side, entry_price, confidence, holding_hours, now);

        let order = self
            .broker
            .submit_order(OrderRequest {
                symbol: symbol.clone(),
                quantity: initial_quantity,
                side: spec.side,
                price: Some(entry_price),
                stop_conditions: Some(stops),
            })
            .ok_or_else(|| PlayError::OrderRejected {
                symbol: symbol.clone(),
            })?;

        let play = Play {
            play_id: Uuid::new_v4().to_string(),
            order_id: order.order_id,
            symbol,
            status: PlayStatus::Active,
            confidence_score: confidence,
            quantity: initial_quantity,
            created_at: now,
            updated_at: now,
            completed_at: None,
            execution_plan: build_plan(&spec),
            monitoring_conditions: build_monitoring_conditions(&spec),
            parsed_play: spec,
            intervention_history: Vec::new(),
            adaptation_history: Vec::new(),
            performance_metrics: PerformanceMetrics::at_entry(entry_price),
        };

        info!(
            "Play {} created: {} {} x{} @ {:.4} ({}, order {})",
            play.play_id,
            play.side(),
            play.symbol,
            initial_quantity,
            entry_price,
            play.parsed_play.timeframe,
            play.order_id
        );
        best_effort("creation", &play.play_id, self.sink.log_creation(&play));
        self.store.create(play.clone());
        Ok(play)
    }

    pub fn monitor_and_execute_play(
        &mut self,
        play_id: &str,
        market_data: &MarketSnapshot,
    ) -> MonitorOutcome {
        let (order_id, terminal) = match self.store.get(play_id) {
            Some(p) => (
                p.order_id.clone(),
                p.status.is_terminal() || self.store.is_archived(play_id),
            ),
            None => return MonitorOutcome::error(PlayError::UnknownPlay(play_id.to_string())),
        };
        if terminal {
            let performance = self
                .store
                .get(play_id)
                .map(|p| p.performance_metrics.clone())
                .unwrap_or_default();
            return MonitorOutcome::PlayCompleted {
                play_id: play_id.to_string(),
                message: "already completed".to_string(),
                performance,
            };
        }
        let Some(order) = self.broker.get(&order_id) else {
            warn!("Play {} backing order {} missing", play_id, order_id);
            return MonitorOutcome::error(PlayError::OrderNotFound(order_id));
        };

        let now = self.clock.now();
        let Some(play) = self.store.get_mut(play_id) else {
            return MonitorOutcome::error(PlayError::UnknownPlay(play_id.to_string()));
        };
        performance::update(play, market_data, now);
        play.updated_at = now;
        best_effort(
            "performance",
            play_id,
            self.sink.log_performance_update(play_id, &play.performance_metrics),
        );

        if let Some(iv) = self.interventions.evaluate(play, &order, market_data, now) {
            play.intervention_history.push(iv.clone());
            info!(
                "Play {} intervention {:?} -> {:?}: {}",
                play_id, iv.kind, iv.action, iv.reason
            );
            best_effort(
                "intervention",
                play_id,
                self.sink.log_intervention(play_id, &iv, market_data),
            );

            if iv.action.is_exit() {
                if !self.broker.close(&order_id) {
                    warn!("Play {} order {} was not open at exit", play_id, order_id);
                }
                let performance = self.complete_play(play_id, market_data.price, now);
                return MonitorOutcome::InterventionExecuted {
                    play_id: play_id.to_string(),
                    intervention: iv,
                    play_status: PlayStatus::Completed,
                    performance,
                };
            }

            match iv.action {
                InterventionAction::ReducePosition => info!(
                    "Play {}: position reduction requested, size left unchanged",
                    play_id
                ),
                _ => info!("Play {}: monitoring closely", play_id),
            }
            return MonitorOutcome::InterventionExecuted {
                play_id: play_id.to_string(),
                intervention: iv,
                play_status: play.status,
                performance: play.performance_metrics.clone(),
            };
        }

        if let Some(ad) = self.adaptations.evaluate(play, now) {
            play.adaptation_history.push(ad.clone());
            play.updated_at = now;
            let verb = match ad.action {
                AdaptationAction::IncreasePositionSize => "increase",
                AdaptationAction::ReducePositionSize => "reduce",
            };
            info!(
                "Play {} adaptation: {} position suggested, size left unchanged ({})",
                play_id, verb, ad.reason
            );
            best_effort(
                "adaptation",
                play_id,
                self.sink.log_adaptation(play_id, &ad, market_data),
            );
            return MonitorOutcome::AdaptationExecuted {
                play_id: play_id.to_string(),
                adaptation: ad,
                performance: play.performance_metrics.clone(),
            };
        }

        if completion::is_complete(play, &order) {
            let message = if order.status.is_done() {
                format!("order {} is {:?}", order.order_id, order.status)
            } else {
                format!("timeframe {} elapsed", play.parsed_play.timeframe)
            };
            let performance = self.complete_play(play_id, market_data.price, now);
            return MonitorOutcome::PlayCompleted {
                play_id: play_id.to_string(),
                message,
                performance,
            };
        }

        MonitorOutcome::PlayActive {
            play_id: play_id.to_string(),
            performance: play.performance_metrics.clone(),
        }
    }

    /// Terminal transition: mark completed, record exit, archive.
    fn complete_play(
        &mut self,
        play_id: &str,
        exit_price: f64,
        now: DateTime<Utc>,
    ) -> PerformanceMetrics {
        let Some(play) = self.store.get_mut(play_id) else {
            return PerformanceMetrics::default();
        };
        play.status = PlayStatus::Completed;
        play.completed_at = Some(now);
        play.updated_at = now;
        play.performance_metrics.exit_price = Some(exit_price);
        let metrics = play.performance_metrics.clone();

        info!(
            "Play {} completed: exit {:.4}, pnl {:.2}%",
            play_id,
            exit_price,
            metrics.pnl_pct * 100.0
        );
        best_effort(
            "completion",
            play_id,
            self.sink.log_completion(play_id, exit_price, metrics.pnl_pct),
        );
        self.store.archive(play_id);
        metrics
    }

    pub fn get_play_summary(&self, play_id: &str) -> Option<PlaySummary> {
        self.store.get(play_id).map(PlaySummary::from)
    }

    pub fn get_all_plays_summary(&self) -> AllPlaysSummary {
        let active = self.store.list_active();
        let history = self.store.list_history();

        let pnls: Vec<f64> = history.iter().map(|p| p.performance_metrics.pnl_pct).collect();
        let winning_plays = pnls.iter().filter(|x| **x > 0.0).count();
        let losing_plays = pnls.iter().filter(|x| **x < 0.0).count();
        let all = || active.iter().copied().chain(history.iter());

        let statistics = PlayStatistics {
            total_plays: active.len() + history.len(),
            active_count: active.len(),
            completed_count: history
                .iter()
                .filter(|p| p.status == PlayStatus::Completed)
                .count(),
            winning_plays,
            losing_plays,
            win_rate: if history.is_empty() {
                0.0
            } else {
                winning_plays as f64 / history.len() as f64
            },
            average_pnl_pct: mean(&pnls),
            total_interventions: all().map(|p| p.intervention_history.len()).sum(),
            total_adaptations: all().map(|p| p.adaptation_history.len()).sum(),
        };

        AllPlaysSummary {
            active_plays: active.into_iter().map(PlaySummary::from).collect(),
            historical_plays: history.iter().map(PlaySummary::from).collect(),
            statistics,
        }
    }
}
