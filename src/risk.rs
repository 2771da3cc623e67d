//! Risk checks before a play's backing order is placed, and stop-level derivation.

use chrono::{DateTime, Duration, Utc};

use crate::config::RiskCfg;
use crate::error::{PlayError, Result};
use crate::types::{Side, StopConditions};

/// Stop/target fractions for one confidence tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskTier {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

pub struct RiskEngine {
    max_position_value: f64,
    stop_loss_override: Option<f64>,
    take_profit_override: Option<f64>,
}

impl RiskEngine {
    pub fn new(max_value: f64) -> Self {
        Self {
            max_position_value: max_value,
            stop_loss_override: None,
            take_profit_override: None,
        }
    }

    pub fn from_cfg(cfg: &RiskCfg) -> Self {
        Self {
            stop_loss_override: cfg.stop_loss_pct,
            take_profit_override: cfg.take_profit_pct,
            ..Self::new(cfg.max_position_value)
        }
    }

    pub fn pre_check(&self, symbol: &str, quantity: f64, est_price: f64) -> Result<()> {
        if symbol.trim().is_empty() {
            return Err(PlayError::EmptySymbol);
        }
        if !(quantity > 0.0) || !quantity.is_finite() {
            return Err(PlayError::InvalidQuantity(quantity));
        }
        if !(est_price > 0.0) || !est_price.is_finite() {
            return Err(PlayError::InvalidPrice(est_price, symbol.to_string()));
        }
        let notional = est_price * quantity;
        if notional > self.max_position_value {
            return Err(PlayError::NotionalTooLarge {
                notional,
                max: self.max_position_value,
            });
        }
        Ok(())
    }

    /// Higher confidence -> tighter stop and nearer target.
    pub fn tier_for(&self, confidence: f64) -> RiskTier {
        let base = if confidence >= 0.8 {
            RiskTier { stop_loss_pct: 0.03, take_profit_pct: 0.06 }
        } else if confidence >= 0.6 {
            RiskTier { stop_loss_pct: 0.05, take_profit_pct: 0.10 }
        } else {
            RiskTier { stop_loss_pct: 0.08, take_profit_pct: 0.15 }
        };
        RiskTier {
            stop_loss_pct: self.stop_loss_override.unwrap_or(base.stop_loss_pct),
            take_profit_pct: self.take_profit_override.unwrap_or(base.take_profit_pct),
        }
    }

    pub fn stop_conditions(
        &self,
        side: Side,
        entry_price: f64,
        confidence: f64,
        holding_hours: f64,
        created_at: DateTime<Utc>,
    ) -> StopConditions {
        let tier = self.tier_for(confidence);
        let (stop, target) =
            stop_levels(side, entry_price, tier.stop_loss_pct, tier.take_profit_pct);
        // None when the deadline falls outside the representable date range.
        let deadline = Duration::try_seconds((holding_hours * 3600.0) as i64)
            .and_then(|d| created_at.checked_add_signed(d));
        StopConditions {
            stop_loss_price: stop,
            stop_loss_percentage: tier.stop_loss_pct * 100.0,
            take_profit_price: target,
            take_profit_percentage: tier.take_profit_pct * 100.0,
            trailing_stop_percentage: None,
            time_based_stop: deadline,
            max_holding_period: Some(holding_hours),
        }
    }
}

/// (stop_loss_price, take_profit_price) for the given side.
pub fn stop_levels(side: Side, entry: f64, stop_pct: f64, target_pct: f64) -> (f64, f64) {
    match side {
        Side::Buy => (entry * (1.0 - stop_pct), entry * (1.0 + target_pct)),
        Side::Sell => (entry * (1.0 + stop_pct), entry * (1.0 - target_pct)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn notional_cap() {
        let r = RiskEngine::new(10_000.0);
        assert!(r.pre_check("AAPL", 10.0, 150.0).is_ok());
        assert!(matches!(
            r.pre_check("AAPL", 100.0, 150.0),
            Err(PlayError::NotionalTooLarge { .. })
        ));
        assert!(matches!(r.pre_check("AAPL", 0.0, 150.0), Err(PlayError::InvalidQuantity(_))));
        assert!(matches!(r.pre_check("AAPL", 1.0, 0.0), Err(PlayError::InvalidPrice(..))));
        assert!(matches!(r.pre_check(" ", 1.0, 1.0), Err(PlayError::EmptySymbol)));
    }

    #[test]
    fn levels_are_side_symmetric() {
        let (s, t) = stop_levels(Side::Buy, 100.0, 0.05, 0.10);
        assert!(approx(s, 95.0) && approx(t, 110.0));
        let (s, t) = stop_levels(Side::Sell, 100.0, 0.05, 0.10);
        assert!(approx(s, 105.0) && approx(t, 90.0));
    }

    #[test]
    fn default_confidence_is_five_ten() {
        let r = RiskEngine::new(1e9);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap();
        let sc = r.stop_conditions(Side::Buy, 150.0, 0.7, 24.0, t0);
        assert!(approx(sc.stop_loss_price, 142.5));
        assert!(approx(sc.take_profit_price, 165.0));
        assert_eq!(sc.time_based_stop, Some(t0 + Duration::hours(24)));
        assert_eq!(r.tier_for(0.9).stop_loss_pct, 0.03);
        assert_eq!(r.tier_for(0.2).take_profit_pct, 0.15);
    }

    #[test]
    fn unrepresentable_deadline_is_dropped() {
        let r = RiskEngine::new(1e9);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap();
        let sc = r.stop_conditions(Side::Buy, 150.0, 0.7, 9.6e10, t0);
        assert_eq!(sc.time_based_stop, None);
        assert_eq!(sc.max_holding_period, Some(9.6e10));
        assert!(approx(sc.stop_loss_price, 142.5));
    }

    #[test]
    fn overrides_win() {
        let r = RiskEngine::from_cfg(&RiskCfg {
            max_position_value: 1e6,
            default_confidence: 0.7,
            stop_loss_pct: Some(0.02),
            take_profit_pct: None,
        });
        let t = r.tier_for(0.95);
        assert_eq!(t.stop_loss_pct, 0.02);
        assert_eq!(t.take_profit_pct, 0.06);
    }
}
