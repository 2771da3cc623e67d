//! Recompute a play's running P&L from the latest snapshot.

use chrono::{DateTime, Utc};

use crate::clock::hours_between;
use crate::types::{MarketSnapshot, Play, Side};

/// Signed fractional P&L, sign-adjusted for side. Zero when entry is not positive.
pub fn pnl_pct(side: Side, entry: f64, current: f64) -> f64 {
    if entry <= 0.0 {
        return 0.0;
    }
    match side {
        Side::Buy => (current - entry) / entry,
        Side::Sell => (entry - current) / entry,
    }
}

/// Mutates `play.performance_metrics` in place. Skipped entirely when entry price is not positive.
pub fn update(play: &mut Play, snapshot: &MarketSnapshot, now: DateTime<Utc>) {
    let side = play.side();
    let m = &mut play.performance_metrics;
    if m.entry_price <= 0.0 {
        return;
    }
    m.current_price = snapshot.price;
    m.pnl_pct = pnl_pct(side, m.entry_price, snapshot.price);
    m.max_profit = m.max_profit.max(m.pnl_pct);
    m.max_drawdown = m.max_drawdown.min(m.pnl_pct);
    m.time_in_play = hours_between(play.created_at, now);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pnl_by_side() {
        assert!((pnl_pct(Side::Buy, 100.0, 110.0) - 0.10).abs() < 1e-12);
        assert!((pnl_pct(Side::Sell, 100.0, 110.0) + 0.10).abs() < 1e-12);
        assert_eq!(pnl_pct(Side::Buy, 0.0, 110.0), 0.0);
    }
}
