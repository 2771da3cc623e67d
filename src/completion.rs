//! Decide whether a play has run its course.

use crate::parser::parse_timeframe_to_hours;
use crate::types::{Order, Play};

/// True when the backing order is closed/cancelled or the declared timeframe has elapsed.
pub fn is_complete(play: &Play, order: &Order) -> bool {
    if order.status.is_done() {
        return true;
    }
    play.performance_metrics.time_in_play > parse_timeframe_to_hours(&play.parsed_play.timeframe)
}
