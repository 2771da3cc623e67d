//! Small helpers.

use tracing::warn;

pub fn sanitize_symbol(sym: &str) -> String {
    sym.trim().to_uppercase()
}

/// Swallow an audit-sink failure with a warning; the caller carries on.
pub fn best_effort(what: &str, play_id: &str, r: anyhow::Result<()>) {
    if let Err(e) = r {
        warn!("report {} for play {} failed: {:#}", what, play_id, e);
    }
}

/// Mean of a slice, 0 when empty.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}
