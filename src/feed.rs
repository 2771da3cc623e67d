//! Market snapshot capability and a file-backed replay implementation.

use anyhow::Context;
use std::{
    collections::{HashMap, VecDeque},
    fs,
    path::Path,
};

use crate::types::MarketSnapshot;

pub trait MarketSnapshotProvider: Send {
    /// `None` when no data is available for `symbol`.
    fn market_snapshot(&mut self, symbol: &str) -> Option<MarketSnapshot>;
}

/// Replays `{ "AAPL": [ {price, volume, avg_volume}, ... ] }`, one snapshot per poll.
#[derive(Debug, Default)]
pub struct ReplayFeed {
    queues: HashMap<String, VecDeque<MarketSnapshot>>,
}

impl ReplayFeed {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("read replay feed {}", path.display()))?;
        Self::from_json(&s)
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, Vec<MarketSnapshot>> =
            serde_json::from_str(s).context("parse replay feed")?;
        Ok(Self {
            queues: raw
                .into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v.into()))
                .collect(),
        })
    }

    pub fn remaining(&self, symbol: &str) -> usize {
        self.queues
            .get(&symbol.to_ascii_uppercase())
            .map_or(0, |q| q.len())
    }
}

impl MarketSnapshotProvider for ReplayFeed {
    fn market_snapshot(&mut self, symbol: &str) -> Option<MarketSnapshot> {
        self.queues
            .get_mut(&symbol.to_ascii_uppercase())?
            .pop_front()
    }
}
