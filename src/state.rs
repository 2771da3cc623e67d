//! In-memory play store: active plays by id plus an append-only history of finished ones.
//! Snapshots can be written to / restored from JSON, but the store itself is the system of record.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};
use tracing::warn;

use crate::types::Play;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlayStateStore {
    active: HashMap<String, Play>,
    history: Vec<Play>,
}

impl PlayStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a snapshot. Missing or unreadable files yield an empty store.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(s) => match serde_json::from_str::<Self>(&s) {
                    Ok(me) => return me,
                    Err(e) => warn!("ignoring corrupt play snapshot {}: {}", path.display(), e),
                },
                Err(e) => warn!("cannot read play snapshot {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let s = serde_json::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }

    pub fn create(&mut self, play: Play) {
        self.active.insert(play.play_id.clone(), play);
    }

    /// Looks in active plays first, then history.
    pub fn get(&self, play_id: &str) -> Option<&Play> {
        self.active
            .get(play_id)
            .or_else(|| self.history.iter().find(|p| p.play_id == play_id))
    }

    /// Only active plays are mutable.
    pub fn get_mut(&mut self, play_id: &str) -> Option<&mut Play> {
        self.active.get_mut(play_id)
    }

    pub fn is_archived(&self, play_id: &str) -> bool {
        self.history.iter().any(|p| p.play_id == play_id)
    }

    /// Oldest first.
    pub fn list_active(&self) -> Vec<&Play> {
        let mut v: Vec<&Play> = self.active.values().collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.play_id.cmp(&b.play_id)));
        v
    }

    pub fn list_history(&self) -> &[Play] {
        &self.history
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Move a play from active to history. No-op when it is not active.
    pub fn archive(&mut self, play_id: &str) -> bool {
        match self.active.remove(play_id) {
            Some(play) => {
                self.history.push(play);
                true
            }
            None => false,
        }
    }
}
