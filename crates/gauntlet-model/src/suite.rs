use std::collections::BTreeSet;

use serde::Serialize;

use crate::episode::Episode;
use crate::state::StateId;

/// An ordered group of episodes evaluated as one candidate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSuite {
    episodes: Vec<Episode>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_episodes(episodes: Vec<Episode>) -> Self {
        Self { episodes }
    }

    pub fn push(&mut self, episode: Episode) {
        self.episodes.push(episode);
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn into_episodes(self) -> Vec<Episode> {
        self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.episodes.iter().all(Episode::is_finished)
    }

    pub fn total_actions(&self) -> usize {
        self.episodes.iter().map(Episode::len).sum()
    }

    pub fn crash_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.has_crashed()).count()
    }

    pub fn visited_activities(&self) -> BTreeSet<&str> {
        self.episodes
            .iter()
            .flat_map(|e| e.visited_activities().iter().map(String::as_str))
            .collect()
    }

    pub fn visited_states(&self) -> BTreeSet<&StateId> {
        self.episodes
            .iter()
            .flat_map(|e| e.visited_states().iter())
            .collect()
    }
}
