use std::collections::{HashMap, HashSet};

use crate::error::DiffError;
use crate::feed::Episode;

/// Result of diffing a parsed episode list against the known-id set.
#[derive(Debug, Clone)]
pub struct EpisodeDiff {
    /// Unseen episodes, in document order
    pub new_episodes: Vec<Episode>,
    /// The previous set plus the identity of every episode in the feed.
    /// Identities are never removed, which makes re-crawls idempotent.
    pub known_ids: HashSet<String>,
}

/// Determine which episodes are new since the last successful crawl.
///
/// An empty `known` set means this is the first crawl and the full backlog
/// is emitted. When an identity repeats within one feed, only the last
/// occurrence in document order is kept.
pub fn diff_episodes(
    episodes: &[Episode],
    known: &HashSet<String>,
) -> Result<EpisodeDiff, DiffError> {
    let mut ids = Vec::with_capacity(episodes.len());
    let mut last_position: HashMap<&str, usize> = HashMap::new();
    for (index, episode) in episodes.iter().enumerate() {
        let id = episode
            .identity()
            .ok_or(DiffError::UnidentifiableEpisode { index })?;
        last_position.insert(id, index);
        ids.push(id);
    }

    let mut known_ids = known.clone();
    let mut new_episodes = Vec::new();
    for (index, episode) in episodes.iter().enumerate() {
        let id = ids[index];
        if last_position[id] != index {
            // duplicate identity, a later occurrence wins
            continue;
        }
        if known_ids.insert(id.to_string()) {
            new_episodes.push(episode.clone());
        }
    }

    Ok(EpisodeDiff {
        new_episodes,
        known_ids,
    })
}
