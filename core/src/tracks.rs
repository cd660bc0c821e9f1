use std::collections::BTreeMap;

use nalgebra::Point2;

/// A 2-D feature observation of a track in one shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Normalized image coordinates of the feature.
    pub coord: Point2<f64>,
    pub feature_id: usize,
    pub color: [f64; 3],
}

/// Bipartite shot/track graph stored as nested maps.
///
/// An edge (shot, track) carries one [`Observation`] and is unique per pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackGraph {
    shots: BTreeMap<String, BTreeMap<String, Observation>>,
}

impl TrackGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_shot(&self, shot_id: &str) -> bool {
        self.shots.contains_key(shot_id)
    }

    /// Register a shot node, keeping existing observations if it is already
    /// present.
    pub fn add_shot_node(&mut self, shot_id: &str) {
        self.shots.entry(shot_id.to_string()).or_default();
    }

    pub fn add_observation(&mut self, shot_id: &str, track_id: &str, observation: Observation) {
        self.shots
            .entry(shot_id.to_string())
            .or_default()
            .insert(track_id.to_string(), observation);
    }

    pub fn shot_observations(&self, shot_id: &str) -> Option<&BTreeMap<String, Observation>> {
        self.shots.get(shot_id)
    }

    pub fn observation(&self, shot_id: &str, track_id: &str) -> Option<&Observation> {
        self.shots.get(shot_id)?.get(track_id)
    }

    pub fn shot_ids(&self) -> impl Iterator<Item = &String> {
        self.shots.keys()
    }

    /// All (shot, track, observation) edges in deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = (&String, &String, &Observation)> {
        self.shots.iter().flat_map(|(shot, tracks)| {
            tracks.iter().map(move |(track, obs)| (shot, track, obs))
        })
    }

    pub fn len_edges(&self) -> usize {
        self.shots.values().map(|t| t.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_registration_keeps_observations() {
        let mut graph = TrackGraph::new();
        graph.add_observation(
            "shot1",
            "track1",
            Observation {
                coord: Point2::new(0.1, -0.2),
                feature_id: 7,
                color: [10.0, 20.0, 30.0],
            },
        );
        graph.add_shot_node("shot1");
        assert_eq!(graph.shot_observations("shot1").unwrap().len(), 1);
        assert!(graph.contains_shot("shot1"));
        assert!(!graph.contains_shot("shot2"));
        assert_eq!(graph.len_edges(), 1);
    }
}
