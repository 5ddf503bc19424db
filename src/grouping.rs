//! Transitive grouping of similarity edges into duplicate groups.
//!
//! Edges form an undirected graph over image ids; connected components
//! become [`DuplicateGroup`]s. A group's score is its weakest accepted
//! edge, and the representative is chosen by the configured policy. The
//! whole pass is a pure function of its inputs, so rerunning it on the
//! same edges reproduces the same groups.

use std::collections::HashMap;

use crate::config::RepresentativePolicy;
use crate::types::{DuplicateGroup, ImageId, SimilarityEdge};

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Build duplicate groups from accepted edges.
///
/// `quality` feeds the [`RepresentativePolicy::HighestQuality`] policy;
/// images without an entry lose to any scored member, and exact ties fall
/// back to the lexicographically smallest id.
pub fn build_groups(
    edges: &[SimilarityEdge],
    policy: RepresentativePolicy,
    quality: Option<&HashMap<ImageId, f64>>,
) -> Vec<DuplicateGroup> {
    if edges.is_empty() {
        return Vec::new();
    }

    let mut ids: Vec<&str> = edges
        .iter()
        .flat_map(|e| [e.first.as_str(), e.second.as_str()])
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut dsu = UnionFind::new(ids.len());
    for edge in edges {
        dsu.union(index[edge.first.as_str()], index[edge.second.as_str()]);
    }

    // Weakest edge per component; roots are only stable after all unions.
    let mut weakest: HashMap<usize, f64> = HashMap::new();
    for edge in edges {
        let root = dsu.find(index[edge.first.as_str()]);
        let entry = weakest.entry(root).or_insert(edge.score);
        if edge.score < *entry {
            *entry = edge.score;
        }
    }

    let mut components: HashMap<usize, Vec<ImageId>> = HashMap::new();
    for (i, id) in ids.iter().enumerate() {
        let root = dsu.find(i);
        components.entry(root).or_default().push((*id).to_string());
    }

    let mut groups: Vec<DuplicateGroup> = components
        .into_iter()
        .map(|(root, members)| {
            // members inherit the sorted id order
            let representative = choose_representative(&members, policy, quality);
            DuplicateGroup {
                representative,
                members,
                score: weakest.get(&root).copied().unwrap_or(0.0),
            }
        })
        .collect();

    groups.sort_by(|a, b| a.representative.cmp(&b.representative));
    groups
}

fn choose_representative(
    members: &[ImageId],
    policy: RepresentativePolicy,
    quality: Option<&HashMap<ImageId, f64>>,
) -> ImageId {
    match policy {
        RepresentativePolicy::LexicographicId => members[0].clone(),
        RepresentativePolicy::HighestQuality => {
            let Some(quality) = quality else {
                return members[0].clone();
            };
            let mut best = &members[0];
            let mut best_score = quality.get(best).copied().unwrap_or(f64::NEG_INFINITY);
            for member in &members[1..] {
                let score = quality.get(member).copied().unwrap_or(f64::NEG_INFINITY);
                if score > best_score {
                    best = member;
                    best_score = score;
                }
            }
            best.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalMethod;

    fn edge(a: &str, b: &str, score: f64) -> SimilarityEdge {
        SimilarityEdge::new(a, b, score, SignalMethod::Hash)
    }

    #[test]
    fn no_edges_no_groups() {
        assert!(build_groups(&[], RepresentativePolicy::LexicographicId, None).is_empty());
    }

    #[test]
    fn transitive_chain_forms_one_group() {
        let edges = vec![edge("a", "b", 0.95), edge("b", "c", 0.93)];
        let groups = build_groups(&edges, RepresentativePolicy::LexicographicId, None);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["a", "b", "c"]);
        assert_eq!(groups[0].representative, "a");
        assert!((groups[0].score - 0.93).abs() < 1e-9, "weakest edge wins");
    }

    #[test]
    fn disjoint_components_stay_separate() {
        let edges = vec![edge("d", "c", 0.91), edge("a", "b", 0.99)];
        let groups = build_groups(&edges, RepresentativePolicy::LexicographicId, None);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec!["a", "b"]);
        assert_eq!(groups[1].members, vec!["c", "d"]);
    }

    #[test]
    fn edge_order_does_not_change_output() {
        let forward = vec![edge("a", "b", 0.95), edge("b", "c", 0.93), edge("x", "y", 0.96)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = build_groups(&forward, RepresentativePolicy::LexicographicId, None);
        let b = build_groups(&reversed, RepresentativePolicy::LexicographicId, None);
        assert_eq!(a, b);
    }

    #[test]
    fn repeated_edges_keep_weakest_score() {
        let edges = vec![edge("a", "b", 0.99), edge("a", "b", 0.92)];
        let groups = build_groups(&edges, RepresentativePolicy::LexicographicId, None);
        assert_eq!(groups.len(), 1);
        assert!((groups[0].score - 0.92).abs() < 1e-9);
    }

    #[test]
    fn highest_quality_picks_scored_member() {
        let edges = vec![edge("a", "b", 0.95), edge("b", "c", 0.94)];
        let quality: HashMap<ImageId, f64> =
            [("a".to_string(), 0.2), ("b".to_string(), 0.5), ("c".to_string(), 0.9)]
                .into_iter()
                .collect();

        let groups = build_groups(&edges, RepresentativePolicy::HighestQuality, Some(&quality));
        assert_eq!(groups[0].representative, "c");
        assert_eq!(groups[0].members, vec!["a", "b", "c"]);
    }

    #[test]
    fn quality_ties_fall_back_to_lexicographic() {
        let edges = vec![edge("b", "a", 0.95)];
        let quality: HashMap<ImageId, f64> = [("a".to_string(), 0.5), ("b".to_string(), 0.5)]
            .into_iter()
            .collect();

        let groups = build_groups(&edges, RepresentativePolicy::HighestQuality, Some(&quality));
        assert_eq!(groups[0].representative, "a");
    }

    #[test]
    fn unscored_members_lose_to_scored_ones() {
        let edges = vec![edge("a", "b", 0.95)];
        let quality: HashMap<ImageId, f64> = [("b".to_string(), 0.1)].into_iter().collect();

        let groups = build_groups(&edges, RepresentativePolicy::HighestQuality, Some(&quality));
        assert_eq!(groups[0].representative, "b");
    }

    #[test]
    fn missing_quality_map_degrades_to_lexicographic() {
        let edges = vec![edge("b", "a", 0.95)];
        let groups = build_groups(&edges, RepresentativePolicy::HighestQuality, None);
        assert_eq!(groups[0].representative, "a");
    }
}
