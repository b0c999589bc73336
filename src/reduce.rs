use crate::dataset::TransitionRecord;
use crate::touchpoint::TouchpointId;
use std::cmp::Ordering;
use tracing::debug;

/// Disjoint sets over `0..len` with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
    sets: usize,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
            sets: len,
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merges the sets holding `x` and `y`. Returns false when they already
    /// share a set.
    pub fn union(&mut self, x: usize, y: usize) -> bool {
        let px = self.find(x);
        let py = self.find(y);
        if px == py {
            return false;
        }
        match self.rank[px].cmp(&self.rank[py]) {
            Ordering::Less => self.parent[px] = py,
            Ordering::Greater => self.parent[py] = px,
            Ordering::Equal => {
                self.parent[py] = px;
                self.rank[px] += 1;
            }
        }
        self.sets -= 1;
        true
    }

    pub fn set_count(&self) -> usize {
        self.sets
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge {
    pub from: TouchpointId,
    pub to: TouchpointId,
    pub frequency: f64,
}

/// Edges that survive filtering: a parseable, non-zero frequency at or above
/// `threshold`.
pub fn candidate_edges(records: &[TransitionRecord], threshold: f64) -> Vec<WeightedEdge> {
    records
        .iter()
        .filter_map(|record| {
            let frequency = record.frequency.as_float()?;
            if frequency == 0.0 || frequency < threshold {
                return None;
            }
            Some(WeightedEdge {
                from: record.from,
                to: record.to,
                frequency,
            })
        })
        .collect()
}

/// Maximum-weight spanning forest over the touchpoints `1..=universe`, built
/// with Kruskal on inverted weights. Accepted edges come back in union order.
///
/// Endpoints outside the universe (the conversion sink among them) belong to
/// no set: an edge with one such endpoint is kept without merging anything,
/// an edge with two is dropped.
pub fn reduce(records: &[TransitionRecord], threshold: f64, universe: u32) -> Vec<WeightedEdge> {
    let mut candidates = candidate_edges(records, threshold);
    let filtered = records.len() - candidates.len();

    // Stable ascending order on the negated inverse weight; consuming from the
    // back yields the highest frequency first and, among ties, the last input.
    candidates.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));

    let mut forest = UnionFind::new(universe as usize);
    let mut accepted = Vec::new();
    let mut cycles = 0usize;
    while forest.set_count() > 1 {
        let Some(edge) = candidates.pop() else {
            break;
        };
        match (slot(edge.from, universe), slot(edge.to, universe)) {
            (Some(a), Some(b)) => {
                if forest.union(a, b) {
                    accepted.push(edge);
                } else {
                    cycles += 1;
                }
            }
            (None, None) => cycles += 1,
            _ => accepted.push(edge),
        }
    }

    debug!(
        threshold,
        filtered,
        accepted = accepted.len(),
        rejected = cycles,
        components = forest.set_count(),
        "reduced transition graph"
    );
    accepted
}

fn sort_key(edge: &WeightedEdge) -> f64 {
    -(1.0 / edge.frequency)
}

fn slot(id: TouchpointId, universe: u32) -> Option<usize> {
    match id {
        TouchpointId::Stage(n) if n >= 1 && n <= universe => Some((n - 1) as usize),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawValue;
    use std::collections::HashSet;

    fn record(from: u32, to: u32, frequency: f64) -> TransitionRecord {
        TransitionRecord::new(
            TouchpointId::Stage(from),
            TouchpointId::Stage(to),
            RawValue::Number(frequency),
        )
    }

    fn pairs(edges: &[WeightedEdge]) -> Vec<(TouchpointId, TouchpointId)> {
        edges.iter().map(|e| (e.from, e.to)).collect()
    }

    #[test]
    fn union_find_tracks_sets() {
        let mut uf = UnionFind::new(4);
        assert_eq!(uf.set_count(), 4);
        assert!(uf.union(0, 1));
        assert!(uf.union(2, 3));
        assert!(!uf.union(1, 0));
        assert!(uf.union(1, 3));
        assert_eq!(uf.set_count(), 1);
        assert_eq!(uf.find(0), uf.find(2));
    }

    #[test]
    fn keeps_heaviest_tree_and_drops_cycle() {
        let records = vec![record(1, 2, 100.0), record(2, 3, 50.0), record(1, 3, 10.0)];
        let edges = reduce(&records, 0.0, 201);
        assert_eq!(
            pairs(&edges),
            vec![
                (TouchpointId::Stage(1), TouchpointId::Stage(2)),
                (TouchpointId::Stage(2), TouchpointId::Stage(3)),
            ]
        );
    }

    #[test]
    fn threshold_filters_everything() {
        let edges = reduce(&[record(1, 2, 5.0)], 10.0, 201);
        assert!(edges.is_empty());
    }

    #[test]
    fn drops_zero_and_unparseable_frequencies() {
        let records = vec![
            record(1, 2, 0.0),
            TransitionRecord::new(
                TouchpointId::Stage(2),
                TouchpointId::Stage(3),
                RawValue::text("n/a"),
            ),
            TransitionRecord::new(TouchpointId::Stage(3), TouchpointId::Stage(4), RawValue::Null),
            TransitionRecord::new(
                TouchpointId::Stage(4),
                TouchpointId::Stage(5),
                RawValue::text("30"),
            ),
        ];
        let candidates = candidate_edges(&records, 0.0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].frequency, 30.0);
    }

    #[test]
    fn ties_prefer_later_input() {
        let records = vec![record(1, 2, 10.0), record(1, 2, 10.0), record(2, 1, 10.0)];
        let edges = reduce(&records, 0.0, 201);
        assert_eq!(
            pairs(&edges),
            vec![(TouchpointId::Stage(2), TouchpointId::Stage(1))]
        );
    }

    #[test]
    fn conversion_edges_are_kept_without_union() {
        let records = vec![
            TransitionRecord::new(
                TouchpointId::Stage(1),
                TouchpointId::Conversion,
                RawValue::Number(40.0),
            ),
            TransitionRecord::new(
                TouchpointId::Stage(2),
                TouchpointId::Conversion,
                RawValue::Number(30.0),
            ),
            record(1, 2, 20.0),
            TransitionRecord::new(
                TouchpointId::Conversion,
                TouchpointId::Stage(500),
                RawValue::Number(90.0),
            ),
        ];
        let edges = reduce(&records, 0.0, 201);
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().all(|e| e.to != TouchpointId::Stage(500)));
    }

    #[test]
    fn empty_universe_yields_nothing() {
        assert!(reduce(&[record(1, 2, 5.0)], 0.0, 0).is_empty());
        assert!(reduce(&[record(1, 1, 5.0)], 0.0, 201).is_empty());
    }

    #[test]
    fn stops_once_universe_is_connected() {
        let records = vec![record(1, 2, 100.0), record(2, 3, 90.0), record(3, 1, 80.0)];
        let edges = reduce(&records, 0.0, 3);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn output_is_a_forest_above_threshold() {
        let mut records = Vec::new();
        for from in 1..=12u32 {
            for to in 1..=12u32 {
                if from != to {
                    records.push(record(from, to, f64::from((from * 31 + to * 17) % 97)));
                }
            }
        }
        let threshold = 20.0;
        let edges = reduce(&records, threshold, 201);
        let mut uf = UnionFind::new(13);
        let mut seen = HashSet::new();
        for edge in &edges {
            assert!(edge.frequency >= threshold);
            let (Some(a), Some(b)) = (edge.from.stage(), edge.to.stage()) else {
                panic!("unexpected conversion edge");
            };
            assert!(uf.union(a as usize, b as usize), "cycle at {a}->{b}");
            seen.insert(a);
            seen.insert(b);
        }
        assert_eq!(edges.len(), seen.len() - 1);
    }
}
