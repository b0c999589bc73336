use crate::dataset::{RawValue, TransitionDataset, TransitionStats};
use crate::graph::{EdgeMeta, JourneyEdge, JourneyGraph, JourneyNode};
use crate::reduce::WeightedEdge;
use crate::touchpoint::{TouchpointId, resolve_label};
use indexmap::IndexSet;
use tracing::{debug, warn};

/// Turns a reduced edge list into the labelled journey graph.
#[derive(Debug, Clone, Copy)]
pub struct JourneyGraphBuilder<'a> {
    dataset: &'a TransitionDataset,
    conversion_alias: u32,
}

impl<'a> JourneyGraphBuilder<'a> {
    pub fn new(dataset: &'a TransitionDataset, conversion_alias: u32) -> Self {
        Self {
            dataset,
            conversion_alias,
        }
    }

    /// Never fails: missing names and statistics fall back to placeholders.
    /// Every touchpoint other than the conversion sink ends up with a direct
    /// edge into the sink.
    pub fn build(&self, reduced: &[WeightedEdge]) -> JourneyGraph {
        let mut graph = JourneyGraph::new();
        let mut used: IndexSet<TouchpointId> = IndexSet::new();
        let mut defaulted = 0usize;

        for edge in reduced {
            used.insert(edge.from);
            used.insert(edge.to);
            let stats = match self.dataset.stats(edge.from, edge.to, self.conversion_alias) {
                Some(stats) => stats.clone(),
                None => {
                    defaulted += 1;
                    TransitionStats::placeholder()
                }
            };
            if !graph.add_edge(JourneyEdge::new(edge.from, edge.to, edge_meta(&stats))) {
                warn!(source = %edge.from, target = %edge.to, "duplicate reduced edge ignored");
            }
        }

        for &id in &used {
            graph.add_node(self.node(id));
        }

        let mut synthesized = 0usize;
        for &id in &used {
            if id.is_conversion() || graph.has_edge(id, TouchpointId::Conversion) {
                continue;
            }
            graph.add_edge(JourneyEdge::new(
                id,
                TouchpointId::Conversion,
                EdgeMeta::default(),
            ));
            synthesized += 1;
        }
        if synthesized > 0 {
            graph.add_node(self.node(TouchpointId::Conversion));
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            synthesized,
            defaulted_stats = defaulted,
            "built journey graph"
        );
        graph
    }

    fn node(&self, id: TouchpointId) -> JourneyNode {
        let name = id.stage().and_then(|n| self.dataset.name(n));
        JourneyNode::new(id, resolve_label(id, name))
    }
}

fn edge_meta(stats: &TransitionStats) -> EdgeMeta {
    EdgeMeta {
        value: stats
            .classified_frequency
            .as_int()
            .map(|v| RawValue::Number(v as f64))
            .unwrap_or_default(),
        unclassified_frequency: stats.unclassified_frequency.as_int(),
        conversion_rate: stats.conversion.as_float(),
        classified_avg_time: stats.cl_avg_time.as_float(),
        unclassified_avg_time: stats.ncl_avg_time.as_float(),
    }
}
