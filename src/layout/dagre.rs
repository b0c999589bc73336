use super::engine::{LayoutEngine, LayoutError, LayoutMode, LayoutRequest, LayoutResult, Orientation};
use crate::config::LayoutConfig;
use crate::graph::Rect;
use crate::touchpoint::TouchpointId;
use async_trait::async_trait;
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Layered layout through dagre, run on the blocking pool.
///
/// dagre has no sketch-preserving mode, so incremental requests are laid out
/// from scratch; the incremental sets are only reported.
#[derive(Debug, Clone)]
pub struct DagreLayoutEngine {
    config: LayoutConfig,
}

impl DagreLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LayoutEngine for DagreLayoutEngine {
    async fn layout(&self, request: LayoutRequest) -> Result<LayoutResult, LayoutError> {
        if request.nodes.is_empty() {
            return Ok(LayoutResult::default());
        }
        if request.mode == LayoutMode::Incremental {
            debug!(
                new_nodes = request.hints.incremental_nodes.len(),
                new_edges = request.hints.incremental_edges.len(),
                "incremental hints received, laying out from scratch"
            );
        }
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || run_dagre(&config, &request))
            .await
            .map_err(|err| LayoutError::Interrupted(err.to_string()))?
    }
}

fn dagre_rankdir(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::LeftToRight => "lr",
    }
}

fn run_dagre(config: &LayoutConfig, request: &LayoutRequest) -> Result<LayoutResult, LayoutError> {
    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(request.orientation).to_string());
    graph_config.nodesep = Some(config.node_spacing);
    graph_config.ranksep = Some(config.rank_spacing);
    graph_config.marginx = Some(config.margin);
    graph_config.marginy = Some(config.margin);
    dagre_graph.set_graph(graph_config);

    let mut keys: HashMap<TouchpointId, String> = HashMap::new();
    let mut sizes: HashMap<TouchpointId, (f32, f32)> = HashMap::new();
    for node in &request.nodes {
        let (width, height) = request
            .hints
            .node_sizes
            .get(&node.id)
            .copied()
            .unwrap_or((config.node_width, config.node_height));
        let key = node.id.to_string();
        let mut dagre_node = DagreNode::default();
        dagre_node.width = width;
        dagre_node.height = height;
        dagre_graph.set_node(key.clone(), Some(dagre_node));
        keys.insert(node.id, key);
        sizes.insert(node.id, (width, height));
    }

    let mut edge_set: HashSet<(String, String)> = HashSet::new();
    for (source, target) in &request.edges {
        let (Some(from), Some(to)) = (keys.get(source), keys.get(target)) else {
            continue;
        };
        if !edge_set.insert((from.clone(), to.clone())) {
            continue;
        }
        let mut edge_label = DagreEdge::default();
        edge_label.minlen = Some(1.0);
        let _ = dagre_graph.set_edge(from, to, Some(edge_label), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    let mut result = LayoutResult::default();
    for node in &request.nodes {
        let key = &keys[&node.id];
        let Some(dagre_node) = dagre_graph.node(key) else {
            return Err(LayoutError::MissingNode(node.id));
        };
        let (width, height) = sizes[&node.id];
        result
            .positions
            .insert(node.id, Rect::from_center(dagre_node.x, dagre_node.y, width, height));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::engine::{LayoutHints, LayoutNode, PortConstraint, PortSide};
    use indexmap::IndexMap;

    fn request(edges: &[(u32, u32)]) -> LayoutRequest {
        let mut ids: Vec<TouchpointId> = Vec::new();
        for &(a, b) in edges {
            for id in [a, b] {
                let id = TouchpointId::Stage(id);
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        LayoutRequest {
            mode: LayoutMode::FromScratch,
            orientation: Orientation::LeftToRight,
            nodes: ids.iter().map(|&id| LayoutNode { id, sketch: None }).collect(),
            edges: edges
                .iter()
                .map(|&(a, b)| (TouchpointId::Stage(a), TouchpointId::Stage(b)))
                .collect(),
            hints: LayoutHints {
                edge_thickness: IndexMap::new(),
                node_sizes: IndexMap::new(),
                source_port: PortConstraint::weak(PortSide::East),
                target_port: PortConstraint::weak(PortSide::West),
                incremental_nodes: Vec::new(),
                incremental_edges: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn chain_flows_left_to_right() {
        let engine = DagreLayoutEngine::new(LayoutConfig::default());
        let result = engine.layout(request(&[(1, 2), (2, 3)])).await.unwrap();
        let x = |id| result.positions[&TouchpointId::Stage(id)].center().0;
        assert!(x(1) < x(2));
        assert!(x(2) < x(3));
    }

    #[tokio::test]
    async fn empty_request_skips_dagre() {
        let engine = DagreLayoutEngine::new(LayoutConfig::default());
        let result = engine.layout(request(&[])).await.unwrap();
        assert!(result.positions.is_empty());
    }
}
