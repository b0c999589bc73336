//! Bridges the journey graph and the hierarchical layout collaborator: builds
//! the request (thickness map, port sides, node sizes, incremental sets) and
//! folds the engine's answer back into the graph.

pub mod columns;
pub mod dagre;
pub mod engine;

use crate::config::LayoutConfig;
use crate::graph::{GraphDelta, JourneyGraph};
use crate::thickness::MIN_THICKNESS;
use crate::theme::Theme;
use crate::touchpoint::TouchpointId;
use indexmap::IndexMap;
use tracing::debug;

pub use columns::{assign_column_colors, column_index, column_positions};
pub use dagre::DagreLayoutEngine;
pub use engine::{
    LayoutEngine, LayoutError, LayoutHints, LayoutMode, LayoutNode, LayoutRequest, LayoutResult,
    Orientation, PortConstraint, PortSide,
};

#[derive(Debug, Clone)]
pub struct LayoutDataAdapter {
    config: LayoutConfig,
}

impl LayoutDataAdapter {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Flow runs strictly left to right: edges leave on the east side and
    /// arrive on the west side. The incremental sets are only filled for
    /// incremental layouts.
    pub fn hints(&self, graph: &JourneyGraph, mode: LayoutMode, delta: Option<&GraphDelta>) -> LayoutHints {
        let edge_thickness: IndexMap<_, _> = graph
            .edges()
            .map(|edge| (edge.key(), edge.thickness.unwrap_or(MIN_THICKNESS)))
            .collect();
        let node_sizes = graph
            .nodes()
            .map(|node| (node.id, self.node_size(graph, node.id)))
            .collect();
        let (incremental_nodes, incremental_edges) = match (mode, delta) {
            (LayoutMode::Incremental, Some(delta)) => {
                (delta.added_nodes.clone(), delta.added_edges.clone())
            }
            _ => (Vec::new(), Vec::new()),
        };
        LayoutHints {
            edge_thickness,
            node_sizes,
            source_port: PortConstraint::weak(PortSide::East),
            target_port: PortConstraint::weak(PortSide::West),
            incremental_nodes,
            incremental_edges,
        }
    }

    pub fn request(&self, graph: &JourneyGraph, mode: LayoutMode, delta: Option<&GraphDelta>) -> LayoutRequest {
        let hints = self.hints(graph, mode, delta);
        LayoutRequest {
            mode,
            orientation: Orientation::LeftToRight,
            nodes: graph
                .nodes()
                .map(|node| LayoutNode {
                    id: node.id,
                    sketch: node.geometry,
                })
                .collect(),
            edges: graph.edges().map(|edge| edge.key()).collect(),
            hints,
        }
    }

    /// Node box large enough for its incoming and outgoing flows to sit side
    /// by side along the west and east borders.
    pub fn node_size(&self, graph: &JourneyGraph, id: TouchpointId) -> (f32, f32) {
        let incoming = self.required_space(graph.in_edges(id).map(|e| e.thickness));
        let outgoing = self.required_space(graph.out_edges(id).map(|e| e.thickness));
        let height = self.config.node_height.max(incoming).max(outgoing);
        (self.config.node_width, height)
    }

    fn required_space(&self, thicknesses: impl Iterator<Item = Option<u32>>) -> f32 {
        let mut space = 0.0f32;
        let mut count = 0usize;
        for thickness in thicknesses {
            space += thickness.unwrap_or(0).max(1) as f32;
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }
        let gap = self.config.minimum_port_distance;
        space + (count - 1) as f32 * gap + 2.0 * self.config.port_border_gap_ratio * gap
    }

    /// Returns a copy of `graph` carrying the engine's geometry and the column
    /// colors derived from it. `graph` itself is left untouched so a failed
    /// layout never leaves partial state behind.
    pub fn apply(
        &self,
        graph: &JourneyGraph,
        result: &LayoutResult,
        theme: &Theme,
    ) -> Result<JourneyGraph, LayoutError> {
        let mut laid_out = graph.clone();
        for node in laid_out.nodes_mut() {
            let rect = result
                .positions
                .get(&node.id)
                .ok_or(LayoutError::MissingNode(node.id))?;
            node.geometry = Some(*rect);
        }
        let columns = assign_column_colors(&mut laid_out, theme);
        debug!(nodes = laid_out.node_count(), columns, "applied layout");
        Ok(laid_out)
    }
}
