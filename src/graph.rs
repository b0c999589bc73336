use crate::dataset::RawValue;
use crate::touchpoint::TouchpointId;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

pub type Rgb = [u8; 3];
pub type EdgeKey = (TouchpointId, TouchpointId);

/// Structural violations of the graph model. These point at a bug upstream of
/// the failing step, never at bad input data.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("edge {from} -> {to} is missing its metadata")]
    MissingEdgeMeta { from: TouchpointId, to: TouchpointId },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JourneyNode {
    pub id: TouchpointId,
    pub label: String,
    pub color: Rgb,
    pub geometry: Option<Rect>,
}

impl JourneyNode {
    pub fn new(id: TouchpointId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            color: [0, 0, 0],
            geometry: None,
        }
    }
}

/// Flow value and transition statistics carried by an edge. `value` doubles as
/// the edge label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeMeta {
    pub value: RawValue,
    pub unclassified_frequency: Option<i64>,
    pub conversion_rate: Option<f64>,
    pub classified_avg_time: Option<f64>,
    pub unclassified_avg_time: Option<f64>,
}

impl EdgeMeta {
    pub fn label(&self) -> Option<String> {
        match &self.value {
            RawValue::Null => None,
            value => Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JourneyEdge {
    pub source: TouchpointId,
    pub target: TouchpointId,
    pub meta: Option<EdgeMeta>,
    pub thickness: Option<u32>,
}

impl JourneyEdge {
    pub fn new(source: TouchpointId, target: TouchpointId, meta: EdgeMeta) -> Self {
        Self {
            source,
            target,
            meta: Some(meta),
            thickness: None,
        }
    }

    pub fn key(&self) -> EdgeKey {
        (self.source, self.target)
    }
}

/// Nodes in first-seen order plus edges keyed by their endpoint pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JourneyGraph {
    nodes: IndexMap<TouchpointId, JourneyNode>,
    edges: IndexMap<EdgeKey, JourneyEdge>,
}

/// What changed between two consecutive graph builds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDelta {
    pub added_nodes: Vec<TouchpointId>,
    pub added_edges: Vec<EdgeKey>,
    pub removed_nodes: Vec<TouchpointId>,
    pub removed_edges: Vec<EdgeKey>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_nodes.is_empty()
            && self.removed_edges.is_empty()
    }
}

impl JourneyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Inserts the node unless one with the same id exists. Returns whether it
    /// was inserted.
    pub fn add_node(&mut self, node: JourneyNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id, node);
        true
    }

    /// Inserts the edge unless its endpoint pair is already present.
    pub fn add_edge(&mut self, edge: JourneyEdge) -> bool {
        let key = edge.key();
        if self.edges.contains_key(&key) {
            return false;
        }
        self.edges.insert(key, edge);
        true
    }

    pub fn node(&self, id: TouchpointId) -> Option<&JourneyNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: TouchpointId) -> Option<&mut JourneyNode> {
        self.nodes.get_mut(&id)
    }

    pub fn edge(&self, source: TouchpointId, target: TouchpointId) -> Option<&JourneyEdge> {
        self.edges.get(&(source, target))
    }

    pub fn has_edge(&self, source: TouchpointId, target: TouchpointId) -> bool {
        self.edges.contains_key(&(source, target))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &JourneyNode> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut JourneyNode> {
        self.nodes.values_mut()
    }

    pub fn edges(&self) -> impl Iterator<Item = &JourneyEdge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut JourneyEdge> {
        self.edges.values_mut()
    }

    pub fn out_edges(&self, id: TouchpointId) -> impl Iterator<Item = &JourneyEdge> {
        self.edges.values().filter(move |edge| edge.source == id)
    }

    pub fn in_edges(&self, id: TouchpointId) -> impl Iterator<Item = &JourneyEdge> {
        self.edges.values().filter(move |edge| edge.target == id)
    }

    pub fn conversion_node(&self) -> Option<&JourneyNode> {
        self.nodes.get(&TouchpointId::Conversion)
    }

    /// Replaces this graph with `next`. Nodes that survive keep their color
    /// and geometry; new nodes get `new_color` and start at the previous
    /// conversion node's rectangle so an incremental layout grows them from
    /// there.
    pub fn apply_rebuild(&mut self, mut next: JourneyGraph, new_color: Rgb) -> GraphDelta {
        let sketch = self.conversion_node().and_then(|node| node.geometry);
        let mut delta = GraphDelta::default();

        for node in next.nodes.values_mut() {
            match self.nodes.get(&node.id) {
                Some(previous) => {
                    node.color = previous.color;
                    node.geometry = previous.geometry;
                }
                None => {
                    node.color = new_color;
                    node.geometry = sketch;
                    delta.added_nodes.push(node.id);
                }
            }
        }
        delta.added_edges = next
            .edges
            .keys()
            .filter(|key| !self.edges.contains_key(*key))
            .copied()
            .collect();
        delta.removed_nodes = self
            .nodes
            .keys()
            .filter(|id| !next.nodes.contains_key(*id))
            .copied()
            .collect();
        delta.removed_edges = self
            .edges
            .keys()
            .filter(|key| !next.edges.contains_key(*key))
            .copied()
            .collect();

        *self = next;
        delta
    }
}
