use crate::graph::{EdgeKey, Rect};
use crate::touchpoint::TouchpointId;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout engine failed: {0}")]
    Engine(String),
    #[error("layout engine returned no position for node {0}")]
    MissingNode(TouchpointId),
    #[error("layout task did not complete: {0}")]
    Interrupted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutMode {
    FromScratch,
    Incremental,
}

impl LayoutMode {
    pub fn from_incremental(incremental: bool) -> Self {
        if incremental {
            Self::Incremental
        } else {
            Self::FromScratch
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    LeftToRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortSide {
    East,
    West,
}

/// Side of the node an edge end must attach to. Weak constraints let the
/// engine pick the exact spot along that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortConstraint {
    pub side: PortSide,
    pub strong: bool,
}

impl PortConstraint {
    pub fn weak(side: PortSide) -> Self {
        Self {
            side,
            strong: false,
        }
    }
}

/// Everything the engine needs beyond the bare topology.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutHints {
    pub edge_thickness: IndexMap<EdgeKey, u32>,
    pub node_sizes: IndexMap<TouchpointId, (f32, f32)>,
    pub source_port: PortConstraint,
    pub target_port: PortConstraint,
    /// Nodes to be layered into the existing sketch. Empty unless incremental.
    pub incremental_nodes: Vec<TouchpointId>,
    /// Edges to be sequenced into the existing sketch. Empty unless incremental.
    pub incremental_edges: Vec<EdgeKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: TouchpointId,
    pub sketch: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRequest {
    pub mode: LayoutMode,
    pub orientation: Orientation,
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<EdgeKey>,
    pub hints: LayoutHints,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub positions: IndexMap<TouchpointId, Rect>,
}

/// The hierarchical layout collaborator. Implementations position every
/// requested node; one call is outstanding at a time.
#[async_trait]
pub trait LayoutEngine: Send + Sync {
    async fn layout(&self, request: LayoutRequest) -> Result<LayoutResult, LayoutError>;
}
