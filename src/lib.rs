#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dataset;
pub mod dump;
pub mod graph;
pub mod journey;
pub mod layout;
pub mod pipeline;
pub mod reduce;
pub mod theme;
pub mod thickness;
pub mod touchpoint;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, PipelineConfig, load_config};
pub use dataset::{RawValue, TransitionDataset, TransitionRecord, TransitionStats};
pub use graph::{EdgeMeta, GraphDelta, GraphError, JourneyEdge, JourneyGraph, JourneyNode, Rect, Rgb};
pub use journey::JourneyGraphBuilder;
pub use layout::{DagreLayoutEngine, LayoutDataAdapter, LayoutEngine, LayoutError, LayoutMode};
pub use pipeline::{JourneyPipeline, PipelineError, PipelineStatus};
pub use reduce::{UnionFind, WeightedEdge, reduce};
pub use theme::Theme;
pub use thickness::{ThicknessRange, normalize_thickness};
pub use touchpoint::TouchpointId;
