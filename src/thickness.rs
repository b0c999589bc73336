use crate::graph::{GraphError, JourneyGraph};
use tracing::debug;

pub const MIN_THICKNESS: u32 = 2;
pub const MAX_THICKNESS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThicknessRange {
    pub min: u32,
    pub max: u32,
}

impl Default for ThicknessRange {
    fn default() -> Self {
        Self {
            min: MIN_THICKNESS,
            max: MAX_THICKNESS,
        }
    }
}

impl ThicknessRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }
}

/// Rescales every edge's flow value linearly into `range`. Edges without a
/// usable value, and all edges when every value is equal, get `range.min`.
///
/// Fails only when an edge carries no metadata at all.
pub fn normalize_thickness(graph: &mut JourneyGraph, range: ThicknessRange) -> Result<(), GraphError> {
    if graph.is_empty() || graph.edge_count() == 0 {
        return Ok(());
    }

    let mut bounds: Option<(f64, f64)> = None;
    for edge in graph.edges() {
        let Some(meta) = &edge.meta else {
            return Err(GraphError::MissingEdgeMeta {
                from: edge.source,
                to: edge.target,
            });
        };
        let Some(value) = flow_value(meta.value.as_float()) else {
            continue;
        };
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(value), max.max(value)),
            None => (value, value),
        });
    }

    let span = f64::from(range.max.saturating_sub(range.min));
    let mut unparsed = 0usize;
    for edge in graph.edges_mut() {
        let value = edge.meta.as_ref().and_then(|meta| flow_value(meta.value.as_float()));
        let thickness = match (value, bounds) {
            (Some(value), Some((min, max))) if max > min => {
                let ratio = (value - min) / (max - min);
                let scaled = (f64::from(range.min) + ratio * span).floor() as u32;
                scaled.clamp(range.min, range.max)
            }
            (Some(_), _) => range.min,
            (None, _) => {
                unparsed += 1;
                range.min
            }
        };
        edge.thickness = Some(thickness);
    }

    debug!(
        edges = graph.edge_count(),
        unparsed,
        min = bounds.map(|b| b.0),
        max = bounds.map(|b| b.1),
        "normalized edge thickness"
    );
    Ok(())
}

fn flow_value(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.max(0.0))
}
