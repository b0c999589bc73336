use crate::config::Config;
use crate::dataset::TransitionDataset;
use crate::graph::{GraphDelta, GraphError, JourneyGraph};
use crate::journey::JourneyGraphBuilder;
use crate::layout::{LayoutDataAdapter, LayoutEngine, LayoutError, LayoutMode};
use crate::reduce::reduce;
use crate::thickness::normalize_thickness;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a rebuild or relayout is already in progress")]
    Busy,
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Idle,
    Building,
}

/// Owns the single journey graph and serialises the operations on it: one
/// rebuild or relayout at a time, others are turned away with `Busy`.
pub struct JourneyPipeline<E> {
    dataset: TransitionDataset,
    config: Config,
    adapter: LayoutDataAdapter,
    engine: E,
    graph: RwLock<JourneyGraph>,
    building: AtomicBool,
}

/// Holds the `Building` state; dropping it returns the pipeline to `Idle` on
/// every exit path.
struct BuildGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BuildGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PipelineError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<E: LayoutEngine> JourneyPipeline<E> {
    pub fn new(dataset: TransitionDataset, config: Config, engine: E) -> Self {
        let adapter = LayoutDataAdapter::new(config.layout.clone());
        Self {
            dataset,
            config,
            adapter,
            engine,
            graph: RwLock::new(JourneyGraph::new()),
            building: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> PipelineStatus {
        if self.building.load(Ordering::Acquire) {
            PipelineStatus::Building
        } else {
            PipelineStatus::Idle
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dataset(&self) -> &TransitionDataset {
        &self.dataset
    }

    pub async fn graph(&self) -> JourneyGraph {
        self.graph.read().await.clone()
    }

    /// Re-filters the transitions at `threshold`, rebuilds the journey graph,
    /// normalizes thickness, lays it out and recolors it. The shared graph is
    /// only replaced once the layout has succeeded.
    pub async fn rebuild(&self, threshold: f64, incremental: bool) -> Result<JourneyGraph, PipelineError> {
        let _guard = self.acquire()?;
        let pipeline = &self.config.pipeline;

        let reduced = reduce(&self.dataset.records, threshold, pipeline.touchpoint_universe);
        let built = JourneyGraphBuilder::new(&self.dataset, pipeline.conversion_alias).build(&reduced);

        let mut staged = self.graph.read().await.clone();
        let delta = staged.apply_rebuild(built, self.config.theme.new_node_color);
        normalize_thickness(&mut staged, pipeline.thickness_range())?;
        debug!(
            added_nodes = delta.added_nodes.len(),
            added_edges = delta.added_edges.len(),
            removed_nodes = delta.removed_nodes.len(),
            removed_edges = delta.removed_edges.len(),
            "graph delta"
        );

        let laid_out = self
            .layout(&staged, LayoutMode::from_incremental(incremental), Some(&delta))
            .await?;
        *self.graph.write().await = laid_out.clone();
        info!(
            threshold,
            incremental,
            nodes = laid_out.node_count(),
            edges = laid_out.edge_count(),
            "journey rebuilt"
        );
        Ok(laid_out)
    }

    /// Lays out and recolors the current graph without touching its edges.
    pub async fn relayout(&self, incremental: bool) -> Result<JourneyGraph, PipelineError> {
        let _guard = self.acquire()?;
        let current = self.graph.read().await.clone();
        let laid_out = self
            .layout(&current, LayoutMode::from_incremental(incremental), None)
            .await?;
        *self.graph.write().await = laid_out.clone();
        info!(incremental, nodes = laid_out.node_count(), "journey laid out");
        Ok(laid_out)
    }

    fn acquire(&self) -> Result<BuildGuard<'_>, PipelineError> {
        BuildGuard::acquire(&self.building).inspect_err(|_| {
            warn!("request rejected, pipeline is busy");
        })
    }

    async fn layout(
        &self,
        graph: &JourneyGraph,
        mode: LayoutMode,
        delta: Option<&GraphDelta>,
    ) -> Result<JourneyGraph, PipelineError> {
        if graph.is_empty() {
            return Ok(graph.clone());
        }
        let request = self.adapter.request(graph, mode, delta);
        let result = self.engine.layout(request).await?;
        Ok(self.adapter.apply(graph, &result, &self.config.theme)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{RawValue, TransitionRecord};
    use crate::graph::Rect;
    use crate::layout::{LayoutRequest, LayoutResult};
    use crate::touchpoint::TouchpointId;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Places each node in the column of its longest path from a source.
    #[derive(Default)]
    struct ColumnEngine {
        requests: Mutex<Vec<LayoutRequest>>,
        fail_first: AtomicUsize,
        gate: Option<Notify>,
    }

    #[async_trait]
    impl LayoutEngine for ColumnEngine {
        async fn layout(&self, request: LayoutRequest) -> Result<LayoutResult, LayoutError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(LayoutError::Engine("scripted failure".to_string()));
            }
            let mut rank: HashMap<TouchpointId, usize> =
                request.nodes.iter().map(|n| (n.id, 0)).collect();
            for _ in 0..request.nodes.len() {
                for (source, target) in &request.edges {
                    let next = rank[source] + 1;
                    let entry = rank.get_mut(target).unwrap();
                    *entry = (*entry).max(next);
                }
            }
            let mut result = LayoutResult::default();
            for (row, node) in request.nodes.iter().enumerate() {
                let x = rank[&node.id] as f32 * 260.0;
                result
                    .positions
                    .insert(node.id, Rect::from_center(x, row as f32 * 40.0, 180.0, 20.0));
            }
            Ok(result)
        }
    }

    fn stage(id: u32) -> TouchpointId {
        TouchpointId::Stage(id)
    }

    fn dataset() -> TransitionDataset {
        TransitionDataset::new(vec![
            TransitionRecord::new(stage(1), stage(2), RawValue::Number(100.0)),
            TransitionRecord::new(stage(2), stage(3), RawValue::Number(50.0)),
            TransitionRecord::new(stage(1), stage(3), RawValue::Number(10.0)),
        ])
    }

    fn pipeline(engine: ColumnEngine) -> JourneyPipeline<ColumnEngine> {
        JourneyPipeline::new(dataset(), Config::default(), engine)
    }

    #[tokio::test]
    async fn rebuild_colors_nodes_by_column() {
        let pipeline = pipeline(ColumnEngine::default());
        let graph = pipeline.rebuild(0.0, false).await.unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);
        let ramp = pipeline.config().theme.ramp(4);
        assert_eq!(graph.node(stage(1)).unwrap().color, ramp[0]);
        assert_eq!(graph.node(stage(2)).unwrap().color, ramp[1]);
        assert_eq!(graph.node(stage(3)).unwrap().color, ramp[2]);
        assert_eq!(graph.node(TouchpointId::Conversion).unwrap().color, ramp[3]);
        assert!(graph.edges().all(|e| e.thickness.is_some()));
        assert_eq!(pipeline.graph().await, graph);
        assert_eq!(pipeline.status(), PipelineStatus::Idle);
    }

    #[tokio::test]
    async fn incremental_rebuild_sends_only_new_items() {
        let pipeline = pipeline(ColumnEngine::default());
        let first = pipeline.rebuild(60.0, false).await.unwrap();
        pipeline.rebuild(0.0, true).await.unwrap();

        let requests = pipeline.engine.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].mode, LayoutMode::FromScratch);
        assert!(requests[0].hints.incremental_nodes.is_empty());
        let second = &requests[1];
        assert_eq!(second.mode, LayoutMode::Incremental);
        assert_eq!(second.hints.incremental_nodes, vec![stage(3)]);
        assert_eq!(
            second.hints.incremental_edges,
            vec![(stage(2), stage(3)), (stage(3), TouchpointId::Conversion)]
        );
        assert_eq!(requests[0].nodes.len(), 3);
        let sketch = second.nodes.iter().find(|n| n.id == stage(3)).unwrap().sketch;
        let conversion = first.node(TouchpointId::Conversion).unwrap().geometry;
        assert!(sketch.is_some());
        assert_eq!(sketch, conversion);
    }

    #[tokio::test]
    async fn relayout_is_idempotent() {
        let pipeline = pipeline(ColumnEngine::default());
        pipeline.rebuild(0.0, false).await.unwrap();
        let first = pipeline.relayout(false).await.unwrap();
        let second = pipeline.relayout(false).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failed_layout_keeps_previous_graph_and_releases_guard() {
        let pipeline = pipeline(ColumnEngine::default());
        let before = pipeline.rebuild(60.0, false).await.unwrap();

        pipeline.engine.fail_first.store(1, Ordering::SeqCst);
        let err = pipeline.rebuild(0.0, false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Layout(LayoutError::Engine(_))));
        assert_eq!(pipeline.status(), PipelineStatus::Idle);
        assert_eq!(pipeline.graph().await, before);

        let after = pipeline.rebuild(0.0, false).await.unwrap();
        assert_eq!(after.node_count(), 4);
    }

    #[tokio::test]
    async fn concurrent_requests_are_rejected() {
        let engine = ColumnEngine {
            gate: Some(Notify::new()),
            ..Default::default()
        };
        let pipeline = pipeline(engine);
        let (first, second) = tokio::join!(pipeline.rebuild(0.0, false), async {
            while pipeline.status() != PipelineStatus::Building {
                tokio::task::yield_now().await;
            }
            let rejected = pipeline.relayout(false).await;
            if let Some(gate) = &pipeline.engine.gate {
                gate.notify_one();
            }
            rejected
        });
        assert!(first.is_ok());
        assert!(matches!(second, Err(PipelineError::Busy)));
        assert_eq!(pipeline.status(), PipelineStatus::Idle);
    }

    #[tokio::test]
    async fn empty_threshold_result_skips_layout() {
        let pipeline = pipeline(ColumnEngine::default());
        let graph = pipeline.rebuild(1000.0, false).await.unwrap();
        assert!(graph.is_empty());
        assert!(pipeline.engine.requests.lock().unwrap().is_empty());
    }
}
