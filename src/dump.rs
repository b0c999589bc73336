use crate::graph::{JourneyGraph, Rgb};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GraphDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub columns: usize,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub color: String,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub source: String,
    pub target: String,
    pub thickness: Option<u32>,
    pub label: Option<String>,
    pub unclassified_frequency: Option<i64>,
    pub conversion_rate: Option<f64>,
    pub classified_avg_time: Option<f64>,
    pub unclassified_avg_time: Option<f64>,
}

pub fn css_rgb(color: Rgb) -> String {
    format!("rgb({},{},{})", color[0], color[1], color[2])
}

impl GraphDump {
    pub fn from_graph(graph: &JourneyGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeDump {
                id: node.id.to_string(),
                label: node.label.clone(),
                color: css_rgb(node.color),
                x: node.geometry.map(|r| r.x),
                y: node.geometry.map(|r| r.y),
                width: node.geometry.map(|r| r.width),
                height: node.geometry.map(|r| r.height),
            })
            .collect();

        let edges = graph
            .edges()
            .map(|edge| {
                let meta = edge.meta.clone().unwrap_or_default();
                EdgeDump {
                    source: edge.source.to_string(),
                    target: edge.target.to_string(),
                    thickness: edge.thickness,
                    label: meta.label(),
                    unclassified_frequency: meta.unclassified_frequency,
                    conversion_rate: meta.conversion_rate,
                    classified_avg_time: meta.classified_avg_time,
                    unclassified_avg_time: meta.unclassified_avg_time,
                }
            })
            .collect();

        GraphDump {
            nodes,
            edges,
            columns: crate::layout::column_positions(graph).len(),
        }
    }
}

pub fn write_graph_dump(path: Option<&Path>, graph: &JourneyGraph) -> anyhow::Result<()> {
    let dump = GraphDump::from_graph(graph);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &dump)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}
