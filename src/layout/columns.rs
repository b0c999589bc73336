use crate::graph::JourneyGraph;
use crate::theme::Theme;

/// Distinct node center x-positions, ascending. Nodes without geometry are
/// ignored.
pub fn column_positions(graph: &JourneyGraph) -> Vec<f32> {
    let mut xs: Vec<f32> = graph
        .nodes()
        .filter_map(|node| node.geometry.map(|rect| rect.center().0))
        .collect();
    xs.sort_by(f32::total_cmp);
    xs.dedup();
    xs
}

pub fn column_index(columns: &[f32], x: f32) -> Option<usize> {
    columns.binary_search_by(|probe| probe.total_cmp(&x)).ok()
}

/// Colors each positioned node by its column. Returns the number of columns.
pub fn assign_column_colors(graph: &mut JourneyGraph, theme: &Theme) -> usize {
    let columns = column_positions(graph);
    let ramp = theme.ramp(columns.len());
    for node in graph.nodes_mut() {
        let Some(rect) = node.geometry else {
            continue;
        };
        if let Some(idx) = column_index(&columns, rect.center().0) {
            node.color = ramp[idx];
        }
    }
    columns.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{JourneyNode, Rect};
    use crate::touchpoint::TouchpointId;

    fn positioned(entries: &[(u32, f32)]) -> JourneyGraph {
        let mut graph = JourneyGraph::new();
        for &(id, x) in entries {
            let mut node = JourneyNode::new(TouchpointId::Stage(id), id.to_string());
            node.geometry = Some(Rect::from_center(x, f32::from(id as u16) * 30.0, 180.0, 20.0));
            graph.add_node(node);
        }
        graph
    }

    #[test]
    fn groups_nodes_by_x() {
        let graph = positioned(&[(1, 300.0), (2, 10.0), (3, 300.0), (4, 620.5)]);
        assert_eq!(column_positions(&graph), vec![10.0, 300.0, 620.5]);
        assert_eq!(column_index(&[10.0, 300.0], 300.0), Some(1));
        assert_eq!(column_index(&[10.0, 300.0], 42.0), None);
    }

    #[test]
    fn colors_follow_columns() {
        let mut graph = positioned(&[(1, 0.0), (2, 100.0), (3, 100.0), (4, 200.0)]);
        let mut unplaced = JourneyNode::new(TouchpointId::Conversion, "Conversion");
        unplaced.color = [1, 1, 1];
        graph.add_node(unplaced);

        let theme = Theme::default();
        assert_eq!(assign_column_colors(&mut graph, &theme), 3);
        let ramp = theme.ramp(3);
        let color = |id| graph.node(id).unwrap().color;
        assert_eq!(color(TouchpointId::Stage(1)), ramp[0]);
        assert_eq!(color(TouchpointId::Stage(2)), ramp[1]);
        assert_eq!(color(TouchpointId::Stage(3)), ramp[1]);
        assert_eq!(color(TouchpointId::Stage(4)), ramp[2]);
        assert_eq!(color(TouchpointId::Conversion), [1, 1, 1]);
    }

    #[test]
    fn recoloring_is_idempotent() {
        let mut graph = positioned(&[(1, 0.0), (2, 50.0), (3, 75.0)]);
        let theme = Theme::default();
        assign_column_colors(&mut graph, &theme);
        let first = graph.clone();
        assign_column_colors(&mut graph, &theme);
        assert_eq!(graph, first);
    }
}
