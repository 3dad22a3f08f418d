//! Step graph for a run: nodes in execution order, edges `i -> i+1`.
//!
//! The planner does not report real dependencies between actions, so the observed
//! execution order is the dependency order. Graph helpers (successors, sinks,
//! topological order) still work on arbitrary edge lists assembled with
//! [`StepGraph::from_parts`].

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

use serde::Serialize;

use crate::action::{ActionRecord, ActionStatus};
use crate::error::TelemetryError;
use crate::format::{duration_label, truncate_label};

/// Longest node label before truncation.
pub const MAX_LABEL_CHARS: usize = 24;

/// Error when the graph contains a cycle (no topological order exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleDetected;

impl std::fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("step graph contains a cycle")
    }
}

impl std::error::Error for CycleDetected {}

/// Status-derived color class of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Gray,
    Blue,
    Green,
    Red,
}

impl StatusColor {
    pub fn class_name(self) -> &'static str {
        match self {
            StatusColor::Gray => "node-pending",
            StatusColor::Blue => "node-executing",
            StatusColor::Green => "node-completed",
            StatusColor::Red => "node-failed",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            StatusColor::Gray => "#9ca3af",
            StatusColor::Blue => "#3b82f6",
            StatusColor::Green => "#22c55e",
            StatusColor::Red => "#ef4444",
        }
    }
}

impl From<ActionStatus> for StatusColor {
    fn from(status: ActionStatus) -> Self {
        match status {
            ActionStatus::Pending => StatusColor::Gray,
            ActionStatus::Executing => StatusColor::Blue,
            ActionStatus::Completed => StatusColor::Green,
            ActionStatus::Failed => StatusColor::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagNode {
    /// Stable id derived from the execution index (`step-{index}`).
    pub id: String,
    pub index: usize,
    pub name: String,
    pub label: String,
    pub status: ActionStatus,
    pub color: StatusColor,
    pub duration_label: String,
}

impl DagNode {
    fn from_record(index: usize, record: &ActionRecord) -> Self {
        Self {
            id: node_id(index),
            index,
            name: record.name.clone(),
            label: truncate_label(&record.name, MAX_LABEL_CHARS),
            status: record.status,
            color: record.status.into(),
            duration_label: duration_label(record.duration_ms),
        }
    }
}

/// Directed edge between node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DagEdge {
    pub from: usize,
    pub to: usize,
}

/// Layout parameters for [`StepGraph::layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub node_width: f64,
    pub node_height: f64,
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_width: 160.0,
            node_height: 56.0,
            horizontal_gap: 48.0,
            vertical_gap: 24.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePosition {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepGraph {
    nodes: Vec<DagNode>,
    edges: Vec<DagEdge>,
}

pub fn node_id(index: usize) -> String {
    format!("step-{index}")
}

impl StepGraph {
    /// Chains `records` left to right in execution order.
    pub fn build(records: &[ActionRecord]) -> Self {
        let nodes = records
            .iter()
            .enumerate()
            .map(|(index, record)| DagNode::from_record(index, record))
            .collect();
        let edges = (1..records.len())
            .map(|to| DagEdge { from: to - 1, to })
            .collect();
        Self { nodes, edges }
    }

    /// Builds a graph with explicit edges. Every edge must reference existing nodes.
    pub fn from_parts(
        records: &[ActionRecord],
        edges: Vec<DagEdge>,
    ) -> Result<Self, TelemetryError> {
        if let Some(bad) = edges
            .iter()
            .find(|e| e.from >= records.len() || e.to >= records.len())
        {
            return Err(TelemetryError::InvalidEdge {
                from: bad.from,
                to: bad.to,
            });
        }
        let nodes = records
            .iter()
            .enumerate()
            .map(|(index, record)| DagNode::from_record(index, record))
            .collect();
        Ok(Self { nodes, edges })
    }

    pub fn nodes(&self) -> &[DagNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DagEdge] {
        &self.edges
    }

    /// Edges as `(from_id, to_id)` pairs for renderers keyed by node id.
    pub fn edge_ids(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.edges.iter().map(|e| {
            (
                self.nodes[e.from].id.as_str(),
                self.nodes[e.to].id.as_str(),
            )
        })
    }

    /// Nodes that have an edge from `from`.
    pub fn successors(&self, from: usize) -> Vec<usize> {
        self.edges
            .iter()
            .filter(|e| e.from == from)
            .map(|e| e.to)
            .collect()
    }

    /// Nodes that have an edge to `to`.
    pub fn predecessors(&self, to: usize) -> Vec<usize> {
        self.edges
            .iter()
            .filter(|e| e.to == to)
            .map(|e| e.from)
            .collect()
    }

    /// Nodes with no outgoing edges, in index order.
    pub fn sinks(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|i| !self.edges.iter().any(|e| e.from == *i))
            .collect()
    }

    /// Topological order (Kahn's algorithm, lowest index first among ready nodes).
    pub fn topo_order(&self) -> Result<Vec<usize>, CycleDetected> {
        let mut in_degree = vec![0_usize; self.nodes.len()];
        for edge in &self.edges {
            in_degree[edge.to] += 1;
        }

        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|i| in_degree[*i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(u) = queue.pop_front() {
            order.push(u);
            for to in self.successors(u) {
                let d = &mut in_degree[to];
                *d = d.saturating_sub(1);
                if *d == 0 {
                    queue.push_back(to);
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            Err(CycleDetected)
        }
    }

    /// Left-to-right layered layout.
    ///
    /// A node's column is the longest path from any source; rows stack nodes that
    /// share a column in index order. For the execution chain this places node `i`
    /// in column `i`, row 0. A cyclic graph falls back to one column per node.
    pub fn layout(&self, options: &LayoutOptions) -> Vec<NodePosition> {
        let columns: Vec<usize> = match self.topo_order() {
            Ok(order) => {
                let mut depth = vec![0_usize; self.nodes.len()];
                for u in order {
                    for to in self.successors(u) {
                        depth[to] = depth[to].max(depth[u] + 1);
                    }
                }
                depth
            }
            Err(CycleDetected) => (0..self.nodes.len()).collect(),
        };

        let mut rows_used: HashMap<usize, usize> = HashMap::new();
        columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let row = rows_used.entry(*column).or_insert(0);
                let position = NodePosition {
                    index,
                    x: *column as f64 * (options.node_width + options.horizontal_gap),
                    y: *row as f64 * (options.node_height + options.vertical_gap),
                };
                *row += 1;
                position
            })
            .collect()
    }

    /// Graphviz DOT rendering.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph plan {\n  rankdir=LR;\n");
        out.push_str("  node [shape=box, style=\"rounded,filled\"];\n");
        for node in &self.nodes {
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\\n{}\", fillcolor=\"{}\"];",
                node.id,
                escape_dot(&node.label),
                node.duration_label,
                node.color.hex()
            );
        }
        for (from, to) in self.edge_ids() {
            let _ = writeln!(out, "  \"{from}\" -> \"{to}\";");
        }
        out.push_str("}\n");
        out
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Vec<ActionRecord> {
        (0..n)
            .map(|i| ActionRecord::completed(format!("action {i}"), (i as u64 + 1) * 100))
            .collect()
    }

    #[test]
    fn four_records_give_three_sequential_edges() {
        let graph = StepGraph::build(&chain(4));
        assert_eq!(graph.nodes().len(), 4);
        assert_eq!(
            graph.edges(),
            &[
                DagEdge { from: 0, to: 1 },
                DagEdge { from: 1, to: 2 },
                DagEdge { from: 2, to: 3 },
            ]
        );
        let names: Vec<_> = graph.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["action 0", "action 1", "action 2", "action 3"]);
        let ids: Vec<_> = graph.edge_ids().collect();
        assert_eq!(ids[0], ("step-0", "step-1"));
    }

    #[test]
    fn single_and_empty_traces_have_no_edges() {
        assert!(StepGraph::build(&chain(1)).edges().is_empty());
        let empty = StepGraph::build(&[]);
        assert!(empty.nodes().is_empty());
        assert_eq!(empty.topo_order(), Ok(vec![]));
    }

    #[test]
    fn node_fields_follow_record() {
        let records = vec![
            ActionRecord::completed("synthesize a very long curriculum outline", 1_500),
            ActionRecord::executing("rank"),
        ];
        let graph = StepGraph::build(&records);
        let first = &graph.nodes()[0];
        assert_eq!(first.label.chars().count(), MAX_LABEL_CHARS);
        assert!(first.label.ends_with('…'));
        assert_eq!(first.color, StatusColor::Green);
        assert_eq!(first.duration_label, "1.5s");
        assert_eq!(graph.nodes()[1].color.class_name(), "node-executing");
        assert_eq!(graph.nodes()[1].duration_label, "--");
    }

    #[test]
    fn chain_queries() {
        let graph = StepGraph::build(&chain(3));
        assert_eq!(graph.successors(0), vec![1]);
        assert_eq!(graph.predecessors(0), Vec::<usize>::new());
        assert_eq!(graph.predecessors(2), vec![1]);
        assert_eq!(graph.sinks(), vec![2]);
        assert_eq!(graph.topo_order(), Ok(vec![0, 1, 2]));
    }

    #[test]
    fn chain_layout_is_one_row() {
        let graph = StepGraph::build(&chain(3));
        let options = LayoutOptions::default();
        let positions = graph.layout(&options);
        let step = options.node_width + options.horizontal_gap;
        assert_eq!(positions.len(), 3);
        for (i, p) in positions.iter().enumerate() {
            assert_eq!(p.index, i);
            assert_eq!(p.x, i as f64 * step);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn fan_out_layout_stacks_siblings() {
        let graph = StepGraph::from_parts(
            &chain(3),
            vec![DagEdge { from: 0, to: 1 }, DagEdge { from: 0, to: 2 }],
        )
        .expect("valid edges");
        assert_eq!(graph.sinks(), vec![1, 2]);
        let positions = graph.layout(&LayoutOptions::default());
        assert_eq!(positions[1].x, positions[2].x);
        assert!(positions[2].y > positions[1].y);
    }

    #[test]
    fn cycle_is_detected() {
        let graph = StepGraph::from_parts(
            &chain(3),
            vec![
                DagEdge { from: 0, to: 1 },
                DagEdge { from: 1, to: 2 },
                DagEdge { from: 2, to: 0 },
            ],
        )
        .expect("valid edges");
        assert_eq!(graph.topo_order(), Err(CycleDetected));
        assert_eq!(graph.layout(&LayoutOptions::default()).len(), 3);
        let err: Box<dyn std::error::Error> = Box::new(CycleDetected);
        assert_eq!(err.to_string(), "step graph contains a cycle");
    }

    #[test]
    fn from_parts_rejects_dangling_edges() {
        let err = StepGraph::from_parts(&chain(2), vec![DagEdge { from: 0, to: 5 }])
            .expect_err("dangling edge");
        assert!(matches!(err, TelemetryError::InvalidEdge { from: 0, to: 5 }));
    }

    #[test]
    fn dot_output_lists_nodes_and_edges() {
        let dot = StepGraph::build(&[
            ActionRecord::completed("say \"hi\"", 10),
            ActionRecord::failed("b", 20),
        ])
        .to_dot();
        assert!(dot.starts_with("digraph plan {"));
        assert!(dot.contains("\"step-0\" -> \"step-1\";"));
        assert!(dot.contains("say \\\"hi\\\""));
        assert!(dot.contains("#ef4444"));
    }
}
