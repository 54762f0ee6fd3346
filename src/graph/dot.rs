//! DOT export for external visualization

use super::Graph;
use std::fmt::Write;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Graph {
    /// Render the whole graph in Graphviz DOT format
    ///
    /// Nodes are named by their reference id, edges are labelled and colored
    /// by type.
    pub fn encode_dot(&self) -> String {
        let mut out = String::from("digraph Kubernetes {\n");

        for node in self.nodes() {
            let _ = writeln!(out, "\t{};", quote(&node.reference().id()));
        }

        for node in self.nodes() {
            for edge in self.outgoing(node.id()) {
                let Some(to) = self.node(edge.to) else {
                    continue;
                };
                let _ = writeln!(
                    out,
                    "\t{} -> {} [label={} color={}];",
                    quote(&node.reference().id()),
                    quote(&to.reference().id()),
                    quote(edge.edge_type.as_str()),
                    quote(edge.edge_type.color()),
                );
            }
        }

        out.push_str("}\n");
        out
    }
}
