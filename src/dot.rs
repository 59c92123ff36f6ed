//! Loop body to DOT (Graphviz) conversion.
//!
//! This module renders a [`LoopBody`] as a directed dataflow graph, optionally
//! annotated with the intervals computed by [`BoundVars`][crate::bounds::BoundVars].
//! The output can be visualized using Graphviz tools like `dot` or online viewers.
//!
//! # DOT Format
//!
//! The generated DOT output follows these conventions:
//! - **Root graph nodes** are rendered at the top level
//! - **Masked subblocks** are rendered as clusters named `masked_subblock{i}`
//! - **Edges** point from a value to the node consuming it
//! - **Unknown intervals** are highlighted with a configurable fill colour
//! - **Nodes without a bound** (e.g. inside a subblock that never ran) have no interval line
//!
//! # Examples
//!
//! ```
//! use vra_rs::bounds::BoundVars;
//! use vra_rs::expr::IndexExpr;
//! use vra_rs::ir::{Block, LoopBodyBuilder};
//!
//! let mut b = LoopBodyBuilder::new();
//! b.var_range("i0", IndexExpr::constant(16));
//! b.indexing_expr("index0", IndexExpr::sym("i0"));
//! let idx = b.get_index(Block::Root, "index0");
//! let x = b.load(Block::Root, "buf0", idx);
//! b.output(Block::Root, x);
//! let body = b.build();
//!
//! let mut vars = BoundVars::new(&body);
//! let bounds = vars.get_bounds().unwrap();
//! let dot = body.to_dot(Some(bounds)).unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::fmt::Write as _;

use crate::interp::BoundsMap;
use crate::ir::{Graph, LoopBody};

/// Configuration options for DOT output generation.
///
/// # Examples
///
/// ```
/// use vra_rs::dot::DotConfig;
///
/// let config = DotConfig {
///     node_shape: "ellipse",
///     ..DotConfig::default()
/// };
/// assert!(config.show_bounds);
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for operation nodes (default: "box")
    pub node_shape: &'static str,
    /// Shape for `load` and `reduction` nodes (default: "cylinder")
    pub opaque_shape: &'static str,
    /// Shape for output nodes (default: "doubleoctagon")
    pub output_shape: &'static str,
    /// Fill colour for nodes whose interval is unknown (default: "lightgrey")
    pub unknown_fill: &'static str,
    /// Whether to print intervals under node labels (default: true)
    pub show_bounds: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "box",
            opaque_shape: "cylinder",
            output_shape: "doubleoctagon",
            unknown_fill: "lightgrey",
            show_bounds: true,
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl LoopBody {
    /// Converts the loop body to DOT format with the default configuration.
    pub fn to_dot(&self, bounds: Option<&BoundsMap>) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(bounds, &DotConfig::default())
    }

    /// Converts the loop body to DOT format with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `bounds` - Intervals to annotate nodes with, typically from `BoundVars::get_bounds`
    /// * `config` - Configuration options for DOT generation
    pub fn to_dot_with_config(&self, bounds: Option<&BoundsMap>, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        self.write_nodes(&mut dot, self.root(), bounds, config)?;

        for (i, subblock) in self.subblocks().iter().enumerate() {
            writeln!(dot, "subgraph cluster_{} {{", i)?;
            writeln!(dot, "label=\"masked_subblock{}\";", i)?;
            self.write_nodes(&mut dot, subblock, bounds, config)?;
            writeln!(dot, "}}")?;
        }

        // Dataflow edges
        for node in self.nodes() {
            for input in node.inputs() {
                writeln!(dot, "n{} -> n{};", input.index(), node.id.index())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    fn write_nodes(
        &self,
        dot: &mut String,
        graph: &Graph,
        bounds: Option<&BoundsMap>,
        config: &DotConfig,
    ) -> Result<(), std::fmt::Error> {
        use crate::ir::Target;

        for node in graph.nodes() {
            let mut label = escape(&node.to_string());
            let mut attrs = String::new();

            match node.target {
                Target::Load | Target::Reduction => write!(attrs, ", shape={}", config.opaque_shape)?,
                Target::Output => write!(attrs, ", shape={}", config.output_shape)?,
                _ => {}
            }

            if let Some(interval) = bounds.and_then(|b| b.get(&node.id)) {
                if config.show_bounds {
                    write!(label, "\\n{}", escape(&interval.to_string()))?;
                }
                if interval.is_unknown() {
                    write!(attrs, ", style=filled, fillcolor={}", config.unknown_fill)?;
                }
            }

            writeln!(dot, "n{} [label=\"{}\"{}];", node.id.index(), label, attrs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundVars;
    use crate::expr::IndexExpr;
    use crate::ir::{Block, LoopBodyBuilder};

    fn sample() -> LoopBody {
        let mut b = LoopBodyBuilder::new();
        b.var_range("i0", IndexExpr::constant(8));
        b.indexing_expr("index0", IndexExpr::sym("i0"));
        let sub = b.subblock();
        let v = b.index_value(Block::Subblock(sub), "index0");
        b.output(Block::Subblock(sub), v);
        let idx = b.get_index(Block::Root, "index0");
        let x = b.load(Block::Root, "buf0", idx);
        let m = b.masked_subblock(Block::Root, sub, x, 0);
        b.output(Block::Root, m);
        b.build()
    }

    /// Basic test: verify DOT output is generated without errors
    #[test]
    fn test_to_dot_basic() {
        let body = sample();
        let dot = body.to_dot(None).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("subgraph cluster_0"));
        assert!(dot.contains("n3 -> n4;"));
    }

    /// Test with bounds annotations
    #[test]
    fn test_to_dot_with_bounds() {
        let body = sample();
        let mut vars = BoundVars::new(&body);
        let bounds = vars.get_bounds().unwrap();
        let dot = body.to_dot(Some(bounds)).unwrap();
        assert!(dot.contains("[0, 8]"));
        assert!(dot.contains("fillcolor=lightgrey"));
        assert!(dot.contains("shape=cylinder"));
    }

    /// Test with custom configuration
    #[test]
    fn test_to_dot_with_config() {
        let body = sample();
        let mut vars = BoundVars::new(&body);
        let bounds = vars.get_bounds().unwrap();
        let config = DotConfig {
            show_bounds: false,
            ..DotConfig::default()
        };
        let dot = body.to_dot_with_config(Some(bounds), &config).unwrap();
        assert!(!dot.contains("[0, 8]"));
        assert!(dot.contains("style=filled"));
    }
}
