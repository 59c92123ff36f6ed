//! Loop-body IR: a root graph plus nested masked subblocks.
//!
//! Every node in a [`LoopBody`] carries a [`NodeId`] that is unique across the
//! root graph *and* all subblocks, so a single bounds map can hold the
//! intervals of nodes from every nesting level.

use std::collections::HashMap;
use std::fmt;

use crate::expr::{IndexExpr, Symbol};

/// Identifier of an IR node, unique within a loop body.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// What a node computes.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Target {
    /// A named arithmetic, comparison or logical operation.
    Op(String),
    /// Read from a buffer; the value is opaque to the analysis.
    Load,
    /// Aggregation over an unknown number of elements.
    Reduction,
    /// Resolve a named index expression.
    GetIndex,
    /// Bind the `i`-th indirect variable to the operand's value.
    SetIndirect(usize),
    /// Evaluate the `i`-th masked subblock.
    MaskedSubblock(usize),
    /// The value a graph produces.
    Output,
}

impl Target {
    pub fn op(name: impl Into<String>) -> Self {
        Target::Op(name.into())
    }

    /// Targets that never have a statically known value.
    pub fn is_unbounded_seed(&self) -> bool {
        matches!(self, Target::Load | Target::Reduction | Target::MaskedSubblock(_))
    }

    /// Targets whose bound is computed by dedicated logic even when they
    /// depend on an unbounded node.
    pub fn is_recomputed(&self) -> bool {
        matches!(self, Target::MaskedSubblock(_) | Target::SetIndirect(_))
    }

    pub fn is_submodule(&self) -> bool {
        matches!(self, Target::GetIndex | Target::SetIndirect(_) | Target::MaskedSubblock(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Op(name) => f.write_str(name),
            Target::Load => f.write_str("load"),
            Target::Reduction => f.write_str("reduction"),
            Target::GetIndex => f.write_str("get_index"),
            Target::SetIndirect(i) => write!(f, "set_indirect{}", i),
            Target::MaskedSubblock(i) => write!(f, "masked_subblock{}", i),
            Target::Output => f.write_str("output"),
        }
    }
}

/// Node argument.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Operand {
    /// The value computed by another node.
    Node(NodeId),
    /// An index name or a buffer name.
    Name(String),
    /// An integer literal.
    Int(i64),
}

impl Operand {
    pub fn name(name: impl Into<String>) -> Self {
        Operand::Name(name.into())
    }
}

impl From<NodeId> for Operand {
    fn from(id: NodeId) -> Self {
        Operand::Node(id)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Node(id) => write!(f, "{}", id),
            Operand::Name(name) => write!(f, "{:?}", name),
            Operand::Int(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub target: Target,
    pub args: Vec<Operand>,
}

impl Node {
    /// Nodes this node reads from.
    pub fn inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            Operand::Node(id) => Some(*id),
            _ => None,
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}(", self.id, self.target)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// Nodes in program order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.target == Target::Output)
    }
}

/// The body of a loop nest under analysis.
#[derive(Debug, Clone)]
pub struct LoopBody {
    var_ranges: Vec<(Symbol, IndexExpr)>,
    indexing_exprs: HashMap<String, IndexExpr>,
    indirect_vars: Vec<Symbol>,
    root: Graph,
    subblocks: Vec<Graph>,
}

impl LoopBody {
    /// Loop variables with their declared (possibly symbolic) upper bounds.
    pub fn var_ranges(&self) -> &[(Symbol, IndexExpr)] {
        &self.var_ranges
    }

    pub fn indexing_exprs(&self) -> &HashMap<String, IndexExpr> {
        &self.indexing_exprs
    }

    pub fn indexing_expr(&self, name: &str) -> Option<&IndexExpr> {
        self.indexing_exprs.get(name)
    }

    /// Indirect variables; the `i`-th one is bound by `set_indirect{i}`.
    pub fn indirect_vars(&self) -> &[Symbol] {
        &self.indirect_vars
    }

    pub fn root(&self) -> &Graph {
        &self.root
    }

    pub fn subblock(&self, index: usize) -> Option<&Graph> {
        self.subblocks.get(index)
    }

    pub fn subblocks(&self) -> &[Graph] {
        &self.subblocks
    }

    /// All nodes: the root graph first, then each subblock, in program order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.root
            .nodes
            .iter()
            .chain(self.subblocks.iter().flat_map(|g| g.nodes.iter()))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes().find(|n| n.id == id)
    }

    /// For every node, the nodes that consume its value.
    pub fn users(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut users: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in self.nodes() {
            for input in node.inputs() {
                let entry = users.entry(input).or_default();
                if !entry.contains(&node.id) {
                    entry.push(node.id);
                }
            }
        }
        users
    }
}

/// Where [`LoopBodyBuilder`] appends a node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Block {
    Root,
    Subblock(usize),
}

/// Incremental construction of a [`LoopBody`].
///
/// ```
/// use vra_rs::expr::IndexExpr;
/// use vra_rs::ir::{Block, LoopBodyBuilder};
///
/// let mut b = LoopBodyBuilder::new();
/// b.var_range("i0", IndexExpr::constant(128));
/// b.indexing_expr("index0", IndexExpr::sym("i0"));
/// let idx = b.get_index(Block::Root, "index0");
/// let x = b.load(Block::Root, "buf0", idx);
/// b.output(Block::Root, x);
/// let body = b.build();
/// assert_eq!(body.root().len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct LoopBodyBuilder {
    next_id: u32,
    var_ranges: Vec<(Symbol, IndexExpr)>,
    indexing_exprs: HashMap<String, IndexExpr>,
    indirect_vars: Vec<Symbol>,
    root: Graph,
    subblocks: Vec<Graph>,
}

impl LoopBodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var_range(&mut self, var: impl Into<Symbol>, upper: IndexExpr) -> &mut Self {
        self.var_ranges.push((var.into(), upper));
        self
    }

    pub fn indexing_expr(&mut self, name: impl Into<String>, expr: IndexExpr) -> &mut Self {
        self.indexing_exprs.insert(name.into(), expr);
        self
    }

    /// Registers an indirect variable and returns its `set_indirect` index.
    pub fn indirect_var(&mut self, var: impl Into<Symbol>) -> usize {
        self.indirect_vars.push(var.into());
        self.indirect_vars.len() - 1
    }

    /// Opens a new, empty masked subblock and returns its index.
    pub fn subblock(&mut self) -> usize {
        self.subblocks.push(Graph::default());
        self.subblocks.len() - 1
    }

    /// Appends a node to `block`.
    ///
    /// # Panics
    ///
    /// Panics if `block` names a subblock that was not opened with [`subblock`](Self::subblock).
    pub fn push(&mut self, block: Block, target: Target, args: Vec<Operand>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let graph = match block {
            Block::Root => &mut self.root,
            Block::Subblock(i) => {
                assert!(i < self.subblocks.len(), "Subblock {} was not opened", i);
                &mut self.subblocks[i]
            }
        };
        graph.nodes.push(Node { id, target, args });
        id
    }

    pub fn op(&mut self, block: Block, name: &str, args: &[NodeId]) -> NodeId {
        let args = args.iter().copied().map(Operand::Node).collect();
        self.push(block, Target::op(name), args)
    }

    pub fn constant(&mut self, block: Block, value: i64) -> NodeId {
        self.push(block, Target::op("constant"), vec![Operand::Int(value)])
    }

    pub fn get_index(&mut self, block: Block, name: &str) -> NodeId {
        self.push(block, Target::GetIndex, vec![Operand::name(name)])
    }

    /// `index_expr(get_index(name))`: the index value as data.
    pub fn index_value(&mut self, block: Block, name: &str) -> NodeId {
        let index = self.get_index(block, name);
        self.op(block, "index_expr", &[index])
    }

    pub fn load(&mut self, block: Block, buffer: &str, index: NodeId) -> NodeId {
        self.push(block, Target::Load, vec![Operand::name(buffer), Operand::Node(index)])
    }

    pub fn reduction(&mut self, block: Block, value: NodeId) -> NodeId {
        self.push(block, Target::Reduction, vec![Operand::Node(value)])
    }

    pub fn set_indirect(&mut self, block: Block, indirect: usize, value: NodeId) -> NodeId {
        self.push(block, Target::SetIndirect(indirect), vec![Operand::Node(value)])
    }

    pub fn masked_subblock(&mut self, block: Block, subblock: usize, mask: NodeId, other: i64) -> NodeId {
        self.push(
            block,
            Target::MaskedSubblock(subblock),
            vec![Operand::Node(mask), Operand::Int(other)],
        )
    }

    pub fn output(&mut self, block: Block, value: NodeId) -> NodeId {
        self.push(block, Target::Output, vec![Operand::Node(value)])
    }

    pub fn build(self) -> LoopBody {
        LoopBody {
            var_ranges: self.var_ranges,
            indexing_exprs: self.indexing_exprs,
            indirect_vars: self.indirect_vars,
            root: self.root,
            subblocks: self.subblocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_across_blocks() {
        let mut b = LoopBodyBuilder::new();
        let sub = b.subblock();
        let a = b.constant(Block::Root, 1);
        let c = b.constant(Block::Subblock(sub), 2);
        let d = b.output(Block::Subblock(sub), c);
        assert_ne!(a, c);
        assert_ne!(c, d);

        let body = b.build();
        assert_eq!(body.root().len(), 1);
        assert_eq!(body.subblock(sub).map(Graph::len), Some(2));
        assert_eq!(body.nodes().count(), 3);
        assert_eq!(body.subblock(sub).unwrap().outputs().count(), 1);
    }

    #[test]
    #[should_panic(expected = "Subblock 3 was not opened")]
    fn test_push_into_missing_subblock_panics() {
        let mut b = LoopBodyBuilder::new();
        b.constant(Block::Subblock(3), 0);
    }

    #[test]
    fn test_users() {
        let mut b = LoopBodyBuilder::new();
        let x = b.constant(Block::Root, 1);
        let y = b.op(Block::Root, "add", &[x, x]);
        let z = b.op(Block::Root, "mul", &[x, y]);
        let users = b.build().users();
        assert_eq!(users[&x], vec![y, z]);
        assert_eq!(users[&y], vec![z]);
        assert!(!users.contains_key(&z));
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::SetIndirect(2).to_string(), "set_indirect2");
        assert_eq!(Target::MaskedSubblock(0).to_string(), "masked_subblock0");
        assert_eq!(Target::op("add").to_string(), "add");
        assert!(Target::Load.is_unbounded_seed());
        assert!(!Target::SetIndirect(0).is_unbounded_seed());
        assert!(Target::SetIndirect(0).is_recomputed());
        assert!(Target::GetIndex.is_submodule());
    }

    #[test]
    fn test_node_display() {
        let mut b = LoopBodyBuilder::new();
        let idx = b.get_index(Block::Root, "index0");
        let x = b.load(Block::Root, "buf0", idx);
        let body = b.build();
        assert_eq!(body.node(x).unwrap().to_string(), "%1 = load(\"buf0\", %0)");
    }
}
