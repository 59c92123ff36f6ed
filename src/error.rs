use thiserror::Error;

use crate::interval::Interval;
use crate::ir::NodeId;

/// Internal-consistency failures of the analysis.
///
/// Every variant means the loop body is malformed or the pass itself is
/// inconsistent; none is recoverable, and the analysis of the current loop
/// body is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundsError {
    #[error("masked subblock {index} has {found} output nodes, expected exactly one")]
    MalformedSubblock { index: usize, found: usize },

    #[error("{target} expects an interval operand, got {found}")]
    NotAnInterval { target: String, found: String },

    #[error("index `{name}` re-resolved to {current}, previously recorded as {previous}")]
    ReresolutionMismatch {
        name: String,
        previous: Interval,
        current: Interval,
    },

    #[error("bounds {left} and {right} of `{name}` are disjoint")]
    DisjointBounds {
        name: String,
        left: Interval,
        right: Interval,
    },

    #[error("unknown index name `{0}`")]
    UnknownIndex(String),

    #[error("node {0} is used before it is computed")]
    UndefinedNode(NodeId),

    #[error("no submodule registered for `{0}`")]
    UnregisteredSubmodule(String),

    #[error("operation `{op}` got an invalid operand at position {position}")]
    InvalidOperand { op: String, position: usize },

    #[error("masked subblocks nested deeper than {0} levels")]
    NestingTooDeep(usize),
}
