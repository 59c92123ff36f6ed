//! # vra-rs: value-range analysis for loop bodies
//!
//! **`vra-rs`** computes, for every node of a loop body's IR graph, a sound interval
//! bounding all values the node can take at runtime, given the bounds of the loop's
//! induction variables. Later compiler stages use these intervals to drop bounds
//! checks, pick narrower integer types, and prove indexing safe.
//!
//! ## How it works
//!
//! The analysis is an abstract interpretation of the loop body with intervals:
//!
//! - Loop variables start at `[0, U]` for a concrete declared upper bound `U`, or `[0, +∞)`.
//! - Index expressions are bounded symbolically against the current variable bounds.
//! - Loads and reductions are opaque, so they and every node computed from them are unknown.
//! - Masked subblocks are interpreted recursively in the same environment.
//! - Indirect index variables become known once the node computing them has been interpreted.
//!
//! The analysis is per loop body; bounds are not propagated between loop bodies.
//!
//! ## Basic Usage
//!
//! ```rust
//! use vra_rs::bounds::BoundVars;
//! use vra_rs::expr::IndexExpr;
//! use vra_rs::interval::Interval;
//! use vra_rs::ir::{Block, LoopBodyBuilder};
//!
//! // for i0 in 0..=128: out[i0] = in[i0] + (i0 + 5)
//! let mut b = LoopBodyBuilder::new();
//! b.var_range("i0", IndexExpr::constant(128));
//! b.indexing_expr("index0", IndexExpr::sym("i0"));
//! b.indexing_expr("index1", IndexExpr::sym("i0").add(IndexExpr::constant(5)));
//!
//! let idx = b.get_index(Block::Root, "index0");
//! let x = b.load(Block::Root, "in", idx);
//! let offset = b.index_value(Block::Root, "index1");
//! let sum = b.op(Block::Root, "add", &[x, offset]);
//! b.output(Block::Root, sum);
//! let body = b.build();
//!
//! let mut vars = BoundVars::new(&body);
//! let bounds = vars.get_bounds().unwrap();
//!
//! assert_eq!(bounds[&idx], Interval::range(0, 128));
//! assert_eq!(bounds[&offset], Interval::range(5, 133));
//! assert!(bounds[&x].is_unknown());
//! assert!(bounds[&sum].is_unknown());
//! ```
//!
//! ## Core Components
//!
//! - **[`bounds`]**: The analysis engine, [`BoundVars`][crate::bounds::BoundVars].
//! - **[`interval`]**: The interval domain.
//! - **[`expr`]**: Symbolic index expressions and their bound evaluator.
//! - **[`ir`]**: The loop-body IR and its builder.
//! - **[`interp`]**: The generic graph interpreter and submodule dispatch.
//! - **[`ops`]**: Interval semantics of the IR's operations.
//! - **[`dominance`]**: Dependency reachability used to spread pessimism.
//! - **[`dot`]**: Graphviz rendering of an analysed loop body.

pub mod bounds;
pub mod dominance;
pub mod dot;
pub mod error;
pub mod expr;
pub mod interp;
pub mod interval;
pub mod ir;
pub mod ops;
