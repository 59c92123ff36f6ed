//! Value-range analysis of a single loop body.
//!
//! [`BoundVars`] abstractly interprets a [`LoopBody`] with intervals and exposes
//! the interval of every node through [`BoundVars::get_bounds`].
//!
//! # Pessimism
//!
//! Loads and reductions produce values the analysis cannot see through. Every
//! node that (transitively) depends on a load, a reduction or a masked
//! subblock is pre-seeded as unknown and never evaluated. The exceptions are
//! masked-subblock and `set_indirect` nodes themselves: they still run, because
//! evaluating them is what recurses into the subblock and binds indirect
//! variables.
//!
//! # Submodules
//!
//! Three node kinds are dispatched to the engine rather than to the operation
//! handler:
//!
//! - `get_index` resolves a named index expression against the current
//!   variable bounds and records the result under the index name;
//! - `masked_subblock{i}` interprets the `i`-th subblock with the same
//!   environment and returns the interval of its output node;
//! - `set_indirect{i}` binds the `i`-th indirect variable to its operand's
//!   interval, so later `get_index` calls see it.
//!
//! The dispatch table is complete before interpretation starts, and every
//! subblock handler reaches the table through the interpreter that calls it.
//!
//! # Re-resolution
//!
//! When an index name is resolved again, the new bound is checked against the
//! recorded one ([`ReresolutionCheck`]) and then tightened with it, so the
//! recorded bound never gets looser.
//!
//! Nesting of masked subblocks is expected to be shallow (one to three levels);
//! [`BoundsConfig::max_subblock_depth`] caps it.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::dominance::dominated_nodes;
use crate::error::BoundsError;
use crate::expr::{bound_expr, Symbol};
use crate::interp::{BoundsMap, Interpreter, Submodules, Value};
use crate::interval::{Bound, Interval};
use crate::ir::{Graph, LoopBody, NodeId, Target};
use crate::ops::ValueRangeAnalysis;

/// How a repeated resolution of the same index name is validated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ReresolutionCheck {
    /// The new bound must be contained in the recorded one.
    #[default]
    Subset,
    /// The new bound must equal the recorded one.
    Equal,
}

/// Tunables of the analysis.
#[derive(Debug, Clone)]
pub struct BoundsConfig {
    pub reresolution: ReresolutionCheck,
    pub max_subblock_depth: usize,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            reresolution: ReresolutionCheck::Subset,
            max_subblock_depth: 16,
        }
    }
}

impl BoundsConfig {
    pub fn with_reresolution(mut self, check: ReresolutionCheck) -> Self {
        self.reresolution = check;
        self
    }

    pub fn with_max_subblock_depth(mut self, depth: usize) -> Self {
        self.max_subblock_depth = depth;
        self
    }
}

/// Counters describing the work done by an engine.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BoundsStats {
    /// `get_index` resolutions.
    pub resolutions: usize,
    /// Masked-subblock evaluations.
    pub subblock_runs: usize,
    /// `set_indirect` bindings.
    pub indirect_bindings: usize,
    /// `get_bounds` calls answered from the cache.
    pub cache_hits: usize,
}

/// Mutable analysis state threaded through the interpreter.
#[derive(Debug)]
pub struct AnalysisContext {
    replacement_vals: HashMap<Symbol, Interval>,
    config: BoundsConfig,
    depth: usize,
    stats: BoundsStats,
}

impl AnalysisContext {
    fn new(replacement_vals: HashMap<Symbol, Interval>, config: BoundsConfig) -> Self {
        Self {
            replacement_vals,
            config,
            depth: 0,
            stats: BoundsStats::default(),
        }
    }

    /// Resolves the index expression `name` against the current variable bounds.
    fn get_index(&mut self, loop_body: &LoopBody, name: &str) -> Result<Interval, BoundsError> {
        let expr = loop_body
            .indexing_expr(name)
            .ok_or_else(|| BoundsError::UnknownIndex(name.to_string()))?;
        let key = Symbol::new(name);
        let mut bound = bound_expr(expr, &self.replacement_vals);
        self.stats.resolutions += 1;

        if let Some(prev) = self.replacement_vals.get(&key) {
            let consistent = match self.config.reresolution {
                ReresolutionCheck::Subset => bound.is_subset_of(prev),
                ReresolutionCheck::Equal => &bound == prev,
            };
            if !consistent {
                return Err(BoundsError::ReresolutionMismatch {
                    name: name.to_string(),
                    previous: prev.clone(),
                    current: bound,
                });
            }
            bound = match bound.tighten(prev) {
                Some(tightened) => tightened,
                None => {
                    return Err(BoundsError::DisjointBounds {
                        name: name.to_string(),
                        left: bound,
                        right: prev.clone(),
                    })
                }
            };
        }

        debug!("get_index({}) = {} -> {}", name, expr, bound);
        self.replacement_vals.insert(key, bound.clone());
        Ok(bound)
    }

    /// Binds an indirect variable to a freshly computed interval.
    fn set_indirect(&mut self, var: &Symbol, args: &[Value]) -> Result<Interval, BoundsError> {
        let new = match args.first() {
            Some(Value::Range(interval)) => interval.clone(),
            other => {
                return Err(BoundsError::NotAnInterval {
                    target: format!("set_indirect({})", var),
                    found: other.map_or_else(|| "nothing".to_string(), |v| v.to_string()),
                })
            }
        };
        debug!("set_indirect({}) = {}", var, new);
        self.stats.indirect_bindings += 1;
        self.replacement_vals.insert(var.clone(), new.clone());
        Ok(new)
    }

    /// Interprets a masked subblock in the shared environment and returns the
    /// interval of its output node.
    ///
    /// The subblock's default value is not joined in: whenever the guarded
    /// region reads memory, its output is already unknown.
    fn masked_subblock(
        &mut self,
        index: usize,
        subblock: &Graph,
        interp: &Interpreter<'_, '_, AnalysisContext>,
        env: &mut BoundsMap,
    ) -> Result<Interval, BoundsError> {
        if self.depth >= self.config.max_subblock_depth {
            return Err(BoundsError::NestingTooDeep(self.config.max_subblock_depth));
        }
        debug!("entering masked_subblock{} (depth {})", index, self.depth + 1);
        self.depth += 1;
        let result = interp.run(subblock, self, env);
        self.depth -= 1;
        result?;
        self.stats.subblock_runs += 1;

        let outputs: Vec<NodeId> = subblock.outputs().map(|n| n.id).collect();
        let &[output] = outputs.as_slice() else {
            return Err(BoundsError::MalformedSubblock {
                index,
                found: outputs.len(),
            });
        };
        let bound = env.get(&output).cloned().ok_or(BoundsError::UndefinedNode(output))?;
        debug!("masked_subblock{} = {}", index, bound);
        Ok(bound)
    }
}

/// Seeds the bound of every loop variable from its declared upper bound.
///
/// A variable with a concrete upper bound `U` lies in `[0, U]`; a symbolic
/// upper bound gives `[0, +∞)`.
fn initial_replacement_vals(loop_body: &LoopBody) -> HashMap<Symbol, Interval> {
    loop_body
        .var_ranges()
        .iter()
        .map(|(var, upper)| {
            let range = if upper.is_concrete() {
                let high = bound_expr(upper, &HashMap::new()).high().clone();
                Interval::new(Bound::zero(), high.max(Bound::zero()))
            } else {
                Interval::nonnegative()
            };
            (var.clone(), range)
        })
        .collect()
}

/// Value-range analysis of one loop body.
///
/// # Examples
///
/// ```
/// use vra_rs::bounds::BoundVars;
/// use vra_rs::expr::IndexExpr;
/// use vra_rs::interval::Interval;
/// use vra_rs::ir::{Block, LoopBodyBuilder};
///
/// let mut b = LoopBodyBuilder::new();
/// b.var_range("i0", IndexExpr::constant(128));
/// b.indexing_expr("index0", IndexExpr::sym("i0").add(IndexExpr::constant(5)));
/// let idx = b.get_index(Block::Root, "index0");
/// let body = b.build();
///
/// let mut vars = BoundVars::new(&body);
/// let bounds = vars.get_bounds().unwrap();
/// assert_eq!(bounds[&idx], Interval::range(5, 133));
/// ```
#[derive(Debug)]
pub struct BoundVars<'a> {
    loop_body: &'a LoopBody,
    ctx: AnalysisContext,
    unbounded_vars: HashSet<NodeId>,
    bounds: Option<Result<BoundsMap, BoundsError>>,
}

impl<'a> BoundVars<'a> {
    pub fn new(loop_body: &'a LoopBody) -> Self {
        Self::with_config(loop_body, BoundsConfig::default())
    }

    pub fn with_config(loop_body: &'a LoopBody, config: BoundsConfig) -> Self {
        let replacement_vals = initial_replacement_vals(loop_body);
        let seeds = loop_body
            .nodes()
            .filter(|n| n.target.is_unbounded_seed())
            .map(|n| n.id);
        let unbounded_vars = dominated_nodes(&loop_body.users(), seeds);
        Self {
            loop_body,
            ctx: AnalysisContext::new(replacement_vals, config),
            unbounded_vars,
            bounds: None,
        }
    }

    pub fn loop_body(&self) -> &'a LoopBody {
        self.loop_body
    }

    /// Current bounds of loop variables, indirect variables and index names.
    pub fn replacement_vals(&self) -> &HashMap<Symbol, Interval> {
        &self.ctx.replacement_vals
    }

    /// Nodes assumed unbounded: loads, reductions, masked subblocks and everything computed from them.
    pub fn unbounded_vars(&self) -> &HashSet<NodeId> {
        &self.unbounded_vars
    }

    pub fn stats(&self) -> BoundsStats {
        self.ctx.stats
    }

    /// Interval of every node in the loop body, including nodes of the
    /// masked subblocks that were evaluated.
    ///
    /// Computed on the first call; later calls return the cached result.
    pub fn get_bounds(&mut self) -> Result<&BoundsMap, BoundsError> {
        let cached = match self.bounds.take() {
            Some(cached) => {
                self.ctx.stats.cache_hits += 1;
                cached
            }
            None => self.compute(),
        };
        self.bounds.insert(cached).as_ref().map_err(Clone::clone)
    }

    fn compute(&mut self) -> Result<BoundsMap, BoundsError> {
        let submodules = self.swap_submodules();

        let mut env = BoundsMap::new();
        for node in self.loop_body.nodes() {
            if self.unbounded_vars.contains(&node.id) && !node.target.is_recomputed() {
                env.insert(node.id, Interval::unknown());
            }
        }
        debug!(
            "seeded {} of {} nodes as unbounded",
            env.len(),
            self.loop_body.nodes().count()
        );

        let ops = ValueRangeAnalysis;
        let interp = Interpreter::new(&ops, &submodules);
        interp.run(self.loop_body.root(), &mut self.ctx, &mut env)?;
        Ok(env)
    }

    /// Builds the submodule dispatch table for this loop body.
    fn swap_submodules(&self) -> Submodules<'a, AnalysisContext> {
        let loop_body = self.loop_body;
        let mut submodules = Submodules::new();

        submodules.insert(Target::GetIndex, move |_, ctx: &mut AnalysisContext, _, args: &[Value]| {
            let name = args.first().and_then(Value::as_name).ok_or_else(|| BoundsError::InvalidOperand {
                op: Target::GetIndex.to_string(),
                position: 0,
            })?;
            ctx.get_index(loop_body, name)
        });

        for (index, subblock) in loop_body.subblocks().iter().enumerate() {
            submodules.insert(
                Target::MaskedSubblock(index),
                move |interp, ctx: &mut AnalysisContext, env, _mask_and_other: &[Value]| {
                    ctx.masked_subblock(index, subblock, interp, env)
                },
            );
        }

        for (index, var) in loop_body.indirect_vars().iter().enumerate() {
            submodules.insert(
                Target::SetIndirect(index),
                move |_, ctx: &mut AnalysisContext, _, args: &[Value]| ctx.set_indirect(var, args),
            );
        }

        submodules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::IndexExpr;
    use crate::ir::{Block, LoopBodyBuilder};

    use test_log::test;

    fn builder_with_i0() -> LoopBodyBuilder {
        let mut b = LoopBodyBuilder::new();
        b.var_range("i0", IndexExpr::constant(128));
        b
    }

    #[test]
    fn test_initial_var_ranges() {
        let mut b = LoopBodyBuilder::new();
        b.var_range("i0", IndexExpr::constant(128));
        b.var_range("i1", IndexExpr::sym("s0").add(IndexExpr::constant(1)));
        b.var_range("i2", IndexExpr::constant(4).mul(IndexExpr::constant(8)));
        let body = b.build();

        let vars = BoundVars::new(&body);
        let vals = vars.replacement_vals();
        assert_eq!(vals[&Symbol::new("i0")], Interval::range(0, 128));
        assert_eq!(vals[&Symbol::new("i1")], Interval::nonnegative());
        assert_eq!(vals[&Symbol::new("i2")], Interval::range(0, 32));
    }

    #[test]
    fn test_get_index_records_under_name() {
        let mut b = builder_with_i0();
        b.indexing_expr("index0", IndexExpr::sym("i0").add(IndexExpr::constant(5)));
        let idx = b.get_index(Block::Root, "index0");
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        assert_eq!(vars.get_bounds().unwrap()[&idx], Interval::range(5, 133));
        assert_eq!(vars.replacement_vals()[&Symbol::new("index0")], Interval::range(5, 133));
    }

    #[test]
    fn test_unknown_index_name() {
        let mut b = builder_with_i0();
        b.get_index(Block::Root, "index9");
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        assert_eq!(
            vars.get_bounds().unwrap_err(),
            BoundsError::UnknownIndex("index9".to_string())
        );
    }

    #[test]
    fn test_set_indirect_binds_variable() {
        let mut b = builder_with_i0();
        let tmp = b.indirect_var("tmp0");
        b.indexing_expr("index0", IndexExpr::sym("i0").floordiv(IndexExpr::constant(4)));
        b.indexing_expr("index1", IndexExpr::sym("tmp0").mul(IndexExpr::constant(2)));
        let v = b.index_value(Block::Root, "index0");
        let set = b.set_indirect(Block::Root, tmp, v);
        let idx = b.get_index(Block::Root, "index1");
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        let bounds = vars.get_bounds().unwrap().clone();
        assert_eq!(bounds[&set], Interval::range(0, 32));
        assert_eq!(bounds[&idx], Interval::range(0, 64));
        assert_eq!(vars.replacement_vals()[&Symbol::new("tmp0")], Interval::range(0, 32));
        assert_eq!(vars.stats().indirect_bindings, 1);
    }

    #[test]
    fn test_set_indirect_rejects_non_interval() {
        let mut b = builder_with_i0();
        let tmp = b.indirect_var("tmp0");
        b.push(Block::Root, Target::SetIndirect(tmp), vec![crate::ir::Operand::name("oops")]);
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        assert!(matches!(
            vars.get_bounds(),
            Err(BoundsError::NotAnInterval { .. })
        ));
    }

    #[test]
    fn test_masked_subblock_needs_single_output() {
        let mut b = builder_with_i0();
        let sub = b.subblock();
        let c = b.constant(Block::Subblock(sub), 1);
        b.output(Block::Subblock(sub), c);
        b.output(Block::Subblock(sub), c);
        let mask = b.constant(Block::Root, 1);
        b.masked_subblock(Block::Root, sub, mask, 0);
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        assert_eq!(
            vars.get_bounds().unwrap_err(),
            BoundsError::MalformedSubblock { index: 0, found: 2 }
        );
    }

    #[test]
    fn test_masked_subblock_without_output() {
        let mut b = builder_with_i0();
        let sub = b.subblock();
        b.constant(Block::Subblock(sub), 1);
        let mask = b.constant(Block::Root, 1);
        b.masked_subblock(Block::Root, sub, mask, 0);
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        assert_eq!(
            vars.get_bounds().unwrap_err(),
            BoundsError::MalformedSubblock { index: 0, found: 0 }
        );
    }

    #[test]
    fn test_nested_subblocks_share_bounds() {
        let mut b = builder_with_i0();
        b.indexing_expr("index0", IndexExpr::sym("i0"));
        let outer = b.subblock();
        let inner = b.subblock();

        let x = b.index_value(Block::Subblock(inner), "index0");
        b.output(Block::Subblock(inner), x);

        let m = b.constant(Block::Subblock(outer), 1);
        let nested = b.masked_subblock(Block::Subblock(outer), inner, m, 0);
        b.output(Block::Subblock(outer), nested);

        let mask = b.constant(Block::Root, 1);
        let top = b.masked_subblock(Block::Root, outer, mask, 0);
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        let bounds = vars.get_bounds().unwrap();
        assert_eq!(bounds[&x], Interval::range(0, 128));
        assert_eq!(bounds[&nested], Interval::range(0, 128));
        // The outer output consumes a masked subblock, so it is pessimised.
        assert!(bounds[&top].is_unknown());
        assert_eq!(vars.stats().subblock_runs, 2);
    }

    #[test]
    fn test_nesting_limit() {
        let mut b = builder_with_i0();
        let outer = b.subblock();
        let inner = b.subblock();
        let c = b.constant(Block::Subblock(inner), 3);
        b.output(Block::Subblock(inner), c);
        let m = b.constant(Block::Subblock(outer), 1);
        let nested = b.masked_subblock(Block::Subblock(outer), inner, m, 0);
        b.output(Block::Subblock(outer), nested);
        let mask = b.constant(Block::Root, 1);
        b.masked_subblock(Block::Root, outer, mask, 0);
        let body = b.build();

        let config = BoundsConfig::default().with_max_subblock_depth(1);
        let mut vars = BoundVars::with_config(&body, config);
        assert_eq!(vars.get_bounds().unwrap_err(), BoundsError::NestingTooDeep(1));
    }

    #[test]
    fn test_errors_are_cached() {
        let mut b = builder_with_i0();
        b.get_index(Block::Root, "missing");
        let body = b.build();

        let mut vars = BoundVars::new(&body);
        let first = vars.get_bounds().unwrap_err();
        let second = vars.get_bounds().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(vars.stats().resolutions, 0);
        assert_eq!(vars.stats().cache_hits, 1);
    }
}
