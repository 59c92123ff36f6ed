//! Generic abstract interpreter over IR graphs.
//!
//! [`Interpreter::run`] walks a [`Graph`] in program order. Each node's operands
//! are resolved from the environment; the node is then dispatched either to a
//! registered submodule (by [`Target`]) or to the [`OpsHandler`] (by operation
//! name), and the resulting interval is recorded back into the environment.
//!
//! The environment is borrowed mutably, so a submodule that interprets a nested
//! graph with the same environment writes its nodes' intervals into the same map.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::trace;

use crate::error::BoundsError;
use crate::interval::Interval;
use crate::ir::{Graph, Node, NodeId, Operand, Target};

/// Interval of every interpreted node.
pub type BoundsMap = BTreeMap<NodeId, Interval>;

/// A resolved operand.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    Range(Interval),
    Name(String),
    Int(i64),
}

impl Value {
    pub fn as_range(&self) -> Option<&Interval> {
        match self {
            Value::Range(interval) => Some(interval),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Range(interval) => write!(f, "{}", interval),
            Value::Name(name) => write!(f, "name {:?}", name),
            Value::Int(value) => write!(f, "int {}", value),
        }
    }
}

/// Abstract semantics of named operations.
pub trait OpsHandler {
    fn call(&self, op: &str, args: &[Value]) -> Result<Interval, BoundsError>;
}

/// A submodule callable.
///
/// It receives the interpreter that dispatched it (and thus the finished
/// submodule table), the analysis state, the shared environment and the
/// resolved operands.
pub type SubmoduleFn<'a, S> =
    Box<dyn Fn(&Interpreter<'_, '_, S>, &mut S, &mut BoundsMap, &[Value]) -> Result<Interval, BoundsError> + 'a>;

/// Dispatch table from submodule targets to their callables.
pub struct Submodules<'a, S> {
    table: HashMap<Target, SubmoduleFn<'a, S>>,
}

impl<'a, S> Submodules<'a, S> {
    pub fn new() -> Self {
        Self { table: HashMap::new() }
    }

    pub fn insert<F>(&mut self, target: Target, f: F)
    where
        F: Fn(&Interpreter<'_, '_, S>, &mut S, &mut BoundsMap, &[Value]) -> Result<Interval, BoundsError> + 'a,
    {
        self.table.insert(target, Box::new(f));
    }

    pub fn get(&self, target: &Target) -> Option<&SubmoduleFn<'a, S>> {
        self.table.get(target)
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.table.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<S> Default for Submodules<'_, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Submodules<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.table.keys().map(|t| t.to_string()).collect();
        keys.sort();
        f.debug_struct("Submodules").field("targets", &keys).finish()
    }
}

/// Executes graphs against an operation handler and a finished submodule table.
pub struct Interpreter<'i, 'a, S> {
    ops: &'i dyn OpsHandler,
    submodules: &'i Submodules<'a, S>,
}

impl<'i, 'a, S> Interpreter<'i, 'a, S> {
    pub fn new(ops: &'i dyn OpsHandler, submodules: &'i Submodules<'a, S>) -> Self {
        Self { ops, submodules }
    }

    pub fn submodules(&self) -> &Submodules<'a, S> {
        self.submodules
    }

    /// Interprets `graph`, recording each node's interval in `env`.
    ///
    /// Nodes already present in `env` are not evaluated; their recorded
    /// interval is used as is.
    pub fn run(&self, graph: &Graph, state: &mut S, env: &mut BoundsMap) -> Result<(), BoundsError> {
        for node in graph.nodes() {
            if env.contains_key(&node.id) {
                trace!("{} is pre-seeded, skipping", node.id);
                continue;
            }
            let args = node
                .args
                .iter()
                .map(|arg| resolve(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            let value = self.eval(node, &args, state, env)?;
            trace!("{} -> {}", node, value);
            env.insert(node.id, value);
        }
        Ok(())
    }

    fn eval(&self, node: &Node, args: &[Value], state: &mut S, env: &mut BoundsMap) -> Result<Interval, BoundsError> {
        if let Some(submodule) = self.submodules.get(&node.target) {
            return submodule(self, state, env, args);
        }
        match &node.target {
            Target::Output => Ok(args
                .first()
                .and_then(Value::as_range)
                .cloned()
                .unwrap_or_else(Interval::unknown)),
            Target::Op(name) => self.ops.call(name, args),
            Target::Load => self.ops.call("load", args),
            Target::Reduction => self.ops.call("reduction", args),
            other => Err(BoundsError::UnregisteredSubmodule(other.to_string())),
        }
    }
}

fn resolve(arg: &Operand, env: &BoundsMap) -> Result<Value, BoundsError> {
    match arg {
        Operand::Node(id) => env
            .get(id)
            .cloned()
            .map(Value::Range)
            .ok_or(BoundsError::UndefinedNode(*id)),
        Operand::Name(name) => Ok(Value::Name(name.clone())),
        Operand::Int(value) => Ok(Value::Int(*value)),
    }
}
