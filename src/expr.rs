//! Symbolic index expressions and their sound interval bounds.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::interval::{floor_div, floor_mod, Interval};

/// An opaque name: a loop variable, an indirect variable, or an index name.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(name)
    }
}

/// Integer index expression over symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexExpr {
    /// Symbol reference
    Sym(Symbol),
    /// Constant value
    Const(i64),
    /// Addition: e1 + e2
    Add(Box<IndexExpr>, Box<IndexExpr>),
    /// Subtraction: e1 - e2
    Sub(Box<IndexExpr>, Box<IndexExpr>),
    /// Multiplication: e1 * e2
    Mul(Box<IndexExpr>, Box<IndexExpr>),
    /// Negation: -e
    Neg(Box<IndexExpr>),
    /// Floor division: e1 // e2
    FloorDiv(Box<IndexExpr>, Box<IndexExpr>),
    /// Floor modulo: e1 % e2
    Mod(Box<IndexExpr>, Box<IndexExpr>),
    /// `(base // divisor) % modulus`
    ModularIndexing {
        base: Box<IndexExpr>,
        divisor: Box<IndexExpr>,
        modulus: Box<IndexExpr>,
    },
    /// Minimum: min(e1, e2)
    Min(Box<IndexExpr>, Box<IndexExpr>),
    /// Maximum: max(e1, e2)
    Max(Box<IndexExpr>, Box<IndexExpr>),
}

impl IndexExpr {
    pub fn sym(symbol: impl Into<Symbol>) -> Self {
        IndexExpr::Sym(symbol.into())
    }

    pub fn constant(value: i64) -> Self {
        IndexExpr::Const(value)
    }

    pub fn add(self, other: Self) -> Self {
        IndexExpr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Self) -> Self {
        IndexExpr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Self) -> Self {
        IndexExpr::Mul(Box::new(self), Box::new(other))
    }

    pub fn neg(self) -> Self {
        IndexExpr::Neg(Box::new(self))
    }

    pub fn floordiv(self, other: Self) -> Self {
        IndexExpr::FloorDiv(Box::new(self), Box::new(other))
    }

    pub fn modulo(self, other: Self) -> Self {
        IndexExpr::Mod(Box::new(self), Box::new(other))
    }

    pub fn modular_indexing(self, divisor: Self, modulus: Self) -> Self {
        IndexExpr::ModularIndexing {
            base: Box::new(self),
            divisor: Box::new(divisor),
            modulus: Box::new(modulus),
        }
    }

    pub fn min(self, other: Self) -> Self {
        IndexExpr::Min(Box::new(self), Box::new(other))
    }

    pub fn max(self, other: Self) -> Self {
        IndexExpr::Max(Box::new(self), Box::new(other))
    }

    /// Symbols occurring in the expression.
    pub fn free_symbols(&self) -> BTreeSet<&Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    /// Whether the expression mentions no symbols at all.
    pub fn is_concrete(&self) -> bool {
        self.free_symbols().is_empty()
    }

    fn collect_symbols<'a>(&'a self, out: &mut BTreeSet<&'a Symbol>) {
        match self {
            IndexExpr::Sym(s) => {
                out.insert(s);
            }
            IndexExpr::Const(_) => {}
            IndexExpr::Neg(e) => e.collect_symbols(out),
            IndexExpr::Add(a, b)
            | IndexExpr::Sub(a, b)
            | IndexExpr::Mul(a, b)
            | IndexExpr::FloorDiv(a, b)
            | IndexExpr::Mod(a, b)
            | IndexExpr::Min(a, b)
            | IndexExpr::Max(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            IndexExpr::ModularIndexing { base, divisor, modulus } => {
                base.collect_symbols(out);
                divisor.collect_symbols(out);
                modulus.collect_symbols(out);
            }
        }
    }

    /// Concrete value under a full assignment of the free symbols.
    ///
    /// Returns `None` if a symbol is unassigned or a division by zero occurs.
    pub fn evaluate(&self, values: &HashMap<Symbol, BigInt>) -> Option<BigInt> {
        let v = match self {
            IndexExpr::Sym(s) => values.get(s)?.clone(),
            IndexExpr::Const(c) => BigInt::from(*c),
            IndexExpr::Add(a, b) => a.evaluate(values)? + b.evaluate(values)?,
            IndexExpr::Sub(a, b) => a.evaluate(values)? - b.evaluate(values)?,
            IndexExpr::Mul(a, b) => a.evaluate(values)? * b.evaluate(values)?,
            IndexExpr::Neg(e) => -e.evaluate(values)?,
            IndexExpr::FloorDiv(a, b) => {
                let d = nonzero(b.evaluate(values)?)?;
                floor_div(&a.evaluate(values)?, &d)
            }
            IndexExpr::Mod(a, b) => {
                let d = nonzero(b.evaluate(values)?)?;
                floor_mod(&a.evaluate(values)?, &d)
            }
            IndexExpr::ModularIndexing { base, divisor, modulus } => {
                let d = nonzero(divisor.evaluate(values)?)?;
                let m = nonzero(modulus.evaluate(values)?)?;
                floor_mod(&floor_div(&base.evaluate(values)?, &d), &m)
            }
            IndexExpr::Min(a, b) => a.evaluate(values)?.min(b.evaluate(values)?),
            IndexExpr::Max(a, b) => a.evaluate(values)?.max(b.evaluate(values)?),
        };
        Some(v)
    }
}

fn nonzero(value: BigInt) -> Option<BigInt> {
    if value.is_zero() {
        None
    } else {
        Some(value)
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexExpr::Sym(s) => write!(f, "{}", s),
            IndexExpr::Const(c) => write!(f, "{}", c),
            IndexExpr::Add(a, b) => write!(f, "({} + {})", a, b),
            IndexExpr::Sub(a, b) => write!(f, "({} - {})", a, b),
            IndexExpr::Mul(a, b) => write!(f, "({} * {})", a, b),
            IndexExpr::Neg(e) => write!(f, "-{}", e),
            IndexExpr::FloorDiv(a, b) => write!(f, "({} // {})", a, b),
            IndexExpr::Mod(a, b) => write!(f, "({} % {})", a, b),
            IndexExpr::ModularIndexing { base, divisor, modulus } => {
                write!(f, "ModularIndexing({}, {}, {})", base, divisor, modulus)
            }
            IndexExpr::Min(a, b) => write!(f, "min({}, {})", a, b),
            IndexExpr::Max(a, b) => write!(f, "max({}, {})", a, b),
        }
    }
}

/// Sound interval of `expr` given intervals for its symbols.
///
/// A symbol missing from `env` is treated as unknown. Each operator is bounded
/// independently, so repeated symbols (e.g. `x - x`) over-approximate.
pub fn bound_expr(expr: &IndexExpr, env: &HashMap<Symbol, Interval>) -> Interval {
    match expr {
        IndexExpr::Sym(s) => env.get(s).cloned().unwrap_or_else(Interval::unknown),
        IndexExpr::Const(c) => Interval::constant(*c),
        IndexExpr::Add(a, b) => bound_expr(a, env).add(&bound_expr(b, env)),
        IndexExpr::Sub(a, b) => bound_expr(a, env).sub(&bound_expr(b, env)),
        IndexExpr::Mul(a, b) => bound_expr(a, env).mul(&bound_expr(b, env)),
        IndexExpr::Neg(e) => bound_expr(e, env).neg(),
        IndexExpr::FloorDiv(a, b) => bound_expr(a, env).floordiv(&bound_expr(b, env)),
        IndexExpr::Mod(a, b) => bound_expr(a, env).modulo(&bound_expr(b, env)),
        IndexExpr::ModularIndexing { base, divisor, modulus } => bound_expr(base, env)
            .floordiv(&bound_expr(divisor, env))
            .modulo(&bound_expr(modulus, env)),
        IndexExpr::Min(a, b) => bound_expr(a, env).minimum(&bound_expr(b, env)),
        IndexExpr::Max(a, b) => bound_expr(a, env).maximum(&bound_expr(b, env)),
    }
}
