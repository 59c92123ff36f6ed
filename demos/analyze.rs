//! Runs the value-range analysis on a few representative loop bodies.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example analyze -- gather
//! cargo run --example analyze -- masked --dot masked.dot
//! dot -Tpng masked.dot -o masked.png
//! ```

use clap::{Parser, ValueEnum};

use vra_rs::bounds::{BoundVars, BoundsConfig, ReresolutionCheck};
use vra_rs::expr::IndexExpr;
use vra_rs::ir::{Block, LoopBody, LoopBodyBuilder, Target};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Scenario {
    /// `out[64 * i0 + i1] = in[i1] * 2`
    Strided,
    /// `out[i0] = table[32 * tmp0 + i0]` with `tmp0 = min(i0 // 4, i0 % 32)`
    Gather,
    /// `out[i0] = i0 < 100 ? i0 * 2 : 0`, a masked subblock
    Masked,
    /// A running maximum over a reduction
    Reduction,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Loop body to analyze.
    #[arg(value_enum, default_value = "gather")]
    scenario: Scenario,

    /// Upper bound of the outer loop variable.
    #[arg(long, value_name = "INT", default_value = "127")]
    extent: i64,

    /// Require repeated index resolutions to agree exactly.
    #[arg(long)]
    strict: bool,

    /// Maximum nesting depth of masked subblocks.
    #[arg(long, value_name = "INT", default_value = "16")]
    max_depth: usize,

    /// Write the annotated graph in DOT format to this file.
    #[arg(long, value_name = "FILE")]
    dot: Option<std::path::PathBuf>,

    /// Log every resolution and subblock evaluation.
    #[arg(short, long)]
    verbose: bool,
}

fn strided(extent: i64) -> LoopBody {
    let mut b = LoopBodyBuilder::new();
    b.var_range("i0", IndexExpr::constant(extent));
    b.var_range("i1", IndexExpr::constant(63));
    b.indexing_expr("index0", IndexExpr::sym("i1"));
    b.indexing_expr(
        "index1",
        IndexExpr::constant(64).mul(IndexExpr::sym("i0")).add(IndexExpr::sym("i1")),
    );
    let load_idx = b.get_index(Block::Root, "index0");
    let x = b.load(Block::Root, "in", load_idx);
    let two = b.constant(Block::Root, 2);
    let y = b.op(Block::Root, "mul", &[x, two]);
    let store_idx = b.index_value(Block::Root, "index1");
    b.push(Block::Root, Target::op("store"), vec![store_idx.into(), y.into()]);
    b.output(Block::Root, y);
    b.build()
}

fn gather(extent: i64) -> LoopBody {
    let mut b = LoopBodyBuilder::new();
    b.var_range("i0", IndexExpr::constant(extent));
    b.indexing_expr("index0", IndexExpr::sym("i0").floordiv(IndexExpr::constant(4)));
    b.indexing_expr("index1", IndexExpr::sym("i0").modulo(IndexExpr::constant(32)));
    b.indexing_expr("index2", IndexExpr::sym("tmp0").mul(IndexExpr::constant(32)).add(IndexExpr::sym("i0")));
    let tmp = b.indirect_var("tmp0");

    // The indirect index is computed arithmetically here, so it stays bounded.
    let v = b.index_value(Block::Root, "index0");
    let wrapped = b.index_value(Block::Root, "index1");
    let slot = b.op(Block::Root, "minimum", &[v, wrapped]);
    b.set_indirect(Block::Root, tmp, slot);
    let idx = b.get_index(Block::Root, "index2");
    let x = b.load(Block::Root, "table", idx);
    b.output(Block::Root, x);
    b.build()
}

fn masked(extent: i64) -> LoopBody {
    let mut b = LoopBodyBuilder::new();
    b.var_range("i0", IndexExpr::constant(extent));
    b.indexing_expr("index0", IndexExpr::sym("i0"));

    let sub = b.subblock();
    let v = b.index_value(Block::Subblock(sub), "index0");
    let two = b.constant(Block::Subblock(sub), 2);
    let doubled = b.op(Block::Subblock(sub), "mul", &[v, two]);
    b.output(Block::Subblock(sub), doubled);

    let i = b.index_value(Block::Root, "index0");
    let limit = b.constant(Block::Root, 100);
    let mask = b.op(Block::Root, "lt", &[i, limit]);
    let m = b.masked_subblock(Block::Root, sub, mask, 0);
    b.output(Block::Root, m);
    b.build()
}

fn reduction(extent: i64) -> LoopBody {
    let mut b = LoopBodyBuilder::new();
    b.var_range("i0", IndexExpr::constant(extent));
    b.indexing_expr("index0", IndexExpr::sym("i0"));
    let idx = b.get_index(Block::Root, "index0");
    let x = b.load(Block::Root, "in", idx);
    let r = b.reduction(Block::Root, x);
    let i = b.index_value(Block::Root, "index0");
    let y = b.op(Block::Root, "maximum", &[r, i]);
    b.output(Block::Root, y);
    b.build()
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);

    let body = match args.scenario {
        Scenario::Strided => strided(args.extent),
        Scenario::Gather => gather(args.extent),
        Scenario::Masked => masked(args.extent),
        Scenario::Reduction => reduction(args.extent),
    };

    let config = BoundsConfig::default()
        .with_reresolution(if args.strict {
            ReresolutionCheck::Equal
        } else {
            ReresolutionCheck::Subset
        })
        .with_max_subblock_depth(args.max_depth);

    let time_total = std::time::Instant::now();
    let mut vars = BoundVars::with_config(&body, config);
    let bounds = vars.get_bounds()?.clone();
    let time = time_total.elapsed();

    for node in body.nodes() {
        match bounds.get(&node.id) {
            Some(interval) => println!("{:<40} {}", node.to_string(), interval),
            None => println!("{:<40} -", node.to_string()),
        }
    }
    println!();
    println!("unbounded nodes: {}", vars.unbounded_vars().len());
    println!("stats = {:?}", vars.stats());

    if let Some(path) = &args.dot {
        std::fs::write(path, body.to_dot(Some(&bounds))?)?;
        println!("wrote {}", path.display());
    }

    println!("\nAll done in {:.3} s", time.as_secs_f64());
    Ok(())
}
