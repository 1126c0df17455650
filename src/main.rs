// SysY Compiler
//! Top level driver.

mod args;
mod ast;
mod emit;
mod ir;
mod irgen;
mod lex;
mod parse;
mod riscv;

use std::thread;
use std::time;

use anyhow::{Context, Result};

use ast::fold::AstOptimizer;

fn main() {
  let Some(config) = args::parse_args() else {
    args::print_usage("sysyc");
    std::process::exit(1);
  };
  if config.help {
    args::print_usage("sysyc");
    return;
  }

  // A large stack keeps deeply nested source from overflowing the
  // recursive passes.
  let child = thread::Builder::new()
    .stack_size(128 * 1024 * 1024)
    .spawn(move || {
      env_logger::builder()
        .target(env_logger::Target::Stdout)
        .format_timestamp(None)
        .init();

      match compile(&config) {
        Ok(()) => 0,
        Err(e) => {
          eprintln!("error: {}", e);
          1
        }
      }
    })
    .unwrap();
  std::process::exit(child.join().expect("couldn't join compiler thread"));
}

// Helper macro to time evaluating an expression (like a pass.)
macro_rules! time {
  ( $x:expr ) => {{
    let t1 = time::SystemTime::now();
    let result = $x;
    (result, t1.elapsed().unwrap_or_default())
  }};
}

fn compile(config: &args::Config) -> Result<()> {
  let input = config.input.as_deref().expect("input is checked by args");
  let source =
    std::fs::read_to_string(input).with_context(|| format!("cannot open input file {}", input))?;

  let (parsed, parse_time) = time!(parse::parse(&source));
  let mut unit = parsed?;
  log::info!("parsed {} (opt level O{})", input, config.opt_level);

  let optim = args::OptimizationConfig::from_config();
  let optimizer = AstOptimizer::new(optim.constant_folding, optim.max_fold_passes);
  let (passes, fold_time) = time!(optimizer.optimize(&mut unit));
  log::info!("constant folding ran {} passes", passes);

  if config.dump_ast {
    emit::emit_ast(&config.ast_path(), &unit)?;
    println!("AST written to {}", config.ast_path());
  }

  let (module, irgen_time) = time!(irgen::generate(&unit));
  let module = module?;

  if config.dump_ir {
    emit::emit_ir(&config.ir_path(), &module)?;
    println!("IR written to {}", config.ir_path());
  }

  let (emitted, emit_time) = time!(emit::emit_asm(&config.asm_path(), &module));
  emitted?;

  if config.verbose {
    println!("Parse:   {} us", parse_time.as_micros());
    println!("Fold:    {} us", fold_time.as_micros());
    println!("IR gen:  {} us", irgen_time.as_micros());
    println!("Emit:    {} us", emit_time.as_micros());
  }
  println!("Compiled {} -> {}", input, config.asm_path());
  Ok(())
}
