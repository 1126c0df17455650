// SysY Compiler
//! Command line argument parsing.
//! Hand-rolled on purpose; clap would be overkill for this flag set.

use std::env;

use serde::Deserialize;

/// Configuration options for this compiler run.
pub struct Config {
  pub input: Option<String>,
  pub output: Option<String>,
  pub dump_ast: bool,
  pub dump_ir: bool,
  pub verbose: bool,
  pub help: bool,
  pub opt_level: u32,
}

impl Config {
  fn default() -> Self {
    Config {
      input: None,     // Source file to compile.
      output: None,    // Output assembly path (default: <base>.s).
      dump_ast: false, // Write the AST tree to <base>.ast.
      dump_ir: false,  // Write the textual IR to <base>.ll.
      verbose: false,  // Get extra output from the compiler.
      help: false,     // Print usage and exit.
      opt_level: 0,    // -O level; recorded, folding runs regardless.
    }
  }

  /// Base name of the input without its extension.
  pub fn base_name(&self) -> String {
    let input = self.input.as_deref().unwrap_or("out");
    match input.rfind('.') {
      Some(dot) if dot > 0 => input[..dot].to_string(),
      _ => input.to_string(),
    }
  }

  pub fn asm_path(&self) -> String {
    self
      .output
      .clone()
      .unwrap_or_else(|| format!("{}.s", self.base_name()))
  }

  pub fn ast_path(&self) -> String {
    format!("{}.ast", self.base_name())
  }

  pub fn ir_path(&self) -> String {
    format!("{}.ll", self.base_name())
  }
}

/// Toggles for the AST-level optimization passes, optionally read from
/// optim_opt.toml next to the manifest. Loop optimization is a declared
/// extension point with no pass behind it yet.
#[derive(Deserialize)]
pub struct OptimizationConfig {
  pub constant_folding: bool,
  pub max_fold_passes: u32,
}

impl OptimizationConfig {
  fn defaults() -> Self {
    OptimizationConfig {
      constant_folding: true,
      max_fold_passes: crate::ast::fold::DEFAULT_MAX_PASSES,
    }
  }

  pub fn from_config() -> Self {
    let path = format!("{}/optim_opt.toml", env!("CARGO_MANIFEST_DIR"));
    match std::fs::read_to_string(path) {
      Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
        eprintln!("warning: ignoring malformed optim_opt.toml: {}", e);
        OptimizationConfig::defaults()
      }),
      Err(_) => OptimizationConfig::defaults(),
    }
  }
}

pub fn print_usage(prog: &str) {
  println!("SysY Compiler - RISC-V 64 Code Generator\n");
  println!("Usage: {} <input.sy> [options]\n", prog);
  println!("Options:");
  println!("  -o <file>        Specify output assembly file (default: <input>.s)");
  println!("  --dump-ast       Output abstract syntax tree to <input>.ast");
  println!("  --dump-ir        Output IR to <input>.ll");
  println!("  -O <level>       Optimization level (0-3, default: O0)");
  println!("  -v, --verbose    Enable verbose output");
  println!("  -h, --help       Display this help message");
}

/// Parses command line input into a configuration. Returns None when the
/// arguments are unusable (the caller prints usage and fails).
pub fn parse_args() -> Option<Config> {
  parse_arg_list(env::args().skip(1))
}

fn parse_arg_list(args: impl Iterator<Item = String>) -> Option<Config> {
  let args: Vec<String> = args.collect();
  let mut config = Config::default();
  let mut index = 0;
  while index < args.len() {
    match args[index].as_str() {
      "-h" | "--help" => config.help = true,
      "-v" | "--verbose" => config.verbose = true,
      "--dump-ast" => config.dump_ast = true,
      "--dump-ir" => config.dump_ir = true,
      "-o" => {
        if index + 1 < args.len() {
          config.output = Some(args[index + 1].clone());
          index += 1;
        } else {
          eprintln!("error: -o requires an argument");
          return None;
        }
      }
      "-O" => {
        if index + 1 < args.len() {
          config.opt_level = parse_opt_level(&args[index + 1])?;
          index += 1;
        } else {
          eprintln!("error: -O requires an argument");
          return None;
        }
      }
      // Joined form: -O0 .. -O3.
      arg if arg.starts_with("-O") => {
        config.opt_level = parse_opt_level(&arg[2..])?;
      }
      arg if arg.starts_with('-') => {
        eprintln!("error: unknown option: {}", arg);
        return None;
      }
      file => {
        if config.input.is_some() {
          eprintln!("error: multiple input files specified");
          return None;
        }
        config.input = Some(file.to_string());
      }
    }
    index += 1;
  }

  if config.input.is_none() && !config.help {
    eprintln!("error: no input file specified");
    return None;
  }
  Some(config)
}

fn parse_opt_level(text: &str) -> Option<u32> {
  match text.parse::<u32>() {
    Ok(level) if level <= 3 => Some(level),
    _ => {
      eprintln!("error: invalid optimization level: {}", text);
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Option<Config> {
    parse_arg_list(args.iter().map(|s| s.to_string()))
  }

  #[test]
  fn default_output_derives_from_input() {
    let config = parse(&["test.sy"]).unwrap();
    assert_eq!(config.asm_path(), "test.s");
    assert_eq!(config.ast_path(), "test.ast");
    assert_eq!(config.ir_path(), "test.ll");
    assert_eq!(config.opt_level, 0);
  }

  #[test]
  fn both_opt_level_spellings_parse() {
    assert_eq!(parse(&["t.sy", "-O2"]).unwrap().opt_level, 2);
    assert_eq!(parse(&["t.sy", "-O", "3"]).unwrap().opt_level, 3);
    assert!(parse(&["t.sy", "-O9"]).is_none());
  }

  #[test]
  fn explicit_output_wins() {
    let config = parse(&["test.sy", "-o", "out.s"]).unwrap();
    assert_eq!(config.asm_path(), "out.s");
  }

  #[test]
  fn missing_input_is_rejected() {
    assert!(parse(&[]).is_none());
    assert!(parse(&["--dump-ir"]).is_none());
    assert!(parse(&["-h"]).unwrap().help);
  }
}
