// SysY Compiler
//! File emission

use std::fs::File;
use std::io::prelude::*;

use anyhow::{Context, Result};

use crate::ast::CompUnit;
use crate::ir::Module;
use crate::riscv;

/// Writes the indented AST tree for --dump-ast.
pub fn emit_ast(path: &str, unit: &CompUnit) -> Result<()> {
  let mut file = File::create(path).with_context(|| format!("cannot open {}", path))?;
  file.write_all(unit.dump().as_bytes())?;
  file.flush()?;
  Ok(())
}

/// Writes the textual IR for --dump-ir.
pub fn emit_ir(path: &str, module: &Module) -> Result<()> {
  let mut file = File::create(path).with_context(|| format!("cannot open {}", path))?;
  write!(file, "{}", module)?;
  file.flush()?;
  Ok(())
}

/// Writes the RISC-V assembly output.
pub fn emit_asm(path: &str, module: &Module) -> Result<()> {
  let asm = riscv::emit_assembly(module);
  let mut file = File::create(path).with_context(|| format!("cannot open {}", path))?;
  file.write_all(asm.as_bytes())?;
  file.flush()?;
  Ok(())
}
