// SysY Compiler
//! Scoped symbol table for IR generation.

// A stack of name -> binding maps. The bottom frame is the global scope and
// lives for the whole generation run; every function body and every nested
// block pushes one frame. Shadowing across frames is allowed, redeclaration
// within one frame is not.

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

use crate::ir::{Operand, Type};

#[derive(Clone, Debug)]
pub struct SymbolInfo {
  /// Address of the storage cell: an alloca temp or a global.
  pub ptr: Operand,
  /// Type of the value stored in the cell. For array parameters this is a
  /// pointer type; the cell holds the decayed pointer.
  pub ty: Type,
  pub is_const: bool,
  pub is_array: bool,
  /// For array parameters: the element type the decayed pointer points to.
  pub elem_ty: Option<Type>,
  /// For array parameters: the pointer loaded from the cell once in the
  /// entry block, reused by every access in the body.
  pub preloaded: Option<Operand>,
  /// For global integer constants: the value, so that array bounds and
  /// vector sizes can be const-evaluated.
  pub const_int: Option<i32>,
}

impl SymbolInfo {
  pub fn scalar(ptr: Operand, ty: Type, is_const: bool) -> Self {
    SymbolInfo {
      ptr,
      ty,
      is_const,
      is_array: false,
      elem_ty: None,
      preloaded: None,
      const_int: None,
    }
  }

  pub fn array(ptr: Operand, ty: Type, is_const: bool) -> Self {
    SymbolInfo {
      ptr,
      ty,
      is_const,
      is_array: true,
      elem_ty: None,
      preloaded: None,
      const_int: None,
    }
  }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  scopes: Vec<HashMap<String, SymbolInfo>>,
}

impl SymbolTable {
  pub fn new() -> Self {
    SymbolTable { scopes: Vec::new() }
  }

  pub fn push_scope(&mut self) {
    self.scopes.push(HashMap::new());
  }

  pub fn pop_scope(&mut self) {
    self
      .scopes
      .pop()
      .expect("scope stack must not be empty on pop");
  }

  /// Innermost match wins.
  pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
    self.scopes.iter().rev().find_map(|scope| scope.get(name))
  }

  /// True when the name is bound in the global (bottom) frame.
  pub fn lookup_global(&self, name: &str) -> Option<&SymbolInfo> {
    self.scopes.first().and_then(|scope| scope.get(name))
  }

  /// Inserts into the top frame; a duplicate there is a redeclaration.
  pub fn insert(&mut self, name: &str, info: SymbolInfo) -> Result<()> {
    let scope = self
      .scopes
      .last_mut()
      .ok_or_else(|| anyhow!("no scope available for symbol '{}'", name))?;
    if scope.contains_key(name) {
      bail!("redeclaration of '{}'", name);
    }
    scope.insert(name.to_string(), info);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ir::TempId;

  fn int_binding(id: u32) -> SymbolInfo {
    SymbolInfo::scalar(Operand::Temp(TempId(id)), Type::I32, false)
  }

  #[test]
  fn inner_scope_shadows_and_pop_restores() {
    let mut table = SymbolTable::new();
    table.push_scope();
    table.insert("x", int_binding(0)).unwrap();

    table.push_scope();
    table.insert("x", int_binding(1)).unwrap();
    assert_eq!(
      table.lookup("x").unwrap().ptr,
      Operand::Temp(TempId(1)),
      "inner binding hides the outer one while its scope is live"
    );

    table.pop_scope();
    assert_eq!(table.lookup("x").unwrap().ptr, Operand::Temp(TempId(0)));
  }

  #[test]
  fn redeclaration_in_same_scope_is_rejected() {
    let mut table = SymbolTable::new();
    table.push_scope();
    table.insert("x", int_binding(0)).unwrap();
    assert!(table.insert("x", int_binding(1)).is_err());
  }

  #[test]
  fn lookup_falls_through_to_outer_scopes() {
    let mut table = SymbolTable::new();
    table.push_scope();
    table.insert("g", int_binding(7)).unwrap();
    table.push_scope();
    table.push_scope();
    assert_eq!(table.lookup("g").unwrap().ptr, Operand::Temp(TempId(7)));
    assert!(table.lookup("missing").is_none());
    assert!(table.lookup_global("g").is_some());
  }
}
