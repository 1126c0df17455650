// SysY Compiler
//! Compile-time integer evaluation.

// Array bounds and vector sizes must be integer constant expressions. The
// evaluator recognizes integer literals, references to global integer
// constants, and integer arithmetic over those; everything else is an error.
// Callers check the sign of the result where a length is required.

use anyhow::{anyhow, bail, Result};

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::irgen::symbols::SymbolTable;

pub fn eval(expr: &Expr, symbols: &SymbolTable) -> Result<i32> {
  match &expr.kind {
    ExprKind::IntConst(v) => Ok(*v),
    ExprKind::FloatConst(_) => Err(anyhow!(
      "line {}: expected an integer constant expression, found a float",
      expr.line
    )),
    ExprKind::LVal(lval) => {
      if !lval.indices.is_empty() {
        bail!(
          "line {}: '{}' is not usable in a constant expression",
          expr.line,
          lval.name
        );
      }
      let info = symbols.lookup(&lval.name).ok_or_else(|| {
        anyhow!("line {}: variable '{}' not defined", expr.line, lval.name)
      })?;
      if !info.is_const {
        bail!(
          "line {}: '{}' must be a constant to appear in a constant expression",
          expr.line,
          lval.name
        );
      }
      info.const_int.ok_or_else(|| {
        anyhow!(
          "line {}: '{}' is not an integer constant",
          expr.line,
          lval.name
        )
      })
    }
    ExprKind::Unary(op, operand) => {
      let v = eval(operand, symbols)?;
      match op {
        UnaryOp::Plus => Ok(v),
        UnaryOp::Minus => Ok(v.wrapping_neg()),
        UnaryOp::Not => Err(anyhow!(
          "line {}: operator '!' is not allowed in a constant expression",
          expr.line
        )),
      }
    }
    ExprKind::Binary(op, lhs, rhs) => {
      let l = eval(lhs, symbols)?;
      let r = eval(rhs, symbols)?;
      match op {
        BinaryOp::Add => Ok(l.wrapping_add(r)),
        BinaryOp::Sub => Ok(l.wrapping_sub(r)),
        BinaryOp::Mul => Ok(l.wrapping_mul(r)),
        BinaryOp::Div => {
          if r == 0 {
            bail!("line {}: division by zero in constant expression", expr.line);
          }
          Ok(l.wrapping_div(r))
        }
        BinaryOp::Mod => {
          if r == 0 {
            bail!("line {}: modulo by zero in constant expression", expr.line);
          }
          Ok(l.wrapping_rem(r))
        }
        _ => Err(anyhow!(
          "line {}: operator '{}' is not allowed in a constant expression",
          expr.line,
          op
        )),
      }
    }
    ExprKind::StringLit(_) | ExprKind::Call(..) => Err(anyhow!(
      "line {}: expected a constant integer expression",
      expr.line
    )),
  }
}

/// Evaluates a length expression (array dimension). Must be >= 0.
pub fn eval_array_dim(expr: &Expr, symbols: &SymbolTable) -> Result<usize> {
  let v = eval(expr, symbols)?;
  if v < 0 {
    bail!("line {}: array size must be non-negative", expr.line);
  }
  Ok(v as usize)
}

/// Evaluates a vector size expression. Must be > 0.
pub fn eval_vector_size(expr: &Expr, symbols: &SymbolTable) -> Result<usize> {
  let v = eval(expr, symbols)?;
  if v <= 0 {
    bail!("line {}: vector size must be positive", expr.line);
  }
  Ok(v as usize)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ir::{Operand, Type};
  use crate::irgen::symbols::SymbolInfo;
  use crate::parse;

  fn expr_of(src: &str) -> Expr {
    // Wrap the expression in a return statement to reuse the parser.
    let unit = parse::parse(&format!("int main() {{ return {}; }}", src)).unwrap();
    match &unit.functions[0].body.items[0] {
      crate::ast::BlockItem::Stmt(crate::ast::Stmt {
        kind: crate::ast::StmtKind::Return(Some(e)),
        ..
      }) => e.clone(),
      other => panic!("unexpected item {:?}", other),
    }
  }

  fn globals_with_n(value: i32) -> SymbolTable {
    let mut table = SymbolTable::new();
    table.push_scope();
    let mut info = SymbolInfo::scalar(Operand::Global("N".to_string()), Type::I32, true);
    info.const_int = Some(value);
    table.insert("N", info).unwrap();
    table
  }

  #[test]
  fn arithmetic_over_literals() {
    let table = SymbolTable::new();
    assert_eq!(eval(&expr_of("3 + 4 * 2"), &table).unwrap(), 11);
    assert_eq!(eval(&expr_of("-(10 / 3)"), &table).unwrap(), -3);
    assert_eq!(eval(&expr_of("10 % 4"), &table).unwrap(), 2);
  }

  #[test]
  fn global_integer_constants_resolve() {
    let table = globals_with_n(6);
    assert_eq!(eval(&expr_of("N * 2"), &table).unwrap(), 12);
  }

  #[test]
  fn non_const_names_are_rejected() {
    let mut table = SymbolTable::new();
    table.push_scope();
    table
      .insert(
        "x",
        SymbolInfo::scalar(Operand::Global("x".to_string()), Type::I32, false),
      )
      .unwrap();
    assert!(eval(&expr_of("x + 1"), &table).is_err());
    assert!(eval(&expr_of("missing"), &table).is_err());
  }

  #[test]
  fn division_by_zero_is_an_error() {
    let table = SymbolTable::new();
    assert!(eval(&expr_of("1 / 0"), &table).is_err());
    assert!(eval(&expr_of("1 % 0"), &table).is_err());
  }

  #[test]
  fn length_sign_checks() {
    let table = SymbolTable::new();
    assert_eq!(eval_array_dim(&expr_of("0"), &table).unwrap(), 0);
    assert!(eval_array_dim(&expr_of("-1"), &table).is_err());
    assert_eq!(eval_vector_size(&expr_of("4"), &table).unwrap(), 4);
    assert!(eval_vector_size(&expr_of("0"), &table).is_err());
  }
}
