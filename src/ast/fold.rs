// SysY Compiler
//! Constant folding over the AST.

// An in-place rewrite: a binary or unary operation whose (already folded)
// operands are literals of the same numeric kind collapses to a literal.
// Mixed int/float operands are left alone; the emitter inserts the
// conversion later. Integer arithmetic wraps in 32 bits and division or
// modulo by zero folds to 0 rather than trapping at compile time. Float
// modulo is never folded.

use crate::ast::{BinaryOp, Block, BlockItem, CompUnit, Decl, Expr, ExprKind, InitVal, Stmt};
use crate::ast::{StmtKind, UnaryOp};

/// Runs AST-level optimization passes until nothing changes, bounded by a
/// fixed pass count to guarantee termination.
pub struct AstOptimizer {
  enabled: bool,
  max_passes: u32,
}

pub const DEFAULT_MAX_PASSES: u32 = 8;

impl AstOptimizer {
  pub fn new(enabled: bool, max_passes: u32) -> Self {
    AstOptimizer {
      enabled,
      max_passes,
    }
  }

  /// Returns the number of passes that ran.
  pub fn optimize(&self, unit: &mut CompUnit) -> u32 {
    if !self.enabled {
      return 0;
    }
    let mut passes = 0;
    while passes < self.max_passes {
      passes += 1;
      if !fold_unit(unit) {
        break;
      }
      log::debug!("constant folding pass {} changed the tree", passes);
    }
    passes
  }
}

impl Default for AstOptimizer {
  fn default() -> Self {
    AstOptimizer::new(true, DEFAULT_MAX_PASSES)
  }
}

/// One folding pass over the whole unit. Returns true iff any subtree changed.
pub fn fold_unit(unit: &mut CompUnit) -> bool {
  let mut changed = false;
  for decl in &mut unit.decls {
    changed |= fold_decl(decl);
  }
  for func in &mut unit.functions {
    changed |= fold_block(&mut func.body);
  }
  changed
}

fn fold_decl(decl: &mut Decl) -> bool {
  let mut changed = false;
  for def in &mut decl.defs {
    if let Some(init) = &mut def.init {
      changed |= fold_init_val(init);
    }
  }
  changed
}

fn fold_init_val(init: &mut InitVal) -> bool {
  match init {
    InitVal::Expr(e) => fold_expr(e),
    InitVal::List(vals) => {
      let mut changed = false;
      for val in vals {
        changed |= fold_init_val(val);
      }
      changed
    }
  }
}

fn fold_block(block: &mut Block) -> bool {
  let mut changed = false;
  for item in &mut block.items {
    match item {
      BlockItem::Decl(d) => changed |= fold_decl(d),
      BlockItem::Stmt(s) => changed |= fold_stmt(s),
    }
  }
  changed
}

fn fold_stmt(stmt: &mut Stmt) -> bool {
  match &mut stmt.kind {
    StmtKind::Assign(lval, expr) => {
      let mut changed = fold_expr(expr);
      for idx in &mut lval.indices {
        changed |= fold_expr(idx);
      }
      changed
    }
    StmtKind::Expr(Some(e)) => fold_expr(e),
    StmtKind::Expr(None) => false,
    StmtKind::Block(block) => fold_block(block),
    StmtKind::If(cond, then_stmt, else_stmt) => {
      let mut changed = fold_expr(cond);
      changed |= fold_stmt(then_stmt);
      if let Some(e) = else_stmt {
        changed |= fold_stmt(e);
      }
      changed
    }
    StmtKind::While(cond, body) => {
      let mut changed = fold_expr(cond);
      changed |= fold_stmt(body);
      changed
    }
    StmtKind::Return(Some(e)) => fold_expr(e),
    StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => false,
  }
}

/// Folds an expression in place. Returns true iff the subtree changed.
pub fn fold_expr(expr: &mut Expr) -> bool {
  match &mut expr.kind {
    ExprKind::IntConst(_) | ExprKind::FloatConst(_) | ExprKind::StringLit(_) => false,
    ExprKind::LVal(lval) => {
      let mut changed = false;
      for idx in &mut lval.indices {
        changed |= fold_expr(idx);
      }
      changed
    }
    // The call itself is never folded, only its arguments.
    ExprKind::Call(_, args) => {
      let mut changed = false;
      for arg in args {
        changed |= fold_expr(arg);
      }
      changed
    }
    ExprKind::Unary(op, operand) => {
      let mut changed = fold_expr(operand);
      let folded = match operand.kind {
        ExprKind::IntConst(v) => Some(ExprKind::IntConst(eval_unary_int(*op, v))),
        ExprKind::FloatConst(v) => Some(ExprKind::FloatConst(eval_unary_float(*op, v))),
        _ => None,
      };
      if let Some(kind) = folded {
        expr.kind = kind;
        changed = true;
      }
      changed
    }
    ExprKind::Binary(op, lhs, rhs) => {
      let mut changed = fold_expr(lhs);
      changed |= fold_expr(rhs);
      let folded = match (&lhs.kind, &rhs.kind) {
        (ExprKind::IntConst(a), ExprKind::IntConst(b)) => {
          Some(ExprKind::IntConst(eval_binary_int(*op, *a, *b)))
        }
        (ExprKind::FloatConst(a), ExprKind::FloatConst(b)) => {
          eval_binary_float(*op, *a, *b).map(ExprKind::FloatConst)
        }
        _ => None,
      };
      if let Some(kind) = folded {
        expr.kind = kind;
        changed = true;
      }
      changed
    }
  }
}

/// 32-bit two's-complement semantics; division and modulo by zero yield 0.
pub fn eval_binary_int(op: BinaryOp, lhs: i32, rhs: i32) -> i32 {
  match op {
    BinaryOp::Add => lhs.wrapping_add(rhs),
    BinaryOp::Sub => lhs.wrapping_sub(rhs),
    BinaryOp::Mul => lhs.wrapping_mul(rhs),
    BinaryOp::Div => {
      if rhs == 0 {
        0
      } else {
        lhs.wrapping_div(rhs)
      }
    }
    BinaryOp::Mod => {
      if rhs == 0 {
        0
      } else {
        lhs.wrapping_rem(rhs)
      }
    }
    BinaryOp::Lt => (lhs < rhs) as i32,
    BinaryOp::Gt => (lhs > rhs) as i32,
    BinaryOp::Le => (lhs <= rhs) as i32,
    BinaryOp::Ge => (lhs >= rhs) as i32,
    BinaryOp::Eq => (lhs == rhs) as i32,
    BinaryOp::Ne => (lhs != rhs) as i32,
    BinaryOp::And => (lhs != 0 && rhs != 0) as i32,
    BinaryOp::Or => (lhs != 0 || rhs != 0) as i32,
  }
}

/// IEEE arithmetic except that division by zero yields 0.0. Modulo is not
/// defined over floats and stays unfolded (None).
pub fn eval_binary_float(op: BinaryOp, lhs: f32, rhs: f32) -> Option<f32> {
  let truth = |b: bool| if b { 1.0 } else { 0.0 };
  match op {
    BinaryOp::Add => Some(lhs + rhs),
    BinaryOp::Sub => Some(lhs - rhs),
    BinaryOp::Mul => Some(lhs * rhs),
    BinaryOp::Div => Some(if rhs != 0.0 { lhs / rhs } else { 0.0 }),
    BinaryOp::Mod => None,
    BinaryOp::Lt => Some(truth(lhs < rhs)),
    BinaryOp::Gt => Some(truth(lhs > rhs)),
    BinaryOp::Le => Some(truth(lhs <= rhs)),
    BinaryOp::Ge => Some(truth(lhs >= rhs)),
    BinaryOp::Eq => Some(truth(lhs == rhs)),
    BinaryOp::Ne => Some(truth(lhs != rhs)),
    BinaryOp::And => Some(truth(lhs != 0.0 && rhs != 0.0)),
    BinaryOp::Or => Some(truth(lhs != 0.0 || rhs != 0.0)),
  }
}

pub fn eval_unary_int(op: UnaryOp, v: i32) -> i32 {
  match op {
    UnaryOp::Plus => v,
    UnaryOp::Minus => v.wrapping_neg(),
    UnaryOp::Not => (v == 0) as i32,
  }
}

pub fn eval_unary_float(op: UnaryOp, v: f32) -> f32 {
  match op {
    UnaryOp::Plus => v,
    UnaryOp::Minus => -v,
    UnaryOp::Not => {
      if v == 0.0 {
        1.0
      } else {
        0.0
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse;

  fn parse_unit(src: &str) -> CompUnit {
    parse::parse(src).expect("test source must parse")
  }

  fn int_expr(v: i32) -> Expr {
    Expr::new(ExprKind::IntConst(v), 1)
  }

  fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), 1)
  }

  #[test]
  fn folds_nested_integer_arithmetic() {
    let mut e = binary(
      BinaryOp::Add,
      int_expr(3),
      binary(BinaryOp::Mul, int_expr(4), int_expr(2)),
    );
    assert!(fold_expr(&mut e));
    assert!(matches!(e.kind, ExprKind::IntConst(11)));
  }

  #[test]
  fn integer_semantics_match_twos_complement() {
    let all_ops = [
      BinaryOp::Add,
      BinaryOp::Sub,
      BinaryOp::Mul,
      BinaryOp::Div,
      BinaryOp::Mod,
      BinaryOp::Lt,
      BinaryOp::Gt,
      BinaryOp::Le,
      BinaryOp::Ge,
      BinaryOp::Eq,
      BinaryOp::Ne,
      BinaryOp::And,
      BinaryOp::Or,
    ];
    let samples = [i32::MIN, -7, -1, 0, 1, 2, 7, i32::MAX];
    for op in all_ops {
      for &a in &samples {
        for &b in &samples {
          let mut e = binary(op, int_expr(a), int_expr(b));
          assert!(fold_expr(&mut e));
          let got = match e.kind {
            ExprKind::IntConst(v) => v,
            other => panic!("expected an integer literal, got {:?}", other),
          };
          assert_eq!(got, eval_binary_int(op, a, b), "{:?} {} {}", op, a, b);
        }
      }
    }
  }

  #[test]
  fn division_and_modulo_by_zero_fold_to_zero() {
    assert_eq!(eval_binary_int(BinaryOp::Div, 17, 0), 0);
    assert_eq!(eval_binary_int(BinaryOp::Mod, 17, 0), 0);
    assert_eq!(eval_binary_float(BinaryOp::Div, 1.5, 0.0), Some(0.0));
  }

  #[test]
  fn overflow_wraps() {
    assert_eq!(
      eval_binary_int(BinaryOp::Add, i32::MAX, 1),
      i32::MIN,
    );
    assert_eq!(eval_binary_int(BinaryOp::Mul, 1 << 30, 4), 0);
    // i32::MIN / -1 must not trap.
    assert_eq!(eval_binary_int(BinaryOp::Div, i32::MIN, -1), i32::MIN);
  }

  #[test]
  fn float_modulo_stays_unfolded() {
    let mut e = binary(
      BinaryOp::Mod,
      Expr::new(ExprKind::FloatConst(5.0), 1),
      Expr::new(ExprKind::FloatConst(2.0), 1),
    );
    assert!(!fold_expr(&mut e));
    assert!(matches!(e.kind, ExprKind::Binary(BinaryOp::Mod, _, _)));
  }

  #[test]
  fn mixed_int_float_stays_unfolded() {
    let mut e = binary(
      BinaryOp::Add,
      int_expr(1),
      Expr::new(ExprKind::FloatConst(2.0), 1),
    );
    assert!(!fold_expr(&mut e));
    assert!(matches!(e.kind, ExprKind::Binary(BinaryOp::Add, _, _)));
  }

  #[test]
  fn unary_literals_fold() {
    let mut e = Expr::new(ExprKind::Unary(UnaryOp::Minus, Box::new(int_expr(5))), 1);
    assert!(fold_expr(&mut e));
    assert!(matches!(e.kind, ExprKind::IntConst(-5)));

    let mut e = Expr::new(ExprKind::Unary(UnaryOp::Not, Box::new(int_expr(0))), 1);
    assert!(fold_expr(&mut e));
    assert!(matches!(e.kind, ExprKind::IntConst(1)));
  }

  #[test]
  fn call_arguments_fold_but_call_survives() {
    let mut unit = parse_unit("int main() { putint(1 + 2); return 0; }");
    assert!(fold_unit(&mut unit));
    let body = &unit.functions[0].body;
    match &body.items[0] {
      BlockItem::Stmt(Stmt {
        kind: StmtKind::Expr(Some(Expr {
          kind: ExprKind::Call(name, args),
          ..
        })),
        ..
      }) => {
        assert_eq!(name, "putint");
        assert!(matches!(args[0].kind, ExprKind::IntConst(3)));
      }
      other => panic!("unexpected statement {:?}", other),
    }
  }

  #[test]
  fn fold_is_idempotent_and_bounded() {
    let mut unit = parse_unit(
      "const int N = 3 + 4 * 2;\n\
       int a[2 + 1] = {1 + 1, 2 * 2, -3};\n\
       int main() { if (1 < 2 && 3 > 2) return N; return 0; }",
    );
    let passes = AstOptimizer::default().optimize(&mut unit);
    assert!(passes <= DEFAULT_MAX_PASSES);
    // A second full pass over the already-stable tree changes nothing.
    assert!(!fold_unit(&mut unit));
    let after_once = format!("{:?}", unit);
    fold_unit(&mut unit);
    assert_eq!(after_once, format!("{:?}", unit));
  }
}
