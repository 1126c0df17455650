// SysY Compiler
//! Initializer lowering.

// Global initializers must reduce to constant aggregates; local ones emit
// stores. A flat list is consumed across elements in row-major order, each
// nested brace opens one subaggregate with its own padding, and positions
// without a supplied value are zero-filled up to the declared shape.

use anyhow::{anyhow, bail, Result};

use crate::ast::{fold, Expr, ExprKind, InitVal, Line};
use crate::ir::{Init, Inst, Operand, Type};
use crate::irgen::expr::{coerce_numeric, gen_expr, scalar_zero, ExprCtx};
use crate::irgen::IrGen;

#[derive(Clone, Copy, Debug)]
enum ConstVal {
  Int(i32),
  Float(f32),
}

/// Evaluates a global-initializer expression to a constant. After folding
/// this is usually a literal, but same-kind arithmetic left behind by a
/// disabled folder still reduces here.
fn const_scalar(expr: &Expr) -> Result<ConstVal> {
  match &expr.kind {
    ExprKind::IntConst(v) => Ok(ConstVal::Int(*v)),
    ExprKind::FloatConst(v) => Ok(ConstVal::Float(*v)),
    ExprKind::Unary(op, operand) => match const_scalar(operand)? {
      ConstVal::Int(v) => Ok(ConstVal::Int(fold::eval_unary_int(*op, v))),
      ConstVal::Float(v) => Ok(ConstVal::Float(fold::eval_unary_float(*op, v))),
    },
    ExprKind::Binary(op, lhs, rhs) => {
      match (const_scalar(lhs)?, const_scalar(rhs)?) {
        (ConstVal::Int(a), ConstVal::Int(b)) => Ok(ConstVal::Int(fold::eval_binary_int(*op, a, b))),
        (ConstVal::Float(a), ConstVal::Float(b)) => fold::eval_binary_float(*op, a, b)
          .map(ConstVal::Float)
          .ok_or_else(|| {
            anyhow!("line {}: float modulo is not a constant expression", expr.line)
          }),
        _ => Err(anyhow!(
          "line {}: global initializer must not mix int and float operands",
          expr.line
        )),
      }
    }
    _ => Err(anyhow!(
      "line {}: global initializer must be a constant",
      expr.line
    )),
  }
}

/// Builds the constant aggregate for a global object.
pub(crate) fn global_init(ty: &Type, init: &InitVal) -> Result<Init> {
  match ty {
    Type::Vector(elem, lanes) => global_vector_init(elem, *lanes, init),
    Type::Array(..) => match init {
      InitVal::Expr(e) => Err(anyhow!(
        "line {}: array initializer must be a brace-enclosed list",
        e.line
      )),
      InitVal::List(vals) => {
        if vals.is_empty() {
          return Ok(Init::Zero);
        }
        let mut idx = 0;
        let built = build_const_array(ty, vals, &mut idx)?;
        if idx < vals.len() {
          bail!("array initializer has too many elements");
        }
        Ok(built)
      }
    },
    _ => match init {
      InitVal::Expr(e) => {
        let leaf = const_leaf(ty, e)?;
        Ok(leaf)
      }
      InitVal::List(vals) if vals.is_empty() => Ok(Init::Zero),
      InitVal::List(_) => Err(anyhow!("scalar initializer cannot be a list")),
    },
  }
}

/// A scalar leaf of a global initializer. The declared kind must match
/// exactly; globals do not convert.
fn const_leaf(ty: &Type, expr: &Expr) -> Result<Init> {
  match (ty, const_scalar(expr)?) {
    (Type::I32, ConstVal::Int(v)) => Ok(Init::Int(v)),
    (Type::F32, ConstVal::Float(v)) => Ok(Init::Float(v)),
    _ => Err(anyhow!(
      "line {}: type mismatch in global initializer",
      expr.line
    )),
  }
}

fn build_const_array(ty: &Type, vals: &[InitVal], idx: &mut usize) -> Result<Init> {
  match ty {
    Type::Array(elem, n) => {
      let mut elems = Vec::with_capacity(*n);
      for _ in 0..*n {
        if *idx < vals.len() {
          match &vals[*idx] {
            InitVal::List(sub) => {
              // A nested brace list fills exactly one row, padded on its own.
              *idx += 1;
              let mut sub_idx = 0;
              let built = build_const_array(elem, sub, &mut sub_idx)?;
              if sub_idx < sub.len() {
                bail!("initializer row has too many elements");
              }
              elems.push(built);
            }
            InitVal::Expr(_) => elems.push(build_const_array(elem, vals, idx)?),
          }
        } else {
          elems.push(build_const_array(elem, &[], &mut 0)?);
        }
      }
      Ok(Init::Array(elems))
    }
    _ => {
      // Scalar leaf of the aggregate.
      if *idx < vals.len() {
        match &vals[*idx] {
          InitVal::Expr(e) => {
            let leaf = const_leaf(ty, e)?;
            *idx += 1;
            Ok(leaf)
          }
          InitVal::List(_) => bail!("nested initializer list where a scalar is expected"),
        }
      } else {
        Ok(match ty {
          Type::F32 => Init::Float(0.0),
          _ => Init::Int(0),
        })
      }
    }
  }
}

fn global_vector_init(elem: &Type, lanes: usize, init: &InitVal) -> Result<Init> {
  let vals = match init {
    InitVal::List(vals) => vals,
    InitVal::Expr(e) => {
      bail!(
        "line {}: vector initializer must be a brace-enclosed list",
        e.line
      );
    }
  };
  if vals.len() > lanes {
    bail!("vector initializer has too many elements");
  }
  let mut elems = Vec::with_capacity(lanes);
  for i in 0..lanes {
    if i < vals.len() {
      let expr = match &vals[i] {
        InitVal::Expr(e) => e,
        InitVal::List(_) => bail!("vector initializer elements must be expressions"),
      };
      // Vector lanes convert int<->float, unlike scalar globals.
      let lane = match (elem, const_scalar(expr)?) {
        (Type::I32, ConstVal::Int(v)) => Init::Int(v),
        (Type::I32, ConstVal::Float(v)) => Init::Int(v as i32),
        (Type::F32, ConstVal::Float(v)) => Init::Float(v),
        (Type::F32, ConstVal::Int(v)) => Init::Float(v as f32),
        _ => bail!("line {}: type mismatch in vector initializer", expr.line),
      };
      elems.push(lane);
    } else {
      elems.push(match elem {
        Type::F32 => Init::Float(0.0),
        _ => Init::Int(0),
      });
    }
  }
  Ok(Init::Vector(elems))
}

/// Emits the stores that initialize a local cell.
pub(crate) fn local_init(
  gen: &mut IrGen,
  ptr: Operand,
  ty: &Type,
  init: &InitVal,
  line: Line,
) -> Result<()> {
  match ty {
    Type::Vector(elem, lanes) => local_vector_init(gen, ptr, ty, elem, *lanes, init, line),
    Type::Array(..) => match init {
      InitVal::Expr(e) => Err(anyhow!(
        "line {}: array initializer must be a brace-enclosed list",
        e.line
      )),
      InitVal::List(vals) => {
        let mut idx = 0;
        fill_array(gen, ptr, ty, vals, &mut idx, line)?;
        if idx < vals.len() {
          bail!("line {}: array initializer has too many elements", line);
        }
        Ok(())
      }
    },
    _ => match init {
      InitVal::Expr(e) => {
        let v = gen_expr(gen, e, ExprCtx::Value)?;
        let v = coerce_numeric(gen, v, ty, e.line)?;
        gen.builder().push(Inst::Store {
          ty: ty.clone(),
          value: v.op,
          addr: ptr,
        });
        Ok(())
      }
      InitVal::List(vals) if vals.is_empty() => {
        gen.builder().push(Inst::Store {
          ty: ty.clone(),
          value: scalar_zero(ty),
          addr: ptr,
        });
        Ok(())
      }
      InitVal::List(_) => Err(anyhow!(
        "line {}: scalar initializer cannot be a list",
        line
      )),
    },
  }
}

fn fill_array(
  gen: &mut IrGen,
  base: Operand,
  ty: &Type,
  vals: &[InitVal],
  idx: &mut usize,
  line: Line,
) -> Result<()> {
  match ty {
    Type::Array(elem, n) => {
      for i in 0..*n {
        let cell = gen.builder().temp();
        gen.builder().push(Inst::Gep {
          dest: cell,
          base_ty: ty.clone(),
          base: base.clone(),
          indices: vec![Operand::ConstInt(0), Operand::ConstInt(i as i32)],
        });
        if *idx < vals.len() {
          match &vals[*idx] {
            InitVal::List(sub) => {
              *idx += 1;
              let mut sub_idx = 0;
              fill_array(gen, Operand::Temp(cell), elem, sub, &mut sub_idx, line)?;
              if sub_idx < sub.len() {
                bail!("line {}: initializer row has too many elements", line);
              }
            }
            InitVal::Expr(_) => {
              fill_array(gen, Operand::Temp(cell), elem, vals, idx, line)?;
            }
          }
        } else {
          // Zero-fill the remainder of the declared shape.
          fill_array(gen, Operand::Temp(cell), elem, &[], &mut 0, line)?;
        }
      }
      Ok(())
    }
    _ => {
      let value = if *idx < vals.len() {
        match &vals[*idx] {
          InitVal::Expr(e) => {
            let v = gen_expr(gen, e, ExprCtx::Value)?;
            let v = coerce_numeric(gen, v, ty, e.line)?;
            *idx += 1;
            v.op
          }
          InitVal::List(_) => {
            bail!(
              "line {}: nested initializer list where a scalar is expected",
              line
            );
          }
        }
      } else {
        scalar_zero(ty)
      };
      gen.builder().push(Inst::Store {
        ty: ty.clone(),
        value,
        addr: base,
      });
      Ok(())
    }
  }
}

fn local_vector_init(
  gen: &mut IrGen,
  ptr: Operand,
  vec_ty: &Type,
  elem: &Type,
  lanes: usize,
  init: &InitVal,
  line: Line,
) -> Result<()> {
  match init {
    // A whole-vector expression, e.g. initializing from another vector.
    InitVal::Expr(e) => {
      let v = gen_expr(gen, e, ExprCtx::Value)?;
      if v.ty != *vec_ty {
        bail!(
          "line {}: vector initializer must be a vector of the same type",
          e.line
        );
      }
      gen.builder().push(Inst::Store {
        ty: vec_ty.clone(),
        value: v.op,
        addr: ptr,
      });
      Ok(())
    }
    InitVal::List(vals) => {
      if vals.len() > lanes {
        bail!("line {}: vector initializer has too many elements", line);
      }
      // Insert every lane over undef: supplied values first, zero for the
      // remainder of the shape.
      let mut vec = Operand::Undef;
      for i in 0..lanes {
        let value = if i < vals.len() {
          let expr = match &vals[i] {
            InitVal::Expr(e) => e,
            InitVal::List(_) => {
              bail!(
                "line {}: vector initializer elements must be expressions",
                line
              );
            }
          };
          let v = gen_expr(gen, expr, ExprCtx::Value)?;
          coerce_numeric(gen, v, elem, expr.line)?.op
        } else {
          scalar_zero(elem)
        };
        let dest = gen.builder().temp();
        gen.builder().push(Inst::Insert {
          dest,
          vec_ty: vec_ty.clone(),
          vec,
          elem: value,
          index: Operand::ConstInt(i as i32),
        });
        vec = Operand::Temp(dest);
      }
      gen.builder().push(Inst::Store {
        ty: vec_ty.clone(),
        value: vec,
        addr: ptr,
      });
      Ok(())
    }
  }
}
