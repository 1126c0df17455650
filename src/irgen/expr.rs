// SysY Compiler
//! Expression lowering.

// One lowering function serves both ordinary expressions and branch
// conditions; the context flag decides whether the logical operators are
// legal. In condition context `&&` and `||` reduce their operands to i1 and
// combine them bitwise, and `!` compares against zero.

use anyhow::{anyhow, bail, Result};

use crate::ast::{BinaryOp, Expr, ExprKind, LVal, Line, UnaryOp};
use crate::ir::{BinOp, CastOp, CmpPred, Inst, Operand, TempId, Type};
use crate::irgen::{array_rank, descend, library, IrGen};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExprCtx {
  Value,
  Condition,
}

/// A lowered expression: its IR type and the operand holding it.
#[derive(Clone, Debug)]
pub(crate) struct TypedValue {
  pub ty: Type,
  pub op: Operand,
}

impl TypedValue {
  pub fn new(ty: Type, op: Operand) -> Self {
    TypedValue { ty, op }
  }
}

pub(crate) fn gen_expr(gen: &mut IrGen, expr: &Expr, ctx: ExprCtx) -> Result<TypedValue> {
  match &expr.kind {
    ExprKind::IntConst(v) => Ok(TypedValue::new(Type::I32, Operand::ConstInt(*v))),
    ExprKind::FloatConst(v) => Ok(TypedValue::new(Type::F32, Operand::ConstFloat(*v))),
    ExprKind::StringLit(s) => {
      let op = gen.intern_string(s);
      Ok(TypedValue::new(Type::I8.ptr_to(), op))
    }
    ExprKind::LVal(lval) => {
      let tv = gen_lval_value(gen, lval, expr.line)?;
      if ctx == ExprCtx::Condition && matches!(tv.ty, Type::Vector(..)) {
        bail!(
          "line {}: vector value cannot be used as a condition",
          expr.line
        );
      }
      Ok(tv)
    }
    ExprKind::Call(callee, args) => {
      let tv = gen_call(gen, callee, args, expr.line)?;
      if ctx == ExprCtx::Condition && matches!(tv.ty, Type::Vector(..)) {
        bail!(
          "line {}: vector value cannot be used as a condition",
          expr.line
        );
      }
      Ok(tv)
    }
    ExprKind::Unary(op, operand) => gen_unary(gen, *op, operand, ctx, expr.line),
    ExprKind::Binary(op, lhs, rhs) => gen_binary(gen, *op, lhs, rhs, ctx, expr.line),
  }
}

fn gen_unary(
  gen: &mut IrGen,
  op: UnaryOp,
  operand: &Expr,
  ctx: ExprCtx,
  line: Line,
) -> Result<TypedValue> {
  match op {
    UnaryOp::Plus => gen_expr(gen, operand, ctx),
    UnaryOp::Minus => {
      let v = gen_expr(gen, operand, ctx)?;
      match &v.ty {
        Type::Vector(elem, _) => {
          let elem_is_float = elem.is_float();
          let zero = gen.builder().temp();
          gen.builder().push(Inst::Splat {
            dest: zero,
            vec_ty: v.ty.clone(),
            scalar: scalar_zero(elem),
          });
          let op = if elem_is_float { BinOp::FSub } else { BinOp::Sub };
          emit_binary(gen, op, v.ty.clone(), Operand::Temp(zero), v.op)
        }
        Type::F32 => emit_binary(gen, BinOp::FSub, Type::F32, Operand::ConstFloat(0.0), v.op),
        Type::I1 | Type::I32 => {
          let v = widen_bool(gen, v);
          emit_binary(gen, BinOp::Sub, Type::I32, Operand::ConstInt(0), v.op)
        }
        _ => Err(anyhow!("line {}: cannot negate a value of this type", line)),
      }
    }
    UnaryOp::Not => {
      if ctx != ExprCtx::Condition {
        bail!(
          "line {}: operator '!' is only allowed in conditions",
          line
        );
      }
      let v = gen_expr(gen, operand, ExprCtx::Condition)?;
      match &v.ty {
        Type::I1 => emit_binary(gen, BinOp::Xor, Type::I1, v.op, Operand::ConstBool(true)),
        Type::I32 => emit_cmp(gen, CmpPred::Eq, Type::I32, v.op, Operand::ConstInt(0)),
        Type::F32 => emit_cmp(gen, CmpPred::Oeq, Type::F32, v.op, Operand::ConstFloat(0.0)),
        _ => Err(anyhow!(
          "line {}: operand of '!' must be a scalar value",
          line
        )),
      }
    }
  }
}

fn gen_binary(
  gen: &mut IrGen,
  op: BinaryOp,
  lhs: &Expr,
  rhs: &Expr,
  ctx: ExprCtx,
  line: Line,
) -> Result<TypedValue> {
  if matches!(op, BinaryOp::And | BinaryOp::Or) {
    if ctx != ExprCtx::Condition {
      bail!(
        "line {}: operator '{}' is only allowed in conditions",
        line,
        op
      );
    }
    let l = gen_expr(gen, lhs, ExprCtx::Condition)?;
    let l = to_bool(gen, l, line)?;
    let r = gen_expr(gen, rhs, ExprCtx::Condition)?;
    let r = to_bool(gen, r, line)?;
    let ir_op = if op == BinaryOp::And {
      BinOp::And
    } else {
      BinOp::Or
    };
    return emit_binary(gen, ir_op, Type::I1, l.op, r.op);
  }

  let l = gen_expr(gen, lhs, ctx)?;
  let r = gen_expr(gen, rhs, ctx)?;

  if matches!(l.ty, Type::Vector(..)) || matches!(r.ty, Type::Vector(..)) {
    return gen_vector_binary(gen, op, l, r, line);
  }
  for side in [&l, &r] {
    match side.ty {
      Type::Ptr(_) => bail!(
        "line {}: a partially indexed array cannot be used as a value",
        line
      ),
      Type::Void => bail!(
        "line {}: a void function call cannot be used as a value",
        line
      ),
      _ => {}
    }
  }

  let l = widen_bool(gen, l);
  let r = widen_bool(gen, r);
  let is_float = l.ty == Type::F32 || r.ty == Type::F32;
  let (l, r) = if is_float {
    (
      coerce_numeric(gen, l, &Type::F32, line)?,
      coerce_numeric(gen, r, &Type::F32, line)?,
    )
  } else {
    (l, r)
  };

  match op {
    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
      let ir_op = arith_op(op, is_float);
      let ty = if is_float { Type::F32 } else { Type::I32 };
      emit_binary(gen, ir_op, ty, l.op, r.op)
    }
    BinaryOp::Mod => {
      if is_float {
        // Modulo is undefined over floats; the folded value is 0.0.
        Ok(TypedValue::new(Type::F32, Operand::ConstFloat(0.0)))
      } else {
        emit_binary(gen, BinOp::SRem, Type::I32, l.op, r.op)
      }
    }
    BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
      let pred = cmp_pred(op, is_float);
      let ty = if is_float { Type::F32 } else { Type::I32 };
      emit_cmp(gen, pred, ty, l.op, r.op)
    }
    BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
  }
}

fn gen_vector_binary(
  gen: &mut IrGen,
  op: BinaryOp,
  l: TypedValue,
  r: TypedValue,
  line: Line,
) -> Result<TypedValue> {
  let l_is_vec = matches!(l.ty, Type::Vector(..));
  let r_is_vec = matches!(r.ty, Type::Vector(..));

  if l_is_vec && r_is_vec {
    if l.ty != r.ty {
      bail!("line {}: vector operands must have the same type", line);
    }
    let elem_is_float = match &l.ty {
      Type::Vector(elem, _) => elem.is_float(),
      _ => unreachable!(),
    };
    let ir_op = match op {
      BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arith_op(op, elem_is_float),
      _ => bail!("line {}: unsupported vector binary operator '{}'", line, op),
    };
    return emit_binary(gen, ir_op, l.ty.clone(), l.op, r.op);
  }

  // Vector-scalar broadcast.
  if !matches!(
    op,
    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
  ) {
    bail!("line {}: unsupported vector-scalar operator '{}'", line, op);
  }
  let scalar_on_left = !l_is_vec;
  let (vec, scalar) = if l_is_vec { (l, r) } else { (r, l) };
  let (elem, _lanes) = match &vec.ty {
    Type::Vector(elem, n) => ((**elem).clone(), *n),
    _ => unreachable!(),
  };

  let scalar = if elem.is_float() {
    match scalar.ty {
      Type::F32 => scalar,
      Type::I1 | Type::I32 => {
        let widened = widen_bool(gen, scalar);
        coerce_numeric(gen, widened, &Type::F32, line)?
      }
      _ => bail!(
        "line {}: vector-scalar operation expects an int or float scalar",
        line
      ),
    }
  } else {
    match scalar.ty {
      Type::I32 => scalar,
      Type::I1 => widen_bool(gen, scalar),
      Type::F32 => bail!(
        "line {}: the scalar operand of a vector<int> operation must be an integer",
        line
      ),
      _ => bail!(
        "line {}: vector-scalar operation expects an int or float scalar",
        line
      ),
    }
  };

  if op == BinaryOp::Mod && elem.is_float() {
    bail!("line {}: vector-scalar modulo does not support float", line);
  }

  let splat = gen.builder().temp();
  gen.builder().push(Inst::Splat {
    dest: splat,
    vec_ty: vec.ty.clone(),
    scalar: scalar.op,
  });

  let ir_op = match op {
    BinaryOp::Mod => BinOp::SRem,
    _ => arith_op(op, elem.is_float()),
  };
  // Subtraction and division are not commutative; keep source order.
  let (a, b) = if scalar_on_left {
    (Operand::Temp(splat), vec.op)
  } else {
    (vec.op, Operand::Temp(splat))
  };
  emit_binary(gen, ir_op, vec.ty, a, b)
}

/// Value-mode lvalue lowering: loads scalars and vector elements, decays
/// bare and partially indexed arrays to pointers.
pub(crate) fn gen_lval_value(gen: &mut IrGen, lval: &LVal, line: Line) -> Result<TypedValue> {
  let info = gen
    .symbols
    .lookup(&lval.name)
    .ok_or_else(|| anyhow!("line {}: variable '{}' not defined", line, lval.name))?
    .clone();
  let k = lval.indices.len();

  // Array parameter: every access goes through the pointer preloaded in
  // the entry block.
  if let (Some(elem_ty), Some(base)) = (&info.elem_ty, &info.preloaded) {
    if k == 0 {
      return Ok(TypedValue::new(elem_ty.clone().ptr_to(), base.clone()));
    }
    let accessible = array_rank(elem_ty) + 1;
    if k > accessible {
      bail!("line {}: too many indices into '{}'", line, lval.name);
    }
    let indices = gen_indices(gen, lval, line)?;
    let dest = gen.builder().temp();
    gen.builder().push(Inst::Gep {
      dest,
      base_ty: elem_ty.clone(),
      base: base.clone(),
      indices,
    });
    let reached = descend(elem_ty, k - 1).clone();
    return load_or_decay(gen, dest, reached);
  }

  if let Type::Vector(elem, _) = &info.ty {
    let elem = (**elem).clone();
    return match k {
      0 => {
        let dest = gen.builder().temp();
        gen.builder().push(Inst::Load {
          dest,
          ty: info.ty.clone(),
          addr: info.ptr.clone(),
        });
        Ok(TypedValue::new(info.ty.clone(), Operand::Temp(dest)))
      }
      1 => {
        let vec = gen.builder().temp();
        gen.builder().push(Inst::Load {
          dest: vec,
          ty: info.ty.clone(),
          addr: info.ptr.clone(),
        });
        let index = gen_index(gen, &lval.indices[0])?;
        let dest = gen.builder().temp();
        gen.builder().push(Inst::Extract {
          dest,
          vec_ty: info.ty.clone(),
          vec: Operand::Temp(vec),
          index,
        });
        Ok(TypedValue::new(elem, Operand::Temp(dest)))
      }
      _ => Err(anyhow!(
        "line {}: vector index must be one-dimensional",
        line
      )),
    };
  }

  if info.is_array {
    let rank = array_rank(&info.ty);
    if k > rank {
      bail!("line {}: too many indices into '{}'", line, lval.name);
    }
    // A bare array name decays to a pointer to its first element; partial
    // indexing yields a pointer to the subaggregate.
    let mut indices = vec![Operand::ConstInt(0)];
    if k == 0 {
      indices.push(Operand::ConstInt(0));
    } else {
      indices.extend(gen_indices(gen, lval, line)?);
    }
    let dest = gen.builder().temp();
    gen.builder().push(Inst::Gep {
      dest,
      base_ty: info.ty.clone(),
      base: info.ptr.clone(),
      indices,
    });
    let reached = descend(&info.ty, k.max(1)).clone();
    return load_or_decay(gen, dest, reached);
  }

  if k > 0 {
    bail!("line {}: too many indices into '{}'", line, lval.name);
  }
  let dest = gen.builder().temp();
  gen.builder().push(Inst::Load {
    dest,
    ty: info.ty.clone(),
    addr: info.ptr.clone(),
  });
  Ok(TypedValue::new(info.ty, Operand::Temp(dest)))
}

fn load_or_decay(gen: &mut IrGen, addr: TempId, reached: Type) -> Result<TypedValue> {
  if matches!(reached, Type::Array(..)) {
    // Partially indexed: usable only as a call argument.
    Ok(TypedValue::new(reached.ptr_to(), Operand::Temp(addr)))
  } else {
    let dest = gen.builder().temp();
    gen.builder().push(Inst::Load {
      dest,
      ty: reached.clone(),
      addr: Operand::Temp(addr),
    });
    Ok(TypedValue::new(reached, Operand::Temp(dest)))
  }
}

/// Address-mode lvalue lowering; the result type is the pointer type.
/// Vector elements are not addressable, assignment rewrites them with
/// insertelement instead.
pub(crate) fn gen_lval_addr(gen: &mut IrGen, lval: &LVal, line: Line) -> Result<TypedValue> {
  let info = gen
    .symbols
    .lookup(&lval.name)
    .ok_or_else(|| anyhow!("line {}: variable '{}' not defined", line, lval.name))?
    .clone();
  if info.is_const {
    bail!("line {}: cannot assign to constant '{}'", line, lval.name);
  }
  let k = lval.indices.len();

  if let (Some(elem_ty), Some(base)) = (&info.elem_ty, &info.preloaded) {
    if k == 0 {
      return Ok(TypedValue::new(elem_ty.clone().ptr_to(), base.clone()));
    }
    let accessible = array_rank(elem_ty) + 1;
    if k > accessible {
      bail!("line {}: too many indices into '{}'", line, lval.name);
    }
    let indices = gen_indices(gen, lval, line)?;
    let dest = gen.builder().temp();
    gen.builder().push(Inst::Gep {
      dest,
      base_ty: elem_ty.clone(),
      base: base.clone(),
      indices,
    });
    let reached = descend(elem_ty, k - 1).clone();
    return Ok(TypedValue::new(reached.ptr_to(), Operand::Temp(dest)));
  }

  if matches!(info.ty, Type::Vector(..)) {
    bail!(
      "line {}: a vector element is not addressable; assign through '{}[i]'",
      line,
      lval.name
    );
  }

  if info.is_array {
    let rank = array_rank(&info.ty);
    if k > rank {
      bail!("line {}: too many indices into '{}'", line, lval.name);
    }
    let mut indices = vec![Operand::ConstInt(0)];
    if k == 0 {
      indices.push(Operand::ConstInt(0));
    } else {
      indices.extend(gen_indices(gen, lval, line)?);
    }
    let dest = gen.builder().temp();
    gen.builder().push(Inst::Gep {
      dest,
      base_ty: info.ty.clone(),
      base: info.ptr.clone(),
      indices,
    });
    let reached = descend(&info.ty, k.max(1)).clone();
    return Ok(TypedValue::new(reached.ptr_to(), Operand::Temp(dest)));
  }

  if k > 0 {
    bail!("line {}: too many indices into '{}'", line, lval.name);
  }
  Ok(TypedValue::new(info.ty.clone().ptr_to(), info.ptr))
}

fn gen_indices(gen: &mut IrGen, lval: &LVal, _line: Line) -> Result<Vec<Operand>> {
  lval.indices.iter().map(|idx| gen_index(gen, idx)).collect()
}

fn gen_index(gen: &mut IrGen, idx: &Expr) -> Result<Operand> {
  let v = gen_expr(gen, idx, ExprCtx::Value)?;
  match v.ty {
    Type::I32 => Ok(v.op),
    Type::I1 => Ok(widen_bool(gen, v).op),
    _ => Err(anyhow!("line {}: index must be an integer", idx.line)),
  }
}

pub(crate) fn gen_call(
  gen: &mut IrGen,
  callee: &str,
  args: &[Expr],
  line: Line,
) -> Result<TypedValue> {
  // Built-in vector reduction.
  if callee == "vsum" {
    if args.len() != 1 {
      bail!("line {}: vsum expects exactly one argument", line);
    }
    let v = gen_expr(gen, &args[0], ExprCtx::Value)?;
    let (elem, lanes) = match &v.ty {
      Type::Vector(elem, n) => ((**elem).clone(), *n),
      _ => bail!("line {}: vsum expects a vector argument", line),
    };
    let is_float = elem.is_float();
    let mut acc = scalar_zero(&elem);
    for i in 0..lanes {
      let lane = gen.builder().temp();
      gen.builder().push(Inst::Extract {
        dest: lane,
        vec_ty: v.ty.clone(),
        vec: v.op.clone(),
        index: Operand::ConstInt(i as i32),
      });
      let sum = gen.builder().temp();
      gen.builder().push(Inst::Binary {
        dest: sum,
        op: if is_float { BinOp::FAdd } else { BinOp::Add },
        ty: elem.clone(),
        lhs: acc,
        rhs: Operand::Temp(lane),
      });
      acc = Operand::Temp(sum);
    }
    return Ok(TypedValue::new(elem, acc));
  }

  // Timing aliases take no source arguments; the call-site line is the
  // injected argument.
  if library::is_timing_alias(callee) {
    let lib = library::lookup(callee).expect("timing aliases are library functions");
    gen.builder().push(Inst::Call {
      dest: None,
      ret: Type::Void,
      callee: lib.link_name.to_string(),
      args: vec![(Type::I32, Operand::ConstInt(line as i32))],
    });
    return Ok(TypedValue::new(Type::Void, Operand::ConstInt(0)));
  }

  let (ret, params, variadic, link_name) = if let Some(sig) = gen.funcs.get(callee) {
    (sig.ret.clone(), sig.params.clone(), false, callee.to_string())
  } else if let Some(lib) = library::lookup(callee) {
    (
      lib.ret.clone(),
      lib.params.clone(),
      lib.variadic,
      lib.link_name.to_string(),
    )
  } else {
    bail!("line {}: unknown function '{}'", line, callee);
  };

  if variadic {
    if args.len() < params.len() {
      bail!("line {}: too few arguments to '{}'", line, callee);
    }
  } else if args.len() != params.len() {
    bail!(
      "line {}: '{}' expects {} arguments, found {}",
      line,
      callee,
      params.len(),
      args.len()
    );
  }

  let mut lowered = Vec::with_capacity(args.len());
  for (i, arg) in args.iter().enumerate() {
    if let Some(expected) = params.get(i) {
      let tv = gen_fixed_arg(gen, callee, i, arg, expected, line)?;
      lowered.push((expected.clone(), tv.op));
    } else {
      // Variadic slot: floats promote to double per the C convention.
      let tv = gen_expr(gen, arg, ExprCtx::Value)?;
      let tv = match (tv.ty.clone(), tv.op) {
        (Type::F32, Operand::ConstFloat(v)) => {
          TypedValue::new(Type::F64, Operand::ConstDouble(v as f64))
        }
        (Type::F32, op) => emit_cast(gen, CastOp::FpExt, op, Type::F32, Type::F64)?,
        (Type::I1, op) => widen_bool(gen, TypedValue::new(Type::I1, op)),
        (ty, op) => TypedValue::new(ty, op),
      };
      lowered.push((tv.ty, tv.op));
    }
  }

  let dest = if ret == Type::Void {
    None
  } else {
    Some(gen.builder().temp())
  };
  gen.builder().push(Inst::Call {
    dest,
    ret: ret.clone(),
    callee: link_name,
    args: lowered,
  });
  let op = dest.map(Operand::Temp).unwrap_or(Operand::ConstInt(0));
  Ok(TypedValue::new(ret, op))
}

fn gen_fixed_arg(
  gen: &mut IrGen,
  callee: &str,
  i: usize,
  arg: &Expr,
  expected: &Type,
  line: Line,
) -> Result<TypedValue> {
  if let Type::Ptr(pointee) = expected {
    if **pointee == Type::I8 {
      // Format strings.
      if !matches!(arg.kind, ExprKind::StringLit(_)) {
        bail!("line {}: first argument to {} must be a string", line, callee);
      }
      return gen_expr(gen, arg, ExprCtx::Value);
    }
    let lval = match &arg.kind {
      ExprKind::LVal(lval) => lval,
      _ => bail!(
        "line {}: argument {} to '{}' must be an array lvalue",
        line,
        i + 1,
        callee
      ),
    };
    let mut addr = gen_lval_addr(gen, lval, arg.line)?;
    // Decay sub-array pointers until the expected element type is reached,
    // e.g. a 2-D row passed where a plain int* is expected.
    loop {
      if addr.ty == *expected {
        return Ok(addr);
      }
      let inner = match &addr.ty {
        Type::Ptr(inner) => (**inner).clone(),
        _ => break,
      };
      let elem = match &inner {
        Type::Array(elem, _) => (**elem).clone(),
        _ => break,
      };
      let dest = gen.builder().temp();
      gen.builder().push(Inst::Gep {
        dest,
        base_ty: inner,
        base: addr.op,
        indices: vec![Operand::ConstInt(0), Operand::ConstInt(0)],
      });
      addr = TypedValue::new(elem.ptr_to(), Operand::Temp(dest));
    }
    bail!(
      "line {}: type mismatch in argument {} to '{}'",
      line,
      i + 1,
      callee
    );
  }

  let tv = gen_expr(gen, arg, ExprCtx::Value)?;
  coerce_numeric(gen, tv, expected, line).map_err(|_| {
    anyhow!(
      "line {}: type mismatch in argument {} to '{}'",
      line,
      i + 1,
      callee
    )
  })
}

// ---------------------------------------------------------------------------
// Coercions

/// Converts a numeric value to the target scalar type, inserting int<->float
/// conversions. Constants convert in place, the way a constant-aware IR
/// builder would fold them. Anything non-numeric is a type error.
pub(crate) fn coerce_numeric(
  gen: &mut IrGen,
  tv: TypedValue,
  target: &Type,
  line: Line,
) -> Result<TypedValue> {
  if tv.ty == *target {
    return Ok(tv);
  }
  match (&tv.ty, target) {
    (Type::I1, Type::I32) => Ok(widen_bool(gen, tv)),
    (Type::I1, Type::F32) => {
      let wide = widen_bool(gen, tv);
      emit_cast(gen, CastOp::SiToFp, wide.op, Type::I32, Type::F32)
    }
    (Type::I32, Type::F32) => match tv.op {
      Operand::ConstInt(v) => Ok(TypedValue::new(Type::F32, Operand::ConstFloat(v as f32))),
      op => emit_cast(gen, CastOp::SiToFp, op, Type::I32, Type::F32),
    },
    (Type::F32, Type::I32) => match tv.op {
      Operand::ConstFloat(v) => Ok(TypedValue::new(Type::I32, Operand::ConstInt(v as i32))),
      op => emit_cast(gen, CastOp::FpToSi, op, Type::F32, Type::I32),
    },
    _ => Err(anyhow!(
      "line {}: cannot convert a value of type {} to {}",
      line,
      tv.ty,
      target
    )),
  }
}

/// Reduces any scalar to i1 by comparing against zero; the coercion every
/// condition goes through before branching.
pub(crate) fn to_bool(gen: &mut IrGen, tv: TypedValue, line: Line) -> Result<TypedValue> {
  match tv.ty {
    Type::I1 => Ok(tv),
    Type::I32 => emit_cmp(gen, CmpPred::Ne, Type::I32, tv.op, Operand::ConstInt(0)),
    Type::F32 => emit_cmp(gen, CmpPred::One, Type::F32, tv.op, Operand::ConstFloat(0.0)),
    _ => Err(anyhow!(
      "line {}: value of type {} cannot be used as a condition",
      line,
      tv.ty
    )),
  }
}

/// i1 widens to i32 wherever arithmetic consumes a comparison result.
fn widen_bool(gen: &mut IrGen, tv: TypedValue) -> TypedValue {
  if tv.ty != Type::I1 {
    return tv;
  }
  emit_cast(gen, CastOp::Zext, tv.op, Type::I1, Type::I32).expect("zext cannot fail")
}

pub(crate) fn scalar_zero(ty: &Type) -> Operand {
  if ty.is_float() {
    Operand::ConstFloat(0.0)
  } else {
    Operand::ConstInt(0)
  }
}

fn arith_op(op: BinaryOp, is_float: bool) -> BinOp {
  match (op, is_float) {
    (BinaryOp::Add, false) => BinOp::Add,
    (BinaryOp::Add, true) => BinOp::FAdd,
    (BinaryOp::Sub, false) => BinOp::Sub,
    (BinaryOp::Sub, true) => BinOp::FSub,
    (BinaryOp::Mul, false) => BinOp::Mul,
    (BinaryOp::Mul, true) => BinOp::FMul,
    (BinaryOp::Div, false) => BinOp::SDiv,
    (BinaryOp::Div, true) => BinOp::FDiv,
    _ => unreachable!("not an arithmetic operator: {:?}", op),
  }
}

fn cmp_pred(op: BinaryOp, is_float: bool) -> CmpPred {
  match (op, is_float) {
    (BinaryOp::Lt, false) => CmpPred::Slt,
    (BinaryOp::Gt, false) => CmpPred::Sgt,
    (BinaryOp::Le, false) => CmpPred::Sle,
    (BinaryOp::Ge, false) => CmpPred::Sge,
    (BinaryOp::Eq, false) => CmpPred::Eq,
    (BinaryOp::Ne, false) => CmpPred::Ne,
    (BinaryOp::Lt, true) => CmpPred::Olt,
    (BinaryOp::Gt, true) => CmpPred::Ogt,
    (BinaryOp::Le, true) => CmpPred::Ole,
    (BinaryOp::Ge, true) => CmpPred::Oge,
    (BinaryOp::Eq, true) => CmpPred::Oeq,
    (BinaryOp::Ne, true) => CmpPred::One,
    _ => unreachable!("not a comparison operator: {:?}", op),
  }
}

fn emit_binary(
  gen: &mut IrGen,
  op: BinOp,
  ty: Type,
  lhs: Operand,
  rhs: Operand,
) -> Result<TypedValue> {
  let dest = gen.builder().temp();
  gen.builder().push(Inst::Binary {
    dest,
    op,
    ty: ty.clone(),
    lhs,
    rhs,
  });
  Ok(TypedValue::new(ty, Operand::Temp(dest)))
}

fn emit_cmp(
  gen: &mut IrGen,
  pred: CmpPred,
  ty: Type,
  lhs: Operand,
  rhs: Operand,
) -> Result<TypedValue> {
  let dest = gen.builder().temp();
  gen.builder().push(Inst::Cmp {
    dest,
    pred,
    ty,
    lhs,
    rhs,
  });
  Ok(TypedValue::new(Type::I1, Operand::Temp(dest)))
}

fn emit_cast(
  gen: &mut IrGen,
  op: CastOp,
  value: Operand,
  from: Type,
  to: Type,
) -> Result<TypedValue> {
  let dest = gen.builder().temp();
  gen.builder().push(Inst::Cast {
    dest,
    op,
    value,
    from,
    to: to.clone(),
  });
  Ok(TypedValue::new(to, Operand::Temp(dest)))
}
