// SysY Compiler
//! Statement lowering.

// Control flow follows the usual block schemes: if/else gets then/else/endif
// blocks, while gets cond/body/after. The break and continue target stacks
// are pushed on loop entry and popped on exit; a break or continue with an
// empty stack is a fatal error.

use anyhow::{anyhow, bail, Result};

use crate::ast::{Block, BlockItem, Expr, LVal, Line, Stmt, StmtKind};
use crate::ir::{Inst, Operand, Term, Type};
use crate::irgen::expr::{coerce_numeric, gen_expr, gen_lval_addr, to_bool, ExprCtx};
use crate::irgen::IrGen;

pub(crate) fn gen_block(gen: &mut IrGen, block: &Block) -> Result<()> {
  gen.symbols.push_scope();
  for item in &block.items {
    match item {
      BlockItem::Decl(decl) => gen.gen_decl(decl)?,
      BlockItem::Stmt(stmt) => gen_stmt(gen, stmt)?,
    }
  }
  gen.symbols.pop_scope();
  Ok(())
}

pub(crate) fn gen_stmt(gen: &mut IrGen, stmt: &Stmt) -> Result<()> {
  match &stmt.kind {
    StmtKind::Assign(lval, value) => gen_assign(gen, lval, value, stmt.line),
    StmtKind::Expr(Some(e)) => {
      gen_expr(gen, e, ExprCtx::Value)?;
      Ok(())
    }
    StmtKind::Expr(None) => Ok(()),
    StmtKind::Block(block) => gen_block(gen, block),
    StmtKind::If(cond, then_stmt, else_stmt) => {
      gen_if(gen, cond, then_stmt, else_stmt.as_deref(), stmt.line)
    }
    StmtKind::While(cond, body) => gen_while(gen, cond, body, stmt.line),
    StmtKind::Break => {
      let target = gen
        .break_targets
        .last()
        .cloned()
        .ok_or_else(|| anyhow!("line {}: break statement outside of loop", stmt.line))?;
      gen.builder().terminate(Term::Br(target));
      Ok(())
    }
    StmtKind::Continue => {
      let target = gen
        .continue_targets
        .last()
        .cloned()
        .ok_or_else(|| anyhow!("line {}: continue statement outside of loop", stmt.line))?;
      gen.builder().terminate(Term::Br(target));
      Ok(())
    }
    StmtKind::Return(value) => gen_return(gen, value.as_ref(), stmt.line),
  }
}

fn gen_assign(gen: &mut IrGen, lval: &LVal, value: &Expr, line: Line) -> Result<()> {
  let info = gen
    .symbols
    .lookup(&lval.name)
    .ok_or_else(|| anyhow!("line {}: variable '{}' not defined", line, lval.name))?
    .clone();

  if info.is_array && lval.indices.is_empty() {
    bail!(
      "line {}: cannot assign to array name '{}' directly, use array indexing",
      line,
      lval.name
    );
  }

  // Vector assignment: whole-vector stores require an identical vector
  // value; element assignment is load, insertelement, store.
  if let Type::Vector(elem, _) = &info.ty {
    if info.is_const {
      bail!("line {}: cannot assign to constant '{}'", line, lval.name);
    }
    let elem = (**elem).clone();
    match lval.indices.len() {
      0 => {
        let rv = gen_expr(gen, value, ExprCtx::Value)?;
        if rv.ty != info.ty {
          bail!(
            "line {}: cannot assign a value of type {} to vector '{}'",
            line,
            rv.ty,
            lval.name
          );
        }
        gen.builder().push(Inst::Store {
          ty: info.ty.clone(),
          value: rv.op,
          addr: info.ptr.clone(),
        });
        Ok(())
      }
      1 => {
        let vec = gen.builder().temp();
        gen.builder().push(Inst::Load {
          dest: vec,
          ty: info.ty.clone(),
          addr: info.ptr.clone(),
        });
        let index = {
          let idx = gen_expr(gen, &lval.indices[0], ExprCtx::Value)?;
          match idx.ty {
            Type::I32 => idx.op,
            Type::I1 => coerce_numeric(gen, idx, &Type::I32, line)?.op,
            _ => bail!("line {}: vector index must be an integer", line),
          }
        };
        let rv = gen_expr(gen, value, ExprCtx::Value)?;
        let rv = coerce_numeric(gen, rv, &elem, line)?;
        let updated = gen.builder().temp();
        gen.builder().push(Inst::Insert {
          dest: updated,
          vec_ty: info.ty.clone(),
          vec: Operand::Temp(vec),
          elem: rv.op,
          index,
        });
        gen.builder().push(Inst::Store {
          ty: info.ty.clone(),
          value: Operand::Temp(updated),
          addr: info.ptr.clone(),
        });
        Ok(())
      }
      _ => bail!("line {}: vector index must be one-dimensional", line),
    }
  } else {
    let addr = gen_lval_addr(gen, lval, line)?;
    let pointee = match &addr.ty {
      Type::Ptr(inner) => (**inner).clone(),
      _ => unreachable!("address mode always yields a pointer"),
    };
    if !pointee.is_scalar() {
      bail!(
        "line {}: cannot assign to a partially indexed array '{}'",
        line,
        lval.name
      );
    }
    let rv = gen_expr(gen, value, ExprCtx::Value)?;
    let rv = coerce_numeric(gen, rv, &pointee, line)?;
    gen.builder().push(Inst::Store {
      ty: pointee,
      value: rv.op,
      addr: addr.op,
    });
    Ok(())
  }
}

fn gen_return(gen: &mut IrGen, value: Option<&Expr>, line: Line) -> Result<()> {
  let ret = gen.builder().ret_ty().clone();
  match value {
    Some(expr) => {
      if ret == Type::Void {
        bail!("line {}: void function cannot return a value", line);
      }
      let v = gen_expr(gen, expr, ExprCtx::Value)?;
      let v = if matches!(ret, Type::Vector(..)) {
        if v.ty != ret {
          bail!("line {}: return value does not match the vector return type", line);
        }
        v
      } else {
        coerce_numeric(gen, v, &ret, line)?
      };
      gen.builder().terminate(Term::Ret(Some((ret, v.op))));
    }
    None => {
      if ret != Type::Void {
        bail!("line {}: non-void function must return a value", line);
      }
      gen.builder().terminate(Term::Ret(None));
    }
  }
  Ok(())
}

fn gen_if(
  gen: &mut IrGen,
  cond: &Expr,
  then_stmt: &Stmt,
  else_stmt: Option<&Stmt>,
  line: Line,
) -> Result<()> {
  let c = gen_expr(gen, cond, ExprCtx::Condition)?;
  let c = to_bool(gen, c, line)?;

  let then_label = gen.builder().fresh_label("then");
  let endif_label = gen.builder().fresh_label("endif");
  let else_label = else_stmt.map(|_| gen.builder().fresh_label("else"));

  let false_target = else_label.clone().unwrap_or_else(|| endif_label.clone());
  gen
    .builder()
    .terminate(Term::CondBr(c.op, then_label.clone(), false_target));

  gen.builder().switch_to(then_label);
  gen_stmt(gen, then_stmt)?;
  if !gen.builder().is_terminated() {
    gen.builder().terminate(Term::Br(endif_label.clone()));
  }

  if let (Some(else_label), Some(else_stmt)) = (else_label, else_stmt) {
    gen.builder().switch_to(else_label);
    gen_stmt(gen, else_stmt)?;
    if !gen.builder().is_terminated() {
      gen.builder().terminate(Term::Br(endif_label.clone()));
    }
  }

  gen.builder().switch_to(endif_label);
  Ok(())
}

fn gen_while(gen: &mut IrGen, cond: &Expr, body: &Stmt, line: Line) -> Result<()> {
  let cond_label = gen.builder().fresh_label("whilecond");
  let body_label = gen.builder().fresh_label("whilebody");
  let after_label = gen.builder().fresh_label("whileafter");

  gen.break_targets.push(after_label.clone());
  gen.continue_targets.push(cond_label.clone());

  gen.builder().terminate(Term::Br(cond_label.clone()));
  gen.builder().switch_to(cond_label.clone());
  let c = gen_expr(gen, cond, ExprCtx::Condition)?;
  let c = to_bool(gen, c, line)?;
  gen
    .builder()
    .terminate(Term::CondBr(c.op, body_label.clone(), after_label.clone()));

  gen.builder().switch_to(body_label);
  gen_stmt(gen, body)?;
  if !gen.builder().is_terminated() {
    gen.builder().terminate(Term::Br(cond_label));
  }

  gen.builder().switch_to(after_label);
  gen.break_targets.pop();
  gen.continue_targets.pop();
  Ok(())
}
