// SysY Compiler
//! RISC-V 64 assembly emission.

// A spill-everything translation: every IR temporary lives in a stack slot,
// every instruction loads its operands into scratch registers and stores
// the result back. Vector instructions are unrolled per lane. Scalar loads
// and stores move raw bits through integer registers; only arithmetic
// distinguishes float from int.

mod frame;

use crate::ir::{
  BasicBlock, BinOp, CastOp, CmpPred, Function, Inst, Linkage, Module, Operand, TempId, Term, Type,
};
use frame::{assign_locs, callee_shape, ArgLoc, Frame, SlotKind};

/// Renders the whole module as RV64 textual assembly.
pub fn emit_assembly(module: &Module) -> String {
  let mut out = String::new();

  if !module.strings.is_empty() {
    push(&mut out, "  .section .rodata");
    for s in &module.strings {
      push(&mut out, &format!("{}:", s.name));
      push(&mut out, &format!("  .asciz \"{}\"", escape_asm(&s.data)));
    }
  }

  if !module.globals.is_empty() {
    push(&mut out, "  .data");
    for g in &module.globals {
      push(&mut out, &format!("  .globl {}", g.name));
      push(&mut out, "  .align 2");
      push(&mut out, &format!("{}:", g.name));
      emit_data(&mut out, &g.ty, &g.init);
    }
  }

  push(&mut out, "  .text");
  for func in &module.functions {
    let mut emitter = FuncEmitter {
      out: &mut out,
      module,
      func,
      frame: Frame::build(module, func),
    };
    emitter.run();
  }
  out
}

fn push(out: &mut String, line: &str) {
  out.push_str(line);
  out.push('\n');
}

fn escape_asm(s: &str) -> String {
  let mut out = String::new();
  for b in s.bytes() {
    match b {
      b'"' => out.push_str("\\\""),
      b'\\' => out.push_str("\\\\"),
      b'\n' => out.push_str("\\n"),
      b'\t' => out.push_str("\\t"),
      b'\r' => out.push_str("\\r"),
      0x20..=0x7e => out.push(b as char),
      _ => out.push_str(&format!("\\{:03o}", b)),
    }
  }
  out
}

fn emit_data(out: &mut String, ty: &Type, init: &crate::ir::Init) {
  use crate::ir::Init;
  if init.is_zero() {
    push(out, &format!("  .zero {}", ty.size()));
    return;
  }
  match (ty, init) {
    (Type::I32, Init::Int(v)) => push(out, &format!("  .word {}", v)),
    (Type::F32, Init::Float(v)) => push(out, &format!("  .word {}", v.to_bits())),
    (Type::Array(elem, _), Init::Array(elems)) => {
      for e in elems {
        emit_data(out, elem, e);
      }
    }
    (Type::Vector(elem, _), Init::Vector(elems)) => {
      for e in elems {
        match (elem.as_ref(), e) {
          (Type::F32, Init::Float(v)) => push(out, &format!("  .word {}", v.to_bits())),
          (_, Init::Int(v)) => push(out, &format!("  .word {}", v)),
          (_, Init::Float(v)) => push(out, &format!("  .word {}", v.to_bits())),
          (_, Init::Zero) => push(out, "  .zero 4"),
          _ => panic!("malformed vector initializer"),
        }
      }
    }
    _ => panic!("malformed global initializer for type {}", ty),
  }
}

struct FuncEmitter<'a> {
  out: &'a mut String,
  module: &'a Module,
  func: &'a Function,
  frame: Frame,
}

impl<'a> FuncEmitter<'a> {
  fn line(&mut self, text: &str) {
    push(self.out, &format!("  {}", text));
  }

  fn label(&mut self, text: &str) {
    push(self.out, &format!("{}:", text));
  }

  fn block_label(&self, block: &str) -> String {
    format!(".L{}_{}", self.func.name, block)
  }

  /// lw/ld/sw/sd/flw/fsw/fsd with an offset that may exceed the 12-bit
  /// immediate range; t6 is reserved for address materialisation.
  fn mem(&mut self, op: &str, reg: &str, off: i64, base: &str) {
    if (-2048..=2047).contains(&off) {
      self.line(&format!("{} {}, {}({})", op, reg, off, base));
    } else {
      self.line(&format!("li t6, {}", off));
      self.line(&format!("add t6, t6, {}", base));
      self.line(&format!("{} {}, 0(t6)", op, reg));
    }
  }

  /// Materialises fp+offset into `reg`.
  fn addr(&mut self, reg: &str, off: i64) {
    if (-2048..=2047).contains(&off) {
      self.line(&format!("addi {}, s0, {}", reg, off));
    } else {
      self.line(&format!("li {}, {}", reg, off));
      self.line(&format!("add {}, {}, s0", reg, reg));
    }
  }

  /// Loads a scalar operand's bits into an integer register. Alloca temps
  /// produce their address; globals produce theirs.
  fn load_bits(&mut self, op: &Operand, reg: &str) {
    match op {
      Operand::ConstInt(v) => self.line(&format!("li {}, {}", reg, v)),
      Operand::ConstBool(v) => self.line(&format!("li {}, {}", reg, *v as i32)),
      Operand::ConstFloat(v) => self.line(&format!("li {}, {}", reg, v.to_bits() as i32)),
      Operand::ConstDouble(v) => self.line(&format!("li {}, {}", reg, v.to_bits() as i64)),
      Operand::Undef => self.line(&format!("li {}, 0", reg)),
      Operand::Global(name) => self.line(&format!("la {}, {}", reg, name)),
      Operand::Temp(t) => {
        let slot = self.frame.slot(*t).clone();
        match slot.kind {
          SlotKind::Region => self.addr(reg, slot.offset),
          SlotKind::Value => self.mem("ld", reg, slot.offset, "s0"),
        }
      }
    }
  }

  /// Loads a float operand into a float register.
  fn load_float(&mut self, op: &Operand, freg: &str, ty: &Type) {
    let wide = *ty == Type::F64;
    match op {
      Operand::ConstFloat(v) => {
        self.line(&format!("li t5, {}", v.to_bits() as i32));
        self.line(&format!("fmv.w.x {}, t5", freg));
      }
      Operand::ConstDouble(v) => {
        self.line(&format!("li t5, {}", v.to_bits() as i64));
        self.line(&format!("fmv.d.x {}, t5", freg));
      }
      Operand::Undef => self.line(&format!("fmv.w.x {}, x0", freg)),
      Operand::Temp(t) => {
        let slot = self.frame.slot(*t).clone();
        let op = if wide { "fld" } else { "flw" };
        self.mem(op, freg, slot.offset, "s0");
      }
      other => panic!("operand {} is not a float value", other),
    }
  }

  fn store_slot(&mut self, reg: &str, dest: TempId) {
    let slot = self.frame.slot(dest).clone();
    self.mem("sd", reg, slot.offset, "s0");
  }

  fn store_float_slot(&mut self, freg: &str, dest: TempId, ty: &Type) {
    let slot = self.frame.slot(dest).clone();
    let op = if *ty == Type::F64 { "fsd" } else { "fsw" };
    self.mem(op, freg, slot.offset, "s0");
  }

  fn run(&mut self) {
    if self.func.linkage == Linkage::External {
      push(self.out, &format!("  .globl {}", self.func.name));
    }
    push(self.out, &format!("{}:", self.func.name));
    self.prologue();
    let func = self.func;
    for block in &func.blocks {
      let label = self.block_label(&block.label);
      self.label(&label);
      self.emit_block(block);
    }
  }

  fn prologue(&mut self) {
    let size = self.frame.size;
    if size <= 2047 {
      self.line(&format!("addi sp, sp, -{}", size));
    } else {
      self.line(&format!("li t0, {}", size));
      self.line("sub sp, sp, t0");
    }
    self.mem("sd", "ra", size - 8, "sp");
    self.mem("sd", "s0", size - 16, "sp");
    if size <= 2047 {
      self.line(&format!("addi s0, sp, {}", size));
    } else {
      self.line(&format!("li t0, {}", size));
      self.line("add s0, sp, t0");
    }

    if let Some(off) = self.frame.sret_offset {
      self.mem("sd", "a0", off, "s0");
    }

    // Move the incoming arguments into their slots.
    let sret = self.frame.sret_offset.is_some();
    let (locs, _) = assign_locs(&self.func.params, self.func.params.len(), sret);
    for (i, loc) in locs.iter().enumerate() {
      let dest = TempId(i as u32);
      let ty = self.func.params[i].clone();
      match loc {
        ArgLoc::Int(n) => self.store_slot(&format!("a{}", n), dest),
        ArgLoc::Float(n) => self.store_float_slot(&format!("fa{}", n), dest, &ty),
        ArgLoc::Stack(off) => {
          if let Type::Vector(..) = ty {
            let slot_off = self.frame.slot(dest).offset;
            for lane in 0..(ty.size() as i64 / 4) {
              self.mem("lw", "t0", off + lane * 4, "s0");
              self.mem("sw", "t0", slot_off + lane * 4, "s0");
            }
          } else {
            self.mem("ld", "t0", *off, "s0");
            self.store_slot("t0", dest);
          }
        }
      }
    }
  }

  fn epilogue(&mut self) {
    let size = self.frame.size;
    self.mem("ld", "ra", size - 8, "sp");
    self.mem("ld", "s0", size - 16, "sp");
    if size <= 2047 {
      self.line(&format!("addi sp, sp, {}", size));
    } else {
      self.line(&format!("li t0, {}", size));
      self.line("add sp, sp, t0");
    }
    self.line("ret");
  }

  fn emit_block(&mut self, block: &BasicBlock) {
    for inst in &block.insts {
      self.emit_inst(inst);
    }
    match block.term.as_ref().expect("block must be terminated") {
      Term::Br(target) => {
        let label = self.block_label(target);
        self.line(&format!("j {}", label));
      }
      Term::CondBr(cond, t, e) => {
        self.load_bits(cond, "t0");
        let t = self.block_label(t);
        let e = self.block_label(e);
        self.line(&format!("bnez t0, {}", t));
        self.line(&format!("j {}", e));
      }
      Term::Ret(value) => {
        match value {
          None => {}
          Some((ty, op)) => match ty {
            Type::F32 => self.load_float(op, "fa0", ty),
            Type::Vector(..) => {
              // Copy the value through the hidden return pointer.
              let sret = self.frame.sret_offset.expect("vector return needs sret");
              self.mem("ld", "t1", sret, "s0");
              if let Operand::Temp(t) = op {
                let src = self.frame.slot(*t).offset;
                for lane in 0..(ty.size() as i64 / 4) {
                  self.mem("lw", "t0", src + lane * 4, "s0");
                  self.mem("sw", "t0", lane * 4, "t1");
                }
              }
            }
            _ => self.load_bits(op, "a0"),
          },
        }
        self.epilogue();
      }
    }
  }

  fn emit_inst(&mut self, inst: &Inst) {
    match inst {
      // Handled by the frame layout.
      Inst::Alloca { .. } => {}

      Inst::Load { dest, ty, addr } => {
        if let Type::Vector(..) = ty {
          self.load_bits(addr, "t1");
          let dst = self.frame.slot(*dest).offset;
          for lane in 0..(ty.size() as i64 / 4) {
            self.mem("lw", "t0", lane * 4, "t1");
            self.mem("sw", "t0", dst + lane * 4, "s0");
          }
        } else {
          self.load_bits(addr, "t1");
          let op = if ty.size() == 8 { "ld" } else { "lw" };
          self.mem(op, "t0", 0, "t1");
          self.store_slot("t0", *dest);
        }
      }

      Inst::Store { ty, value, addr } => {
        if let Type::Vector(..) = ty {
          let src = match value {
            Operand::Temp(t) => self.frame.slot(*t).offset,
            _ => panic!("vector store expects a temp value"),
          };
          self.load_bits(addr, "t1");
          for lane in 0..(ty.size() as i64 / 4) {
            self.mem("lw", "t0", src + lane * 4, "s0");
            self.mem("sw", "t0", lane * 4, "t1");
          }
        } else {
          self.load_bits(value, "t0");
          self.load_bits(addr, "t1");
          let op = if ty.size() == 8 { "sd" } else { "sw" };
          self.mem(op, "t0", 0, "t1");
        }
      }

      Inst::Binary {
        dest,
        op,
        ty,
        lhs,
        rhs,
      } => match ty {
        Type::Vector(elem, lanes) => self.emit_vector_binary(*dest, *op, elem, *lanes, lhs, rhs),
        Type::F32 => {
          self.load_float(lhs, "ft0", ty);
          self.load_float(rhs, "ft1", ty);
          let mnemonic = match op {
            BinOp::FAdd => "fadd.s",
            BinOp::FSub => "fsub.s",
            BinOp::FMul => "fmul.s",
            BinOp::FDiv => "fdiv.s",
            _ => panic!("operator {:?} is not a float operation", op),
          };
          self.line(&format!("{} ft0, ft0, ft1", mnemonic));
          self.store_float_slot("ft0", *dest, ty);
        }
        _ => {
          self.load_bits(lhs, "t0");
          self.load_bits(rhs, "t1");
          let mnemonic = match op {
            BinOp::Add => "addw",
            BinOp::Sub => "subw",
            BinOp::Mul => "mulw",
            BinOp::SDiv => "divw",
            BinOp::SRem => "remw",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            _ => panic!("operator {:?} is not an integer operation", op),
          };
          self.line(&format!("{} t0, t0, t1", mnemonic));
          self.store_slot("t0", *dest);
        }
      },

      Inst::Cmp {
        dest,
        pred,
        ty,
        lhs,
        rhs,
      } => {
        if pred.is_float() {
          self.load_float(lhs, "ft0", ty);
          self.load_float(rhs, "ft1", ty);
          match pred {
            CmpPred::Oeq => self.line("feq.s t0, ft0, ft1"),
            CmpPred::One => {
              self.line("feq.s t0, ft0, ft1");
              self.line("xori t0, t0, 1");
            }
            CmpPred::Olt => self.line("flt.s t0, ft0, ft1"),
            CmpPred::Ole => self.line("fle.s t0, ft0, ft1"),
            CmpPred::Ogt => self.line("flt.s t0, ft1, ft0"),
            CmpPred::Oge => self.line("fle.s t0, ft1, ft0"),
            _ => unreachable!(),
          }
        } else {
          self.load_bits(lhs, "t0");
          self.load_bits(rhs, "t1");
          match pred {
            CmpPred::Slt => self.line("slt t0, t0, t1"),
            CmpPred::Sgt => self.line("slt t0, t1, t0"),
            CmpPred::Sle => {
              self.line("slt t0, t1, t0");
              self.line("seqz t0, t0");
            }
            CmpPred::Sge => {
              self.line("slt t0, t0, t1");
              self.line("seqz t0, t0");
            }
            CmpPred::Eq => {
              self.line("xor t0, t0, t1");
              self.line("seqz t0, t0");
            }
            CmpPred::Ne => {
              self.line("xor t0, t0, t1");
              self.line("snez t0, t0");
            }
            _ => unreachable!(),
          }
        }
        self.store_slot("t0", *dest);
      }

      Inst::Cast {
        dest,
        op,
        value,
        from,
        to: _,
      } => match op {
        CastOp::SiToFp => {
          self.load_bits(value, "t0");
          self.line("fcvt.s.w ft0, t0");
          self.store_float_slot("ft0", *dest, &Type::F32);
        }
        CastOp::FpToSi => {
          self.load_float(value, "ft0", from);
          self.line("fcvt.w.s t0, ft0, rtz");
          self.store_slot("t0", *dest);
        }
        CastOp::FpExt => {
          self.load_float(value, "ft0", from);
          self.line("fcvt.d.s ft0, ft0");
          self.store_float_slot("ft0", *dest, &Type::F64);
        }
        CastOp::Zext => {
          self.load_bits(value, "t0");
          self.store_slot("t0", *dest);
        }
      },

      Inst::Gep {
        dest,
        base_ty,
        base,
        indices,
      } => {
        self.load_bits(base, "t0");
        let mut cur = base_ty;
        for (i, idx) in indices.iter().enumerate() {
          if i > 0 {
            cur = match cur {
              Type::Array(elem, _) => elem.as_ref(),
              other => other,
            };
          }
          let stride = cur.size() as i64;
          if let Some(c) = idx.as_const_int() {
            let off = *c as i64 * stride;
            if off != 0 {
              self.line(&format!("li t1, {}", off));
              self.line("add t0, t0, t1");
            }
          } else {
            self.load_bits(idx, "t1");
            self.line(&format!("li t2, {}", stride));
            self.line("mul t1, t1, t2");
            self.line("add t0, t0, t1");
          }
        }
        self.store_slot("t0", *dest);
      }

      Inst::Extract {
        dest,
        vec_ty,
        vec,
        index,
      } => {
        let elem_is_float = matches!(vec_ty, Type::Vector(elem, _) if elem.is_float());
        let src = match vec {
          Operand::Temp(t) => self.frame.slot(*t).offset,
          _ => panic!("extract expects a temp vector"),
        };
        match index {
          Operand::ConstInt(c) => {
            let lane_off = src + *c as i64 * 4;
            if elem_is_float {
              self.mem("flw", "ft0", lane_off, "s0");
            } else {
              self.mem("lw", "t0", lane_off, "s0");
            }
          }
          _ => {
            self.addr("t1", src);
            self.load_bits(index, "t2");
            self.line("slli t2, t2, 2");
            self.line("add t1, t1, t2");
            if elem_is_float {
              self.line("flw ft0, 0(t1)");
            } else {
              self.line("lw t0, 0(t1)");
            }
          }
        }
        if elem_is_float {
          self.store_float_slot("ft0", *dest, &Type::F32);
        } else {
          self.store_slot("t0", *dest);
        }
      }

      Inst::Insert {
        dest,
        vec_ty,
        vec,
        elem,
        index,
      } => {
        let lanes = vec_ty.size() as i64 / 4;
        let dst = self.frame.slot(*dest).offset;
        if let Operand::Temp(src) = vec {
          let src = self.frame.slot(*src).offset;
          for lane in 0..lanes {
            self.mem("lw", "t0", src + lane * 4, "s0");
            self.mem("sw", "t0", dst + lane * 4, "s0");
          }
        }
        self.load_bits(elem, "t0");
        self.addr("t1", dst);
        match index {
          Operand::ConstInt(c) => self.mem("sw", "t0", *c as i64 * 4, "t1"),
          _ => {
            self.load_bits(index, "t2");
            self.line("slli t2, t2, 2");
            self.line("add t1, t1, t2");
            self.line("sw t0, 0(t1)");
          }
        }
      }

      Inst::Splat {
        dest,
        vec_ty,
        scalar,
      } => {
        let lanes = vec_ty.size() as i64 / 4;
        let dst = self.frame.slot(*dest).offset;
        self.load_bits(scalar, "t0");
        for lane in 0..lanes {
          self.mem("sw", "t0", dst + lane * 4, "s0");
        }
      }

      Inst::Call {
        dest,
        ret,
        callee,
        args,
      } => self.emit_call(dest.as_ref(), ret, callee, args),
    }
  }

  fn emit_vector_binary(
    &mut self,
    dest: TempId,
    op: BinOp,
    elem: &Type,
    lanes: usize,
    lhs: &Operand,
    rhs: &Operand,
  ) {
    let lhs_off = match lhs {
      Operand::Temp(t) => self.frame.slot(*t).offset,
      _ => panic!("vector operand must be a temp"),
    };
    let rhs_off = match rhs {
      Operand::Temp(t) => self.frame.slot(*t).offset,
      _ => panic!("vector operand must be a temp"),
    };
    let dst = self.frame.slot(dest).offset;
    for lane in 0..lanes as i64 {
      if elem.is_float() {
        let mnemonic = match op {
          BinOp::FAdd => "fadd.s",
          BinOp::FSub => "fsub.s",
          BinOp::FMul => "fmul.s",
          BinOp::FDiv => "fdiv.s",
          _ => panic!("operator {:?} is not a float operation", op),
        };
        self.mem("flw", "ft0", lhs_off + lane * 4, "s0");
        self.mem("flw", "ft1", rhs_off + lane * 4, "s0");
        self.line(&format!("{} ft0, ft0, ft1", mnemonic));
        self.mem("fsw", "ft0", dst + lane * 4, "s0");
      } else {
        let mnemonic = match op {
          BinOp::Add => "addw",
          BinOp::Sub => "subw",
          BinOp::Mul => "mulw",
          BinOp::SDiv => "divw",
          BinOp::SRem => "remw",
          _ => panic!("operator {:?} is not an integer operation", op),
        };
        self.mem("lw", "t0", lhs_off + lane * 4, "s0");
        self.mem("lw", "t1", rhs_off + lane * 4, "s0");
        self.line(&format!("{} t0, t0, t1", mnemonic));
        self.mem("sw", "t0", dst + lane * 4, "s0");
      }
    }
  }

  fn emit_call(&mut self, dest: Option<&TempId>, ret: &Type, callee: &str, args: &[(Type, Operand)]) {
    let (fixed, _) = callee_shape(self.module, callee);
    let tys: Vec<Type> = args.iter().map(|(ty, _)| ty.clone()).collect();
    let sret = matches!(ret, Type::Vector(..));
    let (locs, _) = assign_locs(&tys, fixed, sret);

    for ((ty, op), loc) in args.iter().zip(&locs) {
      match loc {
        // Variadic float slots travel in integer registers; load_bits moves
        // raw bits either way.
        ArgLoc::Int(n) => self.load_bits(op, &format!("a{}", n)),
        ArgLoc::Float(n) => self.load_float(op, &format!("fa{}", n), ty),
        ArgLoc::Stack(off) => {
          if let Type::Vector(..) = ty {
            let src = match op {
              Operand::Temp(t) => self.frame.slot(*t).offset,
              _ => panic!("vector argument must be a temp"),
            };
            for lane in 0..(ty.size() as i64 / 4) {
              self.mem("lw", "t0", src + lane * 4, "s0");
              self.mem("sw", "t0", off + lane * 4, "sp");
            }
          } else {
            self.load_bits(op, "t0");
            self.mem("sd", "t0", *off, "sp");
          }
        }
      }
    }

    if sret {
      let dest = dest.expect("vector call must have a destination");
      let off = self.frame.slot(*dest).offset;
      self.addr("a0", off);
    }

    self.line(&format!("call {}", callee));

    if !sret {
      if let Some(dest) = dest {
        match ret {
          Type::F32 => self.store_float_slot("fa0", *dest, ret),
          Type::Void => {}
          _ => self.store_slot("a0", *dest),
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::irgen;
  use crate::parse;

  fn compile(src: &str) -> String {
    let mut unit = parse::parse(src).expect("test source must parse");
    crate::ast::fold::AstOptimizer::default().optimize(&mut unit);
    let module = irgen::generate(&unit).expect("test source must lower");
    emit_assembly(&module)
  }

  #[test]
  fn emits_main_with_prologue_and_ret() {
    let asm = compile("int main() { return 42; }");
    assert!(asm.contains("  .globl main"));
    assert!(asm.contains("main:"));
    assert!(asm.contains("li a0, 42"));
    assert!(asm.contains("  ret"));
  }

  #[test]
  fn internal_functions_get_no_globl() {
    let asm = compile("int helper() { return 1; } int main() { return helper(); }");
    assert!(!asm.contains(".globl helper"));
    assert!(asm.contains("helper:"));
    assert!(asm.contains("call helper"));
  }

  #[test]
  fn globals_become_data_words() {
    let asm = compile("int a[3] = {1, 2}; int main() { return a[0]; }");
    assert!(asm.contains("  .data"));
    assert!(asm.contains("a:"));
    assert!(asm.contains("  .word 1"));
    assert!(asm.contains("  .word 2"));
    // The unsupplied element is zero-filled.
    assert!(asm.contains("  .zero 4") || asm.contains("  .word 0"));
  }

  #[test]
  fn string_literals_land_in_rodata() {
    let asm = compile("int main() { putf(\"%d\\n\", 1); return 0; }");
    assert!(asm.contains(".section .rodata"));
    assert!(asm.contains("  .asciz \"%d\\n\""));
    assert!(asm.contains("call putf"));
  }

  #[test]
  fn while_loop_branches_between_blocks() {
    let asm = compile(
      "int main() { int i = 0; while (i < 10) { i = i + 1; } return i; }",
    );
    assert!(asm.contains(".Lmain_whilecond0:"));
    assert!(asm.contains(".Lmain_whilebody1:"));
    assert!(asm.contains(".Lmain_whileafter2:"));
    assert!(asm.contains("bnez t0, .Lmain_whilebody1"));
  }

  #[test]
  fn vector_ops_unroll_per_lane() {
    let asm = compile(
      "vector<int, 4> v = {1, 2, 3, 4};\n\
       int main() { v = v + 10; return vsum(v); }",
    );
    // Four lane stores for the splat and four adds for the vector add.
    assert!(asm.matches("addw").count() >= 4);
    // vsum is expanded inline, never called.
    assert!(!asm.contains("call vsum"));
  }
}
