// SysY Compiler
//! Stack-frame layout for the RISC-V backend.

// Every temporary gets a frame slot addressed off the frame pointer:
// scalars an 8-byte slot, vectors their full lane storage, allocas the full
// size of the allocated object. Outgoing stack arguments (beyond the eight
// argument registers, plus all vector arguments) live at the bottom of the
// frame, so a caller's sp-relative store lands at the callee's fp-relative
// offset.

use std::collections::HashMap;

use crate::ir::{Function, Inst, Module, TempId, Type};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotKind {
  /// The temp's value lives in the slot.
  Value,
  /// The temp is the address of the slot (alloca).
  Region,
}

#[derive(Clone, Debug)]
pub(crate) struct Slot {
  pub offset: i64,
  pub ty: Type,
  pub kind: SlotKind,
}

/// Where one argument travels in a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArgLoc {
  Int(usize),
  Float(usize),
  Stack(i64),
}

/// LP64-style assignment: fixed float arguments use fa0-fa7, everything
/// else (including the variadic tail and promoted doubles) uses a0-a7;
/// vectors always travel on the stack. `sret` reserves a0 for the hidden
/// vector-return pointer.
pub(crate) fn assign_locs(tys: &[Type], fixed: usize, sret: bool) -> (Vec<ArgLoc>, i64) {
  let mut ints: usize = if sret { 1 } else { 0 };
  let mut floats: usize = 0;
  let mut stack: i64 = 0;
  let mut locs = Vec::with_capacity(tys.len());
  for (i, ty) in tys.iter().enumerate() {
    let loc = if matches!(ty, Type::Vector(..)) {
      let off = stack;
      stack += (ty.size() as i64 + 7) & !7;
      ArgLoc::Stack(off)
    } else if ty.is_float() && i < fixed {
      if floats < 8 {
        floats += 1;
        ArgLoc::Float(floats - 1)
      } else {
        let off = stack;
        stack += 8;
        ArgLoc::Stack(off)
      }
    } else if ints < 8 {
      ints += 1;
      ArgLoc::Int(ints - 1)
    } else {
      let off = stack;
      stack += 8;
      ArgLoc::Stack(off)
    };
    locs.push(loc);
  }
  (locs, stack)
}

/// Fixed-arity and variadic boundary of a callee, from the module.
pub(crate) fn callee_shape(module: &Module, callee: &str) -> (usize, bool) {
  if let Some(func) = module.function(callee) {
    (func.params.len(), false)
  } else if let Some(decl) = module.externs.iter().find(|e| e.name == callee) {
    (decl.params.len(), decl.variadic)
  } else {
    (0, true)
  }
}

pub(crate) struct Frame {
  slots: HashMap<TempId, Slot>,
  /// Total frame size, 16-byte aligned. ra sits at fp-8, s0 at fp-16.
  pub size: i64,
  /// Slot holding the hidden vector-return pointer, when present.
  pub sret_offset: Option<i64>,
}

impl Frame {
  pub fn build(module: &Module, func: &Function) -> Frame {
    let mut slots = HashMap::new();
    let mut used: i64 = 16; // saved ra and s0

    fn place(slots: &mut HashMap<TempId, Slot>, used: &mut i64, id: TempId, ty: Type, kind: SlotKind) {
      let bytes = match kind {
        SlotKind::Region => (ty.size() as i64 + 7) & !7,
        SlotKind::Value => ((ty.size() as i64).max(8) + 7) & !7,
      };
      *used += bytes;
      slots.insert(
        id,
        Slot {
          offset: -*used,
          ty,
          kind,
        },
      );
    }

    for (i, ty) in func.params.iter().enumerate() {
      place(&mut slots, &mut used, TempId(i as u32), ty.clone(), SlotKind::Value);
    }

    let sret_offset = if matches!(func.ret, Type::Vector(..)) {
      used += 8;
      Some(-used)
    } else {
      None
    };

    let mut max_out: i64 = 0;
    for block in &func.blocks {
      for inst in &block.insts {
        match inst {
          Inst::Alloca { dest, ty } => {
            place(&mut slots, &mut used, *dest, ty.clone(), SlotKind::Region);
          }
          Inst::Call {
            dest,
            ret,
            callee,
            args,
          } => {
            if let Some(dest) = dest {
              place(&mut slots, &mut used, *dest, ret.clone(), SlotKind::Value);
            }
            let (fixed, _) = callee_shape(module, callee);
            let tys: Vec<Type> = args.iter().map(|(ty, _)| ty.clone()).collect();
            let (_, out) = assign_locs(&tys, fixed, matches!(ret, Type::Vector(..)));
            max_out = max_out.max(out);
          }
          _ => {
            if let Some(dest) = inst.dest() {
              place(&mut slots, &mut used, dest, dest_type(inst), SlotKind::Value);
            }
          }
        }
      }
    }

    let size = (used + max_out + 15) & !15;
    Frame {
      slots,
      size,
      sret_offset,
    }
  }

  pub fn slot(&self, id: TempId) -> &Slot {
    self
      .slots
      .get(&id)
      .unwrap_or_else(|| panic!("temp {} has no frame slot", id))
  }
}

/// Type of the value an instruction defines.
fn dest_type(inst: &Inst) -> Type {
  match inst {
    Inst::Alloca { ty, .. } => ty.clone().ptr_to(),
    Inst::Load { ty, .. } => ty.clone(),
    Inst::Binary { ty, .. } => ty.clone(),
    Inst::Cmp { .. } => Type::I1,
    Inst::Cast { to, .. } => to.clone(),
    Inst::Gep { base_ty, base: _, indices, .. } => {
      // One level per index beyond the leading scale.
      let mut ty = base_ty;
      for _ in 1..indices.len() {
        ty = match ty {
          Type::Array(elem, _) => elem.as_ref(),
          other => other,
        };
      }
      ty.clone().ptr_to()
    }
    Inst::Extract { vec_ty, .. } => match vec_ty {
      Type::Vector(elem, _) => (**elem).clone(),
      _ => unreachable!("extract from a non-vector"),
    },
    Inst::Insert { vec_ty, .. } | Inst::Splat { vec_ty, .. } => vec_ty.clone(),
    Inst::Call { ret, .. } => ret.clone(),
    Inst::Store { .. } => unreachable!("store defines no temp"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn float_args_use_float_registers_in_fixed_slots_only() {
    let tys = vec![Type::I32, Type::F32, Type::F64, Type::I32];
    // putf-like: one fixed arg, the rest variadic.
    let (locs, stack) = assign_locs(&tys, 1, false);
    assert_eq!(
      locs,
      vec![ArgLoc::Int(0), ArgLoc::Int(1), ArgLoc::Int(2), ArgLoc::Int(3)]
    );
    assert_eq!(stack, 0);

    // Fully fixed: the float rides in fa0.
    let (locs, _) = assign_locs(&tys, 4, false);
    assert_eq!(locs[1], ArgLoc::Float(0));
    assert_eq!(locs[2], ArgLoc::Float(1));
  }

  #[test]
  fn overflow_args_spill_to_the_stack() {
    let tys = vec![Type::I32; 10];
    let (locs, stack) = assign_locs(&tys, 10, false);
    assert_eq!(locs[7], ArgLoc::Int(7));
    assert_eq!(locs[8], ArgLoc::Stack(0));
    assert_eq!(locs[9], ArgLoc::Stack(8));
    assert_eq!(stack, 16);
  }

  #[test]
  fn vectors_always_travel_on_the_stack() {
    let tys = vec![Type::Vector(Box::new(Type::I32), 4), Type::I32];
    let (locs, stack) = assign_locs(&tys, 2, false);
    assert_eq!(locs[0], ArgLoc::Stack(0));
    assert_eq!(locs[1], ArgLoc::Int(0));
    assert_eq!(stack, 16);
  }

  #[test]
  fn sret_reserves_the_first_integer_register() {
    let tys = vec![Type::I32];
    let (locs, _) = assign_locs(&tys, 1, true);
    assert_eq!(locs[0], ArgLoc::Int(1));
  }
}
