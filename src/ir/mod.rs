// SysY Compiler
//! Typed intermediate representation.

// A small block-structured SSA-flavoured IR, printed in an LLVM-like textual
// syntax for --dump-ir. The generator builds one `Module` per compilation
// unit; the RISC-V backend consumes it by shared reference and never
// mutates it.

use enum_as_inner::EnumAsInner;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
  Void,
  I1,
  I8,
  I32,
  F32,
  F64,
  Ptr(Box<Type>),
  Array(Box<Type>, usize),
  Vector(Box<Type>, usize),
}

impl Type {
  pub fn ptr_to(self) -> Type {
    Type::Ptr(Box::new(self))
  }

  pub fn is_float(&self) -> bool {
    matches!(self, Type::F32 | Type::F64)
  }

  pub fn is_int(&self) -> bool {
    matches!(self, Type::I1 | Type::I8 | Type::I32)
  }

  pub fn is_scalar(&self) -> bool {
    matches!(self, Type::I1 | Type::I8 | Type::I32 | Type::F32 | Type::F64)
  }

  /// Size in bytes when laid out in memory.
  pub fn size(&self) -> usize {
    match self {
      Type::Void => 0,
      Type::I1 | Type::I8 => 1,
      Type::I32 | Type::F32 => 4,
      Type::F64 | Type::Ptr(_) => 8,
      Type::Array(elem, n) => elem.size() * n,
      Type::Vector(elem, n) => elem.size() * n,
    }
  }

}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Void => write!(f, "void"),
      Type::I1 => write!(f, "i1"),
      Type::I8 => write!(f, "i8"),
      Type::I32 => write!(f, "i32"),
      Type::F32 => write!(f, "float"),
      Type::F64 => write!(f, "double"),
      Type::Ptr(inner) => write!(f, "{}*", inner),
      Type::Array(elem, n) => write!(f, "[{} x {}]", n, elem),
      Type::Vector(elem, n) => write!(f, "<{} x {}>", n, elem),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

impl fmt::Display for TempId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "%t{}", self.0)
  }
}

#[derive(Clone, Debug, PartialEq, EnumAsInner)]
pub enum Operand {
  ConstInt(i32),
  ConstFloat(f32),
  ConstDouble(f64),
  ConstBool(bool),
  Temp(TempId),
  /// Address of a module-level object.
  Global(String),
  Undef,
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operand::ConstInt(v) => write!(f, "{}", v),
      Operand::ConstFloat(v) => write!(f, "{:?}", v),
      Operand::ConstDouble(v) => write!(f, "{:?}", v),
      Operand::ConstBool(v) => write!(f, "{}", v),
      Operand::Temp(t) => write!(f, "{}", t),
      Operand::Global(name) => write!(f, "@{}", name),
      Operand::Undef => write!(f, "undef"),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
  Add,
  Sub,
  Mul,
  SDiv,
  SRem,
  FAdd,
  FSub,
  FMul,
  FDiv,
  And,
  Or,
  Xor,
}

impl BinOp {
  pub fn mnemonic(self) -> &'static str {
    match self {
      BinOp::Add => "add",
      BinOp::Sub => "sub",
      BinOp::Mul => "mul",
      BinOp::SDiv => "sdiv",
      BinOp::SRem => "srem",
      BinOp::FAdd => "fadd",
      BinOp::FSub => "fsub",
      BinOp::FMul => "fmul",
      BinOp::FDiv => "fdiv",
      BinOp::And => "and",
      BinOp::Or => "or",
      BinOp::Xor => "xor",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpPred {
  Slt,
  Sgt,
  Sle,
  Sge,
  Eq,
  Ne,
  Olt,
  Ogt,
  Ole,
  Oge,
  Oeq,
  One,
}

impl CmpPred {
  pub fn is_float(self) -> bool {
    matches!(
      self,
      CmpPred::Olt | CmpPred::Ogt | CmpPred::Ole | CmpPred::Oge | CmpPred::Oeq | CmpPred::One
    )
  }

  pub fn mnemonic(self) -> &'static str {
    match self {
      CmpPred::Slt => "slt",
      CmpPred::Sgt => "sgt",
      CmpPred::Sle => "sle",
      CmpPred::Sge => "sge",
      CmpPred::Eq => "eq",
      CmpPred::Ne => "ne",
      CmpPred::Olt => "olt",
      CmpPred::Ogt => "ogt",
      CmpPred::Ole => "ole",
      CmpPred::Oge => "oge",
      CmpPred::Oeq => "oeq",
      CmpPred::One => "one",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOp {
  SiToFp,
  FpToSi,
  FpExt,
  Zext,
}

impl CastOp {
  pub fn mnemonic(self) -> &'static str {
    match self {
      CastOp::SiToFp => "sitofp",
      CastOp::FpToSi => "fptosi",
      CastOp::FpExt => "fpext",
      CastOp::Zext => "zext",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
  Alloca {
    dest: TempId,
    ty: Type,
  },
  Load {
    dest: TempId,
    ty: Type,
    addr: Operand,
  },
  Store {
    ty: Type,
    value: Operand,
    addr: Operand,
  },
  Binary {
    dest: TempId,
    op: BinOp,
    ty: Type,
    lhs: Operand,
    rhs: Operand,
  },
  Cmp {
    dest: TempId,
    pred: CmpPred,
    ty: Type,
    lhs: Operand,
    rhs: Operand,
  },
  Cast {
    dest: TempId,
    op: CastOp,
    value: Operand,
    from: Type,
    to: Type,
  },
  /// Address arithmetic: the first index scales by the whole base type, the
  /// remaining ones descend into it.
  Gep {
    dest: TempId,
    base_ty: Type,
    base: Operand,
    indices: Vec<Operand>,
  },
  Extract {
    dest: TempId,
    vec_ty: Type,
    vec: Operand,
    index: Operand,
  },
  Insert {
    dest: TempId,
    vec_ty: Type,
    vec: Operand,
    elem: Operand,
    index: Operand,
  },
  /// Broadcast of a scalar into every lane.
  Splat {
    dest: TempId,
    vec_ty: Type,
    scalar: Operand,
  },
  Call {
    dest: Option<TempId>,
    ret: Type,
    callee: String,
    args: Vec<(Type, Operand)>,
  },
}

impl Inst {
  /// The temporary this instruction defines, if any.
  pub fn dest(&self) -> Option<TempId> {
    match self {
      Inst::Alloca { dest, .. }
      | Inst::Load { dest, .. }
      | Inst::Binary { dest, .. }
      | Inst::Cmp { dest, .. }
      | Inst::Cast { dest, .. }
      | Inst::Gep { dest, .. }
      | Inst::Extract { dest, .. }
      | Inst::Insert { dest, .. }
      | Inst::Splat { dest, .. } => Some(*dest),
      Inst::Call { dest, .. } => *dest,
      Inst::Store { .. } => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Term {
  Br(String),
  CondBr(Operand, String, String),
  Ret(Option<(Type, Operand)>),
}

#[derive(Clone, Debug)]
pub struct BasicBlock {
  pub label: String,
  pub insts: Vec<Inst>,
  pub term: Option<Term>,
}

impl BasicBlock {
  pub fn new(label: String) -> Self {
    BasicBlock {
      label,
      insts: Vec::new(),
      term: None,
    }
  }

  pub fn is_terminated(&self) -> bool {
    self.term.is_some()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Linkage {
  External,
  Internal,
}

#[derive(Clone, Debug)]
pub struct Function {
  pub name: String,
  pub linkage: Linkage,
  pub ret: Type,
  /// Parameter types; the incoming values are %t0 .. %t(n-1).
  pub params: Vec<Type>,
  pub blocks: Vec<BasicBlock>,
}

impl Function {
  pub fn entry(&self) -> &BasicBlock {
    &self.blocks[0]
  }
}

/// A constant initializer for a module-level object.
#[derive(Clone, Debug, PartialEq)]
pub enum Init {
  Zero,
  Int(i32),
  Float(f32),
  Array(Vec<Init>),
  Vector(Vec<Init>),
}

impl Init {
  pub fn is_zero(&self) -> bool {
    match self {
      Init::Zero => true,
      Init::Int(v) => *v == 0,
      Init::Float(v) => *v == 0.0,
      Init::Array(elems) | Init::Vector(elems) => elems.iter().all(Init::is_zero),
    }
  }
}

#[derive(Clone, Debug)]
pub struct GlobalVar {
  pub name: String,
  pub ty: Type,
  pub is_const: bool,
  pub init: Init,
  pub linkage: Linkage,
}

/// A NUL-terminated private string constant (putf format strings).
#[derive(Clone, Debug)]
pub struct StringLit {
  pub name: String,
  pub data: String,
}

impl StringLit {
  /// Array type of the constant, including the trailing NUL.
  pub fn ty(&self) -> Type {
    Type::Array(Box::new(Type::I8), self.data.len() + 1)
  }
}

#[derive(Clone, Debug)]
pub struct ExternDecl {
  pub name: String,
  pub ret: Type,
  pub params: Vec<Type>,
  pub variadic: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Module {
  pub globals: Vec<GlobalVar>,
  pub strings: Vec<StringLit>,
  pub externs: Vec<ExternDecl>,
  pub functions: Vec<Function>,
}

impl Module {
  pub fn global(&self, name: &str) -> Option<&GlobalVar> {
    self.globals.iter().find(|g| g.name == name)
  }

  pub fn function(&self, name: &str) -> Option<&Function> {
    self.functions.iter().find(|f| f.name == name)
  }

  pub fn string(&self, name: &str) -> Option<&StringLit> {
    self.strings.iter().find(|s| s.name == name)
  }
}

// ---------------------------------------------------------------------------
// Textual form

fn fmt_init(f: &mut fmt::Formatter<'_>, ty: &Type, init: &Init) -> fmt::Result {
  match init {
    Init::Zero => write!(f, "zeroinitializer"),
    Init::Int(v) => write!(f, "{}", v),
    Init::Float(v) => write!(f, "{:?}", v),
    Init::Array(elems) => {
      let elem_ty = match ty {
        Type::Array(e, _) => e,
        _ => ty,
      };
      write!(f, "[")?;
      for (i, elem) in elems.iter().enumerate() {
        if i != 0 {
          write!(f, ", ")?;
        }
        write!(f, "{} ", elem_ty)?;
        fmt_init(f, elem_ty, elem)?;
      }
      write!(f, "]")
    }
    Init::Vector(elems) => {
      let elem_ty = match ty {
        Type::Vector(e, _) => e,
        _ => ty,
      };
      write!(f, "<")?;
      for (i, elem) in elems.iter().enumerate() {
        if i != 0 {
          write!(f, ", ")?;
        }
        write!(f, "{} ", elem_ty)?;
        fmt_init(f, elem_ty, elem)?;
      }
      write!(f, ">")
    }
  }
}

impl fmt::Display for Inst {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Inst::Alloca { dest, ty } => write!(f, "{} = alloca {}", dest, ty),
      Inst::Load { dest, ty, addr } => write!(f, "{} = load {}, {}* {}", dest, ty, ty, addr),
      Inst::Store { ty, value, addr } => write!(f, "store {} {}, {}* {}", ty, value, ty, addr),
      Inst::Binary {
        dest,
        op,
        ty,
        lhs,
        rhs,
      } => write!(f, "{} = {} {} {}, {}", dest, op.mnemonic(), ty, lhs, rhs),
      Inst::Cmp {
        dest,
        pred,
        ty,
        lhs,
        rhs,
      } => {
        let kind = if pred.is_float() { "fcmp" } else { "icmp" };
        write!(
          f,
          "{} = {} {} {} {}, {}",
          dest,
          kind,
          pred.mnemonic(),
          ty,
          lhs,
          rhs
        )
      }
      Inst::Cast {
        dest,
        op,
        value,
        from,
        to,
      } => write!(
        f,
        "{} = {} {} {} to {}",
        dest,
        op.mnemonic(),
        from,
        value,
        to
      ),
      Inst::Gep {
        dest,
        base_ty,
        base,
        indices,
      } => {
        write!(
          f,
          "{} = getelementptr {}, {}* {}",
          dest, base_ty, base_ty, base
        )?;
        for idx in indices {
          write!(f, ", i32 {}", idx)?;
        }
        Ok(())
      }
      Inst::Extract {
        dest,
        vec_ty,
        vec,
        index,
      } => write!(
        f,
        "{} = extractelement {} {}, i32 {}",
        dest, vec_ty, vec, index
      ),
      Inst::Insert {
        dest,
        vec_ty,
        vec,
        elem,
        index,
      } => write!(
        f,
        "{} = insertelement {} {}, {}, i32 {}",
        dest, vec_ty, vec, elem, index
      ),
      Inst::Splat {
        dest,
        vec_ty,
        scalar,
      } => write!(f, "{} = splat {} {}", dest, vec_ty, scalar),
      Inst::Call {
        dest,
        ret,
        callee,
        args,
      } => {
        if let Some(dest) = dest {
          write!(f, "{} = ", dest)?;
        }
        write!(f, "call {} @{}(", ret, callee)?;
        for (i, (ty, op)) in args.iter().enumerate() {
          if i != 0 {
            write!(f, ", ")?;
          }
          write!(f, "{} {}", ty, op)?;
        }
        write!(f, ")")
      }
    }
  }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Term::Br(label) => write!(f, "br label %{}", label),
      Term::CondBr(cond, t, e) => {
        write!(f, "br i1 {}, label %{}, label %{}", cond, t, e)
      }
      Term::Ret(None) => write!(f, "ret void"),
      Term::Ret(Some((ty, op))) => write!(f, "ret {} {}", ty, op),
    }
  }
}

impl fmt::Display for Module {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for s in &self.strings {
      writeln!(
        f,
        "@{} = private constant {} c\"{}\\00\"",
        s.name,
        s.ty(),
        s.data.escape_default()
      )?;
    }
    for g in &self.globals {
      let kind = if g.is_const { "constant" } else { "global" };
      write!(f, "@{} = {} {} ", g.name, kind, g.ty)?;
      fmt_init(f, &g.ty, &g.init)?;
      writeln!(f)?;
    }
    if !self.strings.is_empty() || !self.globals.is_empty() {
      writeln!(f)?;
    }
    for e in &self.externs {
      write!(f, "declare {} @{}(", e.ret, e.name)?;
      for (i, ty) in e.params.iter().enumerate() {
        if i != 0 {
          write!(f, ", ")?;
        }
        write!(f, "{}", ty)?;
      }
      if e.variadic {
        if !e.params.is_empty() {
          write!(f, ", ")?;
        }
        write!(f, "...")?;
      }
      writeln!(f, ")")?;
    }
    for func in &self.functions {
      writeln!(f)?;
      let link = match func.linkage {
        Linkage::Internal => "internal ",
        Linkage::External => "",
      };
      write!(f, "define {}{} @{}(", link, func.ret, func.name)?;
      for (i, ty) in func.params.iter().enumerate() {
        if i != 0 {
          write!(f, ", ")?;
        }
        write!(f, "{} {}", ty, TempId(i as u32))?;
      }
      writeln!(f, ") {{")?;
      for block in &func.blocks {
        writeln!(f, "{}:", block.label)?;
        for inst in &block.insts {
          writeln!(f, "  {}", inst)?;
        }
        match &block.term {
          Some(term) => writeln!(f, "  {}", term)?,
          None => writeln!(f, "  ; <missing terminator>")?,
        }
      }
      writeln!(f, "}}")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn type_sizes_and_layout() {
    let arr = Type::Array(Box::new(Type::Array(Box::new(Type::I32), 2)), 3);
    assert_eq!(arr.size(), 24);
    assert_eq!(Type::Vector(Box::new(Type::F32), 4).size(), 16);
    assert_eq!(Type::Ptr(Box::new(Type::I32)).size(), 8);
    assert_eq!(arr.to_string(), "[3 x [2 x i32]]");
  }

  #[test]
  fn instruction_text_is_stable() {
    let inst = Inst::Binary {
      dest: TempId(3),
      op: BinOp::Add,
      ty: Type::I32,
      lhs: Operand::Temp(TempId(1)),
      rhs: Operand::ConstInt(10),
    };
    assert_eq!(inst.to_string(), "%t3 = add i32 %t1, 10");

    let gep = Inst::Gep {
      dest: TempId(4),
      base_ty: Type::Array(Box::new(Type::I32), 3),
      base: Operand::Global("a".to_string()),
      indices: vec![Operand::ConstInt(0), Operand::Temp(TempId(2))],
    };
    assert_eq!(
      gep.to_string(),
      "%t4 = getelementptr [3 x i32], [3 x i32]* @a, i32 0, i32 %t2"
    );
  }

  #[test]
  fn zero_detection_descends_aggregates() {
    let init = Init::Array(vec![Init::Int(0), Init::Zero, Init::Float(0.0)]);
    assert!(init.is_zero());
    let init = Init::Array(vec![Init::Int(0), Init::Int(3)]);
    assert!(!init.is_zero());
  }
}
