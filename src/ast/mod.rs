// SysY Compiler
//! Abstract syntax tree for SysY. This is the structure the parser produces
//! and that constant folding rewrites in place before IR generation consumes
//! it read-only.

pub mod fold;

use std::fmt;

/// Source line, 1-based. Every node records the line its first token sits on.
pub type Line = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VecElem {
  Int,
  Float,
}

impl VecElem {
  pub fn name(self) -> &'static str {
    match self {
      VecElem::Int => "int",
      VecElem::Float => "float",
    }
  }
}

/// A base type as written in the source. Vector sizes stay expressions until
/// the const evaluator resolves them at declaration time.
#[derive(Clone, Debug)]
pub enum Ty {
  Int,
  Float,
  Void,
  Vector(VecElem, Box<Expr>),
}

impl Ty {
  pub fn is_void(&self) -> bool {
    matches!(self, Ty::Void)
  }

  pub fn name(&self) -> &'static str {
    match self {
      Ty::Int => "int",
      Ty::Float => "float",
      Ty::Void => "void",
      Ty::Vector(..) => "vector",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Lt,
  Gt,
  Le,
  Ge,
  Eq,
  Ne,
  And,
  Or,
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Mod => "%",
      BinaryOp::Lt => "<",
      BinaryOp::Gt => ">",
      BinaryOp::Le => "<=",
      BinaryOp::Ge => ">=",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
    };
    f.write_str(s)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
  Plus,
  Minus,
  Not,
}

impl fmt::Display for UnaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      UnaryOp::Plus => "+",
      UnaryOp::Minus => "-",
      UnaryOp::Not => "!",
    };
    f.write_str(s)
  }
}

/// An identifier plus the ordered indices applied to it.
#[derive(Clone, Debug)]
pub struct LVal {
  pub name: String,
  pub indices: Vec<Expr>,
}

#[derive(Clone, Debug)]
pub struct Expr {
  pub kind: ExprKind,
  pub line: Line,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
  IntConst(i32),
  FloatConst(f32),
  StringLit(String),
  LVal(LVal),
  Unary(UnaryOp, Box<Expr>),
  Binary(BinaryOp, Box<Expr>, Box<Expr>),
  Call(String, Vec<Expr>),
}

impl Expr {
  pub fn new(kind: ExprKind, line: Line) -> Self {
    Expr { kind, line }
  }
}

#[derive(Clone, Debug)]
pub enum InitVal {
  Expr(Expr),
  List(Vec<InitVal>),
}

/// One name introduced by a declaration, with its dimension expressions and
/// optional initializer.
#[derive(Clone, Debug)]
pub struct Def {
  pub name: String,
  pub dims: Vec<Expr>,
  pub init: Option<InitVal>,
  pub line: Line,
}

#[derive(Clone, Debug)]
pub struct Decl {
  pub is_const: bool,
  pub ty: Ty,
  pub defs: Vec<Def>,
  pub line: Line,
}

#[derive(Clone, Debug)]
pub struct Block {
  pub items: Vec<BlockItem>,
}

#[derive(Clone, Debug)]
pub enum BlockItem {
  Decl(Decl),
  Stmt(Stmt),
}

#[derive(Clone, Debug)]
pub struct Stmt {
  pub kind: StmtKind,
  pub line: Line,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
  Assign(LVal, Expr),
  Expr(Option<Expr>),
  Block(Block),
  If(Expr, Box<Stmt>, Option<Box<Stmt>>),
  While(Expr, Box<Stmt>),
  Break,
  Continue,
  Return(Option<Expr>),
}

impl Stmt {
  pub fn new(kind: StmtKind, line: Line) -> Self {
    Stmt { kind, line }
  }
}

#[derive(Clone, Debug)]
pub struct Param {
  pub ty: Ty,
  pub name: String,
  pub is_array: bool,
  /// Non-leading dimensions; the leading one is dropped by the grammar.
  pub dims: Vec<Expr>,
  pub line: Line,
}

#[derive(Clone, Debug)]
pub struct Function {
  pub ret: Ty,
  pub name: String,
  pub params: Vec<Param>,
  pub body: Block,
  pub line: Line,
}

/// The whole parsed input: global declarations in source order, then the
/// function definitions in source order.
#[derive(Clone, Debug, Default)]
pub struct CompUnit {
  pub decls: Vec<Decl>,
  pub functions: Vec<Function>,
}

// ---------------------------------------------------------------------------
// AST dump
//
// An indented tree, two spaces per level; one line per node with its kind and
// salient attributes.

struct Dumper {
  out: String,
}

impl Dumper {
  fn line(&mut self, indent: usize, text: &str) {
    for _ in 0..indent {
      self.out.push_str("  ");
    }
    self.out.push_str(text);
    self.out.push('\n');
  }

  fn ty(&mut self, indent: usize, ty: &Ty) {
    match ty {
      Ty::Vector(elem, size) => {
        self.line(indent, &format!("Type: vector<{}>", elem.name()));
        self.expr(indent + 1, size);
      }
      _ => self.line(indent, &format!("Type: {}", ty.name())),
    }
  }

  fn expr(&mut self, indent: usize, expr: &Expr) {
    match &expr.kind {
      ExprKind::IntConst(v) => self.line(indent, &format!("IntConst: {}", v)),
      ExprKind::FloatConst(v) => self.line(indent, &format!("FloatConst: {}", v)),
      ExprKind::StringLit(s) => {
        self.line(indent, &format!("StringLiteral: {:?}", s));
      }
      ExprKind::LVal(lval) => self.lval(indent, lval),
      ExprKind::Unary(op, operand) => {
        self.line(indent, &format!("UnaryExpr: {}", op));
        self.expr(indent + 1, operand);
      }
      ExprKind::Binary(op, lhs, rhs) => {
        self.line(indent, &format!("BinaryExpr: {}", op));
        self.expr(indent + 1, lhs);
        self.expr(indent + 1, rhs);
      }
      ExprKind::Call(callee, args) => {
        self.line(
          indent,
          &format!("CallExpr: {} ({} args)", callee, args.len()),
        );
        for arg in args {
          self.expr(indent + 1, arg);
        }
      }
    }
  }

  fn lval(&mut self, indent: usize, lval: &LVal) {
    if lval.indices.is_empty() {
      self.line(indent, &format!("LVal: {}", lval.name));
    } else {
      self.line(
        indent,
        &format!("LVal: {} [{} dimensions]", lval.name, lval.indices.len()),
      );
    }
    for idx in &lval.indices {
      self.expr(indent + 1, idx);
    }
  }

  fn init_val(&mut self, indent: usize, init: &InitVal) {
    match init {
      InitVal::Expr(e) => self.expr(indent, e),
      InitVal::List(vals) => {
        self.line(indent, &format!("InitList: ({} elements)", vals.len()));
        for val in vals {
          self.init_val(indent + 1, val);
        }
      }
    }
  }

  fn decl(&mut self, indent: usize, decl: &Decl) {
    let label = if decl.is_const { "ConstDecl" } else { "VarDecl" };
    self.line(indent, label);
    self.ty(indent + 1, &decl.ty);
    for def in &decl.defs {
      let kind = if decl.is_const { "ConstDef" } else { "VarDef" };
      self.line(indent + 1, &format!("{}: {}", kind, def.name));
      for dim in &def.dims {
        self.expr(indent + 2, dim);
      }
      if let Some(init) = &def.init {
        self.init_val(indent + 2, init);
      }
    }
  }

  fn stmt(&mut self, indent: usize, stmt: &Stmt) {
    match &stmt.kind {
      StmtKind::Assign(lval, expr) => {
        self.line(indent, "AssignStmt");
        self.lval(indent + 1, lval);
        self.expr(indent + 1, expr);
      }
      StmtKind::Expr(expr) => {
        self.line(indent, "ExprStmt");
        if let Some(e) = expr {
          self.expr(indent + 1, e);
        }
      }
      StmtKind::Block(block) => self.block(indent, block),
      StmtKind::If(cond, then_stmt, else_stmt) => {
        self.line(indent, "IfStmt");
        self.expr(indent + 1, cond);
        self.stmt(indent + 1, then_stmt);
        if let Some(e) = else_stmt {
          self.stmt(indent + 1, e);
        }
      }
      StmtKind::While(cond, body) => {
        self.line(indent, "WhileStmt");
        self.expr(indent + 1, cond);
        self.stmt(indent + 1, body);
      }
      StmtKind::Break => self.line(indent, "BreakStmt"),
      StmtKind::Continue => self.line(indent, "ContinueStmt"),
      StmtKind::Return(expr) => {
        self.line(indent, "ReturnStmt");
        if let Some(e) = expr {
          self.expr(indent + 1, e);
        }
      }
    }
  }

  fn block(&mut self, indent: usize, block: &Block) {
    self.line(indent, &format!("Block: ({} items)", block.items.len()));
    for item in &block.items {
      match item {
        BlockItem::Decl(d) => self.decl(indent + 1, d),
        BlockItem::Stmt(s) => self.stmt(indent + 1, s),
      }
    }
  }

  fn function(&mut self, indent: usize, func: &Function) {
    self.line(
      indent,
      &format!("Function: {} ({} params)", func.name, func.params.len()),
    );
    self.ty(indent + 1, &func.ret);
    for param in &func.params {
      let suffix = if param.is_array { " [array]" } else { "" };
      self.line(indent + 1, &format!("Param: {}{}", param.name, suffix));
      self.ty(indent + 2, &param.ty);
      for dim in &param.dims {
        self.expr(indent + 2, dim);
      }
    }
    self.block(indent + 1, &func.body);
  }
}

impl CompUnit {
  /// Renders the indented tree used by `--dump-ast`.
  pub fn dump(&self) -> String {
    let mut d = Dumper { out: String::new() };
    d.line(0, "CompUnit");
    for decl in &self.decls {
      d.decl(1, decl);
    }
    for func in &self.functions {
      d.function(1, func);
    }
    d.out
  }
}

impl fmt::Display for CompUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.dump())
  }
}
