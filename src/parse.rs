// SysY Compiler
//! Parser

// A hand-written recursive-descent parser over the logos token stream. The
// token stream is materialised up front together with 1-based line numbers
// so that every AST node can carry the line its first token sits on.

use anyhow::{anyhow, bail, Result};
use logos::Logos;

use crate::ast::{
  BinaryOp, Block, BlockItem, CompUnit, Decl, Def, Expr, ExprKind, Function, InitVal, LVal, Line,
  Param, Stmt, StmtKind, Ty, UnaryOp, VecElem,
};
use crate::lex::Token;

/// Parses a whole source file into a compilation unit.
pub fn parse(input: &str) -> Result<CompUnit> {
  let tokens = tokenize(input)?;
  Parser { tokens, pos: 0 }.comp_unit()
}

fn tokenize(input: &str) -> Result<Vec<(Token, Line)>> {
  // Byte offsets of line starts, for span -> line translation.
  let mut line_starts = vec![0usize];
  for (i, b) in input.bytes().enumerate() {
    if b == b'\n' {
      line_starts.push(i + 1);
    }
  }

  let mut tokens = Vec::new();
  for (token, span) in Token::lexer(input).spanned() {
    let line = line_starts.partition_point(|&s| s <= span.start) as Line;
    if token == Token::Error {
      bail!("line {}: unrecognized token {:?}", line, &input[span]);
    }
    tokens.push((token, line));
  }
  Ok(tokens)
}

struct Parser {
  tokens: Vec<(Token, Line)>,
  pos: usize,
}

impl Parser {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos).map(|(t, _)| t)
  }

  fn peek_is(&self, token: &Token) -> bool {
    self.peek() == Some(token)
  }

  /// Line of the current token, or of the last one at end of input.
  fn line(&self) -> Line {
    self
      .tokens
      .get(self.pos)
      .or_else(|| self.tokens.last())
      .map(|(_, l)| *l)
      .unwrap_or(1)
  }

  fn advance(&mut self) -> Result<(Token, Line)> {
    let item = self
      .tokens
      .get(self.pos)
      .cloned()
      .ok_or_else(|| anyhow!("line {}: unexpected end of input", self.line()))?;
    self.pos += 1;
    Ok(item)
  }

  fn eat(&mut self, token: &Token) -> bool {
    if self.peek_is(token) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect(&mut self, token: &Token) -> Result<Line> {
    let line = self.line();
    let (got, _) = self.advance()?;
    if &got == token {
      Ok(line)
    } else {
      Err(anyhow!(
        "line {}: expected {}, found {}",
        line,
        token.as_ref(),
        got.as_ref()
      ))
    }
  }

  fn expect_ident(&mut self) -> Result<(String, Line)> {
    let line = self.line();
    let (got, _) = self.advance()?;
    match got {
      Token::Ident(name) => Ok((name, line)),
      other => Err(anyhow!(
        "line {}: expected an identifier, found {}",
        line,
        other.as_ref()
      )),
    }
  }

  fn comp_unit(&mut self) -> Result<CompUnit> {
    let mut unit = CompUnit::default();
    while self.peek().is_some() {
      if self.peek_is(&Token::Const) {
        let decl = self.decl(true)?;
        unit.decls.push(decl);
        continue;
      }
      let line = self.line();
      let ty = self.btype(true)?;
      let (name, name_line) = self.expect_ident()?;
      if self.peek_is(&Token::LParen) {
        unit.functions.push(self.function(ty, name, line)?);
      } else {
        if ty.is_void() {
          bail!("line {}: variables cannot have type void", name_line);
        }
        unit.decls.push(self.decl_tail(false, ty, name, line)?);
      }
    }
    Ok(unit)
  }

  fn decl(&mut self, is_const: bool) -> Result<Decl> {
    let line = self.line();
    if is_const {
      self.expect(&Token::Const)?;
    }
    let ty = self.btype(false)?;
    let (name, _) = self.expect_ident()?;
    self.decl_tail(is_const, ty, name, line)
  }

  fn decl_tail(&mut self, is_const: bool, ty: Ty, first: String, line: Line) -> Result<Decl> {
    let mut defs = vec![self.def_tail(first)?];
    while self.eat(&Token::Comma) {
      let (name, _) = self.expect_ident()?;
      defs.push(self.def_tail(name)?);
    }
    self.expect(&Token::Semicolon)?;
    Ok(Decl {
      is_const,
      ty,
      defs,
      line,
    })
  }

  fn def_tail(&mut self, name: String) -> Result<Def> {
    let line = self.line();
    let mut dims = Vec::new();
    while self.eat(&Token::LBracket) {
      dims.push(self.expr()?);
      self.expect(&Token::RBracket)?;
    }
    let init = if self.eat(&Token::Assgn) {
      Some(self.init_val()?)
    } else {
      None
    };
    Ok(Def {
      name,
      dims,
      init,
      line,
    })
  }

  fn init_val(&mut self) -> Result<InitVal> {
    if self.eat(&Token::LBrace) {
      let mut vals = Vec::new();
      if !self.peek_is(&Token::RBrace) {
        vals.push(self.init_val()?);
        while self.eat(&Token::Comma) {
          vals.push(self.init_val()?);
        }
      }
      self.expect(&Token::RBrace)?;
      Ok(InitVal::List(vals))
    } else {
      Ok(InitVal::Expr(self.expr()?))
    }
  }

  fn btype(&mut self, allow_void: bool) -> Result<Ty> {
    let line = self.line();
    let (token, _) = self.advance()?;
    match token {
      Token::Int => Ok(Ty::Int),
      Token::Float => Ok(Ty::Float),
      Token::Void if allow_void => Ok(Ty::Void),
      Token::Void => Err(anyhow!("line {}: void is not allowed here", line)),
      Token::Vector => {
        self.expect(&Token::LessThan)?;
        let elem_line = self.line();
        let elem = match self.advance()?.0 {
          Token::Int => VecElem::Int,
          Token::Float => VecElem::Float,
          other => {
            bail!(
              "line {}: vector element type must be int or float, found {}",
              elem_line,
              other.as_ref()
            );
          }
        };
        self.expect(&Token::Comma)?;
        // The size is an additive constant expression so that the closing
        // '>' is not mistaken for a comparison.
        let size = self.add_expr()?;
        self.expect(&Token::GreaterThan)?;
        Ok(Ty::Vector(elem, Box::new(size)))
      }
      other => Err(anyhow!(
        "line {}: expected a type, found {}",
        line,
        other.as_ref()
      )),
    }
  }

  fn function(&mut self, ret: Ty, name: String, line: Line) -> Result<Function> {
    self.expect(&Token::LParen)?;
    let mut params = Vec::new();
    if !self.peek_is(&Token::RParen) {
      params.push(self.param()?);
      while self.eat(&Token::Comma) {
        params.push(self.param()?);
      }
    }
    self.expect(&Token::RParen)?;
    let body = self.block()?;
    Ok(Function {
      ret,
      name,
      params,
      body,
      line,
    })
  }

  fn param(&mut self) -> Result<Param> {
    let line = self.line();
    let ty = self.btype(false)?;
    let (name, _) = self.expect_ident()?;
    let mut is_array = false;
    let mut dims = Vec::new();
    if self.eat(&Token::LBracket) {
      // The leading dimension of an array parameter is always empty.
      self.expect(&Token::RBracket)?;
      is_array = true;
      while self.eat(&Token::LBracket) {
        dims.push(self.expr()?);
        self.expect(&Token::RBracket)?;
      }
    }
    Ok(Param {
      ty,
      name,
      is_array,
      dims,
      line,
    })
  }

  fn block(&mut self) -> Result<Block> {
    self.expect(&Token::LBrace)?;
    let mut items = Vec::new();
    while !self.eat(&Token::RBrace) {
      match self.peek() {
        Some(Token::Const) => items.push(BlockItem::Decl(self.decl(true)?)),
        Some(Token::Int | Token::Float | Token::Vector) => {
          items.push(BlockItem::Decl(self.decl(false)?));
        }
        Some(_) => items.push(BlockItem::Stmt(self.stmt()?)),
        None => bail!("line {}: unexpected end of input in block", self.line()),
      }
    }
    Ok(Block { items })
  }

  fn stmt(&mut self) -> Result<Stmt> {
    let line = self.line();
    match self.peek() {
      Some(Token::LBrace) => {
        let block = self.block()?;
        Ok(Stmt::new(StmtKind::Block(block), line))
      }
      Some(Token::If) => {
        self.advance()?;
        self.expect(&Token::LParen)?;
        let cond = self.expr()?;
        self.expect(&Token::RParen)?;
        let then_stmt = Box::new(self.stmt()?);
        let else_stmt = if self.eat(&Token::Else) {
          Some(Box::new(self.stmt()?))
        } else {
          None
        };
        Ok(Stmt::new(StmtKind::If(cond, then_stmt, else_stmt), line))
      }
      Some(Token::While) => {
        self.advance()?;
        self.expect(&Token::LParen)?;
        let cond = self.expr()?;
        self.expect(&Token::RParen)?;
        let body = Box::new(self.stmt()?);
        Ok(Stmt::new(StmtKind::While(cond, body), line))
      }
      Some(Token::Break) => {
        self.advance()?;
        self.expect(&Token::Semicolon)?;
        Ok(Stmt::new(StmtKind::Break, line))
      }
      Some(Token::Continue) => {
        self.advance()?;
        self.expect(&Token::Semicolon)?;
        Ok(Stmt::new(StmtKind::Continue, line))
      }
      Some(Token::Return) => {
        self.advance()?;
        let value = if self.peek_is(&Token::Semicolon) {
          None
        } else {
          Some(self.expr()?)
        };
        self.expect(&Token::Semicolon)?;
        Ok(Stmt::new(StmtKind::Return(value), line))
      }
      Some(Token::Semicolon) => {
        self.advance()?;
        Ok(Stmt::new(StmtKind::Expr(None), line))
      }
      Some(_) => {
        let expr = self.expr()?;
        if self.eat(&Token::Assgn) {
          let lval = match expr.kind {
            ExprKind::LVal(lval) => lval,
            _ => bail!("line {}: left side of assignment is not an lvalue", line),
          };
          let value = self.expr()?;
          self.expect(&Token::Semicolon)?;
          Ok(Stmt::new(StmtKind::Assign(lval, value), line))
        } else {
          self.expect(&Token::Semicolon)?;
          Ok(Stmt::new(StmtKind::Expr(Some(expr)), line))
        }
      }
      None => bail!("line {}: unexpected end of input", line),
    }
  }

  // Expression precedence chain: || < && < equality < relational < additive
  // < multiplicative < unary < primary.
  fn expr(&mut self) -> Result<Expr> {
    self.lor_expr()
  }

  fn lor_expr(&mut self) -> Result<Expr> {
    let mut lhs = self.land_expr()?;
    while self.peek_is(&Token::Or) {
      let line = lhs.line;
      self.advance()?;
      let rhs = self.land_expr()?;
      lhs = Expr::new(
        ExprKind::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs)),
        line,
      );
    }
    Ok(lhs)
  }

  fn land_expr(&mut self) -> Result<Expr> {
    let mut lhs = self.eq_expr()?;
    while self.peek_is(&Token::And) {
      let line = lhs.line;
      self.advance()?;
      let rhs = self.eq_expr()?;
      lhs = Expr::new(
        ExprKind::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs)),
        line,
      );
    }
    Ok(lhs)
  }

  fn eq_expr(&mut self) -> Result<Expr> {
    let mut lhs = self.rel_expr()?;
    loop {
      let op = match self.peek() {
        Some(Token::Eq) => BinaryOp::Eq,
        Some(Token::Neq) => BinaryOp::Ne,
        _ => break,
      };
      let line = lhs.line;
      self.advance()?;
      let rhs = self.rel_expr()?;
      lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), line);
    }
    Ok(lhs)
  }

  fn rel_expr(&mut self) -> Result<Expr> {
    let mut lhs = self.add_expr()?;
    loop {
      let op = match self.peek() {
        Some(Token::LessThan) => BinaryOp::Lt,
        Some(Token::GreaterThan) => BinaryOp::Gt,
        Some(Token::Leq) => BinaryOp::Le,
        Some(Token::Geq) => BinaryOp::Ge,
        _ => break,
      };
      let line = lhs.line;
      self.advance()?;
      let rhs = self.add_expr()?;
      lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), line);
    }
    Ok(lhs)
  }

  fn add_expr(&mut self) -> Result<Expr> {
    let mut lhs = self.mul_expr()?;
    loop {
      let op = match self.peek() {
        Some(Token::Plus) => BinaryOp::Add,
        Some(Token::Minus) => BinaryOp::Sub,
        _ => break,
      };
      let line = lhs.line;
      self.advance()?;
      let rhs = self.mul_expr()?;
      lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), line);
    }
    Ok(lhs)
  }

  fn mul_expr(&mut self) -> Result<Expr> {
    let mut lhs = self.unary_expr()?;
    loop {
      let op = match self.peek() {
        Some(Token::Asterisk) => BinaryOp::Mul,
        Some(Token::Div) => BinaryOp::Div,
        Some(Token::Mod) => BinaryOp::Mod,
        _ => break,
      };
      let line = lhs.line;
      self.advance()?;
      let rhs = self.unary_expr()?;
      lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), line);
    }
    Ok(lhs)
  }

  fn unary_expr(&mut self) -> Result<Expr> {
    let line = self.line();
    let op = match self.peek() {
      Some(Token::Plus) => Some(UnaryOp::Plus),
      Some(Token::Minus) => Some(UnaryOp::Minus),
      Some(Token::Not) => Some(UnaryOp::Not),
      _ => None,
    };
    if let Some(op) = op {
      self.advance()?;
      let operand = self.unary_expr()?;
      return Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), line));
    }
    self.primary_expr()
  }

  fn primary_expr(&mut self) -> Result<Expr> {
    let line = self.line();
    let (token, _) = self.advance()?;
    match token {
      Token::LParen => {
        let inner = self.expr()?;
        self.expect(&Token::RParen)?;
        Ok(inner)
      }
      Token::IntConst(v) => Ok(Expr::new(ExprKind::IntConst(v), line)),
      Token::FloatConst(v) => Ok(Expr::new(ExprKind::FloatConst(v), line)),
      Token::StringLit(s) => Ok(Expr::new(ExprKind::StringLit(s), line)),
      Token::Ident(name) => {
        if self.eat(&Token::LParen) {
          let mut args = Vec::new();
          if !self.peek_is(&Token::RParen) {
            args.push(self.expr()?);
            while self.eat(&Token::Comma) {
              args.push(self.expr()?);
            }
          }
          self.expect(&Token::RParen)?;
          Ok(Expr::new(ExprKind::Call(name, args), line))
        } else {
          let mut indices = Vec::new();
          while self.eat(&Token::LBracket) {
            indices.push(self.expr()?);
            self.expect(&Token::RBracket)?;
          }
          Ok(Expr::new(ExprKind::LVal(LVal { name, indices }), line))
        }
      }
      other => Err(anyhow!(
        "line {}: expected an expression, found {}",
        line,
        other.as_ref()
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_declarations_and_main() {
    let unit = parse(
      "const int N = 8;\n\
       int a[2][3] = {{1, 2, 3}, {4}};\n\
       float x = 1.5;\n\
       int main() { return N; }",
    )
    .unwrap();
    assert_eq!(unit.decls.len(), 3);
    assert_eq!(unit.functions.len(), 1);
    assert_eq!(unit.functions[0].name, "main");
    assert_eq!(unit.decls[0].defs[0].name, "N");
    assert_eq!(unit.decls[1].defs[0].dims.len(), 2);
  }

  #[test]
  fn parses_vector_declarations() {
    let unit = parse("vector<int, 4> v = {1, 2, 3, 4};\nint main() { return 0; }").unwrap();
    match &unit.decls[0].ty {
      Ty::Vector(VecElem::Int, size) => {
        assert!(matches!(size.kind, ExprKind::IntConst(4)));
      }
      other => panic!("expected a vector type, got {:?}", other),
    }
  }

  #[test]
  fn parses_array_parameters() {
    let unit = parse("int sum(int a[], int b[][4]) { return a[0] + b[1][2]; }").unwrap();
    let f = &unit.functions[0];
    assert!(f.params[0].is_array);
    assert!(f.params[0].dims.is_empty());
    assert!(f.params[1].is_array);
    assert_eq!(f.params[1].dims.len(), 1);
  }

  #[test]
  fn precedence_binds_mul_over_add() {
    let unit = parse("int main() { return 3 + 4 * 2; }").unwrap();
    let body = &unit.functions[0].body;
    let ret = match &body.items[0] {
      BlockItem::Stmt(Stmt {
        kind: StmtKind::Return(Some(e)),
        ..
      }) => e,
      other => panic!("unexpected item {:?}", other),
    };
    match &ret.kind {
      ExprKind::Binary(BinaryOp::Add, lhs, rhs) => {
        assert!(matches!(lhs.kind, ExprKind::IntConst(3)));
        assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
      }
      other => panic!("unexpected expression {:?}", other),
    }
  }

  #[test]
  fn dangling_else_attaches_to_inner_if() {
    let unit = parse("int main() { if (1) if (0) return 1; else return 2; return 3; }").unwrap();
    let body = &unit.functions[0].body;
    match &body.items[0] {
      BlockItem::Stmt(Stmt {
        kind: StmtKind::If(_, inner, outer_else),
        ..
      }) => {
        assert!(outer_else.is_none());
        assert!(matches!(inner.kind, StmtKind::If(_, _, Some(_))));
      }
      other => panic!("unexpected item {:?}", other),
    }
  }

  #[test]
  fn assignment_requires_an_lvalue() {
    assert!(parse("int main() { 1 = 2; return 0; }").is_err());
  }

  #[test]
  fn line_numbers_are_recorded() {
    let unit = parse("int main() {\n  starttime();\n  return 0;\n}").unwrap();
    let body = &unit.functions[0].body;
    match &body.items[0] {
      BlockItem::Stmt(Stmt {
        kind: StmtKind::Expr(Some(e)),
        ..
      }) => assert_eq!(e.line, 2),
      other => panic!("unexpected item {:?}", other),
    }
  }

  #[test]
  fn ast_dump_uses_documented_labels() {
    let unit = parse("int main() { if (1 < 2) return 1; else return 0; }").unwrap();
    let dump = unit.dump();
    assert!(dump.starts_with("CompUnit\n"));
    assert!(dump.contains("  Function: main (0 params)"));
    assert!(dump.contains("IfStmt"));
    assert!(dump.contains("BinaryExpr: <"));
    assert!(dump.contains("IntConst: 1"));
  }
}
