// SysY Compiler
//! Lexer

// SysY tokens are lexed with logos 0.12; see docs
// (https://docs.rs/logos/0.12.1/logos/index.html).
// Integer literals come in decimal, octal and hexadecimal form; float
// literals are decimal with an optional fraction and exponent. String
// literals (only meaningful as the first argument of putf) have their
// escapes processed here so the rest of the compiler sees raw bytes.

#![allow(clippy::upper_case_acronyms)]
use enum_as_inner::EnumAsInner;
use logos::{Lexer, Logos, Skip};
use std::fmt;
use strum_macros::AsRefStr;

// Handles parsing a hex string without the leading 0x
fn from_hex(lex: &mut Lexer<Token>) -> Result<i32, String> {
  let slice = lex.slice();
  let without_prefix = &slice[2..];
  match u64::from_str_radix(without_prefix, 16) {
    Ok(x) if x <= 0xffffffff => Ok(x as u32 as i32),
    Ok(x) => Err(format!("hex literal {:#x} is out of range", x)),
    Err(e) => Err(format!("failed to parse hex literal: {:?}", e)),
  }
}

fn from_oct(lex: &mut Lexer<Token>) -> Result<i32, String> {
  let slice = lex.slice();
  match u64::from_str_radix(slice, 8) {
    Ok(x) if x <= 0xffffffff => Ok(x as u32 as i32),
    Ok(x) => Err(format!("octal literal {} is out of range", x)),
    Err(e) => Err(format!("failed to parse octal literal: {:?}", e)),
  }
}

fn from_dec(lex: &mut Lexer<Token>) -> Result<i32, String> {
  let slice = lex.slice();
  let res: Result<i64, _> = slice.parse();
  match res {
    // 2147483648 is allowed so that -2147483648 works after negation.
    Ok(x) if x <= (i32::MIN as i64).abs() => Ok(x as u32 as i32),
    Ok(x) => Err(format!("integer literal {} is out of range", x)),
    Err(e) => Err(format!("failed to parse integer literal: {:?}", e)),
  }
}

fn from_float(lex: &mut Lexer<Token>) -> Result<f32, String> {
  lex
    .slice()
    .parse::<f32>()
    .map_err(|e| format!("failed to parse float literal: {:?}", e))
}

// Strips the surrounding quotes and processes escape sequences.
fn from_string(lex: &mut Lexer<Token>) -> Result<String, String> {
  let slice = lex.slice();
  let body = &slice[1..slice.len() - 1];
  let mut out = String::with_capacity(body.len());
  let mut chars = body.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('r') => out.push('\r'),
      Some('0') => out.push('\0'),
      Some('\\') => out.push('\\'),
      Some('"') => out.push('"'),
      Some(c) => return Err(format!("unknown escape sequence \\{}", c)),
      None => return Err("dangling backslash in string literal".to_string()),
    }
  }
  Ok(out)
}

fn skip_block_comment(lex: &mut Lexer<Token>) -> Skip {
  let rest = lex.remainder();
  match rest.find("*/") {
    Some(pos) => lex.bump(pos + 2),
    None => lex.bump(rest.len()),
  }
  Skip
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

#[derive(Clone, Logos, Debug, PartialEq, AsRefStr, EnumAsInner)]
pub enum Token {
  #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string(), priority = 2)]
  Ident(String),

  #[regex(r"0[xX][0-9a-fA-F]+", from_hex)]
  #[regex(r"0[0-7]*", from_oct)]
  #[regex(r"[1-9][0-9]*", from_dec)]
  IntConst(i32),

  #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", from_float)]
  #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", from_float)]
  #[regex(r"[0-9]+[eE][+-]?[0-9]+", from_float)]
  FloatConst(f32),

  #[regex(r#""(\\.|[^"\\])*""#, from_string)]
  StringLit(String),

  #[token("+")]
  Plus,
  #[token("-")]
  Minus,
  #[token("*")]
  Asterisk,
  #[token("/")]
  Div,
  #[token("%")]
  Mod,
  #[token("<")]
  LessThan,
  #[token(">")]
  GreaterThan,
  #[token("<=")]
  Leq,
  #[token(">=")]
  Geq,
  #[token("==")]
  Eq,
  #[token("!=")]
  Neq,
  #[token("&&")]
  And,
  #[token("||")]
  Or,
  #[token("!")]
  Not,
  #[token("=")]
  Assgn,
  #[token("(")]
  LParen,
  #[token(")")]
  RParen,
  #[token("{")]
  LBrace,
  #[token("}")]
  RBrace,
  #[token("[")]
  LBracket,
  #[token("]")]
  RBracket,
  #[token(",")]
  Comma,
  #[token(";")]
  Semicolon,

  // Reserved keywords
  #[token("const")]
  Const,
  #[token("int")]
  Int,
  #[token("float")]
  Float,
  #[token("void")]
  Void,
  #[token("vector")]
  Vector,
  #[token("if")]
  If,
  #[token("else")]
  Else,
  #[token("while")]
  While,
  #[token("break")]
  Break,
  #[token("continue")]
  Continue,
  #[token("return")]
  Return,

  #[regex(r"[ \t\n\v\r\f]+", logos::skip)]
  #[regex(r"//[^\n]*", logos::skip)]
  #[token("/*", skip_block_comment)]
  Comment,

  #[error]
  #[regex(r"[^\x00-\x7F]")] // Error on non ascii characters
  Error,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lex_all(input: &str) -> Vec<Token> {
    Token::lexer(input).collect()
  }

  #[test]
  fn integer_literal_forms() {
    assert_eq!(
      lex_all("0 42 010 0x1F"),
      vec![
        Token::IntConst(0),
        Token::IntConst(42),
        Token::IntConst(8),
        Token::IntConst(31),
      ]
    );
  }

  #[test]
  fn int_min_magnitude_wraps() {
    // 2147483648 lexes so that unary minus can produce i32::MIN.
    assert_eq!(lex_all("2147483648"), vec![Token::IntConst(i32::MIN)]);
    assert_eq!(lex_all("2147483649"), vec![Token::Error]);
  }

  #[test]
  fn float_literal_forms() {
    assert_eq!(
      lex_all("1.5 .5 2. 3e2"),
      vec![
        Token::FloatConst(1.5),
        Token::FloatConst(0.5),
        Token::FloatConst(2.0),
        Token::FloatConst(300.0),
      ]
    );
  }

  #[test]
  fn string_escapes_processed() {
    assert_eq!(
      lex_all(r#""%d %f\n""#),
      vec![Token::StringLit("%d %f\n".to_string())]
    );
  }

  #[test]
  fn keywords_beat_identifiers() {
    assert_eq!(
      lex_all("vector vectors"),
      vec![Token::Vector, Token::Ident("vectors".to_string())]
    );
  }

  #[test]
  fn comments_are_skipped() {
    assert_eq!(
      lex_all("a // line\n/* block\n */ b"),
      vec![Token::Ident("a".to_string()), Token::Ident("b".to_string())]
    );
  }
}
