// SysY Compiler
//! Runtime library bindings.

// Fixed signatures for the hosted SysY runtime. `starttime` and `stoptime`
// are source-level aliases: the call site rewrites them to the
// `_sysy_starttime` / `_sysy_stoptime` entry points and injects the call's
// source line as the single argument.

use lazy_static::lazy_static;

use crate::ir::{ExternDecl, Type};

pub struct LibraryFunction {
  /// Name callable from SysY source.
  pub name: &'static str,
  /// Symbol the emitted module references.
  pub link_name: &'static str,
  pub ret: Type,
  pub params: Vec<Type>,
  pub variadic: bool,
}

fn int_ptr() -> Type {
  Type::I32.ptr_to()
}

fn float_ptr() -> Type {
  Type::F32.ptr_to()
}

fn char_ptr() -> Type {
  Type::I8.ptr_to()
}

lazy_static! {
  pub static ref LIBRARY_FUNCTIONS: Vec<LibraryFunction> = vec![
    LibraryFunction {
      name: "getint",
      link_name: "getint",
      ret: Type::I32,
      params: vec![],
      variadic: false,
    },
    LibraryFunction {
      name: "getch",
      link_name: "getch",
      ret: Type::I32,
      params: vec![],
      variadic: false,
    },
    LibraryFunction {
      name: "getfloat",
      link_name: "getfloat",
      ret: Type::F32,
      params: vec![],
      variadic: false,
    },
    LibraryFunction {
      name: "getarray",
      link_name: "getarray",
      ret: Type::I32,
      params: vec![int_ptr()],
      variadic: false,
    },
    LibraryFunction {
      name: "getfarray",
      link_name: "getfarray",
      ret: Type::I32,
      params: vec![float_ptr()],
      variadic: false,
    },
    LibraryFunction {
      name: "putint",
      link_name: "putint",
      ret: Type::Void,
      params: vec![Type::I32],
      variadic: false,
    },
    LibraryFunction {
      name: "putch",
      link_name: "putch",
      ret: Type::Void,
      params: vec![Type::I32],
      variadic: false,
    },
    LibraryFunction {
      name: "putfloat",
      link_name: "putfloat",
      ret: Type::Void,
      params: vec![Type::F32],
      variadic: false,
    },
    LibraryFunction {
      name: "putarray",
      link_name: "putarray",
      ret: Type::Void,
      params: vec![Type::I32, int_ptr()],
      variadic: false,
    },
    LibraryFunction {
      name: "putfarray",
      link_name: "putfarray",
      ret: Type::Void,
      params: vec![Type::I32, float_ptr()],
      variadic: false,
    },
    LibraryFunction {
      name: "putf",
      link_name: "putf",
      ret: Type::Void,
      params: vec![char_ptr()],
      variadic: true,
    },
    LibraryFunction {
      name: "starttime",
      link_name: "_sysy_starttime",
      ret: Type::Void,
      params: vec![Type::I32],
      variadic: false,
    },
    LibraryFunction {
      name: "stoptime",
      link_name: "_sysy_stoptime",
      ret: Type::Void,
      params: vec![Type::I32],
      variadic: false,
    },
  ];
}

/// Looks up a library binding by its source-callable name. The `_sysy_`
/// entry points are also callable directly.
pub fn lookup(name: &str) -> Option<&'static LibraryFunction> {
  LIBRARY_FUNCTIONS
    .iter()
    .find(|lib| lib.name == name || lib.link_name == name)
}

/// True when the timing aliases apply, i.e. the call site must inject the
/// source line argument.
pub fn is_timing_alias(name: &str) -> bool {
  name == "starttime" || name == "stoptime"
}

/// Extern declarations for the emitted module, one per linked symbol.
pub fn extern_decls() -> Vec<ExternDecl> {
  LIBRARY_FUNCTIONS
    .iter()
    .map(|lib| ExternDecl {
      name: lib.link_name.to_string(),
      ret: lib.ret.clone(),
      params: lib.params.clone(),
      variadic: lib.variadic,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timing_aliases_remap_to_runtime_names() {
    assert_eq!(lookup("starttime").unwrap().link_name, "_sysy_starttime");
    assert_eq!(lookup("stoptime").unwrap().link_name, "_sysy_stoptime");
    assert_eq!(
      lookup("_sysy_starttime").unwrap().link_name,
      "_sysy_starttime"
    );
  }

  #[test]
  fn putf_is_the_only_variadic_entry() {
    for lib in LIBRARY_FUNCTIONS.iter() {
      assert_eq!(lib.variadic, lib.name == "putf", "{}", lib.name);
    }
  }
}
