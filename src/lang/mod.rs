//! Reference engine
//!
//! A small indentation-structured scripting language. It exists so the
//! console has something real to drive: values are `Arc`s, so the
//! environment diff sees rebinding by identity.

pub mod ast;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod value;

pub use interp::{Interpreter, DEFAULT_MAX_LOOP_ITERATIONS};
pub use value::Value;
