//! `minicc`: the middle end of a compiler for a small subset of C
//!
//! Source files are lexed and parsed into an AST, names are resolved and the
//! result is lowered to an expression tree IR. The IR is type checked without
//! any implicit conversions, and every function that checks cleanly is
//! optimized in place until it reaches a fixpoint.

pub mod driver;
pub mod frontend;
pub mod index;
pub mod middle;
