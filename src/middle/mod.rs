//! Names are resolved here and the AST is lowered to IR. The IR is type
//! checked and then optimized in place, function by function, until the
//! optimization passes stop finding anything to rewrite.

pub mod ast_lowering;
pub mod diagnostic;
pub mod ir;
pub mod optimization;
pub mod resolve;
pub mod symbol;
pub mod ty;
pub mod type_check;
pub mod value;
