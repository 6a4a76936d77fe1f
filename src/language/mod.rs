pub mod ast;
pub mod errors;
pub mod resolve;
pub mod span;
pub mod symbols;
pub mod type_syntax;
pub mod typecheck;
pub mod types;
