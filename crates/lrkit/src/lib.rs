pub mod parser;
pub mod semantics;
