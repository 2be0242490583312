//! Front end of the gremlin compiler: arena memory, source positions, and the tokenizer.
//!

pub mod lexer;
pub mod memory;
pub mod text;
