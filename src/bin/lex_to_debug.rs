//! Tokenize a source file and print the tokens:
//! - `line:column kind` on stdout, one token per line
//! - Debug on stderr - the internal representation from the `gremlin` crate.
//!
//! Exits with a failure status if any token is a lexical error.
//!
//! ```ignore
//! <input.grm lex_to_debug
//! ```

use std::cell::RefCell;
use std::io::Read;

use gremlin::lexer::{Lexer, TokenKind};
use gremlin::memory::Arena;

fn main() {
    tracing_subscriber::fmt::init();

    let mut input = std::io::stdin().lock();
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .expect("error: could not read input");

    let arena = RefCell::new(Arena::new());
    let mut lexer = Lexer::new(&bytes, 0, &arena);
    let mut errors = 0;
    for token in lexer.tokens() {
        let position = token.interval.position;
        match token.kind {
            TokenKind::String(s) => {
                let arena = arena.borrow();
                println!(
                    "{}:{} string {:?}",
                    position.line + 1,
                    position.column + 1,
                    String::from_utf8_lossy(arena.get(s))
                );
            }
            kind => println!("{}:{} {}", position.line + 1, position.column + 1, kind),
        }
        eprintln!("{:?}", token);
        if token.is_error() {
            errors += 1;
        }
    }

    tracing::debug!("arena after lexing: {:?}", arena.borrow().stats());
    if errors > 0 {
        eprintln!("error: {} lexical errors", errors);
        std::process::exit(1);
    }
}
