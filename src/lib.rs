//! A small tape-machine interpreter for the eight-instruction language
//! `><+-.,[]`.
//!
//! Running a program takes two steps:
//! - [`brackets::index`] checks that every `[` has a matching `]` and builds
//!   a jump table so loops cost O(1) per iteration;
//! - [`Engine::run`] executes the program against a fixed-size tape of byte
//!   cells, reading `,` from any [`Read`](std::io::Read) and writing `.` to
//!   any [`Write`](std::io::Write).
//!
//! Behaviors:
//! - The tape defaults to 30,000 cells, all initialized to 0.
//! - Cells wrap on overflow (255 + 1 == 0).
//! - Moving the pointer off either end is an error under the default
//!   [`BoundaryPolicy::Strict`], or wraps to the other end under
//!   [`BoundaryPolicy::Wrapping`].
//! - `,` at end of input stores 0.
//! - Any byte outside the instruction set is a comment.
//!
//! Quick start:
//!
//! ```no_run
//! use bf_engine::{run_program, EngineConfig};
//!
//! // Classic "Hello World!"
//! let code = b"++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let mut out = Vec::new();
//! run_program(code, EngineConfig::default(), &mut std::io::empty(), &mut out)
//!     .expect("program should run");
//! assert_eq!(out, b"Hello World!\n");
//! ```

pub mod brackets;
pub mod cli_util;
pub mod config;
pub mod engine;

use std::io::{Read, Write};

pub use brackets::{index, BracketError, BracketKind, BracketMap};
pub use engine::{BoundaryPolicy, Engine, EngineConfig, EngineError, DEFAULT_TAPE_SIZE};

/// Anything that can stop [`run_program`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bracket error: {0}")]
    Bracket(#[from] BracketError),
    #[error("runtime error: {0}")]
    Engine(#[from] EngineError),
}

/// Index `program` and run it on a fresh engine.
///
/// Returns the engine after a successful run so its final tape can be
/// inspected.
pub fn run_program<R, W>(
    program: &[u8],
    config: EngineConfig,
    input: &mut R,
    output: &mut W,
) -> Result<Engine, Error>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let brackets = index(program)?;
    let mut engine = Engine::try_new(config)?;
    engine.run(program, &brackets, input, output)?;
    Ok(engine)
}
