use std::io::{self, Write};

use crate::{EngineError, Error};

/// Bytes shown on each side of the offending position.
const WINDOW: usize = 32;

/// Pretty-print a structured [`Error`] with caret positioning.
/// Messages are prefixed with `program` (e.g. "bf: ...").
pub fn print_error(program: &str, code: &[u8], err: &Error) {
    match err {
        Error::Bracket(e) => {
            let msg = format!("{program}: Bracket error: unmatched {}", e.kind);
            print_error_with_context(&msg, code, e.position);
        }
        Error::Engine(EngineError::PointerOutOfBounds { ip, ptr, op }) => {
            let msg = format!(
                "{program}: Runtime error: pointer out of bounds (ptr={ptr}, op='{op}')"
            );
            print_error_with_context(&msg, code, *ip);
        }
        Error::Engine(EngineError::UnindexedBracket { ip }) => {
            let msg = format!("{program}: Runtime error: bracket missing from jump table");
            print_error_with_context(&msg, code, *ip);
        }
        Error::Engine(EngineError::TapeAllocation { size }) => {
            eprintln!("{program}: cannot allocate a tape of {size} cells (see --tape)");
            let _ = io::stderr().flush();
        }
        Error::Engine(EngineError::Io { ip, source }) => {
            let msg = format!("{program}: I/O error: {source}");
            print_error_with_context(&msg, code, *ip);
        }
    }
}

/// Print a concise error with its position and a caret context window.
pub fn print_error_with_context(prefix: &str, code: &[u8], pos: usize) {
    let (slice, underline) = context_window(code, pos);
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{prefix} at position {pos}");
    let _ = writeln!(stderr, "  {slice}");
    let _ = writeln!(stderr, "  {underline}");
    let _ = stderr.flush();
}

/// The source around `pos` and a line with a caret under `pos`.
///
/// Every byte renders as exactly one column so the caret lines up: line
/// breaks and other control bytes become spaces, non-ASCII becomes `?`.
pub fn context_window(code: &[u8], pos: usize) -> (String, String) {
    let start = pos.saturating_sub(WINDOW).min(code.len());
    let end = (pos + WINDOW + 1).min(code.len());

    let slice: String = code[start..end]
        .iter()
        .map(|&b| match b {
            b' '..=b'~' => b as char,
            0x80..=0xff => '?',
            _ => ' ',
        })
        .collect();

    let mut underline = " ".repeat(pos - start);
    underline.push('^');
    (slice, underline)
}
