//! The execution engine.
//!
//! An [`Engine`] owns a fixed-size tape of byte cells and a data pointer. It
//! runs a program against a [`BracketMap`] produced by
//! [`brackets::index`](crate::brackets::index), reading `,` input from any
//! [`Read`] and writing `.` output to any [`Write`].

use std::io::{self, Read, Write};
use std::num::NonZeroUsize;

use crate::brackets::BracketMap;

/// Tape length used when none is configured.
pub const DEFAULT_TAPE_SIZE: NonZeroUsize = NonZeroUsize::new(30_000).unwrap();

/// What happens when the data pointer is moved past either end of the tape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Moving off the tape aborts the run.
    #[default]
    Strict,
    /// Moving off one end lands on the opposite end.
    Wrapping,
}

impl std::str::FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(BoundaryPolicy::Strict),
            "wrap" | "wrapping" => Ok(BoundaryPolicy::Wrapping),
            other => Err(format!(
                "unknown boundary policy '{other}' (expected 'strict' or 'wrapping')"
            )),
        }
    }
}

/// Fixed per-engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub tape_size: NonZeroUsize,
    pub boundary: BoundaryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tape_size: DEFAULT_TAPE_SIZE,
            boundary: BoundaryPolicy::Strict,
        }
    }
}

/// Errors that stop a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The data pointer would leave the tape under [`BoundaryPolicy::Strict`].
    #[error("pointer out of bounds at instruction {ip} (ptr={ptr}, op='{op}')")]
    PointerOutOfBounds { ip: usize, ptr: usize, op: char },

    /// A bracket with no entry in the jump table, i.e. the table was built
    /// for a different program.
    #[error("bracket at instruction {ip} is missing from the bracket map")]
    UnindexedBracket { ip: usize },

    /// The input or output stream failed. End of input is not an error.
    #[error("I/O error at instruction {ip}: {source}")]
    Io {
        ip: usize,
        #[source]
        source: io::Error,
    },

    /// The configured tape is larger than this process can allocate.
    #[error("cannot allocate a tape of {size} cells")]
    TapeAllocation { size: usize },
}

/// A tape machine.
///
/// The engine keeps its tape and pointer between runs; call
/// [`reset`](Engine::reset) to start the next program from a clean tape.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    tape: Vec<u8>,
    pointer: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine with a zeroed tape of `config.tape_size` cells.
    ///
    /// Panics if the tape cannot be allocated; use [`try_new`](Engine::try_new)
    /// for sizes that come from user input.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tape: vec![0; config.tape_size.get()],
            pointer: 0,
        }
    }

    /// Like [`new`](Engine::new), but reports an oversized tape as
    /// [`EngineError::TapeAllocation`] instead of aborting.
    pub fn try_new(config: EngineConfig) -> Result<Self, EngineError> {
        let size = config.tape_size.get();
        let mut tape: Vec<u8> = Vec::new();
        tape.try_reserve_exact(size)
            .map_err(|_| EngineError::TapeAllocation { size })?;
        tape.resize(size, 0);
        Ok(Self {
            config,
            tape,
            pointer: 0,
        })
    }

    /// The settings this engine was built with.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// The whole tape, cell 0 first.
    pub fn tape(&self) -> &[u8] {
        &self.tape
    }

    /// Index of the current cell.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Value of the cell under the pointer.
    pub fn current_cell(&self) -> u8 {
        self.tape[self.pointer]
    }

    /// Zero every cell and return the pointer to cell 0.
    pub fn reset(&mut self) {
        self.tape.fill(0);
        self.pointer = 0;
    }

    /// Returns `false` when the move is refused under the strict policy.
    fn move_right(&mut self) -> bool {
        if self.pointer + 1 >= self.tape.len() {
            match self.config.boundary {
                BoundaryPolicy::Strict => return false,
                BoundaryPolicy::Wrapping => self.pointer = 0,
            }
        } else {
            self.pointer += 1;
        }
        true
    }

    fn move_left(&mut self) -> bool {
        if self.pointer == 0 {
            match self.config.boundary {
                BoundaryPolicy::Strict => return false,
                BoundaryPolicy::Wrapping => self.pointer = self.tape.len() - 1,
            }
        } else {
            self.pointer -= 1;
        }
        true
    }

    /// Execute `program` until its last instruction has run.
    ///
    /// `brackets` must come from indexing the same `program`. The first
    /// boundary violation ends the run; bytes already written to `output`
    /// stay written. There is no step limit, so a loop that never clears its
    /// cell never returns.
    pub fn run<R, W>(
        &mut self,
        program: &[u8],
        brackets: &BracketMap,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), EngineError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut ip = 0;

        while ip < program.len() {
            let op = program[ip];
            match op {
                b'>' => {
                    if !self.move_right() {
                        return Err(self.out_of_bounds(ip, op));
                    }
                }
                b'<' => {
                    if !self.move_left() {
                        return Err(self.out_of_bounds(ip, op));
                    }
                }
                b'+' => {
                    self.tape[self.pointer] = self.tape[self.pointer].wrapping_add(1);
                }
                b'-' => {
                    self.tape[self.pointer] = self.tape[self.pointer].wrapping_sub(1);
                }
                b'.' => {
                    output
                        .write_all(&[self.tape[self.pointer]])
                        .map_err(|source| EngineError::Io { ip, source })?;
                }
                b',' => {
                    // Make any pending prompt visible before blocking on input.
                    output
                        .flush()
                        .map_err(|source| EngineError::Io { ip, source })?;
                    self.tape[self.pointer] =
                        read_byte(input).map_err(|source| EngineError::Io { ip, source })?;
                }
                b'[' => {
                    if self.tape[self.pointer] == 0 {
                        ip = brackets.get(ip).ok_or(EngineError::UnindexedBracket { ip })?;
                    }
                }
                b']' => {
                    // Landing on the '[' and then advancing is the same as
                    // re-checking it: the cell is known to be nonzero.
                    if self.tape[self.pointer] != 0 {
                        ip = brackets.get(ip).ok_or(EngineError::UnindexedBracket { ip })?;
                    }
                }
                _ => {}
            }
            ip += 1;
        }

        output.flush().map_err(|source| EngineError::Io { ip, source })
    }

    fn out_of_bounds(&self, ip: usize, op: u8) -> EngineError {
        EngineError::PointerOutOfBounds {
            ip,
            ptr: self.pointer,
            op: op as char,
        }
    }
}

/// One byte from `input`, or 0 once the stream is exhausted.
fn read_byte<R: Read + ?Sized>(input: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(0),
            Ok(_) => return Ok(buf[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brackets::index;
    use std::io::Cursor;

    fn engine(tape_size: usize, boundary: BoundaryPolicy) -> Engine {
        Engine::new(EngineConfig {
            tape_size: NonZeroUsize::new(tape_size).unwrap(),
            boundary,
        })
    }

    /// Run `code` with the given input, returning the run result and output.
    fn run(bf: &mut Engine, code: &str, input: &[u8]) -> (Result<(), EngineError>, Vec<u8>) {
        let map = index(code.as_bytes()).expect("balanced program");
        let mut input = Cursor::new(input.to_vec());
        let mut output = Vec::new();
        let result = bf.run(code.as_bytes(), &map, &mut input, &mut output);
        (result, output)
    }

    #[test]
    fn default_config_is_strict_with_30000_cells() {
        let bf = Engine::default();
        assert_eq!(bf.config().boundary, BoundaryPolicy::Strict);
        assert_eq!(bf.tape().len(), 30_000);
        assert!(bf.tape().iter().all(|&c| c == 0));
        assert_eq!(bf.pointer(), 0);
    }

    #[test]
    fn try_new_matches_new_for_normal_sizes() {
        let bf = Engine::try_new(EngineConfig::default()).unwrap();
        assert_eq!(bf.tape().len(), 30_000);
        assert!(bf.tape().iter().all(|&c| c == 0));
    }

    #[test]
    fn oversized_tape_is_an_error_not_a_panic() {
        let config = EngineConfig {
            tape_size: NonZeroUsize::MAX,
            boundary: BoundaryPolicy::Strict,
        };
        let result = Engine::try_new(config);
        assert!(matches!(
            result,
            Err(EngineError::TapeAllocation { size }) if size == usize::MAX
        ));
    }

    #[test]
    fn left_pointer_out_of_bounds_errors() {
        let mut bf = engine(10, BoundaryPolicy::Strict);
        let (result, _) = run(&mut bf, "<", b"");
        assert!(matches!(
            result,
            Err(EngineError::PointerOutOfBounds { ip: 0, ptr: 0, op: '<' })
        ));
        assert_eq!(bf.pointer(), 0);
    }

    #[test]
    fn right_pointer_out_of_bounds_errors() {
        // With 3 cells (0..=2), the 3rd '>' attempts to move beyond index 2.
        let mut bf = engine(3, BoundaryPolicy::Strict);
        let (result, _) = run(&mut bf, ">>>", b"");
        assert!(matches!(
            result,
            Err(EngineError::PointerOutOfBounds { ip: 2, ptr: 2, op: '>' })
        ));
        assert_eq!(bf.pointer(), 2);
    }

    #[test]
    fn wrapping_left_from_first_cell_lands_on_last() {
        let mut bf = engine(5, BoundaryPolicy::Wrapping);
        let (result, _) = run(&mut bf, "<+", b"");
        assert!(result.is_ok());
        assert_eq!(bf.pointer(), 4);
        assert_eq!(bf.tape(), &[0, 0, 0, 0, 1]);
    }

    #[test]
    fn wrapping_right_from_last_cell_lands_on_first() {
        let mut bf = engine(3, BoundaryPolicy::Wrapping);
        let (result, _) = run(&mut bf, ">>>+", b"");
        assert!(result.is_ok());
        assert_eq!(bf.pointer(), 0);
        assert_eq!(bf.tape(), &[1, 0, 0]);
    }

    #[test]
    fn single_cell_tape_wraps_onto_itself() {
        let mut bf = engine(1, BoundaryPolicy::Wrapping);
        let (result, _) = run(&mut bf, "><+", b"");
        assert!(result.is_ok());
        assert_eq!(bf.tape(), &[1]);

        let mut strict = engine(1, BoundaryPolicy::Strict);
        let (result, _) = run(&mut strict, ">", b"");
        assert!(matches!(result, Err(EngineError::PointerOutOfBounds { .. })));
    }

    #[test]
    fn wrapping_subtraction() {
        let mut bf = engine(1, BoundaryPolicy::Strict);
        let (result, _) = run(&mut bf, "-", b"");
        assert!(result.is_ok());
        assert_eq!(bf.tape()[0], 255);
    }

    #[test]
    fn wrapping_addition() {
        let code = "+".repeat(256);
        let mut bf = engine(1, BoundaryPolicy::Strict);
        let (result, _) = run(&mut bf, &code, b"");
        assert!(result.is_ok());
        assert_eq!(bf.tape()[0], 0);
    }

    #[test]
    fn increment_and_decrement_cancel_across_the_wrap() {
        for (prefix, expected) in [("", 0u8), ("-", 255u8), ("+", 1u8)] {
            for pair in ["+-", "-+"] {
                let mut bf = engine(1, BoundaryPolicy::Strict);
                let (result, _) = run(&mut bf, &format!("{prefix}{pair}"), b"");
                assert!(result.is_ok());
                assert_eq!(bf.current_cell(), expected, "{prefix}{pair}");
            }
        }
    }

    #[test]
    fn output_writes_raw_cell_bytes() {
        let mut bf = engine(2, BoundaryPolicy::Strict);
        let (result, output) = run(&mut bf, "-.+.+.", b"");
        assert!(result.is_ok());
        assert_eq!(output, vec![255, 0, 1]);
    }

    #[test]
    fn input_reads_bytes_then_zero_on_eof() {
        let mut bf = engine(3, BoundaryPolicy::Strict);
        let (result, _) = run(&mut bf, "+++,>+++,>+++,", b"AB");
        assert!(result.is_ok());
        assert_eq!(bf.tape(), b"AB\0");
    }

    #[test]
    fn empty_loop_on_zero_cell_is_skipped() {
        let mut bf = engine(10, BoundaryPolicy::Strict);
        let (result, output) = run(&mut bf, "[.]+.", b"");
        assert!(result.is_ok());
        assert_eq!(output, vec![1]);
    }

    #[test]
    fn loop_clears_cell() {
        let mut bf = engine(10, BoundaryPolicy::Strict);
        let (result, _) = run(&mut bf, "+++[-]", b"");
        assert!(result.is_ok());
        assert_eq!(bf.current_cell(), 0);
    }

    #[test]
    fn nested_loops_multiply() {
        // 4 * 3 into cell 1 via an inner loop over cell 2.
        let mut bf = engine(10, BoundaryPolicy::Strict);
        let (result, _) = run(&mut bf, "++++[>>+++[<+>-]<<-]", b"");
        assert!(result.is_ok());
        assert_eq!(&bf.tape()[..3], &[0, 12, 0]);
    }

    #[test]
    fn comment_bytes_are_ignored() {
        let mut bf = engine(10, BoundaryPolicy::Strict);
        let (result, output) = run(&mut bf, "add one: +\nthen print it! .", b"");
        assert!(result.is_ok());
        assert_eq!(output, vec![1]);
    }

    #[test]
    fn output_before_boundary_error_is_kept() {
        let mut bf = engine(2, BoundaryPolicy::Strict);
        let (result, output) = run(&mut bf, "+.>+.>+.", b"");
        assert!(matches!(result, Err(EngineError::PointerOutOfBounds { ip: 5, .. })));
        assert_eq!(output, vec![1, 1]);
        assert_eq!(bf.tape(), &[1, 1]);
    }

    #[test]
    fn map_from_another_program_is_reported() {
        let mut bf = engine(10, BoundaryPolicy::Strict);
        let map = index(b"").unwrap();
        let result = bf.run(b"[]", &map, &mut io::empty(), &mut io::sink());
        assert!(matches!(result, Err(EngineError::UnindexedBracket { ip: 0 })));
    }

    #[test]
    fn reset_clears_tape_and_pointer_but_keeps_config() {
        let mut bf = engine(4, BoundaryPolicy::Wrapping);
        let (result, _) = run(&mut bf, "+>++>+++", b"");
        assert!(result.is_ok());
        assert_eq!(bf.pointer(), 2);

        bf.reset();
        assert_eq!(bf.pointer(), 0);
        assert_eq!(bf.tape(), &[0, 0, 0, 0]);
        assert_eq!(bf.config().boundary, BoundaryPolicy::Wrapping);
        assert_eq!(bf.config().tape_size.get(), 4);
    }

    #[test]
    fn state_persists_between_runs_without_reset() {
        let mut bf = engine(4, BoundaryPolicy::Strict);
        let (first, _) = run(&mut bf, "+>", b"");
        let (second, _) = run(&mut bf, "+", b"");
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(bf.tape(), &[1, 1, 0, 0]);
    }

    #[test]
    fn read_errors_surface_as_io() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("boom"))
            }
        }

        let mut bf = engine(1, BoundaryPolicy::Strict);
        let map = index(b"+,").unwrap();
        let result = bf.run(b"+,", &map, &mut Broken, &mut io::sink());
        assert!(matches!(result, Err(EngineError::Io { ip: 1, .. })));
    }

    #[test]
    fn boundary_policy_parses_from_text() {
        assert_eq!("strict".parse(), Ok(BoundaryPolicy::Strict));
        assert_eq!(" Wrapping ".parse(), Ok(BoundaryPolicy::Wrapping));
        assert_eq!("wrap".parse(), Ok(BoundaryPolicy::Wrapping));
        assert!("sideways".parse::<BoundaryPolicy>().is_err());
    }
}
