//! Bracket indexing.
//!
//! Before a program runs, every `[` is paired with its `]` so the engine can
//! jump between them in O(1). Pairing uses a stack of unmatched openers: the
//! most recently opened loop is the first one closed.

use std::fmt;

/// Which side of a loop was left without a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Open,
    Close,
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKind::Open => write!(f, "'['"),
            BracketKind::Close => write!(f, "']'"),
        }
    }
}

/// A program whose brackets do not balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unmatched {kind} at position {position}")]
pub struct BracketError {
    pub kind: BracketKind,
    pub position: usize,
}

/// Jump table for a well-formed program.
///
/// `jumps[i]` holds the partner of the bracket at `i`; non-bracket positions
/// hold `None`. The table is symmetric: if `i` maps to `j`, `j` maps to `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketMap {
    jumps: Vec<Option<usize>>,
    pairs: usize,
}

impl BracketMap {
    /// Position of the bracket matching the one at `position`, if any.
    pub fn get(&self, position: usize) -> Option<usize> {
        self.jumps.get(position).copied().flatten()
    }

    /// Number of matched `[`/`]` pairs.
    pub fn pair_count(&self) -> usize {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    /// Iterate over `(open, close)` pairs in order of their opening bracket.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.jumps
            .iter()
            .enumerate()
            .filter_map(|(i, jump)| jump.filter(|&j| j > i).map(|j| (i, j)))
    }
}

/// Validate the brackets of `program` and build its jump table.
///
/// Fails on the first `]` with no open loop, or, once the scan is done, on
/// the innermost `[` that was never closed.
pub fn index(program: &[u8]) -> Result<BracketMap, BracketError> {
    let mut jumps: Vec<Option<usize>> = vec![None; program.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut pairs = 0;

    for (i, &byte) in program.iter().enumerate() {
        match byte {
            b'[' => stack.push(i),
            b']' => {
                let Some(open) = stack.pop() else {
                    return Err(BracketError {
                        kind: BracketKind::Close,
                        position: i,
                    });
                };
                jumps[open] = Some(i);
                jumps[i] = Some(open);
                pairs += 1;
            }
            _ => {}
        }
    }

    if let Some(&open) = stack.last() {
        return Err(BracketError {
            kind: BracketKind::Open,
            position: open,
        });
    }

    Ok(BracketMap { jumps, pairs })
}
