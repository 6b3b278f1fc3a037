//! Board model, move applier, and outcome evaluator.
//!
//! DESIGN
//! ======
//! The board is nine tri-state cells in row-major order. Cells, players and
//! outcomes are enums in memory and plain integers on the wire
//! (`0/1/2` for cells, `1/2` for players, `-1/0/1/2` for outcomes).
//!
//! Everything in this module is pure: no locks, no I/O. The match service
//! owns sequencing; these functions only compute.
//!
//! EVALUATION ORDER
//! ================
//! Rows, then columns, then `[0,4,8]`, then `[2,4,6]`. A uniform
//! `[2,4,6]` diagonal reports the owner of cell 0 rather than cell 2, which
//! is what deployed clients have always been sent. When cell 0 is empty
//! that reads as "ongoing".

use serde::{Deserialize, Serialize};

use crate::protocol::ErrorCode;

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

const ROWS: [[usize; 3]; 3] = [[0, 1, 2], [3, 4, 5], [6, 7, 8]];
const COLUMNS: [[usize; 3]; 3] = [[0, 3, 6], [1, 4, 7], [2, 5, 8]];
const MAIN_DIAGONAL: [usize; 3] = [0, 4, 8];
const ANTI_DIAGONAL: [usize; 3] = [2, 4, 6];

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("invalid cell value {value} at index {index}")]
    InvalidCell { index: usize, value: i64 },
    #[error("invalid cell value {0}")]
    InvalidValue(i64),
    #[error("invalid player value {0}")]
    InvalidPlayer(i64),
    #[error("invalid outcome value {0}")]
    InvalidOutcome(i64),
}

impl ErrorCode for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCell { .. } | Self::InvalidValue(_) => "E_INVALID_CELL",
            Self::InvalidPlayer(_) => "E_INVALID_PLAYER",
            Self::InvalidOutcome(_) => "E_INVALID_OUTCOME",
        }
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// One of the two match seats. Slot one is the creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "i64")]
pub enum Player {
    One,
    Two,
}

impl Player {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> Self {
        match player {
            Player::One => 1,
            Player::Two => 2,
        }
    }
}

impl TryFrom<i64> for Player {
    type Error = BoardError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(BoardError::InvalidPlayer(other)),
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

// =============================================================================
// CELL
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "i64")]
pub enum Cell {
    #[default]
    Empty,
    PlayerOne,
    PlayerTwo,
}

impl Cell {
    #[must_use]
    pub fn owner(self) -> Option<Player> {
        match self {
            Self::Empty => None,
            Self::PlayerOne => Some(Player::One),
            Self::PlayerTwo => Some(Player::Two),
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => 0,
            Cell::PlayerOne => 1,
            Cell::PlayerTwo => 2,
        }
    }
}

impl TryFrom<i64> for Cell {
    type Error = BoardError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::PlayerOne),
            2 => Ok(Self::PlayerTwo),
            other => Err(BoardError::InvalidValue(other)),
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Cell; CELL_COUNT]);

impl Board {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from raw wire values, rejecting the whole board if any
    /// value is not a valid cell.
    ///
    /// # Errors
    ///
    /// Returns `BoardError::InvalidCell` naming the first bad index.
    pub fn from_values(values: &[i64; CELL_COUNT]) -> Result<Self, BoardError> {
        let mut cells = [Cell::Empty; CELL_COUNT];
        for (index, (slot, &value)) in cells.iter_mut().zip(values).enumerate() {
            *slot = Cell::try_from(value).map_err(|_| BoardError::InvalidCell { index, value })?;
        }
        Ok(Self(cells))
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0 = [Cell::Empty; CELL_COUNT];
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.0.iter().any(|c| c.is_empty())
    }

    /// The player holding all three cells of `line`, if any.
    fn line_owner(&self, line: [usize; 3]) -> Option<Player> {
        let [a, b, c] = line;
        let first = self.0[a];
        if first == self.0[b] && first == self.0[c] { first.owner() } else { None }
    }
}

// =============================================================================
// MOVE APPLIER
// =============================================================================

/// Claim the first cell that is empty on `current` and occupied on
/// `proposed`. Any further differences in `proposed` are ignored.
///
/// Returns the claimed index, or `None` when the proposal claims nothing
/// new (resubmitted board, or only occupied cells overwritten).
pub fn apply_move(current: &mut Board, proposed: &Board) -> Option<usize> {
    let index = current
        .0
        .iter()
        .zip(proposed.0.iter())
        .position(|(now, next)| now.is_empty() && !next.is_empty())?;
    current.0[index] = proposed.0[index];
    Some(index)
}

/// Apply a raw wire proposal. Out-of-range values reject the proposal
/// without touching `current`.
///
/// # Errors
///
/// Returns the validation error when any value is not a valid cell.
pub fn apply_values(current: &mut Board, values: &[i64; CELL_COUNT]) -> Result<Option<usize>, BoardError> {
    let proposed = Board::from_values(values)?;
    Ok(apply_move(current, &proposed))
}

// =============================================================================
// OUTCOME
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i64")]
pub enum Outcome {
    #[default]
    Ongoing,
    Draw,
    Winner(Player),
}

impl Outcome {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Ongoing
    }
}

impl From<Cell> for Outcome {
    fn from(cell: Cell) -> Self {
        cell.owner().map_or(Self::Ongoing, Self::Winner)
    }
}

impl From<Outcome> for i8 {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ongoing => 0,
            Outcome::Draw => -1,
            Outcome::Winner(Player::One) => 1,
            Outcome::Winner(Player::Two) => 2,
        }
    }
}

impl TryFrom<i64> for Outcome {
    type Error = BoardError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ongoing),
            -1 => Ok(Self::Draw),
            1 => Ok(Self::Winner(Player::One)),
            2 => Ok(Self::Winner(Player::Two)),
            other => Err(BoardError::InvalidOutcome(other)),
        }
    }
}

/// Compute the outcome of `board`. See the module docs for check order.
#[must_use]
pub fn evaluate(board: &Board) -> Outcome {
    for line in ROWS.into_iter().chain(COLUMNS) {
        if let Some(player) = board.line_owner(line) {
            return Outcome::Winner(player);
        }
    }
    if let Some(player) = board.line_owner(MAIN_DIAGONAL) {
        return Outcome::Winner(player);
    }
    if board.line_owner(ANTI_DIAGONAL).is_some() {
        return Outcome::from(board.cells()[0]);
    }
    if board.is_full() { Outcome::Draw } else { Outcome::Ongoing }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
