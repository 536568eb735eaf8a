//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the engine.
//! All types are pure data structures with no external dependencies, making
//! them usable in any context (core logic, presentation, AI protocol).
//!
//! # Grid Dimensions
//!
//! Grids are sized per game; the canonical configuration is:
//!
//! - **Rows**: 8 (indexed 0-7, row 0 at the top)
//! - **Columns**: 5 (indexed 0-4)
//!
//! # Match Rules Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `MIN_MATCH` | 3 | Minimum chain length for a commit to resolve |
//! | `TILE_SCORE` | 10 | Base points per removed tile |
//! | `BONUS_TIER_MIN` | 5 | Removal count for the bonus tier (x2 score) |
//! | `SUPER_TIER_MIN` | 10 | Removal count for the super tier (x4 score) |
//! | `POWERUP_CHANCE_PCT` | 12 | Chance that a generated tile carries a powerup |
//! | `EXTRA_MOVES_PER_TILE` | 3 | Moves refunded per `extraMoves` tile in a chain |
//! | `MULTIPLIER_TURNS` | 3 | Commits the score multiplier buff stays active |
//! | `SUPER_TIER_MOVE_BONUS` | 1 | Flat move refund for a super-tier match |
//!
//! # Combo Meter Constants
//!
//! The combo meter lives in `[0, 100)` and fills with every resolved match:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `COMBO_MAX` | 100 | Meter value that triggers a breakout |
//! | `COMBO_FILL_BASE` | 10 | Fill for a minimum-length match |
//! | `COMBO_FILL_STEP` | 5 | Extra fill per tile beyond `MIN_MATCH` |
//! | `COMBO_FILL_MAX` | 25 | Fill cap per match |
//! | `COMBO_BREAKOUT_SCORE` | 500 | Flat score bonus on breakout |
//! | `COMBO_BREAKOUT_MOVES` | 2 | Flat move refund on breakout |
//! | `COMBO_MISS_PENALTY` | 15 | Meter drop when a too-short chain is released |
//!
//! # Snapshot Cell Codes
//!
//! Observation payloads encode cells as `u8` values:
//!
//! | Code | Face | Code | Powerup |
//! |------|------|------|---------|
//! | 0 | empty | 0 | none |
//! | 1 | red | 1 | extraMoves |
//! | 2 | blue | 2 | scoreMultiplier |
//! | 3 | yellow | 3 | areaBomb |
//! | 4 | green | | |
//! | 5 | purple | | |
//! | 6 | rainbow | | |
//! | 7 | special | | |
//!
//! # Examples
//!
//! ```
//! use chainpop_types::{GameOp, GridPos, TileColor, TileFace, MIN_MATCH};
//!
//! // Parse a color from string (case-insensitive)
//! let color = TileColor::from_str("Yellow").unwrap();
//! assert_eq!(color, TileColor::Yellow);
//!
//! // Wildcards bind to any chain color
//! assert!(TileFace::Rainbow.is_wildcard());
//! assert_eq!(TileFace::Color(color).base_color(), Some(TileColor::Yellow));
//!
//! // King-move adjacency drives chain extension
//! let a = GridPos::new(2, 2);
//! assert!(a.king_adjacent(GridPos::new(3, 3)));
//! assert!(!a.king_adjacent(GridPos::new(2, 4)));
//!
//! // Operations carry their own coordinates
//! let op = GameOp::StartSelection { row: 0, col: 1 };
//! assert_eq!(op.name(), "startSelection");
//! assert_eq!(MIN_MATCH, 3);
//! ```

/// Number of base colors in the palette
pub const PALETTE_SIZE: usize = 5;

/// Default grid rows (row 0 is the top row)
pub const DEFAULT_GRID_ROWS: u8 = 8;

/// Default grid columns
pub const DEFAULT_GRID_COLS: u8 = 5;

/// Minimum chain length for a commit to resolve as a match
pub const MIN_MATCH: usize = 3;

/// Base points per removed tile
pub const TILE_SCORE: u32 = 10;

/// Removal-set size at which a match reaches the bonus tier
pub const BONUS_TIER_MIN: usize = 5;

/// Removal-set size at which a match reaches the super tier
pub const SUPER_TIER_MIN: usize = 10;

/// Percent chance that a freshly generated tile carries a powerup
pub const POWERUP_CHANCE_PCT: u32 = 12;

/// Moves refunded per `extraMoves` tile collected in a chain
pub const EXTRA_MOVES_PER_TILE: u32 = 3;

/// Commits the score multiplier buff stays active after collection
pub const MULTIPLIER_TURNS: u32 = 3;

/// Flat move refund for a super-tier match
pub const SUPER_TIER_MOVE_BONUS: u32 = 1;

/// Target decrement factor when the removal set contains a special tile
pub const SPECIAL_TARGET_FACTOR: u16 = 2;

/// Combo meter value that triggers a breakout (meter stays in `[0, COMBO_MAX)`)
pub const COMBO_MAX: u32 = 100;

/// Combo meter fill for a minimum-length match
pub const COMBO_FILL_BASE: u32 = 10;

/// Extra combo meter fill per removed tile beyond `MIN_MATCH`
pub const COMBO_FILL_STEP: u32 = 5;

/// Combo meter fill cap per match
pub const COMBO_FILL_MAX: u32 = 25;

/// Flat score bonus awarded on a combo breakout
pub const COMBO_BREAKOUT_SCORE: u32 = 500;

/// Flat move refund awarded on a combo breakout
pub const COMBO_BREAKOUT_MOVES: u32 = 2;

/// Combo meter penalty when a too-short chain is released
pub const COMBO_MISS_PENALTY: u32 = 15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_rule_defaults() {
        assert_eq!(MIN_MATCH, 3);
        assert_eq!(TILE_SCORE, 10);
        assert_eq!(BONUS_TIER_MIN, 5);
        assert_eq!(SUPER_TIER_MIN, 10);
        assert_eq!(POWERUP_CHANCE_PCT, 12);
        assert_eq!(EXTRA_MOVES_PER_TILE, 3);
        assert_eq!(MULTIPLIER_TURNS, 3);

        assert_eq!(COMBO_MAX, 100);
        assert_eq!(COMBO_FILL_BASE, 10);
        assert_eq!(COMBO_FILL_STEP, 5);
        assert_eq!(COMBO_FILL_MAX, 25);
        assert_eq!(COMBO_BREAKOUT_SCORE, 500);
        assert_eq!(COMBO_BREAKOUT_MOVES, 2);
        assert_eq!(COMBO_MISS_PENALTY, 15);
    }

    #[test]
    fn string_round_trips() {
        for color in TileColor::ALL {
            assert_eq!(TileColor::from_str(color.as_str()), Some(color));
        }
        for phase in [
            GamePhase::Home,
            GamePhase::Playing,
            GamePhase::LevelUp,
            GamePhase::Won,
            GamePhase::Lost,
        ] {
            assert_eq!(GamePhase::from_str(phase.as_str()), Some(phase));
        }
        for kind in [
            PowerupKind::ExtraMoves,
            PowerupKind::ScoreMultiplier,
            PowerupKind::AreaBomb,
        ] {
            assert_eq!(PowerupKind::from_str(kind.as_str()), Some(kind));
        }
        for tier in [MatchTier::Normal, MatchTier::Bonus, MatchTier::Super] {
            assert_eq!(MatchTier::from_str(tier.as_str()), Some(tier));
        }
    }

    #[test]
    fn face_codes_are_distinct() {
        let mut codes = vec![0u8];
        for color in TileColor::ALL {
            codes.push(TileFace::Color(color).code());
        }
        codes.push(TileFace::Rainbow.code());
        codes.push(TileFace::Special.code());
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 8);
    }

    #[test]
    fn targets_decrement_saturates() {
        let mut targets = Targets::new([5, 0, 3, 0, 0]);
        targets.decrement(TileColor::Red, 9);
        assert_eq!(targets.get(TileColor::Red), 0);
        assert!(!targets.all_met());
        targets.decrement_all(3);
        assert!(targets.all_met());
        assert_eq!(targets.total(), 0);
    }
}

/// The five base tile colors
///
/// Every generated tile carries one of these; `rainbow` and `special`
/// wildcards are represented by [`TileFace`], not by a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileColor {
    Red,
    Blue,
    Yellow,
    Green,
    Purple,
}

impl TileColor {
    /// All palette colors in index order
    pub const ALL: [TileColor; PALETTE_SIZE] = [
        TileColor::Red,
        TileColor::Blue,
        TileColor::Yellow,
        TileColor::Green,
        TileColor::Purple,
    ];

    /// Parse a color from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use chainpop_types::TileColor;
    ///
    /// assert_eq!(TileColor::from_str("red"), Some(TileColor::Red));
    /// assert_eq!(TileColor::from_str("PURPLE"), Some(TileColor::Purple));
    /// assert_eq!(TileColor::from_str("cyan"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "red" => Some(TileColor::Red),
            "blue" => Some(TileColor::Blue),
            "yellow" => Some(TileColor::Yellow),
            "green" => Some(TileColor::Green),
            "purple" => Some(TileColor::Purple),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TileColor::Red => "red",
            TileColor::Blue => "blue",
            TileColor::Yellow => "yellow",
            TileColor::Green => "green",
            TileColor::Purple => "purple",
        }
    }

    /// Stable palette index (0-4), used to key [`Targets`]
    pub fn index(&self) -> usize {
        match self {
            TileColor::Red => 0,
            TileColor::Blue => 1,
            TileColor::Yellow => 2,
            TileColor::Green => 3,
            TileColor::Purple => 4,
        }
    }

    /// Inverse of [`TileColor::index`]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// The face of a tile: a base color or one of the two wildcard markers
///
/// Wildcards are never generated randomly; they only appear as tier rewards
/// placed by the resolution engine (`special` for bonus, `rainbow` for super).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFace {
    Color(TileColor),
    Rainbow,
    Special,
}

impl TileFace {
    /// Whether this face binds to any chain color
    ///
    /// # Examples
    ///
    /// ```
    /// use chainpop_types::{TileColor, TileFace};
    ///
    /// assert!(TileFace::Rainbow.is_wildcard());
    /// assert!(TileFace::Special.is_wildcard());
    /// assert!(!TileFace::Color(TileColor::Red).is_wildcard());
    /// ```
    pub fn is_wildcard(&self) -> bool {
        matches!(self, TileFace::Rainbow | TileFace::Special)
    }

    /// The base color of this face, `None` for wildcards
    pub fn base_color(&self) -> Option<TileColor> {
        match self {
            TileFace::Color(c) => Some(*c),
            TileFace::Rainbow | TileFace::Special => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TileFace::Color(c) => c.as_str(),
            TileFace::Rainbow => "rainbow",
            TileFace::Special => "special",
        }
    }

    /// Parse a face from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rainbow" => Some(TileFace::Rainbow),
            "special" => Some(TileFace::Special),
            other => TileColor::from_str(other).map(TileFace::Color),
        }
    }

    /// Snapshot code for this face (1-5 colors, 6 rainbow, 7 special)
    ///
    /// Code 0 is reserved for empty cells.
    pub fn code(&self) -> u8 {
        match self {
            TileFace::Color(c) => c.index() as u8 + 1,
            TileFace::Rainbow => 6,
            TileFace::Special => 7,
        }
    }
}

/// Powerup kinds a generated tile may carry
///
/// Effects fire when the tile is part of a committed chain:
/// - **ExtraMoves**: refunds [`EXTRA_MOVES_PER_TILE`] moves
/// - **ScoreMultiplier**: doubles match scores for [`MULTIPLIER_TURNS`] commits
/// - **AreaBomb**: expands the removal set to every tile of the chain color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerupKind {
    ExtraMoves,
    ScoreMultiplier,
    AreaBomb,
}

impl PowerupKind {
    /// Parse a powerup from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use chainpop_types::PowerupKind;
    ///
    /// assert_eq!(PowerupKind::from_str("extraMoves"), Some(PowerupKind::ExtraMoves));
    /// assert_eq!(PowerupKind::from_str("areabomb"), Some(PowerupKind::AreaBomb));
    /// assert_eq!(PowerupKind::from_str("shield"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "extramoves" => Some(PowerupKind::ExtraMoves),
            "scoremultiplier" => Some(PowerupKind::ScoreMultiplier),
            "areabomb" => Some(PowerupKind::AreaBomb),
            _ => None,
        }
    }

    /// Convert to camelCase string for the AI protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerupKind::ExtraMoves => "extraMoves",
            PowerupKind::ScoreMultiplier => "scoreMultiplier",
            PowerupKind::AreaBomb => "areaBomb",
        }
    }

    /// Snapshot code for this powerup (1-3; 0 is reserved for none)
    pub fn code(&self) -> u8 {
        match self {
            PowerupKind::ExtraMoves => 1,
            PowerupKind::ScoreMultiplier => 2,
            PowerupKind::AreaBomb => 3,
        }
    }
}

/// A single tile instance on the grid
///
/// `id` is a monotonic identity token distinguishing instances across refills.
/// It exists purely so presentation collaborators can key animations; core
/// logic never consults it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub face: TileFace,
    pub powerup: Option<PowerupKind>,
    pub id: u32,
}

/// A cell on the grid
///
/// - `None`: empty cell (only observable mid-resolution; gravity and refill
///   restore fullness before a commit completes)
/// - `Some(Tile)`: occupied cell
pub type Cell = Option<Tile>;

/// A grid coordinate (`row` 0 is the top row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub row: u8,
    pub col: u8,
}

impl GridPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Whether `other` is one king move away (row and column deltas both <= 1,
    /// positions not identical)
    ///
    /// # Examples
    ///
    /// ```
    /// use chainpop_types::GridPos;
    ///
    /// let p = GridPos::new(1, 1);
    /// assert!(p.king_adjacent(GridPos::new(0, 0)));
    /// assert!(p.king_adjacent(GridPos::new(1, 2)));
    /// assert!(!p.king_adjacent(GridPos::new(1, 1)));
    /// assert!(!p.king_adjacent(GridPos::new(3, 1)));
    /// ```
    pub fn king_adjacent(&self, other: GridPos) -> bool {
        let dr = (self.row as i16 - other.row as i16).abs();
        let dc = (self.col as i16 - other.col as i16).abs();
        dr <= 1 && dc <= 1 && (dr, dc) != (0, 0)
    }
}

/// Game lifecycle phases
///
/// Transitions: `home → playing → {levelup, won, lost}`; `levelup` returns to
/// `playing` via `advanceLevel`; every phase can return to `home` or restart
/// via `resetRun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamePhase {
    Home,
    Playing,
    LevelUp,
    Won,
    Lost,
}

impl GamePhase {
    /// Parse a phase from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "home" => Some(GamePhase::Home),
            "playing" => Some(GamePhase::Playing),
            "levelup" => Some(GamePhase::LevelUp),
            "won" => Some(GamePhase::Won),
            "lost" => Some(GamePhase::Lost),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Home => "home",
            GamePhase::Playing => "playing",
            GamePhase::LevelUp => "levelup",
            GamePhase::Won => "won",
            GamePhase::Lost => "lost",
        }
    }
}

/// Bonus tier of a resolved match, by removal-set size
///
/// - **Normal**: fewer than [`BONUS_TIER_MIN`] tiles (x1 score)
/// - **Bonus**: at least [`BONUS_TIER_MIN`] tiles (x2 score, special reward)
/// - **Super**: at least [`SUPER_TIER_MIN`] tiles (x4 score, rainbow reward,
///   +1 move)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchTier {
    Normal,
    Bonus,
    Super,
}

impl MatchTier {
    /// Parse a tier from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(MatchTier::Normal),
            "bonus" => Some(MatchTier::Bonus),
            "super" => Some(MatchTier::Super),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Normal => "normal",
            MatchTier::Bonus => "bonus",
            MatchTier::Super => "super",
        }
    }
}

/// Operations exposed by the engine to input/presentation collaborators
///
/// Each operation is processed synchronously; the return value of
/// `GameState::apply_op` reports accepted vs rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOp {
    /// Begin a chain at the given cell (phase `playing`, selection idle)
    StartSelection { row: u8, col: u8 },
    /// Extend the active chain to the given cell (backtrack/repeat/adjacency/
    /// color rules apply)
    ExtendSelection { row: u8, col: u8 },
    /// Commit the active chain; resolves as a match when long enough
    CommitSelection,
    /// Start or restart a run from level 0 with a fresh episode
    ResetRun,
    /// Advance to the next level (phase `levelup` only)
    AdvanceLevel,
    /// Return to the home screen, zeroing score and combo state
    GoHome,
}

impl GameOp {
    /// The camelCase operation name used on the AI protocol
    ///
    /// # Examples
    ///
    /// ```
    /// use chainpop_types::GameOp;
    ///
    /// assert_eq!(GameOp::CommitSelection.name(), "commitSelection");
    /// assert_eq!(GameOp::AdvanceLevel.name(), "advanceLevel");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            GameOp::StartSelection { .. } => "startSelection",
            GameOp::ExtendSelection { .. } => "extendSelection",
            GameOp::CommitSelection => "commitSelection",
            GameOp::ResetRun => "resetRun",
            GameOp::AdvanceLevel => "advanceLevel",
            GameOp::GoHome => "goHome",
        }
    }
}

/// Remaining removal counts per base color
///
/// Values are non-negative; a level is won when every value reaches zero.
/// Colors a level does not require simply start at zero.
///
/// # Examples
///
/// ```
/// use chainpop_types::{Targets, TileColor};
///
/// let mut targets = Targets::new([10, 0, 5, 0, 0]);
/// assert_eq!(targets.get(TileColor::Red), 10);
/// targets.decrement(TileColor::Yellow, 7); // floors at 0
/// assert_eq!(targets.get(TileColor::Yellow), 0);
/// assert!(!targets.all_met());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Targets([u16; PALETTE_SIZE]);

impl Targets {
    /// Build targets from per-color counts in [`TileColor::ALL`] order
    pub const fn new(counts: [u16; PALETTE_SIZE]) -> Self {
        Self(counts)
    }

    /// Remaining count for a color
    pub fn get(&self, color: TileColor) -> u16 {
        self.0[color.index()]
    }

    /// Set the remaining count for a color
    pub fn set(&mut self, color: TileColor, count: u16) {
        self.0[color.index()] = count;
    }

    /// Decrement one color, flooring at zero
    pub fn decrement(&mut self, color: TileColor, amount: u16) {
        let slot = &mut self.0[color.index()];
        *slot = slot.saturating_sub(amount);
    }

    /// Decrement every color, flooring at zero
    pub fn decrement_all(&mut self, amount: u16) {
        for slot in &mut self.0 {
            *slot = slot.saturating_sub(amount);
        }
    }

    /// Whether every target has reached zero
    pub fn all_met(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    /// Sum of all remaining counts
    pub fn total(&self) -> u32 {
        self.0.iter().map(|&c| c as u32).sum()
    }

    /// Raw per-color counts in [`TileColor::ALL`] order
    pub fn counts(&self) -> [u16; PALETTE_SIZE] {
        self.0
    }
}

/// Transient record emitted by the resolution engine after each resolved
/// commit
///
/// Consumed once by presentation/audio collaborators (explosion placement,
/// tier callouts, powerup cues) and mapped to the adapter protocol
/// `last_resolution`. `score_delta` and `moves_delta` are the commit's total
/// effect, breakout bonuses included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// Tiles removed, bomb expansion included
    pub removal_count: u32,
    /// Length of the committed chain before expansion
    pub chain_len: u32,
    pub tier: MatchTier,
    /// Chain color; `None` when the chain was entirely wildcards
    pub chain_color: Option<TileColor>,
    pub score_delta: u32,
    pub moves_delta: i32,
    pub combo_breakout: bool,
    /// Moves refunded by `extraMoves` tiles in the chain
    pub extra_moves: u32,
    pub multiplier_activated: bool,
    pub bomb_activated: bool,
    /// Reward tile placed at the chain's last coordinate, if any
    pub reward: Option<TileFace>,
    /// Every coordinate touched by the removal set
    pub cleared: Vec<GridPos>,
}
