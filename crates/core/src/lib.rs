//! Core game logic module - pure, deterministic, and testable
//!
//! This module contains all the game rules, state management, and resolution
//! logic. It has **zero dependencies** on UI, networking, or I/O, making it:
//!
//! - **Deterministic**: Same seed produces identical games (for AI training)
//! - **Testable**: Comprehensive unit tests for all game rules
//! - **Portable**: Can run in any environment (terminal, GUI, headless)
//!
//! # Module Structure
//!
//! - [`grid`]: the 2D tile field with generation, gravity, and refill
//! - [`selection`]: the in-progress chain state machine
//! - [`game_state`]: phases, commits, and the match resolution engine
//! - [`scoring`]: tier classification, score, and combo arithmetic
//! - [`levels`]: authored level table and procedural continuation
//! - [`rng`]: seedable LCG and deterministic tile generation
//! - [`snapshot`]: reusable state views for observers
//!
//! # Game Rules
//!
//! - **Chains**: drag a path of king-adjacent cells sharing one color;
//!   `rainbow` and `special` wildcards bind to any chain
//! - **Commits**: a chain of 3+ resolves as a match; shorter releases break
//!   the combo streak instead
//! - **Tiers**: 5+ removed is a bonus match (x2, leaves a `special` tile),
//!   10+ is a super match (x4, leaves a `rainbow`, refunds a move)
//! - **Powerups**: `extraMoves` refunds moves, `scoreMultiplier` doubles
//!   scores for three commits, `areaBomb` clears every tile of the chain
//!   color
//! - **Combo meter**: fills with every match; at 100 it breaks out for +500
//!   score and +2 moves
//! - **Levels**: clear every color target within the move budget; authored
//!   levels first, procedurally generated ones beyond
//!
//! # Example
//!
//! ```
//! use chainpop_core::GameState;
//! use chainpop_core::types::{GameOp, GamePhase};
//!
//! // Create a game and start a run
//! let mut game = GameState::new(12345);
//! assert_eq!(game.phase(), GamePhase::Home);
//!
//! game.apply_op(GameOp::ResetRun);
//! assert_eq!(game.phase(), GamePhase::Playing);
//!
//! // The grid is always full between commits
//! assert!(game.grid().is_full());
//! assert!(game.moves_remaining() >= 12);
//! ```

pub mod game_state;
pub mod grid;
pub mod levels;
pub mod rng;
pub mod scoring;
pub mod selection;
pub mod snapshot;

pub use chainpop_types as types;

// Re-export commonly used types for convenience
pub use game_state::{GameOptions, GameState};
pub use grid::Grid;
pub use levels::LevelConfig;
pub use rng::{SimpleRng, TileGen};
pub use selection::Selection;
pub use snapshot::GameSnapshot;
