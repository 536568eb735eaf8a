//! Chainpop (workspace facade crate).
//!
//! This package keeps the `chainpop::{core,adapter,types}` public API stable
//! while the implementation lives in dedicated crates under `crates/`.

pub use chainpop_adapter as adapter;
pub use chainpop_core as core;
pub use chainpop_types as types;

pub mod observe;
