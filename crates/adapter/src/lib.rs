//! Adapter module - AI control via TCP socket with JSON protocol
//!
//! This module enables external AI agents to play the game through a
//! TCP socket connection. Agents see the same board a player would and
//! submit the same operations, so a bot and a human are interchangeable.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7777)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to hello becomes the controller
//! 4. **Observation Streaming**: Server sends a game state observation after
//!    every applied command
//! 5. **Commanding**: Controller sends commands to execute game operations
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: Initial handshake with client info and requested capabilities
//! - **command**: Execute game operations or submit a whole chain
//! - **control**: Claim or release controller status
//!
//! ## Server → Client
//!
//! - **welcome**: Response to hello with server capabilities
//! - **observation**: Full game state snapshot (board, selection, score, targets, etc.)
//! - **ack**: Command acknowledgment
//! - **error**: Error response with code and message
//!
//! # Command Modes
//!
//! The adapter supports two command modes:
//!
//! - **op**: Send individual operations (startSelection, extendSelection,
//!   commitSelection, resetRun, advanceLevel, goHome)
//! - **chain**: Send a whole chain as `[row, col]` pairs; the server starts,
//!   extends, and commits it atomically, or rejects the chain untouched
//!
//! # Environment Variables
//!
//! Configure the adapter using environment variables:
//!
//! - `CHAINPOP_AI_HOST`: Bind address (default: "127.0.0.1")
//! - `CHAINPOP_AI_PORT`: Port number (default: 7777)
//! - `CHAINPOP_AI_MAX_PENDING`: Command queue depth before backpressure (default: 10)
//! - `CHAINPOP_AI_LOG_PATH`: Append every wire message to this file
//! - `CHAINPOP_AI_DISABLED`: Set to "1" or "true" to disable adapter entirely
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":1234567890,"client":{"name":"my-ai","version":"1.0.0"},...}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1234567890,"protocol_version":"1.0.0",...}
//! Server -> Client: {"type":"observation","seq":2,"ts":1234567891,"board":{...},"targets":{...},...}
//! Client -> Server: {"type":"command","seq":2,"ts":1234567892,"mode":"chain","chain":[[4,0],[4,1],[5,2]]}
//! Server -> Client: {"type":"ack","seq":3,"ts":1234567892,"status":"ok"}
//! ```
//!
//! # Implementation
//!
//! - Uses **tokio** for async networking
//! - Multiple clients can connect (only one controller at a time)
//! - Controller can release control for another client to take over
//! - See [`protocol`] for message structure definitions
//! - See [`server`] for TCP server implementation
//!
//! # Testing
//!
//! Connect to the adapter using netcat for manual testing:
//!
//! ```bash
//! nc 127.0.0.1 7777
//! {"type":"hello","seq":1,"ts":1234567890,"client":{"name":"test","version":"1.0.0"},"protocol_version":"1.0.0","formats":["json"],"requested":{"stream_observations":true,"command_mode":"op"}}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use chainpop_core as core;
pub use chainpop_types as types;

// Re-export protocol types for convenience
pub use protocol::*;
pub use runtime::{Adapter, ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
pub use server::*;
