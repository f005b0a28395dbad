//! # Collaboration Core
//!
//! Real-time side of a project: the handshake gateway, per-project rooms, the
//! session state machine, and the AI co-author bridge.

pub mod ai_bridge;
pub mod gateway;
pub mod generator;
pub mod rooms;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use ai_bridge::{AiBridge, AiEnvelope, BridgeError, CommandSpec};
pub use gateway::{admit, Handshake, HandshakeQuery};
pub use generator::{AiProvider, GenaiGenerator, GeneratorConfig, TextGenerator};
pub use rooms::{ConnectionId, EventReceiver, RoomManager};
pub use session::{Session, SessionPhase};
