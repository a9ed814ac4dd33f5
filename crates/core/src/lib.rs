//! Core logic including the agent phase orchestration, prompt
//! composition, tolerant response parsing, and the outward stream
//! relay.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
mod gateway_client;
pub mod parse;
pub mod prompt;
pub mod relay;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentConfig};
pub use gateway_client::{GatewayClient, GatewayReply};
