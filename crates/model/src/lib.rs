//! An abstraction layer for chat-completion backends.
//!
//! This crate establishes an unified protocol for the agent core to
//! talk to a completion endpoint, so that the orchestration logic can
//! seamlessly switch between backends (a real HTTP gateway, a scripted
//! fake, ...) without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod gateway;
mod request;
mod response;

pub use error::*;
pub use gateway::*;
pub use request::*;
pub use response::*;
