//! An out-of-the-box goal runner that assembles the agent with an
//! OpenAI-compatible gateway.
//!
//! The crate includes a CLI tool for driving a goal in the terminal.
//! And you can also use it as a library to embed goal runs into your
//! own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod run;

pub use run::{GoalRun, GoalRunBuilder, RunEvent, RunReport};

/// Re-exports of [`taskloom_core`] crate.
pub mod core {
    pub use taskloom_core::*;
}
