//! Scripted driver for the overlay controller.
//!
//! Reads a JSON list of player events, runs them against an in-memory host, and records every
//! frame the controller sends.

pub mod replay;
pub mod script;

pub use replay::{CommandRecord, RecordedFrame, Replay, ReplayReport, to_hex};
pub use script::{Script, ScriptEvent, SlotContents};
