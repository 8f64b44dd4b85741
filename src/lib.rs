//! Turn loop for a locally hosted text-adventure narrator.
//!
//! Each player turn folds the world state into a prompt, asks the text
//! backend for a reply (falling back to local narration when it fails),
//! cleans the reply up, and mines it for facts that update the world.

pub mod config;
pub mod engine;
pub mod model;
