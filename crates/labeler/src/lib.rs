//! Omnivore label automation.
//!
//! This crate provides:
//! - Trigger label classification (`do`, `do:tags`, `do:summary`, ...)
//! - Label action resolution and dispatch
//! - Tag generation and note annotation flows
//! - HTTP server for Omnivore webhooks (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Every flow calls out to Omnivore or the model

pub mod action;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod locks;
pub mod prompt;
pub mod server;

pub use action::{resolve, ActionKind, LabelAction};
pub use classifier::classify;
pub use config::Config;
pub use dispatch::{dispatch, DispatchDecision};
pub use error::LabelerError;
pub use handlers::{Labeler, Outcome};
pub use prompt::assemble;
