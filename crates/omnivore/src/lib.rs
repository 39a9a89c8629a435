//! Omnivore API client and webhook payload types.
//!
//! This crate provides:
//! - GraphQL client for the Omnivore API
//! - Webhook payload parsing
//! - Type definitions for Omnivore entities
//! - The [`OmnivoreGateway`] seam used by the label automation

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Every API method can fail

pub mod client;
pub mod gateway;
pub mod models;
pub mod webhooks;

pub use client::OmnivoreClient;
#[cfg(any(test, feature = "mock"))]
pub use gateway::MockOmnivoreGateway;
pub use gateway::{upsert_note, NoteWrite, OmnivoreGateway};
pub use models::*;
pub use webhooks::{LabelPayload, PagePayload, WebhookAction, WebhookEvent};
