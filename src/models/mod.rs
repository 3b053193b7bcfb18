//! Data models for the `SoilLab` application
//!
//! This module contains the core domain models organized by concern:
//! - Lab: Lab entries as decoded from the model reply
//! - Chat: Conversation turns kept as session context

pub mod chat;
pub mod lab;

// Re-export all public types for convenient access
pub use chat::{ChatRole, ChatTurn};
pub use lab::{LabEntry, MappedLab, Variant};
