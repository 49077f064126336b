//! Infrastructure adapters. Implement outbound ports.
//!
//! Telegram, GitHub, terminal UI. Map errors to DomainError.

pub mod github;
pub mod telegram;
pub mod ui;
