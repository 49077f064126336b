//! tg-herald: GitHub activity notifications and rule-based chat forwarding for Telegram,
//! with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
