//! Telegram adapter (MTProto via grammers): transport, inbound updates and login.

pub mod auth_adapter;
pub mod client;
pub mod mapper;
pub mod session;

pub use auth_adapter::GrammersAuthAdapter;
pub use client::GrammersTransport;
