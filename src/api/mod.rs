//! HTTP API for the elo-board voting service

pub mod handlers;
pub mod server;

pub use server::{cors_layer, create_router, ApiServer};
