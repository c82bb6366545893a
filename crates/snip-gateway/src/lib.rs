//! HTTP surface of the snip URL shortener.
//!
//! Exposes create, redirect, mapping lookup and health endpoints on top of
//! any [`Allocator`](snip_core::Allocator).

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use error::AppError;
pub use state::AppState;
