//! Backend access
//!
//! - [`client::ApiClient`] -- the authenticated client and its session
//!   contract
//! - [`endpoints`] -- typed helpers for the marketplace endpoints
//! - [`models`] -- request/response bodies

pub mod client;
pub mod endpoints;
pub mod models;

pub use client::{ApiClient, ApiResponse};
pub use models::UnreadCount;
