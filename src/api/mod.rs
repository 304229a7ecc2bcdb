//! Authenticated request pipeline for the wrapped resource API.

pub mod client;

pub use client::{ApiClient, QueryOptions};
