//! Test tooling: an in-memory [`StoreClient`](crate::client::StoreClient)
//! and fixture record types. Enabled for unit tests and, through the
//! `testing` feature, for downstream integration tests.

mod client;
pub mod fixtures;

pub use client::{MemoryClient, Request};
