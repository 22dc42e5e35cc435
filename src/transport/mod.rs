//! Implementations of [`MatchService`](crate::protocol::MatchService).

#[cfg(feature = "http")]
pub mod http;
pub mod in_memory;

#[cfg(feature = "http")]
pub use http::{HttpMatchService, Tokens};
pub use in_memory::{standard_catalog, InMemoryMatchService};
