//! JSON:API access to the plant catalog backend
//!
//! This module provides:
//! - Wire types for JSON:API documents
//! - Strict decode into typed primary records and included resources
//! - The first-page query for the plant collection
//! - Page transports (HTTP, retrying and scripted) and the paginating fetcher

pub mod client;
pub mod decode;
pub mod fetch;
pub mod query;
pub mod scripted;
pub mod types;

pub use client::{HttpPageSource, PageSource, RetryPolicy, RetryingPageSource};
pub use decode::{IncludedResource, MediaRef, PrimaryRecord};
pub use fetch::{FetchedCollection, IncludedSet, ResourceFetcher};
pub use query::PlantQuery;
pub use scripted::ScriptedPageSource;
pub use types::JsonApiDocument;
