//! Unity Editor release aggregation and querying
//!
//! Releases are pulled page by page from the Unity release API, held in a TTL cache keyed by
//! the upstream filter, and queried in memory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Query    │────▶│    Cache    │────▶│ Aggregator  │────▶│   Fetcher   │
//! │  (filter)   │     │(single-flt) │     │   (pages)   │     │   (HTTP)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                                           │
//!        ▼                                                           ▼
//! ┌─────────────┐                                             ┌─────────────┐
//! │   Ordinal   │                                             │  Fetchers   │
//! │(version cmp)│                                             │   (unity)   │
//! └─────────────┘                                             └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`query`]: Filtering, ordering, pagination and latest-release lookup
//! - [`cache`]: Per-filter TTL cache with single-flight aggregation
//! - [`aggregator`]: Walks every page of a filtered listing
//! - [`fetcher`]: Fetcher trait for the release API and release notes pages
//! - [`fetchers`]: Concrete fetcher implementations
//! - [`ordinal`]: Unity version parsing and ordering
//! - [`notes`]: Release notes summaries
//! - [`error`]: Error types for fetch and query operations
//! - [`types`]: Release data model

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod fetchers;
pub mod notes;
pub mod ordinal;
pub mod query;
pub mod types;
