//! Fetcher implementations for upstream release sources

pub mod unity;

pub use unity::UnityReleaseFetcher;
