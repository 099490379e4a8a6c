//! tagfetch - bulk downloader for tag-searchable media catalogs.
//!
//! Fetches a bounded number of posts matching a tag query from a paginated
//! catalog API, downloads their payloads with limited parallelism, skips
//! byte-identical duplicates and reports throughput.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod dedup;
pub mod error;
pub mod history;
pub mod http_client;
pub mod services;
pub mod storage;
pub mod throughput;
pub mod utils;
