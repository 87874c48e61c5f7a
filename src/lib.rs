//! Harvest static STAC catalogs into newline-delimited JSON.
//!
//! A harvest walks one catalog, fetches every item it links to with a
//! bounded number of requests in flight, and appends each item as one line
//! of compact JSON to `<output_dir>/<catalog title>.json`. The resulting file
//! can be checked against its source catalog with [`verify`] and turned into
//! a Parquet table with [`convert`].

pub mod catalog;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod harvest;
pub mod output;
pub mod progress;
pub mod sink;
pub mod stac;
pub mod verify;

pub use error::HarvestError;
