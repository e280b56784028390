//! Weather station ingestion: sensor catalog, value normalization and the per-push handler.

pub mod bootstrap;
pub mod catalog;
pub mod db;
pub mod error;
pub mod handler;
pub mod normalizer;
pub mod payload;
pub mod store;
pub mod update;
