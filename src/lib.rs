//! Barcode scan recorder.
//!
//! Watches a camera, decodes barcodes, logs each new detection to SQLite and
//! optionally records video of the packing session it happened in.

pub mod capture;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod export;
pub mod logging;
pub mod opener;
pub mod recording;
pub mod tasks;
