#![doc = "homedir-archiver-core: core logic library for homedir-archiver."]

//! This crate contains the scanning, archiving, checksum and upload
//! reconciliation logic for homedir-archiver. CLI glue lives in the
//! `homedir-archiver` crate.
//!
//! # Usage
//! Add this as a dependency for the staleness scan, archive staging, store
//! contract and the per-directory/sweep pipelines.

pub mod archive;
pub mod checksum;
pub mod config;
pub mod contract;
pub mod notice;
pub mod process;
pub mod scan;
pub mod store;
pub mod sweep;
