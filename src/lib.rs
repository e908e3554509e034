//! Asynchronous asset synchronization from a PIM into a catalog.
//!
//! Reconciliation ([`reconcile`]) compares desired PIM asset state with the
//! catalog product and enqueues work; the drain ([`drain`]) claims queued
//! entries and runs the matching strategy ([`strategy`]) against the catalog.

pub mod catalog;
pub mod category;
pub mod config;
pub mod db;
pub mod dedup;
pub mod dispatch;
pub mod drain;
pub mod error;
pub mod image;
pub mod media;
pub mod model;
pub mod reconcile;
pub mod strategy;
pub mod type_metadata;

pub use error::{CatalogError, Result, SyncError};
