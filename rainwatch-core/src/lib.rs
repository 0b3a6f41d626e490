//! Core library for the `rainwatch` tool.
//!
//! This crate defines:
//! - The reading model and rain status tiers
//! - The rain status classifier (pure, no I/O)
//! - Collaborators around it: upstream provider, ingestion, persistence,
//!   feed rendering, service window and the update cycle tying them together
//!
//! It is used by `rainwatch-cli`, but the classifier can be embedded on its own.

pub mod classifier;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod model;
pub mod provider;
pub mod store;
pub mod updater;
pub mod window;

pub use classifier::{ClassifierConfig, decide};
pub use config::Config;
pub use ingest::{RawReading, Readings};
pub use model::{
    RainBand, RainResult, RainStatus, Reading, ReadingKind, classify_forecast, classify_observed,
    describe,
};
pub use provider::RainProvider;
pub use store::{FileStore, StoreError};
pub use updater::{UpdateOutcome, Updater};
pub use window::ServiceWindow;
