// src/lib.rs

//! Reconciles static-analysis defects, structural metrics and refactoring activity across
//! the tagged revisions of one codebase.
//!
//! The [`pipeline::Orchestrator`] drives the external tools revision by revision; the
//! [`commands`] stages turn their reports into per-class tables keyed by
//! [`model::ClassKey`], join them, and summarize metric trends.

pub mod aggregate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod join;
pub mod layout;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod revisions;
pub mod stats;
pub mod trend;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use model::{ClassKey, Revision, RevisionSequence};
pub use normalize::ClassKeyNormalizer;
