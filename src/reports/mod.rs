// src/reports/mod.rs

//! Readers for the three external report shapes and for the CSV tables this crate writes.

pub mod ck;
pub mod refactoring_miner;
pub mod schema;
pub mod spotbugs;

pub use refactoring_miner::read_refactoring_report;
pub use schema::RawTable;
pub use spotbugs::{read_bug_findings, read_defect_report};
