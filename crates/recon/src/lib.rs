//! `cardtrail-recon`: retrieval and reconciliation engine.
//!
//! Pure engine crate: pulls raw records through a [`TransactionSource`],
//! returns a deduplicated, balance-annotated ledger. No CLI or HTTP
//! dependencies.

pub mod aggregate;
pub mod balance;
pub mod classify;
pub mod engine;
pub mod error;
pub mod model;
pub mod money;
pub mod report;
pub mod window;

pub use classify::classify;
pub use engine::{run, Completeness, Ledger, PipelineOptions, TransactionSource};
pub use error::{ReconError, SourceError, SourceErrorKind};
pub use model::{Category, CategoryFilter, RawRecord, Transaction};
pub use report::Report;
pub use window::{partition, QueryWindow, Windows};
