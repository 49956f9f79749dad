//! Jobtrawl Pipeline - keyword crawl orchestration.
//!
//! This crate discovers listings across an unknown number of search pages,
//! resolves each to a unique identity, enriches it through an inference
//! backend, and upserts the result exactly once per identity. Fetching,
//! inference and storage are injected as trait objects.
//!
//! # Features
//!
//! - Eager or adaptive pagination with an empty-page sentinel stop
//! - First-occurrence deduplication with keyword-derived exclusion
//! - One generic bounded fan-out for fetching, enrichment and persistence,
//!   with per-task failure isolation and memory-pressure back-off
//! - Retrying, idempotent persistence gateway
//!
//! # Example
//!
//! ```rust,ignore
//! use jobtrawl_pipeline::Orchestrator;
//!
//! let orchestrator = Orchestrator::new(&config, fetcher, extractor, store);
//! let report = orchestrator.run_pass("data analyst").await?;
//! println!("{report}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod dedup;
pub mod dispatcher;
pub mod enrichment;
#[allow(missing_docs)]
pub mod error;
pub mod fanout;
pub mod identity;
pub mod links;
pub mod orchestrator;
pub mod pagination;
pub mod persistence;
pub mod pressure;
pub mod report;

// Re-export commonly used types
pub use dedup::{count_unique, Deduplicator, SeenSet, UniqueItem};
pub use dispatcher::FetchDispatcher;
pub use enrichment::EnrichmentFanOut;
pub use error::{EnrichError, IdentityError, PersistError, PipelineError, Result};
pub use fanout::{Attributed, FanOut, FanOutReport};
pub use identity::{resolve, resolve_reference};
pub use links::LinkClassifier;
pub use orchestrator::{Orchestrator, PassReport, PassState};
pub use pagination::{is_sentinel, slugify, PageRequest, PaginationPlanner};
pub use persistence::PersistenceGateway;
pub use pressure::{default_monitor, NoopMonitor, ProcMeminfoMonitor, ResourceMonitor};
pub use report::{render_report, report_file_name, write_report};
