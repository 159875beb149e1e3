//! Extension obfuscation
//!
//! The mutation phase appends one random digit to every file extension using
//! a fixed pool of rename workers; the restoration phase strips it again in a
//! single sequential pass.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │         Mutator          │
//!                 │  - walkdir tree walk     │
//!                 │  - one Job per file      │
//!                 └────────────┬─────────────┘
//!                              │ push
//!                              ▼
//!                 ┌──────────────────────────┐
//!                 │        JobQueue          │
//!                 │  (crossbeam unbounded)   │
//!                 │  + outstanding counter   │
//!                 └────────────┬─────────────┘
//!            ┌─────────────────┼─────────────────┐
//!      ┌─────▼─────┐     ┌─────▼─────┐     ┌─────▼─────┐
//!      │ Worker 0  │     │ Worker 1  │ ... │ Worker N  │
//!      │ rename +  │     │ rename +  │     │ rename +  │
//!      │ task_done │     │ task_done │     │ task_done │
//!      └───────────┘     └───────────┘     └───────────┘
//! ```

pub mod extension;
pub mod mutator;
pub mod queue;
pub mod restorer;
pub mod worker;

pub use mutator::{MutateConfig, MutateReport, Mutator, DEFAULT_WORKERS};
pub use restorer::{RestoreReport, Restorer};
