//! # Health Module
//!
//! The leaf layer of the orchestration core:
//!
//! - [`Checker`]: polymorphic health probe returning a [`CheckResult`]
//! - [`HealthRegistry`]: concurrent fan-out/fan-in over named checkers with
//!   a shared deadline and a TTL-cached [`AggregateReport`]
//! - Built-in probes: [`FnChecker`], [`StaticChecker`], [`TcpChecker`]

pub mod checker;
pub mod registry;
pub mod result;

pub use checker::{run_protected, CheckOutcome, Checker, FnChecker, StaticChecker, TcpChecker};
pub use registry::HealthRegistry;
pub use result::{AggregateReport, CheckMetadata, CheckResult};
