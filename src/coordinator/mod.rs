//! Update coordination: the fetch loop and its collaborators.
//!
//! ## Contents
//! - [`UpdateCoordinator`] owns the retry state and drives sequential fetch cycles
//! - [`CoordinatorBuilder`] validated construction with subscribers and clock
//! - [`Fetch`], [`Render`], [`FetchFn`] collaborator interfaces
//! - [`Connectivity`] "network is back" signal that shortens the current wait
//! - [`CycleReport`], [`CycleOutcome`], [`CoordinatorStatus`] cycle results
//! - JSON error reports for failed cycles when `Config::diagnostics_dir` is set

mod builder;
mod collaborators;
mod diagnostics;
mod runner;
mod update;

pub use builder::CoordinatorBuilder;
pub use collaborators::{Connectivity, Fetch, FetchFn, FetchRef, Render, RenderRef};
pub use update::{CoordinatorStatus, CycleOutcome, CycleReport, UpdateCoordinator};
