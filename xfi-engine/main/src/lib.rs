//! Codebase conformance analysis engine.
//!
//! Given a repository path and an archetype profile, the engine
//! evaluates declarative rules against every collected file plus one
//! synthetic repository-wide check, and persists the structured
//! `XFI_RESULT` artifact under `.xfiResults/`.

pub mod api;
pub mod core;

pub use api::traits::{Reporter, ReportSink};
pub use api::types::{
    AnalysisOptions, ArchetypeConfig, EngineError, Exemption, FileData, IssueLevel, OutputFormat,
    RuleFailure, RuleSpec, RunMode, ScanResult, XfiResult, REPO_GLOBAL_CHECK,
};
pub use core::analysis::{correlation_id, run_analysis, run_analysis_with_cancel};
pub use core::report::read_result;
pub use core::runner::CancelFlag;
pub use core::sink::{FileSink, JsonReporter, StdoutSink};
