use crate::api::types::{EngineError, XfiResult};

/// Renders an analysis result into an output string.
pub trait Reporter {
    fn report(&self, result: &XfiResult) -> String;
}

/// Delivers an analysis result to a destination.
pub trait ReportSink {
    fn emit(&self, result: &XfiResult) -> Result<(), EngineError>;
}
