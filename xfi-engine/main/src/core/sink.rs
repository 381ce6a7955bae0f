use std::path::PathBuf;

use crate::api::traits::{Reporter, ReportSink};
use crate::api::types::{EngineError, OutputFormat, XfiResult, XfiResultEnvelope};

/// Renders the artifact envelope as pretty-printed JSON.
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, result: &XfiResult) -> String {
        let envelope = XfiResultEnvelope { xfi_result: result.clone() };
        serde_json::to_string_pretty(&envelope).unwrap_or_else(|e| {
            format!("{{\"error\": \"serialization failed: {}\"}}", e)
        })
    }
}

/// Writes the formatted result to stdout.
pub struct StdoutSink {
    /// The output format to use.
    pub format: OutputFormat,
}

impl ReportSink for StdoutSink {
    fn emit(&self, result: &XfiResult) -> Result<(), EngineError> {
        let output = match self.format {
            OutputFormat::Json => JsonReporter.report(result),
        };
        println!("{}", output);
        Ok(())
    }
}

/// Writes the result envelope as pretty-printed JSON to a file.
///
/// Creates parent directories if they do not exist.
pub struct FileSink {
    /// The file path to write the result to.
    pub path: PathBuf,
}

impl ReportSink for FileSink {
    fn emit(&self, result: &XfiResult) -> Result<(), EngineError> {
        let json = JsonReporter.report(result);
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, &json)?;
        Ok(())
    }
}
