use crate::document::LiveDocument;
use crate::source::VERSION_META_NAME;
use crate::token::{is_valid_meta_content, is_valid_version, BuildVersionStamp, StampOrigin};
use serde::Serialize;

/// Read-only snapshot of what the client believes its version is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiagnostics {
    pub compiled_version: String,
    pub compiled_origin: StampOrigin,
    pub compiled_valid: bool,
    /// Raw meta content, placeholders included.
    pub running_version: Option<String>,
    pub running_valid: bool,
    pub running_matches_compiled: bool,
    pub read_error: Option<String>,
}

impl VersionDiagnostics {
    pub fn collect(stamp: &BuildVersionStamp, document: &dyn LiveDocument) -> Self {
        let (running_version, read_error) = match document.meta_content(VERSION_META_NAME) {
            Ok(content) => (content, None),
            Err(e) => (None, Some(e.to_string())),
        };
        let running_valid = running_version
            .as_deref()
            .is_some_and(is_valid_meta_content);
        let running_matches_compiled = running_version
            .as_deref()
            .is_some_and(|v| v.trim() == stamp.token().as_str());

        Self {
            compiled_version: stamp.token().to_string(),
            compiled_origin: stamp.origin(),
            compiled_valid: is_valid_version(stamp.token().as_str()),
            running_version,
            running_valid,
            running_matches_compiled,
            read_error,
        }
    }
}
