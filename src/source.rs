//! Reading (and, for build tooling and self-repair, writing) the version
//! meta element.

use crate::document::LiveDocument;
use crate::error::AppError;
use crate::parsers::meta_parser;
use crate::token::{is_valid_meta_content, is_valid_version, BuildVersionStamp, VersionToken};
use serde::Serialize;
use tracing::{error, info, warn};

/// `name` attribute of the meta element carrying the build version.
pub const VERSION_META_NAME: &str = "app-version";

/// Running version as the live page reports it.
pub fn read_from_live_document(document: &dyn LiveDocument) -> Option<VersionToken> {
    let content = match document.meta_content(VERSION_META_NAME) {
        Ok(Some(content)) => content,
        Ok(None) => {
            info!("No {VERSION_META_NAME} meta tag in live document");
            return None;
        }
        Err(e) => {
            error!("Failed to read {VERSION_META_NAME} meta tag: {e}");
            return None;
        }
    };

    let content = content.trim();
    if !is_valid_meta_content(content) {
        info!("Live {VERSION_META_NAME} meta tag holds placeholder {content:?}");
        return None;
    }
    Some(VersionToken::new(content))
}

/// Version embedded in freshly fetched entry document markup.
pub fn read_from_html_text(html: &str) -> Option<VersionToken> {
    let tag = match meta_parser::find_meta(html, VERSION_META_NAME) {
        Ok(Some(tag)) => tag,
        Ok(None) => {
            info!("Fetched entry document has no {VERSION_META_NAME} meta tag");
            return None;
        }
        Err(e) => {
            error!("Failed to parse fetched entry document: {e}");
            return None;
        }
    };

    let content = tag.content.unwrap_or_default();
    let content = content.trim();
    if !is_valid_version(content) {
        info!("Fetched {VERSION_META_NAME} meta tag holds placeholder {content:?}");
        return None;
    }
    Some(VersionToken::new(content))
}

/// Inject `token` into entry document markup at build time.
pub fn stamp_html(html: &str, token: &VersionToken) -> Result<String, AppError> {
    meta_parser::upsert_meta_content(html, VERSION_META_NAME, token.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TagReconciliation {
    /// The tag already held a usable version.
    Unchanged,
    /// The tag was missing or a placeholder and now holds the compiled version.
    Stamped { previous: Option<String> },
    /// The document could not be written; it keeps describing itself as before.
    Failed,
}

/// Overwrite a missing or placeholder version tag with the compiled version.
///
/// Never touches a tag that already holds a valid version, even if it differs
/// from `stamp`: that mismatch is the update check's business.
pub fn reconcile_live_version_tag(
    document: &dyn LiveDocument,
    stamp: &BuildVersionStamp,
) -> TagReconciliation {
    let previous = match document.meta_content(VERSION_META_NAME) {
        Ok(previous) => previous,
        Err(e) => {
            warn!("Could not read {VERSION_META_NAME} meta tag before stamping: {e}");
            None
        }
    };

    if previous.as_deref().is_some_and(is_valid_meta_content) {
        return TagReconciliation::Unchanged;
    }

    match document.set_meta_content(VERSION_META_NAME, stamp.token().as_str()) {
        Ok(()) => {
            info!(
                "Stamped {VERSION_META_NAME} meta tag with {} (was {previous:?})",
                stamp.token()
            );
            TagReconciliation::Stamped { previous }
        }
        Err(e) => {
            error!("Failed to stamp {VERSION_META_NAME} meta tag: {e}");
            TagReconciliation::Failed
        }
    }
}
