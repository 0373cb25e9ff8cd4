use crate::error::AppError;
use crate::parsers::meta_parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// The page surface the running client describes itself through.
pub trait LiveDocument: Send + Sync {
    /// `content` of the named meta element, or `None` when the element is absent.
    fn meta_content(&self, name: &str) -> Result<Option<String>, AppError>;

    fn set_meta_content(&self, name: &str, content: &str) -> Result<(), AppError>;
}

/// Entry document held as HTML text, optionally mirrored to a file on disk.
pub struct HtmlDocument {
    html: RwLock<String>,
    path: Option<PathBuf>,
}

impl HtmlDocument {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: RwLock::new(html.into()),
            path: None,
        }
    }

    /// Load an entry document. Writes through `set_meta_content` are saved back to `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let html = fs::read_to_string(path)?;
        Ok(Self {
            html: RwLock::new(html),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn html(&self) -> Result<String, AppError> {
        self.html
            .read()
            .map(|html| html.clone())
            .map_err(|_| AppError::Internal("Document lock poisoned".into()))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl LiveDocument for HtmlDocument {
    fn meta_content(&self, name: &str) -> Result<Option<String>, AppError> {
        let html = self
            .html
            .read()
            .map_err(|_| AppError::Internal("Document lock poisoned".into()))?;
        Ok(meta_parser::find_meta(&html, name)?.map(|tag| tag.content.unwrap_or_default()))
    }

    fn set_meta_content(&self, name: &str, content: &str) -> Result<(), AppError> {
        let mut html = self
            .html
            .write()
            .map_err(|_| AppError::Internal("Document lock poisoned".into()))?;
        let updated = meta_parser::upsert_meta_content(&html, name, content)?;
        if let Some(path) = &self.path {
            fs::write(path, &updated)?;
        }
        *html = updated;
        Ok(())
    }
}
