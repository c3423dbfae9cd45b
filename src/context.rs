// ABOUTME: Context loader: validates uploads, persists them, extracts document text
// ABOUTME: Supports plain text and PDF; extracted text replaces the session context wholesale
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Context Loader
//!
//! Converts an uploaded file into injected conversation context. Validation
//! happens in a fixed order (missing payload, empty filename, unsupported
//! extension) so callers get deterministic errors; the allowed set is
//! `.txt` and `.pdf`, matched case-insensitively on the extension after the
//! last dot. Uploaded bytes are persisted under a sanitized filename before
//! extraction.
//!
//! Extracted text has no size cap; a large document grows the per-turn
//! request accordingly, since context is re-sent on every turn.

use std::path::PathBuf;

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult, ErrorCode};

/// File extensions accepted for context uploads
const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf"];

/// Fallback name when sanitization strips a filename to nothing
const FALLBACK_FILENAME: &str = "document.txt";

/// Validates, persists, and extracts text from uploaded documents
#[derive(Debug, Clone)]
pub struct ContextLoader {
    upload_dir: PathBuf,
}

impl ContextLoader {
    /// Create a loader writing into the given upload directory
    #[must_use]
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    /// Create the upload directory if it does not exist
    pub async fn init(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        debug!(dir = %self.upload_dir.display(), "Upload directory ready");
        Ok(())
    }

    /// Extension after the last dot, lowercased, if it is in the allowed set
    ///
    /// A filename with no dot has no extension and is rejected.
    fn allowed_extension(filename: &str) -> Option<&'static str> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_lowercase();
        ALLOWED_EXTENSIONS.iter().find(|&&e| e == ext).copied()
    }

    /// Reduce a client-supplied filename to a safe basename
    ///
    /// Takes the basename only and keeps alphanumerics plus `.-_ `, which
    /// prevents path traversal via the multipart filename header. An empty
    /// result collapses to a fallback name.
    fn sanitize_filename(raw: &str) -> String {
        let basename = raw
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(FALLBACK_FILENAME);
        let safe: String = basename
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
            .collect();
        let safe = safe.trim();
        if safe.is_empty() {
            FALLBACK_FILENAME.to_owned()
        } else {
            safe.to_owned()
        }
    }

    /// Validate, persist, and extract text from an upload
    ///
    /// # Errors
    ///
    /// `EmptyFilename` for a blank filename, `UnsupportedType` for anything
    /// other than `.txt`/`.pdf`, or a storage error if persisting or parsing
    /// fails. (`NoFile` for a missing payload is raised by the transport
    /// handler, which is the only place that can observe field absence.)
    pub async fn load(&self, filename: &str, bytes: Vec<u8>) -> AppResult<String> {
        if filename.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyFilename, "No file selected"));
        }

        let Some(extension) = Self::allowed_extension(filename) else {
            return Err(AppError::new(
                ErrorCode::UnsupportedType,
                "Invalid file type. Only .txt and .pdf allowed",
            ));
        };

        let safe_name = Self::sanitize_filename(filename);
        let path = self.upload_dir.join(&safe_name);
        tokio::fs::write(&path, &bytes).await?;

        let extracted = match extension {
            "txt" => String::from_utf8_lossy(&bytes).into_owned(),
            _ => extract_pdf_text(&bytes)?,
        };

        info!(
            file = %safe_name,
            bytes = bytes.len(),
            chars = extracted.len(),
            "Document context loaded"
        );

        Ok(extracted)
    }
}

/// Extract text from PDF bytes, pages concatenated in page order
///
/// Walks the `Tj`/`TJ` text-showing operators of each page's content
/// stream. Non-UTF-8 string operands are skipped rather than failing the
/// whole document; when the walk yields nothing (font-encoded text), the
/// decoder-aware `extract_text` path is tried before giving up.
fn extract_pdf_text(bytes: &[u8]) -> AppResult<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| AppError::storage(format!("Failed to parse PDF: {e}")))?;

    let mut out = String::new();
    // get_pages() is keyed by page number, so iteration is page order.
    for page_id in doc.get_pages().values() {
        let page = doc
            .get_page_content(*page_id)
            .map_err(|e| AppError::storage(format!("Failed to read PDF page: {e}")))?;
        let content = lopdf::content::Content::decode(&page)
            .map_err(|e| AppError::storage(format!("Failed to decode PDF content: {e}")))?;

        for operation in content.operations {
            if operation.operator == "Tj" || operation.operator == "TJ" {
                for operand in operation.operands {
                    collect_string_objects(&operand, &mut out);
                }
            }
        }
    }

    if out.trim().is_empty() {
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        if let Ok(decoded) = doc.extract_text(&pages) {
            if !decoded.trim().is_empty() {
                return Ok(decoded);
            }
        }
        warn!("PDF yielded no extractable text; context will be empty");
    }

    Ok(out)
}

/// Append the text of a string operand (or of strings nested in a `TJ`
/// array) to the output buffer
fn collect_string_objects(object: &lopdf::Object, out: &mut String) {
    match object {
        lopdf::Object::String(bytes, _) => {
            if let Ok(text) = std::str::from_utf8(bytes) {
                out.push_str(text);
                out.push('\n');
            }
        }
        lopdf::Object::Array(items) => {
            for item in items {
                collect_string_objects(item, out);
            }
        }
        _ => {}
    }
}
