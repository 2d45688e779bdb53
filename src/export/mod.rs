//! JSON Lines output for scanned documents
//!
//! Each document is written as relaxed extended JSON on its own line, so a
//! scan can be piped into other tools or written to a file.

use mongodb::bson::{Bson, Document};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::{Result, ScanError};

/// Buffer size for file output
const FILE_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Writer for JSON Lines format
pub struct JsonLinesWriter<W: AsyncWrite + Unpin> {
    /// Buffered output
    writer: BufWriter<W>,
    /// Number of documents written
    written: u64,
}

impl JsonLinesWriter<File> {
    /// Create a writer for a new file
    ///
    /// # Arguments
    /// * `path` - Output file path; its directory must exist
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ScanError::Generic(format!(
                    "Directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let file = File::create(path).await?;
        debug!("Created JSON Lines writer for: {}", path.display());
        Ok(Self {
            writer: BufWriter::with_capacity(FILE_BUFFER_SIZE, file),
            written: 0,
        })
    }
}

impl<W: AsyncWrite + Unpin> JsonLinesWriter<W> {
    /// Wrap any async writer (stdout, socket, buffer)
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            written: 0,
        }
    }

    /// Write one document as a line
    pub async fn write_document(&mut self, doc: &Document) -> Result<()> {
        let line = to_json_line(doc)?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered output
    pub async fn finalize(&mut self) -> Result<()> {
        self.writer.flush().await?;
        debug!("Finalized JSON Lines output ({} documents)", self.written);
        Ok(())
    }

    /// Number of documents written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Unwrap the underlying writer; call `finalize` first
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Render a document as compact relaxed extended JSON
pub fn to_json_line(doc: &Document) -> Result<String> {
    let value = Bson::Document(doc.clone()).into_relaxed_extjson();
    serde_json::to_string(&value)
        .map_err(|e| ScanError::Generic(format!("Failed to encode document: {e}")))
}
