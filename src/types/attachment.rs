//! File encoding for attachments sent alongside a prompt.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use mime_guess::Mime;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Where an attachment comes from before it is encoded.
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// Raw bytes held in memory.
    Bytes { filename: String, bytes: Vec<u8> },
    /// Data that is already base64 encoded.
    Encoded { filename: String, data: String },
}

impl From<PathBuf> for AttachmentSource {
    fn from(path: PathBuf) -> Self {
        AttachmentSource::Path(path)
    }
}

impl From<&Path> for AttachmentSource {
    fn from(path: &Path) -> Self {
        AttachmentSource::Path(path.to_path_buf())
    }
}

/// A file or image encoded as base64, ready to be placed in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    filename: String,
    data: String,
}

impl Attachment {
    /// Read and encode a file. The filename is the last path component.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(Error::invalid_input(format!(
                "'{}' is not a regular file",
                path.display()
            )));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::invalid_input(format!("'{}' has no file name", path.display())))?;
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(filename, &bytes))
    }

    /// Encode in-memory bytes.
    pub fn from_bytes(filename: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Wrap data that is already base64 encoded.
    pub fn from_encoded(filename: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Resolve an optional source into an attachment.
    pub fn resolve(source: Option<AttachmentSource>) -> Result<Option<Self>, Error> {
        match source {
            None => Ok(None),
            Some(AttachmentSource::Path(path)) => Self::from_path(path).map(Some),
            Some(AttachmentSource::Bytes { filename, bytes }) => {
                Ok(Some(Self::from_bytes(filename, &bytes)))
            }
            Some(AttachmentSource::Encoded { filename, data }) => {
                Ok(Some(Self::from_encoded(filename, data)))
            }
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The base64 payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// MIME type guessed from the filename extension.
    pub fn mime_type(&self) -> Result<Mime, Error> {
        mime_guess::from_path(&self.filename)
            .first()
            .ok_or_else(|| Error::UnknownMimeType(self.filename.clone()))
    }

    pub fn is_image(&self) -> Result<bool, Error> {
        Ok(self.mime_type()?.type_() == mime_guess::mime::IMAGE)
    }

    /// `data:` URL form used by OpenAI-style payloads.
    pub fn data_url(&self) -> Result<String, Error> {
        Ok(format!("data:{};base64,{}", self.mime_type()?, self.data))
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>, Error> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| Error::invalid_input(format!("'{}' is not valid base64: {e}", self.filename)))
    }
}
