//! Validating and loading check images before we send them anywhere.

use std::io;

use thiserror::Error;

use crate::{data_url::data_url, prelude::*};

/// Image types we accept.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// The largest image we accept, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Reasons an image can be rejected before extraction.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Not a JPEG, PNG or WEBP image.
    #[error("Invalid file type. Please upload a JPG, PNG, or WEBP image.")]
    UnsupportedType { mime_type: String },

    /// Over [`MAX_UPLOAD_BYTES`].
    #[error("File is too large. Maximum size is 10MB.")]
    TooLarge { size: u64 },

    /// We couldn't read the file.
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Check a declared MIME type and size against our limits.
///
/// Type is checked before size.
pub fn validate_upload(mime_type: &str, size: u64) -> Result<(), UploadError> {
    if !ACCEPTED_MIME_TYPES.contains(&mime_type) {
        return Err(UploadError::UnsupportedType {
            mime_type: mime_type.to_owned(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    Ok(())
}

/// Work out the MIME type of a file, preferring its magic bytes and falling
/// back to its extension.
pub fn detect_mime_type(path: &Path) -> Result<String, UploadError> {
    let sniffed = infer::get_from_path(path).map_err(|source| UploadError::Io {
        path: path.to_owned(),
        source,
    })?;
    if let Some(kind) = sniffed {
        return Ok(kind.mime_type().to_owned());
    }
    let guessed = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_owned())
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    debug!(path = %path.display(), %guessed, "Could not sniff MIME type, using extension");
    Ok(guessed)
}

/// A validated check image, ready to be encoded.
#[derive(Clone, Debug)]
pub struct CheckImage {
    /// Where we loaded this from.
    pub path: PathBuf,

    /// One of [`ACCEPTED_MIME_TYPES`].
    pub mime_type: String,

    /// The raw image bytes.
    pub data: Vec<u8>,
}

impl CheckImage {
    /// Validate and load an image.
    ///
    /// We check the file size from metadata first, so oversized files are
    /// never read into memory.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, UploadError> {
        let io_err = |source| UploadError::Io {
            path: path.to_owned(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
        let mime_type = detect_mime_type(path)?;
        validate_upload(&mime_type, size)?;
        let data = tokio::fs::read(path).await.map_err(io_err)?;

        // The file may have grown between the metadata check and the read.
        validate_upload(&mime_type, data.len() as u64)?;
        debug!(%mime_type, size = data.len(), "Loaded check image");
        Ok(Self {
            path: path.to_owned(),
            mime_type,
            data,
        })
    }

    /// Encode this image as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        data_url(&self.mime_type, &self.data)
    }
}
