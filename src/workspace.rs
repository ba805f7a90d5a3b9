//! Page-level state: the selected image, the current review surface, and the
//! last error.
//!
//! [`Workspace::extract`] takes `&mut self`, so only one extraction can be in
//! flight per workspace, and nothing can observe the workspace while it is.

use thiserror::Error;

use crate::{
    gateway::{ExtractionError, ExtractionGateway},
    prelude::*,
    review::ReviewSurface,
    upload::{CheckImage, UploadError},
};

/// Errors reported by the workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// Extract was requested with no image.
    #[error("Please upload an image of a check first.")]
    NoImageSelected,

    /// The image was rejected before any network call.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The extraction call failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Page-level state.
#[derive(Debug, Default)]
pub struct Workspace {
    /// The currently selected image.
    image: Option<CheckImage>,

    /// The review surface for the current record, if we have one.
    surface: Option<ReviewSurface>,

    /// The message from the last failure, if any.
    last_error: Option<String>,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected image.
    pub fn image(&self) -> Option<&CheckImage> {
        self.image.as_ref()
    }

    /// The review surface, if a record has been extracted.
    pub fn surface(&self) -> Option<&ReviewSurface> {
        self.surface.as_ref()
    }

    /// The last error message, if the last action failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Validate and select an image.
    ///
    /// On success, any previous record and error are cleared. On failure, the
    /// previously selected image (if any) stays selected.
    pub async fn select_image(&mut self, path: &Path) -> Result<(), WorkspaceError> {
        match CheckImage::load(path).await {
            Ok(image) => {
                self.image = Some(image);
                self.surface = None;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                match &err {
                    UploadError::UnsupportedType { mime_type } => {
                        warn!(path = %path.display(), %mime_type, "Rejected check image type")
                    }
                    UploadError::TooLarge { size } => {
                        warn!(path = %path.display(), size, "Rejected oversized check image")
                    }
                    UploadError::Io { .. } => {
                        warn!(path = %path.display(), error = %err, "Could not read check image")
                    }
                }
                self.last_error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Extract data from the selected image.
    ///
    /// The previous record is cleared before the call. On failure, the error
    /// message is kept and the selected image is left alone.
    pub async fn extract(
        &mut self,
        gateway: &ExtractionGateway,
    ) -> Result<&mut ReviewSurface, WorkspaceError> {
        let Some(image) = &self.image else {
            self.last_error = Some(WorkspaceError::NoImageSelected.to_string());
            return Err(WorkspaceError::NoImageSelected);
        };
        let data_url = image.to_data_url();

        self.last_error = None;
        self.surface = None;
        let result = gateway.extract(&data_url).await;

        match result {
            Ok(record) => Ok(self.surface.insert(ReviewSurface::new(record))),
            Err(err) => {
                error!(error = %err, "Extraction failed");
                self.last_error = Some(err.to_string());
                Err(err.into())
            }
        }
    }
}
