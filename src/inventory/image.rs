//! Reading an uploaded image into an inline data URI

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::form::ItemForm;
use super::workflow::{InventoryWorkflow, ProcessingGuard};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Image attach errors
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("A submission is already in progress")]
    Busy,

    #[error("Failed to read image file: {0}")]
    Read(String),
}

impl ImageError {
    /// User-facing text for the blocking notice
    pub fn notice(&self) -> &'static str {
        match self {
            ImageError::Busy => "Another submission is still being processed. Please wait.",
            ImageError::Read(_) => "An error occurred while reading the image file.",
        }
    }
}

/// `data:<type>;base64,<payload>`
pub fn to_data_uri(content_type: Option<&str>, data: &[u8]) -> String {
    let content_type = content_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    format!("data:{};base64,{}", content_type, STANDARD.encode(data))
}

impl InventoryWorkflow {
    /// Read the selected file and keep it on the form as a data URI.
    ///
    /// An empty file clears any previous image. A read error leaves the form as it was.
    pub async fn attach_image<S, E>(
        &self,
        form: &mut ItemForm,
        content_type: Option<&str>,
        mut chunks: S,
    ) -> Result<(), ImageError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let _guard = ProcessingGuard::acquire(&self.processing).ok_or(ImageError::Busy)?;

        let mut data = Vec::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(error = %e, "Image read failed");
                ImageError::Read(e.to_string())
            })?;
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            form.image_data = None;
            return Ok(());
        }

        debug!(bytes = data.len(), ?content_type, "Image attached");
        form.image_data = Some(to_data_uri(content_type, &data));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn data_uri_defaults_content_type() {
        assert_eq!(to_data_uri(None, b"hi"), "data:application/octet-stream;base64,aGk=");
        assert_eq!(to_data_uri(Some("image/png"), b"hi"), "data:image/png;base64,aGk=");
    }

    #[tokio::test]
    async fn chunks_are_joined_into_one_uri() {
        let workflow = InventoryWorkflow::new(None);
        let mut form = ItemForm::default();
        let chunks = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"h")),
            Ok(Bytes::from_static(b"i")),
        ]);

        assert_ok!(workflow.attach_image(&mut form, Some("image/jpeg"), chunks).await);
        assert_eq!(form.image_data.as_deref(), Some("data:image/jpeg;base64,aGk="));
        assert!(!workflow.is_processing());
    }

    #[tokio::test]
    async fn read_error_keeps_previous_form() {
        let workflow = InventoryWorkflow::new(None);
        let mut form = ItemForm {
            name: "Scarf".into(),
            image_data: Some("data:image/png;base64,AAAA".into()),
            ..ItemForm::default()
        };
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err("connection reset"),
        ]);

        let err = assert_err!(workflow.attach_image(&mut form, None, chunks).await);
        assert_eq!(err.notice(), "An error occurred while reading the image file.");
        assert_eq!(form.name, "Scarf");
        assert_eq!(form.image_data.as_deref(), Some("data:image/png;base64,AAAA"));
        assert!(!workflow.is_processing());
    }

    #[tokio::test]
    async fn empty_file_clears_image() {
        let workflow = InventoryWorkflow::new(None);
        let mut form = ItemForm {
            image_data: Some("data:image/png;base64,AAAA".into()),
            ..ItemForm::default()
        };
        let chunks = stream::iter(Vec::<Result<Bytes, std::io::Error>>::new());

        assert_ok!(workflow.attach_image(&mut form, None, chunks).await);
        assert_eq!(form.image_data, None);
    }
}
