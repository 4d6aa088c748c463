use std::path::Path;

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

pub const ANALYZE_FAILED: &str =
    "Failed to analyze image. Please check your API key and try again.";

// Data URL structure: data:<mime>;base64,<payload>
static DATA_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^data:(.+);base64,(.+)$").unwrap());

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("Image size too large. Please choose an image under 5MB.")]
    TooLarge,
    #[error("Could not read the selected file.")]
    Unreadable(#[from] std::io::Error),
    #[error("Unsupported image format. Please use a JPG, PNG, or WEBP photo.")]
    UnknownFormat,
}

/// An image staged for analysis. Ephemeral; replaced on re-selection and
/// dropped on clear.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub data_url: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Builds a [`SelectedImage`] from raw file content. The size ceiling is
/// checked before any encoding work; the mime type is sniffed from the bytes.
pub fn select_image(bytes: Vec<u8>) -> Result<SelectedImage, SelectError> {
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        return Err(SelectError::TooLarge);
    }

    let format = image::guess_format(&bytes).map_err(|_| SelectError::UnknownFormat)?;
    let mime_type = format.to_mime_type().to_string();

    let payload = base64::engine::general_purpose::STANDARD.encode(&bytes);
    let data_url = format!("data:{};base64,{}", mime_type, payload);

    Ok(SelectedImage {
        data_url,
        mime_type,
        bytes,
    })
}

/// Reads a file into a [`SelectedImage`]. Oversized files are rejected from
/// their metadata length, before the content is read.
pub async fn load_image(path: impl AsRef<Path>) -> Result<SelectedImage, SelectError> {
    let metadata = tokio::fs::metadata(path.as_ref()).await?;
    if metadata.len() > MAX_IMAGE_BYTES {
        return Err(SelectError::TooLarge);
    }

    let bytes = tokio::fs::read(path.as_ref()).await?;
    select_image(bytes)
}

/// Splits a data URL into its mime type and raw base64 payload.
pub fn split_data_url(data_url: &str) -> Option<(String, String)> {
    let captures = DATA_URL.captures(data_url)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

/// State of the Identify mode: the staged image, the analysis outcome, and
/// the in-flight flag that keeps calls sequential.
#[derive(Debug, Default)]
pub struct Analyzer {
    pub image: Option<SelectedImage>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub is_analyzing: bool,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer::default()
    }

    /// Stages a newly selected image, discarding any previous outcome.
    pub fn set_image(&mut self, image: SelectedImage) {
        self.image = Some(image);
        self.result = None;
        self.error = None;
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Starts an analysis, returning the mime type and base64 payload to
    /// send. None when no image is staged or a call is already in flight.
    pub fn begin_analysis(&mut self) -> Option<(String, String)> {
        if self.is_analyzing {
            return None;
        }
        let image = self.image.as_ref()?;
        let (mime_type, payload) = split_data_url(&image.data_url)?;

        self.is_analyzing = true;
        self.error = None;
        Some((mime_type, payload))
    }

    /// Records the outcome of an analysis call. Failures collapse into one
    /// generic user-facing message; the caller logs the underlying error.
    pub fn finish_analysis(&mut self, outcome: Result<String, String>) {
        match outcome {
            Ok(text) => self.result = Some(text),
            Err(_) => self.error = Some(ANALYZE_FAILED.to_string()),
        }
        self.is_analyzing = false;
    }

    /// Resets to the initial empty state.
    pub fn clear(&mut self) {
        self.image = None;
        self.result = None;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn tiny_png() -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0; 16]);
        bytes
    }

    #[test]
    fn test_oversized_image_rejected_before_encoding() {
        let bytes = vec![0u8; MAX_IMAGE_BYTES as usize + 1];
        assert!(matches!(select_image(bytes), Err(SelectError::TooLarge)));
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(matches!(
            select_image(vec![1, 2, 3, 4]),
            Err(SelectError::UnknownFormat)
        ));
    }

    #[test]
    fn test_select_builds_data_url() {
        let image = select_image(tiny_png()).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert!(image.data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_split_data_url_recovers_payload() {
        let image = select_image(tiny_png()).unwrap();
        let (mime_type, payload) = split_data_url(&image.data_url).unwrap();
        assert_eq!(mime_type, "image/png");

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(decoded, image.bytes);
    }

    #[test]
    fn test_split_rejects_malformed_urls() {
        assert!(split_data_url("data:image/png,abc").is_none());
        assert!(split_data_url("image/png;base64,abc").is_none());
    }

    #[test]
    fn test_begin_requires_a_staged_image() {
        let mut analyzer = Analyzer::new();
        assert!(analyzer.begin_analysis().is_none());
        assert!(!analyzer.is_analyzing);
    }

    #[test]
    fn test_begin_is_rejected_while_in_flight() {
        let mut analyzer = Analyzer::new();
        analyzer.set_image(select_image(tiny_png()).unwrap());

        assert!(analyzer.begin_analysis().is_some());
        assert!(analyzer.is_analyzing);
        assert!(analyzer.begin_analysis().is_none());
    }

    #[test]
    fn test_failure_collapses_to_generic_message() {
        let mut analyzer = Analyzer::new();
        analyzer.set_image(select_image(tiny_png()).unwrap());
        analyzer.begin_analysis().unwrap();

        analyzer.finish_analysis(Err("connection refused".to_string()));
        assert_eq!(analyzer.error.as_deref(), Some(ANALYZE_FAILED));
        assert!(analyzer.result.is_none());
        assert!(!analyzer.is_analyzing);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut analyzer = Analyzer::new();
        analyzer.set_image(select_image(tiny_png()).unwrap());
        analyzer.begin_analysis().unwrap();
        analyzer.finish_analysis(Ok("## Rose".to_string()));

        analyzer.clear();
        assert!(analyzer.image.is_none());
        assert!(analyzer.result.is_none());
        assert!(analyzer.error.is_none());
    }
}
