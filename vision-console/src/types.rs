use chrono::{DateTime, Utc};
use std::path::Path;
use url::Url;
pub use vision_defs::{AnnotationResult, CloudImageInfo, Feature, FeatureSet, ImageSource};

/// Message shown when a cloud image has no precomputed annotation to load.
pub const NO_ANNOTATION_MESSAGE: &str = "No annotation exists for this image";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_server: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_response_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_server: "http://localhost:8080".to_string(),
            user_agent: "Vision-Console/1.0".to_string(),
            // The backend gives the annotator itself 120 seconds.
            timeout_seconds: 120,
            max_response_size_mb: 20,
            max_redirects: 5,
        }
    }
}

impl ClientConfig {
    pub fn with_api_server(mut self, api_server: impl Into<String>) -> Self {
        self.api_server = api_server.into();
        self
    }

    /// Parsed base URL, always ending with a slash so relative joins keep any path prefix.
    pub fn base_url(&self) -> Result<Url> {
        let trimmed = self.api_server.trim();
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        Ok(Url::parse(&normalized)?)
    }
}

/// An image file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// Guesses the content type from the file extension.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// What the result panel shows the annotations on top of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayedImage {
    Upload { file_name: String, bytes: Vec<u8> },
    Remote { url: String },
}

impl DisplayedImage {
    pub fn describe(&self) -> String {
        match self {
            DisplayedImage::Upload { file_name, bytes } => format!("{} ({} bytes)", file_name, bytes.len()),
            DisplayedImage::Remote { url } => url.clone(),
        }
    }
}

/// A settled annotation, stamped with when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledAnnotation {
    pub result: AnnotationResult,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("No annotation exists for this image")]
    NoAnnotation { image_id: String },

    #[error("Response too large: {size_mb}MB")]
    ResponseTooLarge { size_mb: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Defs(#[from] vision_defs::DefsError),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
