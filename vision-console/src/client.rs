use crate::traits::AnnotationBackend;
use crate::types::{AnnotationResult, CloudImageInfo, ClientConfig, ConsoleError, FeatureSet, ImageUpload, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;
use vision_defs::{reshape_listing, ListInfoDictionary};

/// HTTP client for the annotation service.
pub struct AnnotationClient {
    client: Client,
    config: ClientConfig,
    base_url: Url,
}

impl AnnotationClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds `{base}/{segments...}`. Each segment is percent-encoded, so
    /// references containing `/` stay a single path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConsoleError::General(format!("API server URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_annotate(&self, form: Form, what: &str) -> Result<AnnotationResult> {
        let url = self.endpoint(&["annotate"])?;
        let start_time = Instant::now();
        debug!("Requesting annotation of {} from {}", what, url);

        let response = self.client.post(url).multipart(form).send().await?;
        let result = reject_embedded_error(self.read_json(response).await?, what)?;

        info!("Annotated {} in {}ms", what, start_time.elapsed().as_millis());
        Ok(result)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        self.read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let bytes = self.read_bytes(response).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Reads the body, giving up once it grows past `max_response_size_mb`
    /// whether or not the server announced a length.
    async fn read_bytes(&self, response: Response) -> Result<Vec<u8>> {
        let mut response = check_status(response).await?;
        let limit = self.config.max_response_size_mb.saturating_mul(BYTES_PER_MB);

        if let Some(content_length) = response.content_length() {
            let content_length = usize::try_from(content_length).unwrap_or(usize::MAX);
            if content_length > limit {
                return Err(ConsoleError::ResponseTooLarge {
                    size_mb: content_length.div_ceil(BYTES_PER_MB),
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                let size_mb = (body.len() + chunk.len()).div_ceil(BYTES_PER_MB);
                warn!("Response body exceeded {}MB, aborting", self.config.max_response_size_mb);
                return Err(ConsoleError::ResponseTooLarge { size_mb });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

const BYTES_PER_MB: usize = 1024 * 1024;

/// A 200 response can still carry an `error` status instead of a result.
fn reject_embedded_error(result: AnnotationResult, what: &str) -> Result<AnnotationResult> {
    match result.error_message() {
        Some(message) => {
            warn!("Annotation of {} returned an embedded error: {}", what, message);
            Err(ConsoleError::Backend {
                status: 200,
                message: message.to_string(),
            })
        }
        None => Ok(result),
    }
}

/// Turns a non-success response into a backend error carrying the service's own message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AnnotationResult>(&body)
        .ok()
        .and_then(|result| result.error_message().map(str::to_string))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown"))
            } else {
                body.to_string()
            }
        });

    warn!("Backend responded with {}: {}", status, message);
    Err(ConsoleError::Backend {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AnnotationBackend for AnnotationClient {
    fn backend_name(&self) -> String {
        format!("Annotation service ({})", self.base_url)
    }

    async fn annotate_file(&self, upload: &ImageUpload, features: &FeatureSet) -> Result<AnnotationResult> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;
        let form = Form::new().part("image", part).text("features", features.to_wire());
        self.post_annotate(form, &upload.file_name).await
    }

    async fn annotate_uri(&self, uri: &str, features: &FeatureSet) -> Result<AnnotationResult> {
        let form = Form::new()
            .text("image_uri", uri.to_string())
            .text("features", features.to_wire());
        self.post_annotate(form, uri).await
    }

    async fn fetch_annotation(&self, annotation_ref: &str) -> Result<AnnotationResult> {
        let mut url = self.endpoint(&["bucket", "annotation", annotation_ref])?;
        url.query_pairs_mut().append_pair("image_uri", annotation_ref);
        let result = reject_embedded_error(self.get_json(url).await?, annotation_ref)?;
        info!("Loaded stored annotation {}", annotation_ref);
        Ok(result)
    }

    async fn list_bucket(&self, range: Option<(usize, usize)>) -> Result<Vec<CloudImageInfo>> {
        let mut url = self.endpoint(&["bucket", "list"])?;
        if let Some((start, end)) = range {
            url.query_pairs_mut()
                .append_pair("start", &start.to_string())
                .append_pair("end", &end.to_string());
        }

        let listing: ListInfoDictionary = self.get_json(url).await?;
        let infos = reshape_listing(listing);
        info!("Listed {} bucket images", infos.len());
        Ok(infos)
    }

    async fn image_data(&self, image_id: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&["bucket", "imagedata", image_id])?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        self.read_bytes(response).await
    }

    fn image_data_url(&self, info: &CloudImageInfo) -> String {
        match self.endpoint(&["bucket", "imagedata", &info.image_id]) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}bucket/imagedata/{}", self.base_url, info.image_id),
        }
    }

    async fn fetch_image(&self, uri: &str) -> Result<Vec<u8>> {
        let url = Url::parse(uri)?;
        debug!("Fetching image {}", url);
        let response = self.client.get(url).send().await?;
        let bytes = self.read_bytes(response).await?;
        debug!("Fetched image {} ({} bytes)", uri, bytes.len());
        Ok(bytes)
    }
}
