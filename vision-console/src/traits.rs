use crate::types::{AnnotationResult, CloudImageInfo, ConsoleError, FeatureSet, ImageUpload, Result};
use async_trait::async_trait;
use tracing::debug;

/// Everything the console needs from the annotation service.
#[async_trait]
pub trait AnnotationBackend: Send + Sync {
    /// Human-readable name of the backend, used in logs
    fn backend_name(&self) -> String;

    /// Annotate an uploaded image file for the given features
    async fn annotate_file(&self, upload: &ImageUpload, features: &FeatureSet) -> Result<AnnotationResult>;

    /// Annotate an image the service downloads itself
    async fn annotate_uri(&self, uri: &str, features: &FeatureSet) -> Result<AnnotationResult>;

    /// Load a precomputed annotation stored next to a bucket image
    async fn fetch_annotation(&self, annotation_ref: &str) -> Result<AnnotationResult>;

    /// List the images stored in the bucket, unfiltered
    async fn list_bucket(&self, range: Option<(usize, usize)>) -> Result<Vec<CloudImageInfo>>;

    /// Raw bytes of a bucket image
    async fn image_data(&self, image_id: &str) -> Result<Vec<u8>>;

    /// URL the bucket image is displayed from
    fn image_data_url(&self, info: &CloudImageInfo) -> String;

    /// Raw bytes behind an arbitrary image URL
    async fn fetch_image(&self, uri: &str) -> Result<Vec<u8>>;

    /// Annotation of a bucket image by reference. Images without a stored
    /// annotation fail here, before any request is made.
    async fn annotate_cloud_image(&self, info: &CloudImageInfo) -> Result<AnnotationResult> {
        match info.annotation.as_deref() {
            Some(annotation_ref) => self.fetch_annotation(annotation_ref).await,
            None => {
                debug!("Image {} has no stored annotation", info.image_id);
                Err(ConsoleError::NoAnnotation {
                    image_id: info.image_id.clone(),
                })
            }
        }
    }
}
