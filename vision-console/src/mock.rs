use crate::traits::AnnotationBackend;
use crate::types::{AnnotationResult, CloudImageInfo, ConsoleError, FeatureSet, ImageUpload, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Counts of calls that would have hit the network.
#[derive(Debug, Default)]
pub struct CallCounters {
    pub annotate_file: AtomicUsize,
    pub annotate_uri: AtomicUsize,
    pub fetch_annotation: AtomicUsize,
    pub list_bucket: AtomicUsize,
    pub image_data: AtomicUsize,
    pub fetch_image: AtomicUsize,
}

impl CallCounters {
    pub fn total(&self) -> usize {
        [
            &self.annotate_file,
            &self.annotate_uri,
            &self.fetch_annotation,
            &self.list_bucket,
            &self.image_data,
            &self.fetch_image,
        ]
        .iter()
        .map(|counter| counter.load(Ordering::SeqCst))
        .sum()
    }
}

/// In-memory backend for development and testing
pub struct MockAnnotationBackend {
    name: String,
    response_delay_ms: u64,
    result: AnnotationResult,
    stored: HashMap<String, AnnotationResult>,
    listing: Mutex<Vec<CloudImageInfo>>,
    images: HashMap<String, Vec<u8>>,
    failure: Option<String>,
    pub calls: CallCounters,
    last_features: Mutex<Option<FeatureSet>>,
}

impl MockAnnotationBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response_delay_ms: 0,
            result: AnnotationResult::default(),
            stored: HashMap::new(),
            listing: Mutex::new(Vec::new()),
            images: HashMap::new(),
            failure: None,
            calls: CallCounters::default(),
            last_features: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    /// Result returned for every file and URI annotation.
    pub fn with_result(mut self, result: AnnotationResult) -> Self {
        self.result = result;
        self
    }

    pub fn with_stored_annotation(mut self, annotation_ref: impl Into<String>, result: AnnotationResult) -> Self {
        self.stored.insert(annotation_ref.into(), result);
        self
    }

    pub fn with_listing(self, listing: Vec<CloudImageInfo>) -> Self {
        self.set_listing(listing);
        self
    }

    /// Image bytes served for both bucket ids and URLs.
    pub fn with_image(mut self, key: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(key.into(), bytes);
        self
    }

    /// Every network call fails with this backend message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn set_listing(&self, listing: Vec<CloudImageInfo>) {
        if let Ok(mut current) = self.listing.lock() {
            *current = listing;
        }
    }

    /// Feature set sent with the most recent file or URI annotation.
    pub fn last_features(&self) -> Option<FeatureSet> {
        self.last_features.lock().ok().and_then(|features| features.clone())
    }

    async fn simulate_call(&self, counter: &AtomicUsize) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.response_delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.response_delay_ms)).await;
        }
        match &self.failure {
            Some(message) => Err(ConsoleError::Backend {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn remember_features(&self, features: &FeatureSet) {
        if let Ok(mut last) = self.last_features.lock() {
            *last = Some(features.clone());
        }
    }

    fn not_found(what: &str) -> ConsoleError {
        ConsoleError::Backend {
            status: 404,
            message: format!("{} not found", what),
        }
    }
}

#[async_trait]
impl AnnotationBackend for MockAnnotationBackend {
    fn backend_name(&self) -> String {
        format!("Mock backend ({})", self.name)
    }

    async fn annotate_file(&self, upload: &ImageUpload, features: &FeatureSet) -> Result<AnnotationResult> {
        self.remember_features(features);
        self.simulate_call(&self.calls.annotate_file).await?;
        debug!("Mock annotated upload {}", upload.file_name);
        Ok(self.result.clone())
    }

    async fn annotate_uri(&self, uri: &str, features: &FeatureSet) -> Result<AnnotationResult> {
        self.remember_features(features);
        self.simulate_call(&self.calls.annotate_uri).await?;
        debug!("Mock annotated uri {}", uri);
        Ok(self.result.clone())
    }

    async fn fetch_annotation(&self, annotation_ref: &str) -> Result<AnnotationResult> {
        self.simulate_call(&self.calls.fetch_annotation).await?;
        self.stored
            .get(annotation_ref)
            .cloned()
            .ok_or_else(|| Self::not_found(&format!("Annotation {}", annotation_ref)))
    }

    async fn list_bucket(&self, range: Option<(usize, usize)>) -> Result<Vec<CloudImageInfo>> {
        self.simulate_call(&self.calls.list_bucket).await?;
        let listing = self.listing.lock().map(|listing| listing.clone()).unwrap_or_default();
        Ok(match range {
            Some((start, end)) => listing.into_iter().skip(start).take(end.saturating_sub(start)).collect(),
            None => listing,
        })
    }

    async fn image_data(&self, image_id: &str) -> Result<Vec<u8>> {
        self.simulate_call(&self.calls.image_data).await?;
        self.images
            .get(image_id)
            .cloned()
            .ok_or_else(|| Self::not_found(&format!("Image {}", image_id)))
    }

    fn image_data_url(&self, info: &CloudImageInfo) -> String {
        format!("mock://bucket/imagedata/{}", info.image_id)
    }

    async fn fetch_image(&self, uri: &str) -> Result<Vec<u8>> {
        self.simulate_call(&self.calls.fetch_image).await?;
        self.images
            .get(uri)
            .cloned()
            .ok_or_else(|| Self::not_found(&format!("Image {}", uri)))
    }
}
