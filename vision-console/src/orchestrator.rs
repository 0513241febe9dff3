use crate::traits::AnnotationBackend;
use crate::types::{
    AnnotationResult, CloudImageInfo, DisplayedImage, Feature, FeatureSet, ImageSource, ImageUpload, Result,
    SettledAnnotation,
};
use chrono::Utc;
use std::fmt;
use tracing::{debug, info, warn};

/// Identifies one issued request. Tokens only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestVariant {
    File,
    Uri,
    CloudImage,
}

impl RequestVariant {
    pub fn source(self) -> ImageSource {
        match self {
            RequestVariant::File => ImageSource::Upload,
            RequestVariant::Uri => ImageSource::Url,
            RequestVariant::CloudImage => ImageSource::CloudStorage,
        }
    }
}

/// Raw input handed over by the image source selector.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquiredInput {
    File(ImageUpload),
    Uri(String),
    CloudImage { info: CloudImageInfo, image_url: String },
}

impl AcquiredInput {
    pub fn variant(&self) -> RequestVariant {
        match self {
            AcquiredInput::File(_) => RequestVariant::File,
            AcquiredInput::Uri(_) => RequestVariant::Uri,
            AcquiredInput::CloudImage { .. } => RequestVariant::CloudImage,
        }
    }

    fn displayed_image(&self) -> DisplayedImage {
        match self {
            AcquiredInput::File(upload) => DisplayedImage::Upload {
                file_name: upload.file_name.clone(),
                bytes: upload.bytes.clone(),
            },
            AcquiredInput::Uri(uri) => DisplayedImage::Remote { url: uri.clone() },
            AcquiredInput::CloudImage { image_url, .. } => DisplayedImage::Remote {
                url: image_url.clone(),
            },
        }
    }
}

/// A request the caller must run against the backend and report back with
/// [`Orchestrator::settle`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationRequest {
    File { upload: ImageUpload, features: FeatureSet },
    Uri { uri: String, features: FeatureSet },
    CloudImage { info: CloudImageInfo },
}

impl AnnotationRequest {
    pub fn variant(&self) -> RequestVariant {
        match self {
            AnnotationRequest::File { .. } => RequestVariant::File,
            AnnotationRequest::Uri { .. } => RequestVariant::Uri,
            AnnotationRequest::CloudImage { .. } => RequestVariant::CloudImage,
        }
    }

    pub async fn execute(&self, backend: &dyn AnnotationBackend) -> Result<AnnotationResult> {
        match self {
            AnnotationRequest::File { upload, features } => backend.annotate_file(upload, features).await,
            AnnotationRequest::Uri { uri, features } => backend.annotate_uri(uri, features).await,
            AnnotationRequest::CloudImage { info } => backend.annotate_cloud_image(info).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestTicket {
    pub token: RequestToken,
    pub request: AnnotationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Annotated(SettledAnnotation),
    Failed(String),
}

/// State of the one annotation request the session tracks.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Pending {
        variant: RequestVariant,
        token: RequestToken,
    },
    Settled {
        variant: RequestVariant,
        token: RequestToken,
        outcome: Outcome,
    },
}

impl RequestState {
    pub fn variant(&self) -> Option<RequestVariant> {
        match self {
            RequestState::Idle => None,
            RequestState::Pending { variant, .. } | RequestState::Settled { variant, .. } => Some(*variant),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RequestState::Idle)
    }
}

/// What the result area renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection<'a> {
    pub is_loading: bool,
    pub error: Option<&'a str>,
    pub result: Option<&'a AnnotationResult>,
}

impl Projection<'_> {
    pub fn is_empty(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.result.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Applied,
    /// The request was superseded or reset before it finished.
    Stale,
}

/// Coordinates the image source, the feature selection and the annotation
/// request lifecycle.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    source: ImageSource,
    features: FeatureSet,
    acquired: Option<AcquiredInput>,
    displayed: Option<DisplayedImage>,
    state: RequestState,
    last_token: u64,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn acquired_input(&self) -> Option<&AcquiredInput> {
        self.acquired.as_ref()
    }

    pub fn displayed_image(&self) -> Option<&DisplayedImage> {
        self.displayed.as_ref()
    }

    /// Switches the image source. Clears the displayed image and any request
    /// state; nothing is issued until input is acquired for the new source.
    pub fn set_source(&mut self, source: ImageSource) {
        info!("Image source changed to {}", source);
        self.source = source;
        self.acquired = None;
        self.displayed = None;
        self.reset();
    }

    /// Accepts input for the active source and issues exactly one request.
    /// Returns `None` for an empty URI or input that belongs to another source.
    pub fn acquire(&mut self, input: AcquiredInput) -> Option<RequestTicket> {
        if input.variant().source() != self.source {
            warn!(
                "Ignoring {:?} input while the image source is {}",
                input.variant(),
                self.source
            );
            return None;
        }
        if let AcquiredInput::Uri(uri) = &input {
            if uri.trim().is_empty() {
                debug!("Ignoring empty image URI");
                return None;
            }
        }

        self.reset();
        self.displayed = Some(input.displayed_image());

        let request = match &input {
            AcquiredInput::File(upload) => AnnotationRequest::File {
                upload: upload.clone(),
                features: self.features.clone(),
            },
            AcquiredInput::Uri(uri) => AnnotationRequest::Uri {
                uri: uri.trim().to_string(),
                features: self.features.clone(),
            },
            AcquiredInput::CloudImage { info, .. } => AnnotationRequest::CloudImage { info: info.clone() },
        };
        self.acquired = Some(input);

        let token = self.next_token();
        let variant = request.variant();
        self.state = RequestState::Pending { variant, token };
        debug!("Issued {:?} request {}", variant, token);

        Some(RequestTicket { token, request })
    }

    /// Replaces the feature selection. Re-annotates the last input of the
    /// active source, except for cloud images which ignore features.
    pub fn set_features(&mut self, features: FeatureSet) -> Option<RequestTicket> {
        if features == self.features {
            return None;
        }
        info!("Feature selection changed to [{}]", features);
        self.features = features;
        self.reannotate()
    }

    pub fn toggle_feature(&mut self, feature: Feature) -> Option<RequestTicket> {
        let mut features = self.features.clone();
        features.toggle(feature);
        self.set_features(features)
    }

    /// Records the outcome of a request. Outcomes for anything but the
    /// currently pending token are discarded.
    pub fn settle(&mut self, token: RequestToken, outcome: Result<AnnotationResult>) -> Settlement {
        let variant = match &self.state {
            RequestState::Pending { variant, token: pending } if *pending == token => *variant,
            _ => {
                debug!("Discarding stale response for request {}", token);
                return Settlement::Stale;
            }
        };

        let outcome = match outcome {
            Ok(result) => {
                info!("Request {} settled with a result", token);
                Outcome::Annotated(SettledAnnotation {
                    result,
                    settled_at: Utc::now(),
                })
            }
            Err(e) => {
                warn!("Request {} failed: {}", token, e);
                Outcome::Failed(e.to_string())
            }
        };
        self.state = RequestState::Settled { variant, token, outcome };
        Settlement::Applied
    }

    pub fn projection(&self) -> Projection<'_> {
        match &self.state {
            RequestState::Idle => Projection {
                is_loading: false,
                error: None,
                result: None,
            },
            RequestState::Pending { .. } => Projection {
                is_loading: true,
                error: None,
                result: None,
            },
            RequestState::Settled { outcome, .. } => match outcome {
                Outcome::Annotated(settled) => Projection {
                    is_loading: false,
                    error: None,
                    result: Some(&settled.result),
                },
                Outcome::Failed(message) => Projection {
                    is_loading: false,
                    error: Some(message.as_str()),
                    result: None,
                },
            },
        }
    }

    /// The settled annotation, with its arrival time.
    pub fn settled(&self) -> Option<&SettledAnnotation> {
        match &self.state {
            RequestState::Settled {
                outcome: Outcome::Annotated(settled),
                ..
            } => Some(settled),
            _ => None,
        }
    }

    fn reannotate(&mut self) -> Option<RequestTicket> {
        if !self.source.uses_features() {
            debug!("Feature change ignored for {}", self.source);
            return None;
        }
        let input = self.acquired.clone()?;
        self.acquire(input)
    }

    fn reset(&mut self) {
        self.state = RequestState::Idle;
    }

    fn next_token(&mut self) -> RequestToken {
        self.last_token += 1;
        RequestToken(self.last_token)
    }
}
