use crate::error::DefsError;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// How the image to annotate is acquired. Exactly one source is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageSource {
    #[default]
    Upload,
    Url,
    CloudStorage,
}

impl ImageSource {
    pub const ALL: [ImageSource; 3] = [ImageSource::Upload, ImageSource::Url, ImageSource::CloudStorage];

    pub fn label(&self) -> &'static str {
        match self {
            ImageSource::Upload => "File upload",
            ImageSource::Url => "Image URL",
            ImageSource::CloudStorage => "Cloud storage",
        }
    }

    /// Whether the feature selection applies to requests made from this source.
    /// Cloud images are annotated ahead of time, server side.
    pub fn uses_features(&self) -> bool {
        !matches!(self, ImageSource::CloudStorage)
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ImageSource {
    type Err = DefsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" | "file" => Ok(ImageSource::Upload),
            "url" | "uri" => Ok(ImageSource::Url),
            "cloud" | "cloud-storage" | "cloudstorage" | "bucket" => Ok(ImageSource::CloudStorage),
            other => Err(DefsError::UnknownImageSource(other.to_string())),
        }
    }
}

/// A requestable annotation category. Declaration order is the canonical
/// order used when the set is sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    ObjectLocalization,
    LabelDetection,
    ImageProperties,
    SafeSearchDetection,
    FaceDetection,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::ObjectLocalization,
        Feature::LabelDetection,
        Feature::ImageProperties,
        Feature::SafeSearchDetection,
        Feature::FaceDetection,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Feature::ObjectLocalization => "OBJECT_LOCALIZATION",
            Feature::LabelDetection => "LABEL_DETECTION",
            Feature::ImageProperties => "IMAGE_PROPERTIES",
            Feature::SafeSearchDetection => "SAFE_SEARCH_DETECTION",
            Feature::FaceDetection => "FACE_DETECTION",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Feature::ObjectLocalization => "Object localization",
            Feature::LabelDetection => "Label detection",
            Feature::ImageProperties => "Image properties",
            Feature::SafeSearchDetection => "Safe-search detection",
            Feature::FaceDetection => "Face detection",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Feature {
    type Err = DefsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_matches('"').trim().to_ascii_uppercase();
        Feature::ALL
            .into_iter()
            .find(|feature| feature.wire_name() == name)
            .ok_or(DefsError::UnknownFeature(name))
    }
}

/// The set of features requested with each upload or URL annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn all() -> Self {
        Feature::ALL.into_iter().collect()
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn insert(&mut self, feature: Feature) -> bool {
        self.0.insert(feature)
    }

    pub fn remove(&mut self, feature: Feature) -> bool {
        self.0.remove(&feature)
    }

    /// Flips membership of `feature`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, feature: Feature) -> bool {
        if self.0.remove(&feature) {
            false
        } else {
            self.0.insert(feature);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }

    /// Comma-joined wire identifiers, e.g. `LABEL_DETECTION,FACE_DETECTION`.
    pub fn to_wire(&self) -> String {
        self.iter().map(|feature| feature.wire_name()).collect::<Vec<_>>().join(",")
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for FeatureSet {
    type Err = DefsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|segment| !segment.trim().is_empty())
            .map(Feature::from_str)
            .collect()
    }
}

/// A stored image in the cloud bucket, optionally linked to a precomputed annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudImageInfo {
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl CloudImageInfo {
    pub fn new(image_id: impl Into<String>, annotation: Option<String>) -> Self {
        Self {
            image_id: image_id.into(),
            annotation,
        }
    }

    pub fn has_annotation(&self) -> bool {
        self.annotation.is_some()
    }
}

/// One value of the `/bucket/list` response, keyed by image id. Images
/// without a stored annotation are listed as `null` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListInfoEntry {
    #[serde(default)]
    pub annotation: Option<String>,
    /// Annotation JSON the backend inlines for the first few entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Listing in bucket order.
pub type ListInfoDictionary = IndexMap<String, Option<ListInfoEntry>>;

/// Turns the keyed listing into rows, keeping the backend's order. Null
/// entries and blank annotation references count as missing.
pub fn reshape_listing(listing: ListInfoDictionary) -> Vec<CloudImageInfo> {
    listing
        .into_iter()
        .map(|(image_id, entry)| CloudImageInfo {
            image_id,
            annotation: entry
                .and_then(|entry| entry.annotation)
                .filter(|reference| !reference.trim().is_empty()),
        })
        .collect()
}
