use crate::likelihood::Likelihood;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of the annotation backend. Every category is optional; only the
/// ones the backend filled in are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_object_annotations: Option<Vec<LocalizedObjectAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_annotations: Option<Vec<EntityAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_properties_annotation: Option<ImagePropertiesAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_search_annotation: Option<SafeSearchAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_annotations: Option<Vec<FaceAnnotation>>,

    // Categories carried through but not presented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark_annotations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_annotations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_annotations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text_annotation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_hints_annotation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_detection: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
}

impl AnnotationResult {
    /// Message of the embedded backend error, if the service reported one.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .filter(|status| status.code != 0 || !status.message.is_empty())
            .map(|status| status.message.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A bounding polygon, in absolute pixels (`vertices`) or in [0, 1]
/// coordinates (`normalized_vertices`). Usually only one of them is filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub normalized_vertices: Vec<Vertex>,
}

impl Poly {
    pub fn absolute(vertices: Vec<Vertex>) -> Self {
        Self { vertices, normalized_vertices: Vec::new() }
    }

    pub fn normalized(normalized_vertices: Vec<Vertex>) -> Self {
        Self { vertices: Vec::new(), normalized_vertices }
    }
}

/// Label detection entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnnotation {
    #[serde(default)]
    pub mid: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub topicality: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedObjectAnnotation {
    #[serde(default)]
    pub mid: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub bounding_poly: Poly,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnnotation {
    #[serde(default)]
    pub bounding_poly: Poly,
    /// Tighter box around the skin part of the face; this is what gets drawn.
    #[serde(default)]
    pub fd_bounding_poly: Poly,
    #[serde(default)]
    pub roll_angle: f64,
    #[serde(default)]
    pub pan_angle: f64,
    #[serde(default)]
    pub tilt_angle: f64,
    #[serde(default)]
    pub detection_confidence: f64,
    #[serde(default)]
    pub landmarking_confidence: f64,
    #[serde(default)]
    pub joy_likelihood: Likelihood,
    #[serde(default)]
    pub sorrow_likelihood: Likelihood,
    #[serde(default)]
    pub anger_likelihood: Likelihood,
    #[serde(default)]
    pub surprise_likelihood: Likelihood,
    #[serde(default)]
    pub under_exposed_likelihood: Likelihood,
    #[serde(default)]
    pub blurred_likelihood: Likelihood,
    #[serde(default)]
    pub headwear_likelihood: Likelihood,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeSearchAnnotation {
    #[serde(default)]
    pub adult: Likelihood,
    #[serde(default)]
    pub spoof: Likelihood,
    #[serde(default)]
    pub medical: Likelihood,
    #[serde(default)]
    pub violence: Likelihood,
    #[serde(default)]
    pub racy: Likelihood,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePropertiesAnnotation {
    #[serde(default)]
    pub dominant_colors: DominantColors,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DominantColors {
    #[serde(default)]
    pub colors: Vec<ColorInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfo {
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub pixel_fraction: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
}
