use vision_defs::{EntityAnnotation, FaceAnnotation, ImagePropertiesAnnotation, LocalizedObjectAnnotation};

/// A labelled confidence bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceRow {
    pub label: String,
    pub confidence: f64,
}

impl ConfidenceRow {
    pub fn percent(&self) -> f64 {
        self.confidence * 100.0
    }
}

/// Borrows `items` in descending order of `score`. Stable for equal scores;
/// the input is left untouched.
pub fn sorted_desc_by<T>(items: &[T], score: impl Fn(&T) -> f64) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| score(b).total_cmp(&score(a)));
    sorted
}

pub fn sorted_objects(objects: &[LocalizedObjectAnnotation]) -> Vec<&LocalizedObjectAnnotation> {
    sorted_desc_by(objects, |object| object.score)
}

pub fn sorted_labels(labels: &[EntityAnnotation]) -> Vec<&EntityAnnotation> {
    sorted_desc_by(labels, |label| label.score)
}

pub fn sorted_faces(faces: &[FaceAnnotation]) -> Vec<&FaceAnnotation> {
    sorted_desc_by(faces, |face| face.detection_confidence)
}

pub fn object_rows(objects: &[LocalizedObjectAnnotation]) -> Vec<ConfidenceRow> {
    sorted_objects(objects)
        .into_iter()
        .map(|object| ConfidenceRow {
            label: object.name.clone(),
            confidence: object.score,
        })
        .collect()
}

pub fn label_rows(labels: &[EntityAnnotation]) -> Vec<ConfidenceRow> {
    sorted_labels(labels)
        .into_iter()
        .map(|label| ConfidenceRow {
            label: label.description.clone(),
            confidence: label.score,
        })
        .collect()
}

/// Faces have no name; rows are numbered after sorting.
pub fn face_rows(faces: &[FaceAnnotation]) -> Vec<ConfidenceRow> {
    sorted_faces(faces)
        .into_iter()
        .enumerate()
        .map(|(index, face)| ConfidenceRow {
            label: format!("Face {}", index + 1),
            confidence: face.detection_confidence,
        })
        .collect()
}

/// Headline for the object tab, from the most confident detection.
pub fn top_object_summary(objects: &[LocalizedObjectAnnotation]) -> Option<String> {
    let top = sorted_objects(objects).into_iter().next()?;
    Some(format!(
        "Image is classified as '{}' with {:.0}% confidence.",
        top.name,
        top.score * 100.0
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorRow {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub score: f64,
    pub pixel_fraction: f64,
}

impl ColorRow {
    pub fn rgb_label(&self) -> String {
        format!("RGB = ({}, {}, {})", self.red, self.green, self.blue)
    }

    pub fn fraction_label(&self) -> String {
        format!("{:.0}%", self.pixel_fraction * 100.0)
    }
}

fn channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Dominant colours, largest share of the image first.
pub fn color_rows(properties: &ImagePropertiesAnnotation) -> Vec<ColorRow> {
    sorted_desc_by(&properties.dominant_colors.colors, |info| info.pixel_fraction)
        .into_iter()
        .map(|info| ColorRow {
            red: channel(info.color.red),
            green: channel(info.color.green),
            blue: channel(info.color.blue),
            score: info.score,
            pixel_fraction: info.pixel_fraction,
        })
        .collect()
}
