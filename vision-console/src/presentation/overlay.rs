use crate::types::Result;
use std::io::Cursor;
use vision_defs::Poly;

/// Natural size of the displayed image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    /// Reads the dimensions from the image header without decoding pixels.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (width, height) = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Self::new(width, height))
    }

    fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Box placement relative to the rendered image, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxPosition {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// One drawn box. `index` is the row the box belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayBox {
    pub index: usize,
    pub position: BoxPosition,
    pub highlighted: bool,
}

/// Projects a quadrilateral onto the image as percentages. Absolute
/// vertices need the natural image size; normalized ones are used as is.
/// Anything that is not exactly four vertices yields `None`.
pub fn bounding_box(poly: &Poly, image_size: Option<ImageSize>) -> Option<BoxPosition> {
    if poly.vertices.len() == 4 {
        let size = image_size.filter(ImageSize::is_usable)?;
        let (first, opposite) = (poly.vertices[0], poly.vertices[2]);
        return Some(BoxPosition {
            top: first.y * 100.0 / size.height,
            left: first.x * 100.0 / size.width,
            width: (opposite.x - first.x) * 100.0 / size.width,
            height: (opposite.y - first.y) * 100.0 / size.height,
        });
    }

    if poly.normalized_vertices.len() == 4 {
        let (first, opposite) = (poly.normalized_vertices[0], poly.normalized_vertices[2]);
        return Some(BoxPosition {
            top: first.y * 100.0,
            left: first.x * 100.0,
            width: (opposite.x - first.x) * 100.0,
            height: (opposite.y - first.y) * 100.0,
        });
    }

    None
}

/// Boxes for a list of polygons, in row order. Rows whose polygon cannot be
/// projected are skipped.
pub fn overlay_boxes<'a>(
    polys: impl IntoIterator<Item = &'a Poly>,
    image_size: Option<ImageSize>,
    highlighted: Option<usize>,
) -> Vec<OverlayBox> {
    polys
        .into_iter()
        .enumerate()
        .filter_map(|(index, poly)| {
            bounding_box(poly, image_size).map(|position| OverlayBox {
                index,
                position,
                highlighted: highlighted == Some(index),
            })
        })
        .collect()
}
