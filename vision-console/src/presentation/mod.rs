//! Pure view model of an annotation result: tabs, rows and the bounding-box
//! overlay. Nothing here mutates the result it is given.

pub mod overlay;
pub mod rows;
pub mod safe_search;

use crate::types::ConsoleError;
use std::fmt;
use std::str::FromStr;
use vision_defs::AnnotationResult;

pub use overlay::{bounding_box, overlay_boxes, BoxPosition, ImageSize, OverlayBox};
pub use rows::{color_rows, face_rows, label_rows, object_rows, top_object_summary, ColorRow, ConfidenceRow};
pub use safe_search::{likelihood_display, safe_search_rows, LikelihoodDisplay, SafeSearchRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Objects,
    Labels,
    Properties,
    SafeSearch,
    Faces,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Objects, Tab::Labels, Tab::Properties, Tab::SafeSearch, Tab::Faces];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Objects => "Objects",
            Tab::Labels => "Labels",
            Tab::Properties => "Properties",
            Tab::SafeSearch => "Safe Search",
            Tab::Faces => "Faces",
        }
    }

    /// Whether the result carries the category behind this tab.
    pub fn is_present(&self, result: &AnnotationResult) -> bool {
        match self {
            Tab::Objects => result.localized_object_annotations.is_some(),
            Tab::Labels => result.label_annotations.is_some(),
            Tab::Properties => result.image_properties_annotation.is_some(),
            Tab::SafeSearch => result.safe_search_annotation.is_some(),
            Tab::Faces => result.face_annotations.is_some(),
        }
    }

    pub fn drives_overlay(&self) -> bool {
        matches!(self, Tab::Objects | Tab::Faces)
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tab {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match name.as_str() {
            "objects" | "object" => Ok(Tab::Objects),
            "labels" | "label" => Ok(Tab::Labels),
            "properties" | "props" => Ok(Tab::Properties),
            "safesearch" | "safe" => Ok(Tab::SafeSearch),
            "faces" | "face" => Ok(Tab::Faces),
            _ => Err(ConsoleError::InvalidCommand(format!("unknown tab '{}'", s.trim()))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabState {
    pub tab: Tab,
    pub enabled: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabContent {
    Objects {
        summary: Option<String>,
        rows: Vec<ConfidenceRow>,
    },
    Labels(Vec<ConfidenceRow>),
    Properties(Vec<ColorRow>),
    SafeSearch([SafeSearchRow; 5]),
    Faces(Vec<ConfidenceRow>),
    /// The active tab's category is missing from the result.
    Unavailable,
}

/// Tab selection and row highlight for one displayed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultView {
    active_tab: Tab,
    highlighted: Option<usize>,
}

impl Default for ResultView {
    fn default() -> Self {
        Self {
            active_tab: Tab::Objects,
            highlighted: None,
        }
    }
}

impl ResultView {
    /// Starts on the first tab the result can show.
    pub fn for_result(result: &AnnotationResult) -> Self {
        let active_tab = Tab::ALL
            .into_iter()
            .find(|tab| tab.is_present(result))
            .unwrap_or(Tab::Objects);
        Self {
            active_tab,
            highlighted: None,
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn tabs(&self, result: &AnnotationResult) -> Vec<TabState> {
        Tab::ALL
            .into_iter()
            .map(|tab| TabState {
                tab,
                enabled: tab.is_present(result),
                active: tab == self.active_tab,
            })
            .collect()
    }

    /// Disabled tabs cannot be selected.
    pub fn select_tab(&mut self, tab: Tab, result: &AnnotationResult) -> bool {
        if !tab.is_present(result) {
            return false;
        }
        self.active_tab = tab;
        self.highlighted = None;
        true
    }

    /// Highlights the box of `row`. Only object and face rows have boxes.
    pub fn hover(&mut self, row: usize, result: &AnnotationResult) -> bool {
        let rows = match self.active_tab {
            Tab::Objects => result.localized_object_annotations.as_ref().map(Vec::len),
            Tab::Faces => result.face_annotations.as_ref().map(Vec::len),
            _ => None,
        };
        match rows {
            Some(count) if row < count => {
                self.highlighted = Some(row);
                true
            }
            _ => false,
        }
    }

    pub fn unhover(&mut self) {
        self.highlighted = None;
    }

    /// Boxes for the active tab, indexed like its sorted rows.
    pub fn overlay(&self, result: &AnnotationResult, image_size: Option<ImageSize>) -> Vec<OverlayBox> {
        match self.active_tab {
            Tab::Objects => match &result.localized_object_annotations {
                Some(objects) => overlay_boxes(
                    rows::sorted_objects(objects).into_iter().map(|object| &object.bounding_poly),
                    image_size,
                    self.highlighted,
                ),
                None => Vec::new(),
            },
            Tab::Faces => match &result.face_annotations {
                Some(faces) => overlay_boxes(
                    rows::sorted_faces(faces).into_iter().map(|face| &face.fd_bounding_poly),
                    image_size,
                    self.highlighted,
                ),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    pub fn content(&self, result: &AnnotationResult) -> TabContent {
        match self.active_tab {
            Tab::Objects => match &result.localized_object_annotations {
                Some(objects) => TabContent::Objects {
                    summary: top_object_summary(objects),
                    rows: object_rows(objects),
                },
                None => TabContent::Unavailable,
            },
            Tab::Labels => result
                .label_annotations
                .as_deref()
                .map_or(TabContent::Unavailable, |labels| TabContent::Labels(label_rows(labels))),
            Tab::Properties => result
                .image_properties_annotation
                .as_ref()
                .map_or(TabContent::Unavailable, |properties| TabContent::Properties(color_rows(properties))),
            Tab::SafeSearch => result
                .safe_search_annotation
                .as_ref()
                .map_or(TabContent::Unavailable, |annotation| {
                    TabContent::SafeSearch(safe_search_rows(annotation))
                }),
            Tab::Faces => result
                .face_annotations
                .as_deref()
                .map_or(TabContent::Unavailable, |faces| TabContent::Faces(face_rows(faces))),
        }
    }
}
