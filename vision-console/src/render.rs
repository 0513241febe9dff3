//! Plain-text rendering of the console screens.

use crate::bucket::CloudBucketBrowser;
use crate::orchestrator::Projection;
use crate::presentation::{ImageSize, OverlayBox, ResultView, TabContent};
use crate::types::{DisplayedImage, Feature, FeatureSet, ImageSource};
use std::fmt::Write;
use vision_defs::AnnotationResult;

const BAR_WIDTH: usize = 20;

/// `percent` in 0..=100 as a fixed-width bar.
pub fn bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn render_sources(active: ImageSource) -> String {
    ImageSource::ALL
        .into_iter()
        .map(|source| {
            if source == active {
                format!("[{}]", source.label())
            } else {
                format!(" {} ", source.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_features(features: &FeatureSet) -> String {
    Feature::ALL
        .into_iter()
        .map(|feature| {
            let mark = if features.contains(feature) { "x" } else { " " };
            format!("[{}] {}", mark, feature.label())
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Alerts above the result panel. Empty when there is nothing to report.
pub fn render_status(projection: &Projection<'_>) -> String {
    let mut out = String::new();
    if let Some(error) = projection.error {
        let _ = writeln!(out, "Error: {}", error);
    }
    if projection.is_loading {
        let _ = writeln!(out, "Getting annotations...");
    }
    out
}

pub fn render_result(
    result: &AnnotationResult,
    view: &ResultView,
    image: Option<&DisplayedImage>,
    image_size: Option<ImageSize>,
) -> String {
    let mut out = String::new();

    if let Some(image) = image {
        match image_size {
            Some(size) => {
                let _ = writeln!(out, "Image: {} [{}x{}]", image.describe(), size.width, size.height);
            }
            None => {
                let _ = writeln!(out, "Image: {}", image.describe());
            }
        }
    }

    let tabs = view
        .tabs(result)
        .into_iter()
        .map(|state| match (state.active, state.enabled) {
            (true, _) => format!("[{}]", state.tab),
            (false, true) => format!(" {} ", state.tab),
            (false, false) => format!("({})", state.tab),
        })
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(out, "{}", tabs);

    match view.content(result) {
        TabContent::Objects { summary, rows } => {
            if rows.is_empty() {
                let _ = writeln!(out, "No objects detected.");
            }
            if let Some(summary) = summary {
                let _ = writeln!(out, "{}", summary);
            }
            write_confidence_rows(&mut out, &rows, view.highlighted());
        }
        TabContent::Labels(rows) => {
            if rows.is_empty() {
                let _ = writeln!(out, "No labels detected.");
            }
            write_confidence_rows(&mut out, &rows, None);
        }
        TabContent::Properties(rows) => {
            for (index, row) in rows.iter().enumerate() {
                let prefix = if index == 0 { "Pixel fraction = " } else { "" };
                let _ = writeln!(
                    out,
                    "  {:<28} {}{:>4} {}",
                    row.rgb_label(),
                    prefix,
                    row.fraction_label(),
                    bar(row.pixel_fraction * 100.0)
                );
            }
        }
        TabContent::SafeSearch(rows) => {
            for row in rows.iter() {
                let _ = writeln!(
                    out,
                    "  {:<10} {:<14} {}",
                    row.category,
                    row.display.label,
                    bar(f64::from(row.display.fill_percent))
                );
            }
        }
        TabContent::Faces(rows) => {
            if rows.is_empty() {
                let _ = writeln!(out, "No faces detected.");
            }
            write_confidence_rows(&mut out, &rows, view.highlighted());
        }
        TabContent::Unavailable => {
            let _ = writeln!(out, "Not available for this image.");
        }
    }

    let boxes = view.overlay(result, image_size);
    if !boxes.is_empty() {
        let _ = writeln!(out, "Bounding boxes:");
        for overlay_box in &boxes {
            let _ = writeln!(out, "{}", render_box(overlay_box));
        }
    }

    out
}

fn write_confidence_rows(out: &mut String, rows: &[crate::presentation::ConfidenceRow], highlighted: Option<usize>) {
    for (index, row) in rows.iter().enumerate() {
        let marker = if highlighted == Some(index) { ">" } else { " " };
        let prefix = if index == 0 { "Confidence = " } else { "" };
        let _ = writeln!(
            out,
            "{}{:>2}. {:<24} {}{:.2} {}",
            marker,
            index,
            row.label,
            prefix,
            row.confidence,
            bar(row.percent())
        );
    }
}

pub fn render_box(overlay_box: &OverlayBox) -> String {
    let position = overlay_box.position;
    format!(
        "{}{:>2}. top {:.1}% left {:.1}% width {:.1}% height {:.1}%",
        if overlay_box.highlighted { ">" } else { " " },
        overlay_box.index,
        position.top,
        position.left,
        position.width,
        position.height
    )
}

pub fn render_bucket(browser: &CloudBucketBrowser) -> String {
    let mut out = String::new();

    if browser.is_loading() {
        let _ = writeln!(out, "Loading images from Cloud Storage...");
        return out;
    }
    if let Some(error) = browser.error() {
        let _ = writeln!(out, "Error: {}", error);
        return out;
    }

    let _ = writeln!(out, "Select an image below");
    for (row, info) in browser.page_rows().iter().enumerate() {
        let marker = if browser.is_selected(info) { "*" } else { " " };
        let _ = writeln!(out, "{} {}. {}", marker, row, info.image_id);
    }

    let pagination = browser.pagination();
    let _ = writeln!(
        out,
        "{}  {}  {}  (page {} of {})",
        if pagination.has_previous() { "<prev" } else { "     " },
        pagination.caption(),
        if pagination.has_next() { "next>" } else { "     " },
        pagination.page() + 1,
        pagination.page_count()
    );
    if let Some(fetched_at) = browser.fetched_at() {
        let _ = writeln!(out, "Listed at {}", fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    out
}
