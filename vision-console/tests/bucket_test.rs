mod common;

use common::init_tracing;
use std::sync::atomic::Ordering;
use tracing::info;
use vision_console::bucket::ListingStatus;
use vision_console::render::render_bucket;
use vision_console::{types::*, CloudBucketBrowser, MockAnnotationBackend, Pagination, PAGE_SIZE};

fn listing(annotated: usize, unannotated: usize) -> Vec<CloudImageInfo> {
    let with = (0..annotated).map(|i| CloudImageInfo::new(format!("img{:02}.jpg", i), Some(format!("img{:02}.json", i))));
    let without = (0..unannotated).map(|i| CloudImageInfo::new(format!("raw{:02}.jpg", i), None));
    with.chain(without).collect()
}

#[test]
fn test_pagination_over_ten_items() {
    let mut pagination = Pagination::new(10, 5);
    assert_eq!(pagination.page_count(), 2);
    assert!(!pagination.has_previous());
    assert!(pagination.has_next());
    assert_eq!(pagination.range(), 0..5);
    assert_eq!(pagination.caption(), "Items 0 to 5");

    assert!(pagination.next());
    assert_eq!(pagination.page(), 1);
    assert!(pagination.has_previous());
    assert!(!pagination.has_next());
    assert_eq!(pagination.range(), 5..10);
    assert_eq!(pagination.caption(), "Items 5 to 10");

    assert!(!pagination.next());
    assert!(!pagination.select(2));
    assert_eq!(pagination.page(), 1);

    assert!(pagination.previous());
    assert_eq!(pagination.page(), 0);
    assert!(!pagination.previous());
}

#[test]
fn test_pagination_partial_and_empty_pages() {
    let mut pagination = Pagination::new(7, 5);
    assert!(pagination.select(1));
    assert_eq!(pagination.range(), 5..7);
    assert_eq!(pagination.caption(), "Items 5 to 7");

    let empty = Pagination::new(0, 5);
    assert_eq!(empty.page_count(), 1);
    assert!(!empty.has_next());
    assert_eq!(empty.range(), 0..0);
}

#[tokio::test]
async fn test_listing_is_filtered_and_cached() -> Result<()> {
    init_tracing();
    info!("Testing bucket listing cache");

    let backend = MockAnnotationBackend::new("bucket").with_listing(listing(7, 3));
    let mut browser = CloudBucketBrowser::new();
    assert_eq!(browser.status(), &ListingStatus::Unloaded);

    let images = browser.load(&backend).await?;
    assert_eq!(images.len(), 7);
    assert!(images.iter().all(CloudImageInfo::has_annotation));
    assert!(browser.fetched_at().is_some());
    assert_eq!(browser.page_rows().len(), PAGE_SIZE);
    assert_eq!(browser.pagination().page_count(), 2);

    browser.load(&backend).await?;
    browser.load(&backend).await?;
    assert_eq!(backend.calls.list_bucket.load(Ordering::SeqCst), 1);

    backend.set_listing(listing(2, 0));
    let images = browser.reload(&backend).await?;
    assert_eq!(images.len(), 2);
    assert_eq!(backend.calls.list_bucket.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_refresh_resets_page_past_the_end() -> Result<()> {
    init_tracing();

    let backend = MockAnnotationBackend::new("shrinking").with_listing(listing(12, 0));
    let mut browser = CloudBucketBrowser::new();
    browser.load(&backend).await?;
    assert!(browser.select_page(2));
    assert_eq!(browser.page_rows().len(), 2);

    backend.set_listing(listing(4, 0));
    browser.reload(&backend).await?;
    assert_eq!(browser.pagination().page(), 0);
    assert_eq!(browser.page_rows().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_listing_failure_is_reported_and_retried() -> Result<()> {
    init_tracing();

    let failing = MockAnnotationBackend::new("down").with_failure("Storage unavailable");
    let mut browser = CloudBucketBrowser::new();

    let error = browser.load(&failing).await.unwrap_err();
    assert_eq!(error.to_string(), "General error: Storage unavailable");
    assert_eq!(browser.error(), Some("Storage unavailable"));
    assert!(render_bucket(&browser).contains("Error: Storage unavailable"));

    let healthy = MockAnnotationBackend::new("up").with_listing(listing(3, 1));
    assert_eq!(browser.load(&healthy).await?.len(), 3);
    assert!(browser.error().is_none());
    Ok(())
}

#[test]
fn test_stale_listing_is_discarded() {
    init_tracing();

    let mut browser = CloudBucketBrowser::new();
    let first = browser.begin_load().unwrap();
    assert!(browser.begin_load().is_none());
    assert!(browser.is_loading());
    assert!(browser.page_rows().is_empty());

    let second = browser.refresh();
    assert_eq!(browser.status(), &ListingStatus::Loading { refreshing: true });

    assert!(!browser.finish_load(first, Ok(listing(9, 0))));
    assert!(browser.is_loading());

    assert!(browser.finish_load(second, Ok(listing(1, 0))));
    assert_eq!(browser.images().len(), 1);
    assert!(browser.begin_load().is_none());
}

#[test]
fn test_select_image_on_current_page() {
    let mut browser = CloudBucketBrowser::new();
    let ticket = browser.begin_load().unwrap();
    browser.finish_load(ticket, Ok(listing(10, 0)));

    assert!(browser.next_page());
    let picked = browser.select_image(1).unwrap();
    assert_eq!(picked.image_id, "img06.jpg");
    assert!(browser.is_selected(&picked));
    assert!(browser.select_image(5).is_none());
    assert_eq!(browser.selected(), Some(&picked));

    let page = render_bucket(&browser);
    assert!(page.contains("* 1. img06.jpg"));
    assert!(page.contains("Items 5 to 10"));
    assert!(page.contains("(page 2 of 2)"));
}
