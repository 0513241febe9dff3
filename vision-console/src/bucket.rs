use crate::traits::AnnotationBackend;
use crate::types::{CloudImageInfo, ConsoleError, Result};
use chrono::{DateTime, Utc};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Rows shown per page of the bucket listing.
pub const PAGE_SIZE: usize = 5;

/// Client-side paging over a list of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
    total: usize,
}

impl Pagination {
    pub fn new(total: usize, page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
            total,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of selectable pages. An empty list still has its first page.
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.total > (self.page + 1) * self.page_size
    }

    /// Index range of the current page, clamped to the list.
    pub fn range(&self) -> Range<usize> {
        let start = (self.page * self.page_size).min(self.total);
        let end = (start + self.page_size).min(self.total);
        start..end
    }

    /// Moves to `page`. Pages past the end are ignored.
    pub fn select(&mut self, page: usize) -> bool {
        if page >= self.page_count() {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.has_next() && self.select(self.page + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.has_previous() && self.select(self.page - 1)
    }

    fn resize(&mut self, total: usize) {
        self.total = total;
        if self.page >= self.page_count() {
            self.page = 0;
        }
    }

    pub fn caption(&self) -> String {
        let range = self.range();
        format!("Items {} to {}", range.start, range.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingStatus {
    Unloaded,
    Loading { refreshing: bool },
    Ready,
    Failed(String),
}

/// Handle for one listing fetch, returned to [`CloudBucketBrowser::finish_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingTicket(u64);

/// Paginated browser over the annotated images of the cloud bucket.
///
/// The listing is fetched once and cached until [`refresh`](Self::refresh).
/// Images without a stored annotation are left out.
#[derive(Debug, Clone)]
pub struct CloudBucketBrowser {
    images: Vec<CloudImageInfo>,
    fetched_at: Option<DateTime<Utc>>,
    status: ListingStatus,
    pagination: Pagination,
    selected: Option<CloudImageInfo>,
    pending: Option<ListingTicket>,
    last_ticket: u64,
}

impl Default for CloudBucketBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudBucketBrowser {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            fetched_at: None,
            status: ListingStatus::Unloaded,
            pagination: Pagination::new(0, PAGE_SIZE),
            selected: None,
            pending: None,
            last_ticket: 0,
        }
    }

    pub fn status(&self) -> &ListingStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, ListingStatus::Loading { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ListingStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// All cached images that can be annotated by reference.
    pub fn images(&self) -> &[CloudImageInfo] {
        &self.images
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn selected(&self) -> Option<&CloudImageInfo> {
        self.selected.as_ref()
    }

    /// Rows of the current page. Empty while a fetch is outstanding.
    pub fn page_rows(&self) -> &[CloudImageInfo] {
        if self.is_loading() {
            return &[];
        }
        &self.images[self.pagination.range()]
    }

    /// Starts the first fetch. Returns `None` when the listing is cached or
    /// already being fetched.
    pub fn begin_load(&mut self) -> Option<ListingTicket> {
        match self.status {
            ListingStatus::Unloaded | ListingStatus::Failed(_) => Some(self.start_fetch(false)),
            ListingStatus::Loading { .. } | ListingStatus::Ready => None,
        }
    }

    /// Drops the cache and starts a new fetch, superseding any outstanding one.
    pub fn refresh(&mut self) -> ListingTicket {
        info!("Refreshing bucket listing");
        self.start_fetch(true)
    }

    /// Applies a fetched listing. Returns `false` if the ticket was superseded.
    pub fn finish_load(&mut self, ticket: ListingTicket, listing: Result<Vec<CloudImageInfo>>) -> bool {
        if self.pending != Some(ticket) {
            debug!("Discarding stale bucket listing {:?}", ticket);
            return false;
        }
        self.pending = None;

        match listing {
            Ok(listing) => {
                let total = listing.len();
                self.images = listing.into_iter().filter(CloudImageInfo::has_annotation).collect();
                self.pagination.resize(self.images.len());
                self.fetched_at = Some(Utc::now());
                self.status = ListingStatus::Ready;
                info!(
                    "Bucket listing ready: {} of {} images have annotations",
                    self.images.len(),
                    total
                );
            }
            Err(e) => {
                warn!("Failed to list bucket images: {}", e);
                self.status = ListingStatus::Failed(e.to_string());
            }
        }
        true
    }

    pub fn select_page(&mut self, page: usize) -> bool {
        self.pagination.select(page)
    }

    pub fn next_page(&mut self) -> bool {
        self.pagination.next()
    }

    pub fn previous_page(&mut self) -> bool {
        self.pagination.previous()
    }

    /// Picks the image at `row` of the current page.
    pub fn select_image(&mut self, row: usize) -> Option<CloudImageInfo> {
        let info = self.page_rows().get(row)?.clone();
        info!("Selected bucket image {}", info.image_id);
        self.selected = Some(info.clone());
        Some(info)
    }

    pub fn is_selected(&self, info: &CloudImageInfo) -> bool {
        self.selected.as_ref().is_some_and(|selected| selected.image_id == info.image_id)
    }

    /// Fetches the listing if it is not cached yet.
    pub async fn load(&mut self, backend: &dyn AnnotationBackend) -> Result<&[CloudImageInfo]> {
        if let Some(ticket) = self.begin_load() {
            let listing = backend.list_bucket(None).await;
            self.finish_load(ticket, listing);
        }
        self.cached()
    }

    /// Refetches the listing even if it is cached.
    pub async fn reload(&mut self, backend: &dyn AnnotationBackend) -> Result<&[CloudImageInfo]> {
        let ticket = self.refresh();
        let listing = backend.list_bucket(None).await;
        self.finish_load(ticket, listing);
        self.cached()
    }

    fn cached(&self) -> Result<&[CloudImageInfo]> {
        match &self.status {
            ListingStatus::Failed(message) => Err(ConsoleError::General(message.clone())),
            _ => Ok(&self.images),
        }
    }

    fn start_fetch(&mut self, refreshing: bool) -> ListingTicket {
        self.last_ticket += 1;
        let ticket = ListingTicket(self.last_ticket);
        self.pending = Some(ticket);
        self.status = ListingStatus::Loading { refreshing };
        ticket
    }
}
