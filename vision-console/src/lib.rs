pub mod types;
pub mod traits;
pub mod client;
pub mod mock;
pub mod orchestrator;
pub mod bucket;
pub mod presentation;
pub mod render;
pub mod console;

pub use types::*;
pub use traits::AnnotationBackend;
pub use client::AnnotationClient;
pub use mock::MockAnnotationBackend;
pub use orchestrator::{AcquiredInput, Orchestrator, RequestState, RequestTicket, RequestToken, Settlement};
pub use bucket::{CloudBucketBrowser, Pagination, PAGE_SIZE};
pub use presentation::{ImageSize, ResultView, Tab};
pub use console::{Command, Session};
