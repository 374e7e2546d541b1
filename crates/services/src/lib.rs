#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_loader;
pub mod error;
pub mod lesson_flow;
pub mod progress_store;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use catalog_loader::{load_catalog, parse_catalog};
pub use error::{CatalogLoadError, LessonFlowError, ProgressStoreError};
pub use lesson_flow::{LessonCompletion, LessonFlowService};
pub use progress_store::ProgressStore;
