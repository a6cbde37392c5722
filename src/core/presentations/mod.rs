pub mod google_slides_service;

pub use google_slides_service::{ExportError, ExportRequest, GoogleSlidesService};
