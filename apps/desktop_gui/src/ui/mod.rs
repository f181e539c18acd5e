//! UI layer for desktop GUI: the scrape form window.

pub mod app;

pub use app::{load_persisted_form, ScraperApp};
