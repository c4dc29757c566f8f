/// Event-planning marketing site
///
/// Serves the static marketing pages and stores contact-form inquiries in a
/// JSON file that is rewritten on every submission.

pub mod error;
pub mod config;
pub mod persistence;
pub mod contact_store;
pub mod submission;
pub mod pages;
pub mod assets;
pub mod web;

pub use error::{SiteError, Result};
pub use config::Config;
pub use contact_store::{ContactEntry, ContactStore, ContactSubmission};
pub use web::SiteState;
