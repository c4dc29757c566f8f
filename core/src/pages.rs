/// Marketing pages: fixed route → template table
use crate::error::{Result, SiteError};
use std::path::Path;
use tracing::debug;

const PAGES: &[(&str, &str)] = &[
    ("/", "index.html"),
    ("/about", "about.html"),
    ("/services", "services.html"),
    ("/services/weddings", "services/weddings.html"),
    ("/services/corporate", "services/corporate.html"),
    ("/services/parties", "services/parties.html"),
    ("/services/concerts", "services/concerts.html"),
    ("/services/destination", "services/destination.html"),
    ("/gallery", "gallery.html"),
    ("/packages", "packages.html"),
    ("/contact", "contact.html"),
];

/// Template backing a page route, if the path is one
pub fn template_for(path: &str) -> Option<&'static str> {
    PAGES
        .iter()
        .find(|(route, _)| *route == path)
        .map(|(_, template)| *template)
}

/// All page routes, in menu order
pub fn routes() -> impl Iterator<Item = &'static str> {
    PAGES.iter().map(|(route, _)| *route)
}

/// Read a page template from disk
pub async fn render(templates_dir: &Path, template: &str) -> Result<String> {
    let path = templates_dir.join(template);
    debug!("Rendering {:?}", path);
    tokio::fs::read_to_string(&path).await.map_err(|e| {
        SiteError::Server(format!("template {} unavailable: {}", template, e))
    })
}
