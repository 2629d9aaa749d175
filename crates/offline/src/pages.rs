//! Internal shell pages
//!
//! Locations under the reserved `ember:` scheme or the `/ember-pages/`
//! path prefix never reach the network; the controller synthesizes their
//! documents from the fixed template table below.

/// Reserved scheme for internal locations
pub const INTERNAL_SCHEME: &str = "ember:";

/// Reserved path prefix for internal locations
pub const INTERNAL_PAGE_PREFIX: &str = "/ember-pages/";

/// The fallback page name for unmatched internal locations
pub const DEFAULT_PAGE: &str = "newtab";

/// Internal page names, each mapping to a static document
pub const PAGE_NAMES: [&str; 6] = ["newtab", "downloads", "history", "bookmarks", "settings", "about"];

/// Whether a location is internal to the shell
pub fn is_internal_location(location: &str) -> bool {
    location.starts_with(INTERNAL_SCHEME) || location.contains(INTERNAL_PAGE_PREFIX)
}

/// The page name addressed by an internal location: the last path segment,
/// with any `.html` suffix stripped
pub fn page_name(location: &str) -> &str {
    let name = location
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(DEFAULT_PAGE);
    name.strip_suffix(".html").unwrap_or(name)
}

/// The document for an internal page name. Unmatched names resolve to the
/// default page.
pub fn template(name: &str) -> &'static str {
    match name {
        "newtab" => NEWTAB,
        "downloads" => DOWNLOADS,
        "history" => HISTORY,
        "bookmarks" => BOOKMARKS,
        "settings" => SETTINGS,
        "about" => ABOUT,
        _ => NEWTAB,
    }
}

/// Seed entries for the dynamic generation at install time: one
/// `/ember-pages/` path per internal page
pub fn seed_entries() -> Vec<(String, &'static str)> {
    PAGE_NAMES
        .iter()
        .map(|name| (format!("{}{}.html", INTERNAL_PAGE_PREFIX, name), template(name)))
        .collect()
}

const NEWTAB: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>New Tab</title>
        <link rel="stylesheet" href="/css/shell.css">
    </head>
    <body>
        <div class="newtab-content">
            <h1>New Tab</h1>
            <div class="top-sites"></div>
        </div>
    </body>
</html>"#;

const DOWNLOADS: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>Downloads</title>
        <link rel="stylesheet" href="/css/shell.css">
    </head>
    <body>
        <div class="downloads-content">
            <h1>Downloads</h1>
            <ul class="download-list"></ul>
        </div>
    </body>
</html>"#;

const HISTORY: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>History</title>
        <link rel="stylesheet" href="/css/shell.css">
    </head>
    <body>
        <div class="history-content">
            <h1>History</h1>
            <ul class="history-list"></ul>
        </div>
    </body>
</html>"#;

const BOOKMARKS: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>Bookmarks</title>
        <link rel="stylesheet" href="/css/shell.css">
    </head>
    <body>
        <div class="bookmarks-content">
            <h1>Bookmarks</h1>
            <ul class="bookmark-list"></ul>
        </div>
    </body>
</html>"#;

const SETTINGS: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>Settings</title>
        <link rel="stylesheet" href="/css/shell.css">
    </head>
    <body>
        <div class="settings-content">
            <h1>Settings</h1>
            <form class="settings-form"></form>
        </div>
    </body>
</html>"#;

const ABOUT: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>About Ember Shell</title>
        <link rel="stylesheet" href="/css/shell.css">
    </head>
    <body>
        <div class="about-content">
            <h1>About Ember Shell</h1>
            <p>A tabbed shell that works offline.</p>
        </div>
    </body>
</html>"#;
