//! Shell configuration

use std::path::PathBuf;

use url::Url;

use crate::history::DEFAULT_HISTORY_LIMIT;

/// Origin the shell's own assets are served from
pub const DEFAULT_ORIGIN: &str = "https://ember.local/";

/// Assets that must be fetchable at controller activation time
pub const DEFAULT_STATIC_MANIFEST: [&str; 5] = [
    "/",
    "/index.html",
    "/css/shell.css",
    "/js/shell.js",
    "/manifest.json",
];

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Directory backing the persistent store
    pub data_dir: PathBuf,
    /// Shell origin; responses from other origins are never cached
    pub origin: Url,
    /// Static-asset manifest seeded into the static cache generation
    pub static_manifest: Vec<String>,
    /// Location loaded into fresh tabs
    pub new_tab_location: String,
    /// Entries the history page shows
    pub history_limit: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("ember-data"),
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid URL"),
            static_manifest: DEFAULT_STATIC_MANIFEST.iter().map(|s| s.to_string()).collect(),
            new_tab_location: ember_session::NEW_TAB_LOCATION.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_coherent() {
        let config = ShellConfig::default();
        assert_eq!(config.origin.as_str(), DEFAULT_ORIGIN);
        assert!(config.static_manifest.contains(&"/index.html".to_string()));
        assert_eq!(config.new_tab_location, "ember:newtab");
    }
}
