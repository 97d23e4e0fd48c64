use std::path::PathBuf;

/// `<home>/.cache/<app_name>`, the default cache root (§6). `None` if the home directory cannot
/// be resolved; callers then run with caching disabled.
pub fn default_cache_dir(app_name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cache").join(app_name))
}

/// `<home>/.<app_name>`, where driver logs land when caching is disabled (§6).
pub fn default_log_dir(app_name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{}", app_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_is_under_dot_cache() {
        if let Some(dir) = default_cache_dir("boxcache") {
            assert!(dir.ends_with("boxcache"));
            assert!(dir.to_string_lossy().contains(".cache"));
        }
    }
}
