//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SiteConfig;
use std::path::Path;

/// Loads and validates a `kiln.toml` configuration from a site directory.
///
/// Reads `<site_dir>/kiln.toml`, parses it, and validates scope keys and
/// extension mappings. A missing file yields the default configuration.
pub fn load_config(site_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = site_dir.join("kiln.toml");
    if !config_path.is_file() {
        return Ok(SiteConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates scope keys, extension mappings, and numeric bounds.
fn validate_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.compilation.max_batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "compilation.max_batch_size must be at least 1".to_string(),
        ));
    }

    validate_extensions(config.compilation.providers.keys())?;

    for (scope, over) in &config.scopes {
        if !scope.starts_with('/') || scope == "/" {
            return Err(ConfigError::InvalidScope(scope.clone()));
        }
        if over.max_batch_size == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "scope '{scope}': max_batch_size must be at least 1"
            )));
        }
        validate_extensions(over.providers.keys())?;
    }

    Ok(())
}

fn validate_extensions<'a>(keys: impl Iterator<Item = &'a String>) -> Result<(), ConfigError> {
    for ext in keys {
        if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
            return Err(ConfigError::InvalidExtension(ext.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert!(config.compilation.batch);
        assert_eq!(config.compilation.max_batch_size, 1000);
        assert!(config.scopes.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[compilation]
batch = true
max_batch_size = 50
case_insensitive = true
referenced_modules = ["core.runtime", "core.web"]
ignore_paths = ["/vendor/legacy.page"]
ignore_file = "/batch-ignore.txt"

[compilation.providers]
page = "markup"
frag = "markup"
svc = "directive"

[scopes."/admin"]
batch = false

[scopes."/admin".providers]
rpt = "markup"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.compilation.max_batch_size, 50);
        assert!(config.compilation.case_insensitive);
        assert_eq!(
            config.compilation.providers.get("page").map(String::as_str),
            Some("markup")
        );
        assert_eq!(
            config.compilation.referenced_modules,
            vec!["core.runtime", "core.web"]
        );
        assert_eq!(
            config.compilation.ignore_file.as_deref(),
            Some("/batch-ignore.txt")
        );
        let admin = &config.scopes["/admin"];
        assert_eq!(admin.batch, Some(false));
        assert_eq!(admin.providers.get("rpt").map(String::as_str), Some("markup"));
    }

    #[test]
    fn rejects_unrooted_scope() {
        let toml = r#"
[scopes."admin"]
batch = false
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScope(_)));
    }

    #[test]
    fn rejects_root_scope() {
        let toml = r#"
[scopes."/"]
batch = false
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScope(_)));
    }

    #[test]
    fn rejects_dotted_extension() {
        let toml = r#"
[compilation.providers]
".page" = "markup"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExtension(_)));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let toml = r#"
[compilation]
max_batch_size = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = load_config_from_str("compilation = {").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(config.compilation.batch);
    }

    #[test]
    fn loads_from_site_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kiln.toml"),
            "[compilation]\nmax_batch_size = 7\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.compilation.max_batch_size, 7);
    }
}
