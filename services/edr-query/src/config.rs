//! Provider configuration loading for the CLI.

use anyhow::{Context, Result};
use sql_edr::{FieldMapping, ProviderConfig};
use std::path::Path;

/// Load a provider YAML file, applying a password override when given.
///
/// The mapping is validated here so configuration mistakes are reported
/// before any connection is attempted.
pub fn load_provider_config(path: &Path, password: Option<&str>) -> Result<ProviderConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read provider config: {:?}", path))?;

    let mut config = ProviderConfig::from_yaml(&content)
        .with_context(|| format!("Failed to parse provider config: {:?}", path))?;

    if let Some(password) = password.filter(|p| !p.is_empty()) {
        config.data.password = Some(password.to_string());
    }

    FieldMapping::from_config(&config)
        .with_context(|| format!("Invalid provider mapping in {:?}", path))?;

    tracing::info!(
        backend = %config.name,
        table = %config.table,
        joins = config.external_tables.len(),
        "Loaded provider config from {:?}",
        path
    );
    Ok(config)
}

/// The effective configuration as YAML. The password is never written.
pub fn render_config(config: &ProviderConfig) -> Result<String> {
    serde_yaml::to_string(config).context("Failed to render provider config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
name: postgresql
data:
  host: db.internal
  dbname: edr
  user: reader
  password: from-file
table: landing_observations
id_field: id
geom_field: airports.airport_locations.geometry_wkt
time_field: observed_on
edr_fields:
  location_field: airport_code
external_tables:
  airports:
    foreign: airport_code
    remote: code
  airports.airport_locations:
    foreign: code
    remote: airport_code
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = write_config(YAML);
        let config = load_provider_config(file.path(), None).unwrap();

        assert_eq!(config.table, "landing_observations");
        assert_eq!(config.data.host, "db.internal");
        assert_eq!(config.data.password.as_deref(), Some("from-file"));
        assert_eq!(config.external_tables.len(), 2);
    }

    #[test]
    fn test_password_override() {
        let file = write_config(YAML);
        let config = load_provider_config(file.path(), Some("from-env")).unwrap();
        assert_eq!(config.data.password.as_deref(), Some("from-env"));

        let config = load_provider_config(file.path(), Some("")).unwrap();
        assert_eq!(config.data.password.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_provider_config(&dir.path().join("absent.yaml"), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read provider config"));
    }

    #[test]
    fn test_unknown_backend_rejected_on_load() {
        let file = write_config(&YAML.replace("name: postgresql", "name: oracle"));
        let err = load_provider_config(file.path(), None).unwrap_err();
        assert!(format!("{:#}", err).contains("Unsupported backend"));
    }

    #[test]
    fn test_missing_join_rejected_on_load() {
        let yaml = YAML.replace(
            "  airports:\n    foreign: airport_code\n    remote: code\n",
            "",
        );
        let file = write_config(&yaml);
        assert!(load_provider_config(file.path(), None).is_err());
    }

    #[test]
    fn test_render_omits_password() {
        let file = write_config(YAML);
        let config = load_provider_config(file.path(), None).unwrap();
        let rendered = render_config(&config).unwrap();

        assert!(rendered.contains("landing_observations"));
        assert!(!rendered.contains("from-file"));
    }
}
