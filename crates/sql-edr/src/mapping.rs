//! Provider configuration and the validated field mapping built from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::dialect::{Backend, Dialect};
use crate::error::{ProviderError, ProviderResult};
use crate::joins::{JoinGraph, ResolvedField};

/// Provider definition as read from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend selector (`postgresql`, `mysql`).
    pub name: String,

    /// Connection parameters passed through to the database driver.
    #[serde(default)]
    pub data: ConnectionConfig,

    /// Primary observation table.
    pub table: String,

    pub id_field: String,
    pub geom_field: String,
    pub time_field: String,

    #[serde(default)]
    pub edr_fields: EdrFields,

    /// Table path to join keys. Paths extend their parent path with `.`.
    #[serde(default)]
    pub external_tables: BTreeMap<String, ExternalTable>,

    #[serde(default)]
    pub geometry_encoding: GeometryEncoding,

    #[serde(default = "default_srid")]
    pub srid: i32,

    #[serde(default)]
    pub limits: LimitsConfig,
}

impl ProviderConfig {
    /// Parse a provider definition from YAML text.
    pub fn from_yaml(yaml: &str) -> ProviderResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ProviderError::Configuration(format!("Failed to parse provider config: {}", e))
        })
    }

    /// Read and parse a provider definition file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}

/// Database connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub dbname: String,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Schemas to search, in order (PostgreSQL only).
    #[serde(default)]
    pub search_path: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            dbname: String::new(),
            user: String::new(),
            password: None,
            search_path: Vec::new(),
        }
    }
}

/// Columns that realize the EDR concepts beyond id, geometry and time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdrFields {
    #[serde(default = "default_location_field")]
    pub location_field: String,

    #[serde(default = "default_result_field")]
    pub result_field: String,

    #[serde(default = "default_parameter_id")]
    pub parameter_id: String,

    #[serde(default = "default_parameter_name")]
    pub parameter_name: String,

    #[serde(default = "default_parameter_unit")]
    pub parameter_unit: String,

    /// Vertical coordinate, if the schema has one.
    #[serde(default)]
    pub z_field: Option<String>,
}

impl Default for EdrFields {
    fn default() -> Self {
        Self {
            location_field: default_location_field(),
            result_field: default_result_field(),
            parameter_id: default_parameter_id(),
            parameter_name: default_parameter_name(),
            parameter_unit: default_parameter_unit(),
            z_field: None,
        }
    }
}

/// Join keys of an external table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTable {
    /// Column on the parent table.
    pub foreign: String,
    /// Column on this table.
    pub remote: String,
}

/// How the geometry column is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryEncoding {
    /// A spatial column type.
    #[default]
    Native,
    /// WKT text, converted before spatial predicates.
    Wkt,
}

/// Result size limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_location_field() -> String {
    "monitoring_location_id".to_string()
}
fn default_result_field() -> String {
    "value".to_string()
}
fn default_parameter_id() -> String {
    "parameter_id".to_string()
}
fn default_parameter_name() -> String {
    "parameter_name".to_string()
}
fn default_parameter_unit() -> String {
    "parameter_unit".to_string()
}
fn default_srid() -> i32 {
    4326
}
fn default_limit() -> usize {
    100
}
fn default_max_limit() -> usize {
    10_000
}

/// Every mapped field, resolved to a column and its joins.
#[derive(Debug, Clone)]
pub struct MappedFields {
    pub id: ResolvedField,
    pub location: ResolvedField,
    pub geometry: ResolvedField,
    pub time: ResolvedField,
    pub result: ResolvedField,
    pub parameter_id: ResolvedField,
    pub parameter_name: ResolvedField,
    pub parameter_unit: ResolvedField,
    pub z: Option<ResolvedField>,
}

/// Immutable, validated mapping from EDR concepts to SQL.
///
/// Construction resolves every field through the join graph, so a mapping
/// that exists can always render a statement.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    backend: Backend,
    table: String,
    joins: JoinGraph,
    fields: MappedFields,
    encoding: GeometryEncoding,
    srid: i32,
    limits: LimitsConfig,
}

impl FieldMapping {
    /// Validate a provider configuration.
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        let backend = Backend::from_name(&config.name)?;
        let dialect = backend.dialect();

        let table = config.table.trim();
        if table.is_empty() || table.contains('.') {
            return Err(ProviderError::Configuration(format!(
                "Invalid primary table '{}'",
                config.table
            )));
        }
        if config.srid <= 0 {
            return Err(ProviderError::Configuration(format!(
                "Invalid srid {}",
                config.srid
            )));
        }
        let limits = config.limits;
        if limits.default_limit == 0 || limits.max_limit < limits.default_limit {
            return Err(ProviderError::Configuration(format!(
                "Invalid limits: default {} max {}",
                limits.default_limit, limits.max_limit
            )));
        }

        let joins = JoinGraph::build(table, &config.external_tables, dialect)?;
        let edr = &config.edr_fields;
        let fields = MappedFields {
            id: joins.resolve(&config.id_field)?,
            location: joins.resolve(&edr.location_field)?,
            geometry: joins.resolve(&config.geom_field)?,
            time: joins.resolve(&config.time_field)?,
            result: joins.resolve(&edr.result_field)?,
            parameter_id: joins.resolve(&edr.parameter_id)?,
            parameter_name: joins.resolve(&edr.parameter_name)?,
            parameter_unit: joins.resolve(&edr.parameter_unit)?,
            z: edr.z_field.as_deref().map(|z| joins.resolve(z)).transpose()?,
        };

        info!(
            backend = %backend,
            table = %table,
            joins = joins.len(),
            "Field mapping resolved"
        );
        debug!(geometry = %fields.geometry.column, time = %fields.time.column, "Mapped columns");

        Ok(Self {
            backend,
            table: table.to_string(),
            joins,
            fields,
            encoding: config.geometry_encoding,
            srid: config.srid,
            limits,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.backend.dialect()
    }

    /// Primary table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &MappedFields {
        &self.fields
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn geometry_encoding(&self) -> GeometryEncoding {
        self.encoding
    }

    /// Resolve an arbitrary field path against this mapping's joins.
    pub fn resolve(&self, field_path: &str) -> ProviderResult<ResolvedField> {
        self.joins.resolve(field_path)
    }

    /// Row limit for a request, defaulted and clamped to the configured max.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.limits.default_limit)
            .min(self.limits.max_limit)
    }

    /// Geometry column as a native geometry, for spatial predicates.
    pub fn geometry_expr(&self) -> String {
        match self.encoding {
            GeometryEncoding::Native => self.fields.geometry.column.clone(),
            GeometryEncoding::Wkt => self
                .dialect()
                .geometry_from_wkt(&self.fields.geometry.column, self.srid),
        }
    }

    /// Geometry column as WKT text, for projection.
    pub fn geometry_text_expr(&self) -> String {
        match self.encoding {
            GeometryEncoding::Native => self.dialect().geometry_as_text(&self.fields.geometry.column),
            GeometryEncoding::Wkt => self.fields.geometry.column.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AIRPORT_YAML: &str = r#"
name: PostgreSQL
data:
  host: db
  dbname: edr
  user: edr
  search_path: [landings, public]
table: landing_observations
id_field: id
geom_field: airports.airport_locations.geometry_wkt
time_field: observed_on
geometry_encoding: wkt
edr_fields:
  location_field: airport_code
  result_field: value
  parameter_id: parameter_id
  parameter_name: airport_parameters.name
  parameter_unit: airport_parameters.unit
external_tables:
  airports:
    foreign: airport_code
    remote: code
  airports.airport_locations:
    foreign: code
    remote: airport_code
  airport_parameters:
    foreign: parameter_id
    remote: id
"#;

    #[test]
    fn test_config_yaml_parsing() {
        let config = ProviderConfig::from_yaml(AIRPORT_YAML).unwrap();
        assert_eq!(config.table, "landing_observations");
        assert_eq!(config.data.search_path, vec!["landings", "public"]);
        assert_eq!(config.data.port, None);
        assert_eq!(config.external_tables.len(), 3);
        assert_eq!(config.geometry_encoding, GeometryEncoding::Wkt);
        assert_eq!(config.srid, 4326);
        assert_eq!(config.limits.default_limit, 100);
    }

    #[test]
    fn test_edr_field_defaults() {
        let config = ProviderConfig::from_yaml(
            "name: mysql\ntable: obs\nid_field: id\ngeom_field: geom\ntime_field: t\n",
        )
        .unwrap();

        assert_eq!(config.edr_fields.location_field, "monitoring_location_id");
        assert_eq!(config.edr_fields.result_field, "value");
        assert_eq!(config.edr_fields.parameter_unit, "parameter_unit");
        assert!(config.edr_fields.z_field.is_none());
        assert_eq!(config.geometry_encoding, GeometryEncoding::Native);
    }

    #[test]
    fn test_missing_required_key() {
        let err = ProviderConfig::from_yaml("name: mysql\ntable: obs\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_mapping_resolves_all_fields() {
        let mapping = FieldMapping::from_config(&ProviderConfig::from_yaml(AIRPORT_YAML).unwrap())
            .unwrap();
        let fields = mapping.fields();

        assert_eq!(mapping.backend(), Backend::Postgres);
        assert_eq!(fields.location.column, "\"obs\".\"airport_code\"");
        assert_eq!(fields.geometry.joins.len(), 2);
        assert_eq!(fields.parameter_name.joins.len(), 1);
        assert_eq!(
            mapping.geometry_expr(),
            "ST_GeomFromText(\"j_airports__airport_locations\".\"geometry_wkt\", 4326)"
        );
        assert_eq!(
            mapping.geometry_text_expr(),
            "\"j_airports__airport_locations\".\"geometry_wkt\""
        );
    }

    #[test]
    fn test_unknown_backend_fails_fast() {
        let mut config = ProviderConfig::from_yaml(AIRPORT_YAML).unwrap();
        config.name = "sqlserver".to_string();
        assert!(FieldMapping::from_config(&config).unwrap_err().is_configuration());
    }

    #[test]
    fn test_field_on_unknown_table_fails_fast() {
        let mut config = ProviderConfig::from_yaml(AIRPORT_YAML).unwrap();
        config.edr_fields.parameter_unit = "units.symbol".to_string();
        let err = FieldMapping::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown join target 'units'"));
    }

    #[test]
    fn test_effective_limit() {
        let mut config = ProviderConfig::from_yaml(AIRPORT_YAML).unwrap();
        config.limits = LimitsConfig {
            default_limit: 50,
            max_limit: 500,
        };
        let mapping = FieldMapping::from_config(&config).unwrap();

        assert_eq!(mapping.effective_limit(None), 50);
        assert_eq!(mapping.effective_limit(Some(20)), 20);
        assert_eq!(mapping.effective_limit(Some(100_000)), 500);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let mut config = ProviderConfig::from_yaml(AIRPORT_YAML).unwrap();
        config.limits.max_limit = 10;
        assert!(FieldMapping::from_config(&config).is_err());
    }

    #[test]
    fn test_native_geometry_projection() {
        let config = ProviderConfig::from_yaml(
            "name: postgresql\ntable: obs\nid_field: id\ngeom_field: geom\ntime_field: t\n",
        )
        .unwrap();
        let mapping = FieldMapping::from_config(&config).unwrap();
        assert_eq!(mapping.geometry_expr(), "\"obs\".\"geom\"");
        assert_eq!(mapping.geometry_text_expr(), "ST_AsText(\"obs\".\"geom\")");
    }
}
