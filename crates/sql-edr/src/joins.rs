//! Join resolution for fields that live on auxiliary tables.
//!
//! A field path such as `airports.airport_locations.geometry_wkt` names a
//! column (`geometry_wkt`) on the table reached by joining `airports` from
//! the primary table and then `airport_locations` from `airports`. Each
//! table path is an entry of `external_tables`.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{ProviderError, ProviderResult};
use crate::mapping::ExternalTable;

/// Alias of the primary table in every generated statement.
pub const PRIMARY_ALIAS: &str = "obs";

/// Longest identifier PostgreSQL keeps without truncating.
pub const MAX_ALIAS_LEN: usize = 63;

/// Deterministic alias for a joined table path.
pub fn alias_for(path: &str) -> String {
    format!("j_{}", path.replace('.', "__"))
}

/// One rendered `JOIN ... ON ...` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    /// Unquoted alias of the joined table.
    pub alias: String,
    pub sql: String,
}

/// A field resolved against the join graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Path as written in the configuration.
    pub path: String,
    /// Qualified, quoted column reference.
    pub column: String,
    /// Joins needed to reach the column, parents first.
    pub joins: Vec<JoinClause>,
}

#[derive(Debug, Clone)]
struct JoinNode {
    clause: JoinClause,
}

/// The validated tree of joinable tables, keyed by table path.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    primary_table: String,
    primary_alias: String,
    dialect: &'static dyn Dialect,
    nodes: BTreeMap<String, JoinNode>,
}

impl JoinGraph {
    /// Validate `external_tables` and render a join clause per path.
    ///
    /// Every path must have its parent path configured, must not revisit a
    /// table already on the path, and must not contain empty segments.
    /// Aliases must be unique and fit in [`MAX_ALIAS_LEN`] bytes.
    pub fn build(
        primary_table: &str,
        external_tables: &BTreeMap<String, ExternalTable>,
        dialect: &'static dyn Dialect,
    ) -> ProviderResult<Self> {
        let mut nodes = BTreeMap::new();
        let mut aliases: HashMap<String, &str> = HashMap::new();

        for (path, table) in external_tables {
            let segments = split_path(path, "external table path")?;

            for (i, segment) in segments.iter().enumerate() {
                if *segment == primary_table || segments[..i].contains(segment) {
                    return Err(ProviderError::Configuration(format!(
                        "Join path '{}' revisits table '{}'",
                        path, segment
                    )));
                }
            }

            let parent = segments[..segments.len() - 1].join(".");
            let parent_alias = if parent.is_empty() {
                PRIMARY_ALIAS.to_string()
            } else if external_tables.contains_key(&parent) {
                alias_for(&parent)
            } else {
                return Err(ProviderError::Configuration(format!(
                    "Join path '{}' has no entry for its parent '{}'",
                    path, parent
                )));
            };

            if table.foreign.trim().is_empty() || table.remote.trim().is_empty() {
                return Err(ProviderError::Configuration(format!(
                    "Join path '{}' needs both foreign and remote keys",
                    path
                )));
            }

            let alias = alias_for(path);
            if alias.len() > MAX_ALIAS_LEN {
                return Err(ProviderError::Configuration(format!(
                    "Join path '{}' gives alias '{}' longer than {} bytes",
                    path, alias, MAX_ALIAS_LEN
                )));
            }
            if let Some(other) = aliases.insert(alias.clone(), path.as_str()) {
                return Err(ProviderError::Configuration(format!(
                    "Join paths '{}' and '{}' share the alias '{}'",
                    other, path, alias
                )));
            }

            let table_name = segments[segments.len() - 1];
            let sql = format!(
                "JOIN {} AS {} ON {}.{} = {}.{}",
                dialect.quote_ident(table_name),
                dialect.quote_ident(&alias),
                dialect.quote_ident(&parent_alias),
                dialect.quote_ident(table.foreign.trim()),
                dialect.quote_ident(&alias),
                dialect.quote_ident(table.remote.trim()),
            );

            debug!(path = %path, alias = %alias, "Registered join");
            nodes.insert(
                path.clone(),
                JoinNode {
                    clause: JoinClause { alias, sql },
                },
            );
        }

        Ok(Self {
            primary_table: primary_table.to_string(),
            primary_alias: dialect.quote_ident(PRIMARY_ALIAS),
            dialect,
            nodes,
        })
    }

    /// Resolve a bare or dotted field path to a column and its joins.
    pub fn resolve(&self, field_path: &str) -> ProviderResult<ResolvedField> {
        let segments = split_path(field_path, "field path")?;
        let (column, tables) = match segments.split_last() {
            Some((column, tables)) => (*column, tables),
            None => {
                return Err(ProviderError::Configuration(format!(
                    "Empty field path '{}'",
                    field_path
                )))
            }
        };

        // `table.column` on the primary table needs no join.
        if tables.is_empty() || (tables.len() == 1 && tables[0] == self.primary_table) {
            return Ok(ResolvedField {
                path: field_path.to_string(),
                column: format!("{}.{}", self.primary_alias, self.dialect.quote_ident(column)),
                joins: Vec::new(),
            });
        }

        let mut joins = Vec::with_capacity(tables.len());
        for depth in 1..=tables.len() {
            let prefix = tables[..depth].join(".");
            let node = self.nodes.get(&prefix).ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "Unknown join target '{}' for field '{}'",
                    prefix, field_path
                ))
            })?;
            joins.push(node.clause.clone());
        }

        let alias = alias_for(&tables.join("."));
        Ok(ResolvedField {
            path: field_path.to_string(),
            column: format!(
                "{}.{}",
                self.dialect.quote_ident(&alias),
                self.dialect.quote_ident(column)
            ),
            joins,
        })
    }

    /// Number of configured join paths.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn split_path<'a>(path: &'a str, what: &str) -> ProviderResult<Vec<&'a str>> {
    let segments: Vec<&str> = path.trim().split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ProviderError::Configuration(format!(
            "Invalid {} '{}': empty segment",
            what, path
        )));
    }
    Ok(segments)
}

/// Join clauses merged from several fields, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct JoinSet {
    clauses: Vec<JoinClause>,
}

impl JoinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the joins a field needs, skipping aliases already present.
    pub fn add(&mut self, field: &ResolvedField) {
        for clause in &field.joins {
            if !self.clauses.iter().any(|c| c.alias == clause.alias) {
                self.clauses.push(clause.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render the clauses in insertion order, each preceded by a space.
    pub fn to_sql(&self) -> String {
        self.clauses
            .iter()
            .map(|c| format!(" {}", c.sql))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect};

    fn ext(foreign: &str, remote: &str) -> ExternalTable {
        ExternalTable {
            foreign: foreign.to_string(),
            remote: remote.to_string(),
        }
    }

    fn airport_tables() -> BTreeMap<String, ExternalTable> {
        let mut tables = BTreeMap::new();
        tables.insert("airports".to_string(), ext("airport_code", "code"));
        tables.insert(
            "airports.airport_locations".to_string(),
            ext("code", "airport_code"),
        );
        tables.insert("airport_parameters".to_string(), ext("parameter_id", "id"));
        tables
    }

    fn graph() -> JoinGraph {
        JoinGraph::build("landing_observations", &airport_tables(), &PostgresDialect).unwrap()
    }

    #[test]
    fn test_bare_field_needs_no_join() {
        let field = graph().resolve("value").unwrap();
        assert_eq!(field.column, "\"obs\".\"value\"");
        assert!(field.joins.is_empty());
    }

    #[test]
    fn test_primary_table_qualified_field() {
        let field = graph().resolve("landing_observations.value").unwrap();
        assert_eq!(field.column, "\"obs\".\"value\"");
        assert!(field.joins.is_empty());
    }

    #[test]
    fn test_two_level_join() {
        let field = graph()
            .resolve("airports.airport_locations.geometry_wkt")
            .unwrap();

        assert_eq!(
            field.column,
            "\"j_airports__airport_locations\".\"geometry_wkt\""
        );
        assert_eq!(field.joins.len(), 2);
        assert_eq!(
            field.joins[0].sql,
            "JOIN \"airports\" AS \"j_airports\" ON \"obs\".\"airport_code\" = \"j_airports\".\"code\""
        );
        assert_eq!(
            field.joins[1].sql,
            "JOIN \"airport_locations\" AS \"j_airports__airport_locations\" ON \"j_airports\".\"code\" = \"j_airports__airport_locations\".\"airport_code\""
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let graph = graph();
        let first = graph.resolve("airports.airport_locations.geometry_wkt").unwrap();
        let second = graph.resolve("airports.airport_locations.geometry_wkt").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_prefix_yields_identical_clauses() {
        let graph = graph();
        let name = graph.resolve("airports.name").unwrap();
        let geom = graph.resolve("airports.airport_locations.geometry_wkt").unwrap();
        assert_eq!(name.joins[0], geom.joins[0]);

        let mut set = JoinSet::new();
        set.add(&name);
        set.add(&geom);
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_sql().matches("JOIN \"airports\"").count(), 1);
    }

    #[test]
    fn test_unknown_join_target() {
        let err = graph().resolve("runways.length").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Unknown join target 'runways'"));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert("airports.airport_locations".to_string(), ext("code", "airport_code"));

        let err = JoinGraph::build("landing_observations", &tables, &PostgresDialect).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("parent 'airports'"));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tables = airport_tables();
        tables.insert("airports.airports".to_string(), ext("code", "code"));
        let err = JoinGraph::build("landing_observations", &tables, &PostgresDialect).unwrap_err();
        assert!(err.to_string().contains("revisits"));

        let mut tables = airport_tables();
        tables.insert(
            "airports.landing_observations".to_string(),
            ext("code", "airport_code"),
        );
        assert!(JoinGraph::build("landing_observations", &tables, &PostgresDialect).is_err());
    }

    #[test]
    fn test_empty_segment_rejected() {
        assert!(graph().resolve("airports..code").is_err());

        let mut tables = BTreeMap::new();
        tables.insert("airports.".to_string(), ext("a", "b"));
        assert!(JoinGraph::build("landing_observations", &tables, &PostgresDialect).is_err());
    }

    #[test]
    fn test_missing_keys_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert("airports".to_string(), ext("", "code"));
        let err = JoinGraph::build("landing_observations", &tables, &PostgresDialect).unwrap_err();
        assert!(err.to_string().contains("foreign and remote"));
    }

    #[test]
    fn test_mysql_quoting() {
        let graph =
            JoinGraph::build("landing_observations", &airport_tables(), &MySqlDialect).unwrap();
        let field = graph.resolve("airport_parameters.unit").unwrap();
        assert_eq!(field.column, "`j_airport_parameters`.`unit`");
        assert_eq!(
            field.joins[0].sql,
            "JOIN `airport_parameters` AS `j_airport_parameters` ON `obs`.`parameter_id` = `j_airport_parameters`.`id`"
        );
    }

    #[test]
    fn test_alias_collision_rejected() {
        let mut tables = airport_tables();
        tables.insert(
            "airports__airport_locations".to_string(),
            ext("airport_code", "airport_code"),
        );

        let err = JoinGraph::build("landing_observations", &tables, &PostgresDialect).unwrap_err();
        assert!(err.is_configuration());
        assert!(err
            .to_string()
            .contains("share the alias 'j_airports__airport_locations'"));
    }

    #[test]
    fn test_overlong_alias_rejected() {
        let long = "a".repeat(MAX_ALIAS_LEN - 1);
        let mut tables = BTreeMap::new();
        tables.insert(long.clone(), ext("code", "code"));

        let err = JoinGraph::build("landing_observations", &tables, &PostgresDialect).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("longer than 63 bytes"));

        let mut tables = BTreeMap::new();
        tables.insert("a".repeat(MAX_ALIAS_LEN - 2), ext("code", "code"));
        assert!(JoinGraph::build("landing_observations", &tables, &PostgresDialect).is_ok());
    }
}
