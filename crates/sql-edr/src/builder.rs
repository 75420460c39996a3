//! SQL generation for validated EDR requests.
//!
//! Every statement selects the same projection so the result mapper can read
//! rows by column name:
//!
//! | column           | source                       |
//! |------------------|------------------------------|
//! | `row_id`         | `id_field`                   |
//! | `location_id`    | `edr_fields.location_field`  |
//! | `geometry`       | `geom_field` as WKT          |
//! | `time`           | `time_field` as timestamp    |
//! | `parameter_id`   | `edr_fields.parameter_id`    |
//! | `parameter_name` | `edr_fields.parameter_name`  |
//! | `parameter_unit` | `edr_fields.parameter_unit`  |
//! | `value`          | `edr_fields.result_field`    |
//!
//! Request values only ever appear as bound parameters.

use chrono::NaiveDateTime;
use tracing::debug;

use edr_protocol::{DateTimeQuery, VerticalQuery};

use crate::dialect::Dialect;
use crate::executor::{SqlValue, Statement};
use crate::joins::{JoinSet, PRIMARY_ALIAS};
use crate::mapping::FieldMapping;
use crate::request::{ParsedRequest, SpatialFilter};

pub const COL_ROW_ID: &str = "row_id";
pub const COL_LOCATION_ID: &str = "location_id";
pub const COL_GEOMETRY: &str = "geometry";
pub const COL_TIME: &str = "time";
pub const COL_PARAMETER_ID: &str = "parameter_id";
pub const COL_PARAMETER_NAME: &str = "parameter_name";
pub const COL_PARAMETER_UNIT: &str = "parameter_unit";
pub const COL_VALUE: &str = "value";
pub const COL_TIME_MIN: &str = "time_min";
pub const COL_TIME_MAX: &str = "time_max";

/// Alias of the derived table that picks the listed locations.
const PICKED_ALIAS: &str = "picked";

/// Positional parameters, rendered with the dialect's placeholder style.
struct Params {
    dialect: &'static dyn Dialect,
    values: Vec<SqlValue>,
}

impl Params {
    fn new(dialect: &'static dyn Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder.
    fn push(&mut self, value: impl Into<SqlValue>) -> String {
        self.values.push(value.into());
        self.dialect.placeholder(self.values.len())
    }

    fn push_time(&mut self, time: NaiveDateTime) -> String {
        let placeholder = self.push(time);
        self.dialect.cast_timestamp(&placeholder)
    }

    /// Bind each value and return `(p1, p2, ...)`.
    fn push_list<I, V>(&mut self, values: I) -> String
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let placeholders: Vec<String> = values.into_iter().map(|v| self.push(v)).collect();
        format!("({})", placeholders.join(", "))
    }
}

/// Builds statements for one field mapping.
pub struct QueryBuilder<'a> {
    mapping: &'a FieldMapping,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(mapping: &'a FieldMapping) -> Self {
        Self { mapping }
    }

    fn dialect(&self) -> &'static dyn Dialect {
        self.mapping.dialect()
    }

    fn from_clause(&self, joins: &JoinSet) -> String {
        let dialect = self.dialect();
        format!(
            "FROM {} AS {}{}",
            dialect.quote_ident(self.mapping.table()),
            dialect.quote_ident(PRIMARY_ALIAS),
            joins.to_sql()
        )
    }

    fn alias(&self, name: &str) -> String {
        self.dialect().quote_ident(name)
    }

    /// Joins every projected field needs, plus the z field when a z
    /// filter applies to it.
    fn request_joins<'r>(
        &self,
        request: &'r ParsedRequest,
    ) -> (JoinSet, Option<(&'r VerticalQuery, &'a str)>) {
        let fields = self.mapping.fields();
        let mut joins = JoinSet::new();
        for field in [
            &fields.id,
            &fields.location,
            &fields.geometry,
            &fields.time,
            &fields.parameter_id,
            &fields.parameter_name,
            &fields.parameter_unit,
            &fields.result,
        ] {
            joins.add(field);
        }

        let z_field = match (&request.z, &fields.z) {
            (Some(z), Some(field)) => {
                joins.add(field);
                Some((z, field.column.as_str()))
            }
            (Some(_), None) => {
                debug!("Ignoring z filter, no z_field is mapped");
                None
            }
            _ => None,
        };
        (joins, z_field)
    }

    /// WHERE conditions in spatial, temporal, parameter, z order.
    fn conditions(
        &self,
        request: &ParsedRequest,
        z_field: Option<(&VerticalQuery, &str)>,
        params: &mut Params,
    ) -> Vec<String> {
        let fields = self.mapping.fields();
        let mut conditions = Vec::new();

        if let Some(spatial) = self.spatial_condition(&request.spatial, params) {
            conditions.push(spatial);
        }
        if let Some(datetime) = &request.datetime {
            conditions.push(temporal_condition(datetime, &fields.time.column, params));
        }
        if !request.parameter_names.is_empty() {
            let ids = params.push_list(request.parameter_names.iter().map(String::as_str));
            let names = params.push_list(request.parameter_names.iter().map(String::as_str));
            conditions.push(format!(
                "({} IN {} OR {} IN {})",
                fields.parameter_id.column, ids, fields.parameter_name.column, names
            ));
        }
        if let Some((z, column)) = z_field {
            conditions.push(vertical_condition(z, column, params));
        }
        conditions
    }

    /// Build the data statement for a validated request.
    pub fn build(&self, request: &ParsedRequest) -> Statement {
        let dialect = self.dialect();
        let fields = self.mapping.fields();
        let mut params = Params::new(dialect);
        let (joins, z_field) = self.request_joins(request);

        let projection = [
            (fields.id.column.clone(), COL_ROW_ID),
            (fields.location.column.clone(), COL_LOCATION_ID),
            (self.mapping.geometry_text_expr(), COL_GEOMETRY),
            (dialect.cast_timestamp(&fields.time.column), COL_TIME),
            (fields.parameter_id.column.clone(), COL_PARAMETER_ID),
            (fields.parameter_name.column.clone(), COL_PARAMETER_NAME),
            (fields.parameter_unit.column.clone(), COL_PARAMETER_UNIT),
            (dialect.cast_float(&fields.result.column), COL_VALUE),
        ]
        .iter()
        .map(|(expr, name)| format!("{} AS {}", expr, self.alias(name)))
        .collect::<Vec<_>>()
        .join(", ");

        let conditions = self.conditions(request, z_field, &mut params);

        let mut sql = format!("SELECT {} {}", projection, self.from_clause(&joins));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY {} ASC, {} ASC, {} ASC",
            fields.location.column, fields.parameter_id.column, fields.time.column
        ));

        let limit = self.mapping.effective_limit(request.limit);
        let limit = params.push(limit as i64);
        sql.push_str(&format!(" LIMIT {}", limit));

        let statement = Statement {
            sql,
            params: params.values,
        };

        debug!(
            backend = dialect.name(),
            kind = %request.kind,
            joins = joins.len(),
            params = statement.params.len(),
            sql = %statement.sql,
            "Built EDR query"
        );

        statement
    }

    /// Build the locations listing for a validated request.
    ///
    /// One row per location and parameter with the first and last matching
    /// time. The limit counts distinct locations: a derived table picks the
    /// first `limit` location ids under the same filters, so a location with
    /// many observations never crowds others out of the listing.
    pub fn locations_listing(&self, request: &ParsedRequest) -> Statement {
        let dialect = self.dialect();
        let fields = self.mapping.fields();
        let mut params = Params::new(dialect);
        let (joins, z_field) = self.request_joins(request);

        let location = fields.location.column.as_str();
        let geometry = self.mapping.geometry_text_expr();
        let time = dialect.cast_timestamp(&fields.time.column);
        let grouped = [
            location,
            geometry.as_str(),
            fields.parameter_id.column.as_str(),
            fields.parameter_name.column.as_str(),
            fields.parameter_unit.column.as_str(),
        ];

        let projection = format!(
            "{} AS {}, {} AS {}, {} AS {}, {} AS {}, {} AS {}, MIN({}) AS {}, MAX({}) AS {}",
            grouped[0],
            self.alias(COL_LOCATION_ID),
            grouped[1],
            self.alias(COL_GEOMETRY),
            grouped[2],
            self.alias(COL_PARAMETER_ID),
            grouped[3],
            self.alias(COL_PARAMETER_NAME),
            grouped[4],
            self.alias(COL_PARAMETER_UNIT),
            time,
            self.alias(COL_TIME_MIN),
            time,
            self.alias(COL_TIME_MAX),
        );

        let mut conditions = self.conditions(request, z_field, &mut params);

        let mut picked = format!(
            "SELECT DISTINCT {} AS {} {}",
            location,
            self.alias(COL_LOCATION_ID),
            self.from_clause(&joins)
        );
        let inner = self.conditions(request, z_field, &mut params);
        if !inner.is_empty() {
            picked.push_str(" WHERE ");
            picked.push_str(&inner.join(" AND "));
        }
        let limit = params.push(self.mapping.effective_limit(request.limit) as i64);
        picked.push_str(&format!(" ORDER BY {} ASC LIMIT {}", location, limit));

        // MySQL refuses LIMIT directly inside IN, so the pick is wrapped in a
        // derived table.
        conditions.push(format!(
            "{} IN (SELECT {} FROM ({}) AS {})",
            location,
            self.alias(COL_LOCATION_ID),
            picked,
            self.alias(PICKED_ALIAS)
        ));

        let sql = format!(
            "SELECT {} {} WHERE {} GROUP BY {} ORDER BY {} ASC, {} ASC",
            projection,
            self.from_clause(&joins),
            conditions.join(" AND "),
            grouped.join(", "),
            location,
            fields.parameter_id.column
        );

        let statement = Statement {
            sql,
            params: params.values,
        };

        debug!(
            backend = dialect.name(),
            params = statement.params.len(),
            sql = %statement.sql,
            "Built locations listing"
        );

        statement
    }

    fn spatial_condition(&self, filter: &SpatialFilter, params: &mut Params) -> Option<String> {
        let dialect = self.dialect();
        let srid = self.mapping.srid();

        match filter {
            SpatialFilter::None => None,
            SpatialFilter::Intersects(geometry) => {
                let wkt = params.push(geometry.to_wkt());
                Some(dialect.intersects(
                    &self.mapping.geometry_expr(),
                    &dialect.geometry_from_wkt(&wkt, srid),
                ))
            }
            SpatialFilter::DWithin { geometry, meters } => {
                let wkt = params.push(geometry.to_wkt());
                let center = dialect.geometry_from_wkt(&wkt, srid);
                let radius = params.push(dialect.radius_value(*meters));
                Some(dialect.distance_within(&self.mapping.geometry_expr(), &center, &radius))
            }
            SpatialFilter::LocationIds(ids) => {
                let list = params.push_list(ids.iter().map(String::as_str));
                Some(format!(
                    "{} IN {}",
                    self.mapping.fields().location.column,
                    list
                ))
            }
        }
    }

    /// Distinct parameter id, name and unit across the mapped table.
    pub fn parameter_catalog(&self) -> Statement {
        let fields = self.mapping.fields();
        let mut joins = JoinSet::new();
        joins.add(&fields.parameter_id);
        joins.add(&fields.parameter_name);
        joins.add(&fields.parameter_unit);

        let sql = format!(
            "SELECT DISTINCT {} AS {}, {} AS {}, {} AS {} {} ORDER BY {} ASC",
            fields.parameter_id.column,
            self.alias(COL_PARAMETER_ID),
            fields.parameter_name.column,
            self.alias(COL_PARAMETER_NAME),
            fields.parameter_unit.column,
            self.alias(COL_PARAMETER_UNIT),
            self.from_clause(&joins),
            self.alias(COL_PARAMETER_ID),
        );

        debug!(sql = %sql, "Built parameter catalog query");
        Statement {
            sql,
            params: Vec::new(),
        }
    }
}

fn temporal_condition(datetime: &DateTimeQuery, column: &str, params: &mut Params) -> String {
    match datetime {
        DateTimeQuery::Instant(t) => format!("{} = {}", column, params.push_time(*t)),
        DateTimeQuery::List(times) => {
            let list: Vec<String> = times.iter().map(|t| params.push_time(*t)).collect();
            format!("{} IN ({})", column, list.join(", "))
        }
        DateTimeQuery::Interval {
            start: Some(start),
            end: Some(end),
        } => {
            let start = params.push_time(*start);
            let end = params.push_time(*end);
            format!("{} BETWEEN {} AND {}", column, start, end)
        }
        DateTimeQuery::Interval {
            start: Some(start),
            end: None,
        } => format!("{} >= {}", column, params.push_time(*start)),
        DateTimeQuery::Interval {
            start: None,
            end: Some(end),
        } => format!("{} <= {}", column, params.push_time(*end)),
        // Validation drops `../..`; keep the statement well formed regardless.
        DateTimeQuery::Interval {
            start: None,
            end: None,
        } => "1 = 1".to_string(),
    }
}

fn vertical_condition(z: &VerticalQuery, column: &str, params: &mut Params) -> String {
    match z {
        VerticalQuery::Levels(levels) => {
            format!("{} IN {}", column, params.push_list(levels.iter().copied()))
        }
        VerticalQuery::Range { from, to } => {
            let low = params.push(from.min(*to));
            let high = params.push(from.max(*to));
            format!("{} BETWEEN {} AND {}", column, low, high)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ProviderConfig;
    use crate::request::QueryRequest;
    use chrono::NaiveDate;

    fn config(backend: &str) -> ProviderConfig {
        ProviderConfig::from_yaml(&format!(
            r#"
name: {backend}
table: landing_observations
id_field: id
geom_field: airports.airport_locations.geometry_wkt
time_field: observed_on
geometry_encoding: wkt
edr_fields:
  location_field: airport_code
  parameter_id: parameter_id
  parameter_name: airport_parameters.name
  parameter_unit: airport_parameters.unit
  z_field: level
external_tables:
  airports: {{foreign: airport_code, remote: code}}
  airports.airport_locations: {{foreign: code, remote: airport_code}}
  airport_parameters: {{foreign: parameter_id, remote: id}}
"#
        ))
        .unwrap()
    }

    fn mapping(backend: &str) -> FieldMapping {
        FieldMapping::from_config(&config(backend)).unwrap()
    }

    fn build(mapping: &FieldMapping, request: QueryRequest) -> Statement {
        QueryBuilder::new(mapping).build(&request.validate().unwrap())
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_locations_query_shape() {
        let mapping = mapping("postgresql");
        let stmt = build(&mapping, QueryRequest::locations(["DCA"]));

        assert!(stmt.sql.starts_with(
            "SELECT \"obs\".\"id\" AS \"row_id\", \"obs\".\"airport_code\" AS \"location_id\""
        ));
        assert!(stmt.sql.contains(
            "FROM \"landing_observations\" AS \"obs\" JOIN \"airports\" AS \"j_airports\""
        ));
        assert!(stmt.sql.contains("WHERE \"obs\".\"airport_code\" IN ($1)"));
        assert!(stmt.sql.ends_with(
            "ORDER BY \"obs\".\"airport_code\" ASC, \"obs\".\"parameter_id\" ASC, \"obs\".\"observed_on\" ASC LIMIT $2"
        ));
        assert_eq!(
            stmt.params,
            vec![SqlValue::Text("DCA".to_string()), SqlValue::Integer(100)]
        );
    }

    #[test]
    fn test_shared_joins_appear_once() {
        let stmt = build(&mapping("postgresql"), QueryRequest::locations(["DCA"]));
        assert_eq!(stmt.sql.matches("JOIN \"airports\" ").count(), 1);
        assert_eq!(stmt.sql.matches("JOIN \"airport_parameters\" ").count(), 1);
        assert_eq!(stmt.sql.matches("JOIN \"airport_locations\" ").count(), 1);
    }

    #[test]
    fn test_interval_is_inclusive_between() {
        let stmt = build(
            &mapping("postgresql"),
            QueryRequest::locations(["DCA"]).with_datetime("2025-05-01/2025-05-03"),
        );

        assert!(stmt.sql.contains(
            "\"obs\".\"observed_on\" BETWEEN CAST($2 AS TIMESTAMP) AND CAST($3 AS TIMESTAMP)"
        ));
        assert_eq!(stmt.params[1], SqlValue::Timestamp(midnight(2025, 5, 1)));
        assert_eq!(stmt.params[2], SqlValue::Timestamp(midnight(2025, 5, 3)));
    }

    #[test]
    fn test_open_intervals_and_instants() {
        let mapping = mapping("postgresql");

        let stmt = build(&mapping, QueryRequest::instances().with_datetime("2025-05-01/.."));
        assert!(stmt.sql.contains("\"obs\".\"observed_on\" >= CAST($1 AS TIMESTAMP)"));

        let stmt = build(&mapping, QueryRequest::instances().with_datetime("../2025-05-01"));
        assert!(stmt.sql.contains("\"obs\".\"observed_on\" <= CAST($1 AS TIMESTAMP)"));

        let stmt = build(&mapping, QueryRequest::instances().with_datetime("2025-05-01"));
        assert!(stmt.sql.contains("\"obs\".\"observed_on\" = CAST($1 AS TIMESTAMP)"));

        let stmt = build(
            &mapping,
            QueryRequest::instances().with_datetime("2025-05-01,2025-05-02"),
        );
        assert!(stmt.sql.contains(
            "\"obs\".\"observed_on\" IN (CAST($1 AS TIMESTAMP), CAST($2 AS TIMESTAMP))"
        ));
    }

    #[test]
    fn test_area_query_binds_wkt() {
        let stmt = build(
            &mapping("postgresql"),
            QueryRequest::area("POLYGON((-78 38, -76 38, -76 40, -78 40, -78 38))"),
        );

        assert!(stmt.sql.contains(
            "ST_Intersects(ST_GeomFromText(\"j_airports__airport_locations\".\"geometry_wkt\", 4326), ST_GeomFromText($1, 4326))"
        ));
        assert_eq!(
            stmt.params[0],
            SqlValue::Text("POLYGON((-78 38, -76 38, -76 40, -78 40, -78 38))".to_string())
        );
    }

    #[test]
    fn test_radius_query_postgres_degrees() {
        let stmt = build(
            &mapping("postgresql"),
            QueryRequest::radius("POINT(-77 38.9)", "111.32", "km"),
        );

        assert!(stmt.sql.contains("ST_DWithin("));
        match stmt.params[1] {
            SqlValue::Float(radius) => assert!((radius - 1.0).abs() < 1e-9),
            ref other => panic!("expected float radius, got {:?}", other),
        }
    }

    #[test]
    fn test_radius_query_mysql_meters() {
        let stmt = build(
            &mapping("mysql"),
            QueryRequest::radius("POINT(-77 38.9)", "10", "km"),
        );

        assert!(stmt.sql.contains("ST_Distance_Sphere("));
        assert!(stmt.sql.contains("<= ?"));
        assert_eq!(stmt.params[1], SqlValue::Float(10_000.0));
        assert!(!stmt.sql.contains('$'));
        assert_eq!(stmt.sql.matches('?').count(), stmt.params.len());
    }

    #[test]
    fn test_parameter_filter_matches_id_or_name() {
        let stmt = build(
            &mapping("postgresql"),
            QueryRequest::locations(["DCA"]).with_parameter_names("landings,Landings"),
        );

        assert!(stmt.sql.contains(
            "(\"obs\".\"parameter_id\" IN ($2, $3) OR \"j_airport_parameters\".\"name\" IN ($4, $5))"
        ));
        assert_eq!(stmt.params.len(), 6);
    }

    #[test]
    fn test_injection_text_is_only_bound() {
        let hostile = "DCA'; DROP TABLE airports; --";
        let stmt = build(
            &mapping("postgresql"),
            QueryRequest::locations([hostile]).with_parameter_names("x') OR 1=1 --"),
        );

        assert!(!stmt.sql.contains("DROP TABLE"));
        assert!(!stmt.sql.contains("1=1"));
        assert_eq!(stmt.params[0], SqlValue::Text(hostile.to_string()));
    }

    #[test]
    fn test_z_filter() {
        let mapping = mapping("postgresql");

        let stmt = build(&mapping, QueryRequest::instances().with_z("850,700"));
        assert!(stmt.sql.contains("\"obs\".\"level\" IN ($1, $2)"));

        let stmt = build(&mapping, QueryRequest::instances().with_z("1000/250"));
        assert!(stmt.sql.contains("\"obs\".\"level\" BETWEEN $1 AND $2"));
        assert_eq!(stmt.params[0], SqlValue::Float(250.0));
        assert_eq!(stmt.params[1], SqlValue::Float(1000.0));
    }

    #[test]
    fn test_z_ignored_without_z_field() {
        let mut config = config("postgresql");
        config.edr_fields.z_field = None;
        let mapping = FieldMapping::from_config(&config).unwrap();

        let stmt = build(&mapping, QueryRequest::instances().with_z("850"));
        assert!(!stmt.sql.contains("WHERE"));
        assert_eq!(stmt.params, vec![SqlValue::Integer(100)]);
    }

    #[test]
    fn test_limit_clamped() {
        let stmt = build(
            &mapping("postgresql"),
            QueryRequest::instances().with_limit(1_000_000),
        );
        assert_eq!(stmt.params, vec![SqlValue::Integer(10_000)]);
    }

    #[test]
    fn test_placeholders_follow_text_order() {
        let stmt = build(
            &mapping("postgresql"),
            QueryRequest::cube("-78,38,-76,40")
                .with_datetime("2025-05-01/2025-05-03")
                .with_parameter_names("landings")
                .with_z("1")
                .with_limit(3),
        );

        let positions: Vec<usize> = (1..=stmt.params.len())
            .map(|i| stmt.sql.find(&format!("${}", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(stmt.params.last(), Some(&SqlValue::Integer(3)));
    }

    #[test]
    fn test_parameter_catalog() {
        let stmt = QueryBuilder::new(&mapping("postgresql")).parameter_catalog();
        assert!(stmt.sql.starts_with("SELECT DISTINCT \"obs\".\"parameter_id\" AS \"parameter_id\""));
        assert!(stmt.sql.contains("JOIN \"airport_parameters\""));
        assert!(!stmt.sql.contains("JOIN \"airports\""));
        assert!(stmt.sql.ends_with("ORDER BY \"parameter_id\" ASC"));
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_native_geometry_projection() {
        let mut config = config("mysql");
        config.geometry_encoding = crate::mapping::GeometryEncoding::Native;
        let mapping = FieldMapping::from_config(&config).unwrap();

        let stmt = build(&mapping, QueryRequest::position("POINT(-77.04 38.85)"));
        assert!(stmt.sql.contains(
            "ST_AsText(`j_airports__airport_locations`.`geometry_wkt`, 'axis-order=long-lat') AS `geometry`"
        ));
        assert!(stmt.sql.contains(
            "ST_Intersects(`j_airports__airport_locations`.`geometry_wkt`, ST_GeomFromText(?, 4326, 'axis-order=long-lat'))"
        ));
    }

    fn listing(mapping: &FieldMapping, request: QueryRequest) -> Statement {
        QueryBuilder::new(mapping).locations_listing(&request.validate().unwrap())
    }

    #[test]
    fn test_listing_limit_counts_distinct_locations() {
        let stmt = listing(
            &mapping("postgresql"),
            QueryRequest::locations(["DCA", "IAD"]).with_limit(2),
        );

        assert!(stmt.sql.contains(
            "\"obs\".\"airport_code\" IN (SELECT \"location_id\" FROM (SELECT DISTINCT \"obs\".\"airport_code\" AS \"location_id\""
        ));
        assert!(stmt.sql.contains(
            "ORDER BY \"obs\".\"airport_code\" ASC LIMIT $5) AS \"picked\")"
        ));
        assert!(stmt.sql.contains("GROUP BY \"obs\".\"airport_code\""));
        assert!(stmt.sql.contains("MIN(") && stmt.sql.contains("AS \"time_min\""));
        assert!(stmt.sql.ends_with(
            "ORDER BY \"obs\".\"airport_code\" ASC, \"obs\".\"parameter_id\" ASC"
        ));
        assert_eq!(stmt.sql.matches(" LIMIT ").count(), 1);
        assert!(!stmt.sql.contains("\"value\""));
    }

    #[test]
    fn test_listing_filters_bound_twice_in_text_order() {
        let stmt = listing(
            &mapping("postgresql"),
            QueryRequest::locations(["DCA"]).with_limit(7),
        );

        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Text("DCA".to_string()),
                SqlValue::Text("DCA".to_string()),
                SqlValue::Integer(7),
            ]
        );
        let positions: Vec<usize> = (1..=3)
            .map(|i| stmt.sql.find(&format!("${}", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_listing_mysql_wraps_pick_in_derived_table() {
        let stmt = listing(&mapping("mysql"), QueryRequest::instances());

        assert!(stmt.sql.contains("IN (SELECT `location_id` FROM (SELECT DISTINCT"));
        assert!(stmt.sql.contains("LIMIT ?) AS `picked`)"));
        assert_eq!(stmt.params, vec![SqlValue::Integer(100)]);
    }
}
