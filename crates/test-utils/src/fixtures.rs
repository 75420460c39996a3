//! The airport landing fixture.
//!
//! Landing counts per airport live in `landing_observations`. Airport
//! geometry is two joins away (`airports` then `airport_locations`) and
//! parameter names and units come from `airport_parameters`.

use chrono::{NaiveDate, NaiveDateTime};
use sql_edr::builder::{
    COL_GEOMETRY, COL_LOCATION_ID, COL_PARAMETER_ID, COL_PARAMETER_NAME, COL_PARAMETER_UNIT,
    COL_ROW_ID, COL_TIME, COL_TIME_MAX, COL_TIME_MIN, COL_VALUE,
};
use sql_edr::{ProviderConfig, Row};

/// Fixture airports.
pub mod airports {
    /// Reagan National.
    pub const DCA: (&str, f64, f64) = ("DCA", -77.0377, 38.8512);
    /// Dulles.
    pub const IAD: (&str, f64, f64) = ("IAD", -77.4558, 38.9531);
    /// Baltimore/Washington.
    pub const BWI: (&str, f64, f64) = ("BWI", -76.6684, 39.1774);

    pub const ALL: [(&str, f64, f64); 3] = [BWI, DCA, IAD];

    /// Polygon enclosing all three airports.
    pub const DC_AREA_POLYGON: &str = "POLYGON((-78 38.5, -76 38.5, -76 39.5, -78 39.5, -78 38.5))";

    /// Polygon around DCA only.
    pub const DCA_POLYGON: &str =
        "POLYGON((-77.1 38.8, -77.0 38.8, -77.0 38.9, -77.1 38.9, -77.1 38.8))";
}

/// Landing counts per airport, as `(month, day, value)`.
pub mod landings {
    pub const PARAMETER_ID: &str = "landings";
    pub const PARAMETER_NAME: &str = "Daily landings";
    pub const PARAMETER_UNIT: &str = "{count}";

    pub const DCA: [(u32, u32, f64); 5] = [
        (4, 30, 89.0),
        (5, 1, 90.0),
        (5, 2, 85.0),
        (5, 3, 87.0),
        (5, 4, 88.0),
    ];
    pub const IAD: [(u32, u32, f64); 3] = [(5, 1, 200.0), (5, 2, 50.0), (5, 3, 303.0)];
    pub const BWI: [(u32, u32, f64); 3] = [(5, 1, 41.0), (5, 2, 40.0), (5, 3, 40.0)];

    /// Observations for an airport code.
    pub fn for_airport(code: &str) -> &'static [(u32, u32, f64)] {
        match code {
            "DCA" => &DCA,
            "IAD" => &IAD,
            "BWI" => &BWI,
            _ => &[],
        }
    }
}

/// Midnight of a 2025 fixture day.
pub fn fixture_day(month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Tables for the fixture. PostGIS is only needed for the spatial functions;
/// geometry is stored as WKT text.
pub const SCHEMA_SQL: &str = r#"
DROP TABLE IF EXISTS landing_observations;
DROP TABLE IF EXISTS airport_parameters;
DROP TABLE IF EXISTS airport_locations;
DROP TABLE IF EXISTS airports;
CREATE EXTENSION IF NOT EXISTS postgis;
CREATE TABLE airports (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE airport_locations (
    airport_code TEXT PRIMARY KEY,
    geometry_wkt TEXT NOT NULL
);
CREATE TABLE airport_parameters (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit TEXT
);
CREATE TABLE landing_observations (
    id TEXT PRIMARY KEY,
    airport_code TEXT NOT NULL,
    observed_on TIMESTAMP NOT NULL,
    parameter_id TEXT NOT NULL,
    value DOUBLE PRECISION
)
"#;

/// Seed statements matching [`airports`] and [`landings`].
pub fn seed_sql() -> Vec<String> {
    let mut statements = vec![
        "INSERT INTO airports (code, name) VALUES \
         ('DCA', 'Ronald Reagan Washington National'), \
         ('IAD', 'Washington Dulles International'), \
         ('BWI', 'Baltimore/Washington International')"
            .to_string(),
        format!(
            "INSERT INTO airport_parameters (id, name, unit) VALUES ('{}', '{}', '{}')",
            landings::PARAMETER_ID,
            landings::PARAMETER_NAME,
            landings::PARAMETER_UNIT
        ),
    ];

    for (code, lon, lat) in airports::ALL {
        statements.push(format!(
            "INSERT INTO airport_locations (airport_code, geometry_wkt) VALUES ('{}', 'POINT({} {})')",
            code, lon, lat
        ));
        for (month, day, value) in landings::for_airport(code) {
            statements.push(format!(
                "INSERT INTO landing_observations (id, airport_code, observed_on, parameter_id, value) \
                 VALUES ('{code}-{month:02}{day:02}', '{code}', '2025-{month:02}-{day:02}', '{}', {value})",
                landings::PARAMETER_ID,
            ));
        }
    }

    statements
}

/// Provider YAML for the fixture, with geometry reached through two joins.
pub fn provider_yaml(backend: &str) -> String {
    format!(
        r#"
name: {backend}
data:
  host: localhost
  dbname: edr
  user: edr
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
"#
    )
}

/// Parsed fixture provider configuration.
pub fn provider_config(backend: &str) -> ProviderConfig {
    ProviderConfig::from_yaml(&provider_yaml(backend))
        .unwrap_or_else(|e| panic!("fixture config must parse: {}", e))
}

/// Same fixture, but geometry joined directly from `airport_locations`.
pub fn single_join_config(backend: &str) -> ProviderConfig {
    let mut config = provider_config(backend);
    config.geom_field = "airport_locations.geometry_wkt".to_string();
    config.external_tables.insert(
        "airport_locations".to_string(),
        sql_edr::ExternalTable {
            foreign: "airport_code".to_string(),
            remote: "airport_code".to_string(),
        },
    );
    config
}

/// Result rows as the database returns them for the given airports, in
/// location, parameter, time order.
pub fn result_rows(codes: &[&str]) -> Vec<Row> {
    let mut codes: Vec<&str> = codes.to_vec();
    codes.sort_unstable();

    let mut rows = Vec::new();
    for code in codes {
        let Some((_, lon, lat)) = airports::ALL.into_iter().find(|(c, _, _)| *c == code) else {
            continue;
        };
        for (month, day, value) in landings::for_airport(code) {
            rows.push(
                Row::new()
                    .with(COL_ROW_ID, format!("{}-{:02}{:02}", code, month, day))
                    .with(COL_LOCATION_ID, code)
                    .with(COL_GEOMETRY, format!("POINT({} {})", lon, lat))
                    .with(COL_TIME, fixture_day(*month, *day))
                    .with(COL_PARAMETER_ID, landings::PARAMETER_ID)
                    .with(COL_PARAMETER_NAME, landings::PARAMETER_NAME)
                    .with(COL_PARAMETER_UNIT, landings::PARAMETER_UNIT)
                    .with(COL_VALUE, *value),
            );
        }
    }
    rows
}

/// Locations listing rows for the given airports, one per airport with the
/// first and last landing day, sorted by location.
pub fn listing_rows(codes: &[&str]) -> Vec<Row> {
    let mut codes: Vec<&str> = codes.to_vec();
    codes.sort_unstable();

    codes
        .into_iter()
        .filter_map(|code| {
            let (_, lon, lat) = airports::ALL.into_iter().find(|(c, _, _)| *c == code)?;
            let days = landings::for_airport(code);
            let (first_month, first_day, _) = days.first()?;
            let (last_month, last_day, _) = days.last()?;
            Some(
                Row::new()
                    .with(COL_LOCATION_ID, code)
                    .with(COL_GEOMETRY, format!("POINT({} {})", lon, lat))
                    .with(COL_PARAMETER_ID, landings::PARAMETER_ID)
                    .with(COL_PARAMETER_NAME, landings::PARAMETER_NAME)
                    .with(COL_PARAMETER_UNIT, landings::PARAMETER_UNIT)
                    .with(COL_TIME_MIN, fixture_day(*first_month, *first_day))
                    .with(COL_TIME_MAX, fixture_day(*last_month, *last_day)),
            )
        })
        .collect()
}
