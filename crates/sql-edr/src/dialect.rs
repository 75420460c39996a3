//! Backend-specific SQL rendering.
//!
//! The query builder only talks to [`Dialect`]; every function name, cast
//! and placeholder style that differs between databases lives here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProviderError, ProviderResult};

/// Meters per degree of latitude, used to express radii in lon/lat units.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// SQL fragments that differ between backends.
///
/// Expression arguments are already-rendered SQL (a qualified column or a
/// placeholder). Implementations never see request values.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Backend name used in logs.
    fn name(&self) -> &'static str;

    /// Quote an identifier.
    fn quote_ident(&self, ident: &str) -> String;

    /// Placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Turn a WKT expression into a native geometry.
    fn geometry_from_wkt(&self, wkt: &str, srid: i32) -> String;

    /// Render a native geometry as WKT text.
    fn geometry_as_text(&self, geometry: &str) -> String;

    /// Boolean intersection test between two geometries.
    fn intersects(&self, left: &str, right: &str) -> String;

    /// Boolean test that `geometry` lies within `radius` of `center`.
    fn distance_within(&self, geometry: &str, center: &str, radius: &str) -> String;

    /// Convert a distance in meters into the unit `distance_within` compares against.
    ///
    /// PostGIS compares planar degrees on lon/lat geometry, so the radius is
    /// `meters / METERS_PER_DEGREE`. That is exact north-south only; east-west
    /// the circle shrinks by `cos(latitude)`, about 22% at 38.9°N. MySQL
    /// compares spherical meters and needs no conversion.
    fn radius_value(&self, meters: f64) -> f64;

    /// Cast an expression to a double precision float.
    fn cast_float(&self, expr: &str) -> String;

    /// Cast an expression to a timestamp without time zone.
    fn cast_timestamp(&self, expr: &str) -> String;
}

/// PostgreSQL with PostGIS.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn geometry_from_wkt(&self, wkt: &str, srid: i32) -> String {
        format!("ST_GeomFromText({}, {})", wkt, srid)
    }

    fn geometry_as_text(&self, geometry: &str) -> String {
        format!("ST_AsText({})", geometry)
    }

    fn intersects(&self, left: &str, right: &str) -> String {
        format!("ST_Intersects({}, {})", left, right)
    }

    fn distance_within(&self, geometry: &str, center: &str, radius: &str) -> String {
        format!("ST_DWithin({}, {}, {})", geometry, center, radius)
    }

    fn radius_value(&self, meters: f64) -> f64 {
        // planar degrees, not a geodesic distance
        meters / METERS_PER_DEGREE
    }

    fn cast_float(&self, expr: &str) -> String {
        format!("CAST({} AS DOUBLE PRECISION)", expr)
    }

    fn cast_timestamp(&self, expr: &str) -> String {
        format!("CAST({} AS TIMESTAMP)", expr)
    }
}

/// MySQL 8 spatial extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn geometry_from_wkt(&self, wkt: &str, srid: i32) -> String {
        // MySQL defaults to lat/lon axis order for geographic SRIDs.
        format!("ST_GeomFromText({}, {}, 'axis-order=long-lat')", wkt, srid)
    }

    fn geometry_as_text(&self, geometry: &str) -> String {
        format!("ST_AsText({}, 'axis-order=long-lat')", geometry)
    }

    fn intersects(&self, left: &str, right: &str) -> String {
        format!("ST_Intersects({}, {})", left, right)
    }

    fn distance_within(&self, geometry: &str, center: &str, radius: &str) -> String {
        format!("ST_Distance_Sphere({}, {}) <= {}", geometry, center, radius)
    }

    fn radius_value(&self, meters: f64) -> f64 {
        meters
    }

    fn cast_float(&self, expr: &str) -> String {
        format!("CAST({} AS DOUBLE)", expr)
    }

    fn cast_timestamp(&self, expr: &str) -> String {
        format!("CAST({} AS DATETIME)", expr)
    }
}

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    MySql,
}

impl Backend {
    /// Select a backend from the provider `name` key.
    pub fn from_name(name: &str) -> ProviderResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" | "postgis" | "pg" => Ok(Backend::Postgres),
            "mysql" | "mariadb" => Ok(Backend::MySql),
            other => Err(ProviderError::Configuration(format!(
                "Unsupported backend '{}'. Expected one of: postgresql, mysql",
                other
            ))),
        }
    }

    /// The dialect used to render SQL for this backend.
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            Backend::Postgres => &PostgresDialect,
            Backend::MySql => &MySqlDialect,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name())
    }
}
