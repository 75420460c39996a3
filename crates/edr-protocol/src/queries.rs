//! Query parameter parsing for EDR endpoints.
//!
//! This module turns the raw query-string values of the EDR data queries
//! (`coords`, `bbox`, `datetime`, `z`, `within`, `parameter-name`) into
//! validated values. Geometries are normalised so they can be re-rendered
//! as canonical WKT and bound as a single SQL parameter.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing query parameters.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateParseError {
    /// Invalid WKT format.
    #[error("Invalid WKT format: {0}")]
    InvalidWkt(String),

    /// Invalid coordinate value.
    #[error("Invalid coordinate value: {0}")]
    InvalidCoordinate(String),

    /// Missing required coordinate.
    #[error("Missing required coordinate: {0}")]
    MissingCoordinate(String),

    /// Coordinate out of valid range.
    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),

    /// Datetime that is not ISO 8601.
    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),
}

/// A (longitude, latitude) pair.
pub type Coord = (f64, f64);

/// A validated query geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum QueryGeometry {
    /// A single point.
    Point(f64, f64),
    /// Several points.
    MultiPoint(Vec<Coord>),
    /// Closed rings, exterior first, then holes.
    Polygon(Vec<Vec<Coord>>),
    /// Several polygons, each with its rings.
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    /// A path; Z and M ordinates are dropped during parsing.
    LineString(Vec<Coord>),
    /// Several disjoint paths.
    MultiLineString(Vec<Vec<Coord>>),
    /// An axis-aligned bounding box.
    Bbox(BboxQuery),
}

impl QueryGeometry {
    /// Parse the `coords` value of a position query.
    ///
    /// Accepts formats:
    /// - `POINT(lon lat)`
    /// - `POINT (lon lat)` (with space)
    /// - `MULTIPOINT((lon1 lat1),(lon2 lat2))`
    /// - Just `lon,lat`
    pub fn parse_position(coords: &str) -> Result<Self, CoordinateParseError> {
        let coords = coords.trim();
        let upper = coords.to_uppercase();

        if upper.starts_with("MULTIPOINT") {
            let points = split_groups(outer_body(coords)?)?
                .iter()
                .map(|group| parse_pair(group))
                .collect::<Result<Vec<_>, _>>()?;
            if points.is_empty() {
                return Err(CoordinateParseError::InvalidWkt(
                    "MULTIPOINT must contain at least one point".to_string(),
                ));
            }
            return Ok(QueryGeometry::MultiPoint(points));
        }

        if upper.starts_with("POINT") {
            let (lon, lat) = parse_pair(outer_body(coords)?)?;
            return Ok(QueryGeometry::Point(lon, lat));
        }

        if coords.contains(',') {
            let parts: Vec<&str> = coords.split(',').collect();
            if parts.len() != 2 {
                return Err(CoordinateParseError::InvalidWkt(format!(
                    "Expected lon,lat format, got {} parts",
                    parts.len()
                )));
            }
            let lon = parse_number(parts[0])?;
            let lat = parse_number(parts[1])?;
            validate_coordinates(lon, lat)?;
            return Ok(QueryGeometry::Point(lon, lat));
        }

        Err(CoordinateParseError::InvalidWkt(
            "Expected POINT(lon lat), MULTIPOINT((lon1 lat1),(lon2 lat2)), or lon,lat format"
                .to_string(),
        ))
    }

    /// Parse the `coords` value of an area query.
    ///
    /// Accepts formats:
    /// - `POLYGON((lon1 lat1, lon2 lat2, lon3 lat3, lon1 lat1))`
    /// - `POLYGON((exterior),(hole),...)`
    /// - `MULTIPOLYGON(((ring1)),((ring2)))`
    ///
    /// Interior rings are kept so holes are excluded from the match.
    pub fn parse_area(coords: &str) -> Result<Self, CoordinateParseError> {
        let coords = coords.trim();
        let upper = coords.to_uppercase();

        if upper.starts_with("MULTIPOLYGON") {
            let polygons = split_groups(outer_body(coords)?)?
                .into_iter()
                .map(parse_rings)
                .collect::<Result<Vec<_>, _>>()?;
            if polygons.is_empty() {
                return Err(CoordinateParseError::InvalidWkt(
                    "MULTIPOLYGON must contain at least one polygon".to_string(),
                ));
            }
            return Ok(QueryGeometry::MultiPolygon(polygons));
        }

        if upper.starts_with("POLYGON") {
            return Ok(QueryGeometry::Polygon(parse_rings(outer_body(coords)?)?));
        }

        Err(CoordinateParseError::InvalidWkt(
            "Expected POLYGON or MULTIPOLYGON format".to_string(),
        ))
    }

    /// Parse the `coords` value of a trajectory or corridor query.
    ///
    /// Supports `LINESTRING`, `LINESTRINGZ`, `LINESTRINGM`, `LINESTRINGZM`
    /// and their `MULTI` variants. Every part of a multi line needs at least
    /// two waypoints and parts stay separate.
    pub fn parse_line(coords: &str) -> Result<Self, CoordinateParseError> {
        let coords = coords.trim();
        let upper = coords.to_uppercase();

        let is_multi = upper.starts_with("MULTI");
        let type_name = if is_multi { &upper[5..] } else { upper.as_str() };
        let expected = if type_name.starts_with("LINESTRINGZM") || type_name.starts_with("LINESTRING ZM") {
            4
        } else if type_name.starts_with("LINESTRINGZ")
            || type_name.starts_with("LINESTRINGM")
            || type_name.starts_with("LINESTRING Z")
            || type_name.starts_with("LINESTRING M")
        {
            3
        } else if type_name.starts_with("LINESTRING") {
            2
        } else {
            return Err(CoordinateParseError::InvalidWkt(
                "Expected LINESTRING, LINESTRINGZ, LINESTRINGM, LINESTRINGZM, or MULTI* variant"
                    .to_string(),
            ));
        };

        let body = outer_body(coords)?;
        if !is_multi {
            return Ok(QueryGeometry::LineString(parse_path(body, expected)?));
        }

        let parts = split_groups(body)?
            .into_iter()
            .map(|part| parse_path(part, expected))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return Err(CoordinateParseError::InvalidWkt(
                "MULTILINESTRING must contain at least one line".to_string(),
            ));
        }
        Ok(QueryGeometry::MultiLineString(parts))
    }

    /// Parse any supported WKT geometry by its type keyword.
    pub fn parse_wkt(wkt: &str) -> Result<Self, CoordinateParseError> {
        let upper = wkt.trim().to_uppercase();
        if upper.starts_with("POINT") || upper.starts_with("MULTIPOINT") {
            Self::parse_position(wkt)
        } else if upper.starts_with("POLYGON") || upper.starts_with("MULTIPOLYGON") {
            Self::parse_area(wkt)
        } else if upper.starts_with("LINESTRING") || upper.starts_with("MULTILINESTRING") {
            Self::parse_line(wkt)
        } else {
            Err(CoordinateParseError::InvalidWkt(format!(
                "Unsupported geometry: {}",
                wkt.trim()
            )))
        }
    }

    /// Render the geometry as canonical 2D WKT.
    pub fn to_wkt(&self) -> String {
        match self {
            QueryGeometry::Point(lon, lat) => format!("POINT({} {})", lon, lat),
            QueryGeometry::MultiPoint(points) => {
                let inner: Vec<String> = points
                    .iter()
                    .map(|(lon, lat)| format!("({} {})", lon, lat))
                    .collect();
                format!("MULTIPOINT({})", inner.join(","))
            }
            QueryGeometry::Polygon(rings) => format!("POLYGON({})", rings_wkt(rings)),
            QueryGeometry::MultiPolygon(polygons) => {
                let inner: Vec<String> = polygons
                    .iter()
                    .map(|rings| format!("({})", rings_wkt(rings)))
                    .collect();
                format!("MULTIPOLYGON({})", inner.join(","))
            }
            QueryGeometry::LineString(points) => format!("LINESTRING({})", ring_wkt(points)),
            QueryGeometry::MultiLineString(parts) => {
                format!("MULTILINESTRING({})", rings_wkt(parts))
            }
            QueryGeometry::Bbox(bbox) => bbox.to_polygon().to_wkt(),
        }
    }

    /// The first point of a point geometry.
    pub fn as_point(&self) -> Option<Coord> {
        match self {
            QueryGeometry::Point(lon, lat) => Some((*lon, *lat)),
            _ => None,
        }
    }
}

fn ring_wkt(points: &[Coord]) -> String {
    points
        .iter()
        .map(|(lon, lat)| format!("{} {}", lon, lat))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(ring),(ring)` for polygon rings or multi line parts.
fn rings_wkt(rings: &[Vec<Coord>]) -> String {
    rings
        .iter()
        .map(|ring| format!("({})", ring_wkt(ring)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse `(exterior),(hole),...` into closed rings.
fn parse_rings(body: &str) -> Result<Vec<Vec<Coord>>, CoordinateParseError> {
    let rings = split_groups(body)?
        .into_iter()
        .map(parse_ring)
        .collect::<Result<Vec<_>, _>>()?;
    if rings.is_empty() {
        return Err(CoordinateParseError::InvalidWkt(
            "POLYGON must contain a ring".to_string(),
        ));
    }
    Ok(rings)
}

/// Parse one line body, checking the ordinate count of every waypoint.
fn parse_path(body: &str, expected: usize) -> Result<Vec<Coord>, CoordinateParseError> {
    let mut waypoints = Vec::new();
    for waypoint in body.split(',') {
        let parts: Vec<&str> = waypoint.split_whitespace().collect();
        if parts.len() != expected {
            return Err(CoordinateParseError::InvalidWkt(format!(
                "Expected {} ordinates per waypoint, got {} in '{}'",
                expected,
                parts.len(),
                waypoint.trim()
            )));
        }
        // Trailing ordinates still have to be numbers.
        for extra in &parts[2..] {
            parse_number(extra)?;
        }
        let lon = parse_number(parts[0])?;
        let lat = parse_number(parts[1])?;
        validate_coordinates(lon, lat)?;
        waypoints.push((lon, lat));
    }

    if waypoints.len() < 2 {
        return Err(CoordinateParseError::InvalidWkt(
            "LINESTRING must contain at least two waypoints".to_string(),
        ));
    }
    Ok(waypoints)
}

/// Return the text between the first `(` and the last `)`.
fn outer_body(wkt: &str) -> Result<&str, CoordinateParseError> {
    let start = wkt.find('(').ok_or_else(|| {
        CoordinateParseError::InvalidWkt("Missing opening parenthesis".to_string())
    })?;
    let end = wkt.rfind(')').ok_or_else(|| {
        CoordinateParseError::InvalidWkt("Missing closing parenthesis".to_string())
    })?;

    if end <= start {
        return Err(CoordinateParseError::InvalidWkt(
            "Invalid parenthesis order".to_string(),
        ));
    }

    Ok(wkt[start + 1..end].trim())
}

/// Split `(a),(b),(c)` into the bodies `a`, `b`, `c`, keeping nested
/// parentheses of each body intact.
fn split_groups(inner: &str) -> Result<Vec<&str>, CoordinateParseError> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (idx, ch) in inner.char_indices() {
        match ch {
            '(' => {
                if depth == 0 {
                    start = idx + 1;
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err(CoordinateParseError::InvalidWkt(
                        "Unbalanced parentheses".to_string(),
                    ));
                }
                depth -= 1;
                if depth == 0 {
                    groups.push(inner[start..idx].trim());
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(CoordinateParseError::InvalidWkt(
            "Unbalanced parentheses".to_string(),
        ));
    }

    // Bare `x y, x y` (MULTIPOINT without inner parentheses) is a single group
    // per comma separated entry.
    if groups.is_empty() && !inner.is_empty() {
        return Ok(inner.split(',').map(str::trim).collect());
    }

    Ok(groups)
}

fn parse_number(value: &str) -> Result<f64, CoordinateParseError> {
    let value = value.trim();
    let parsed: f64 = value
        .parse()
        .map_err(|_| CoordinateParseError::InvalidCoordinate(value.to_string()))?;
    if !parsed.is_finite() {
        return Err(CoordinateParseError::InvalidCoordinate(format!(
            "{} is not a finite number",
            value
        )));
    }
    Ok(parsed)
}

/// Parse `lon lat`.
fn parse_pair(pair: &str) -> Result<Coord, CoordinateParseError> {
    let parts: Vec<&str> = pair.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(CoordinateParseError::InvalidWkt(format!(
            "Expected 2 coordinates, got {}",
            parts.len()
        )));
    }

    let lon = parse_number(parts[0])?;
    let lat = parse_number(parts[1])?;
    validate_coordinates(lon, lat)?;

    Ok((lon, lat))
}

fn parse_ring(ring: &str) -> Result<Vec<Coord>, CoordinateParseError> {
    let points = ring
        .split(',')
        .map(parse_pair)
        .collect::<Result<Vec<_>, _>>()?;

    if points.len() < 4 {
        return Err(CoordinateParseError::InvalidWkt(
            "Polygon must have at least 4 points (including closing point)".to_string(),
        ));
    }

    if points.first() != points.last() {
        return Err(CoordinateParseError::InvalidWkt(
            "Polygon ring must be closed".to_string(),
        ));
    }

    Ok(points)
}

/// Check that a lon/lat pair is finite and within WGS84 bounds.
pub fn validate_coordinates(lon: f64, lat: f64) -> Result<(), CoordinateParseError> {
    if !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinateParseError::OutOfRange(format!(
            "Longitude {} is out of range [-180, 180]",
            lon
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(CoordinateParseError::OutOfRange(format!(
            "Latitude {} is out of range [-90, 90]",
            lat
        )));
    }

    Ok(())
}

/// Parse the `parameter-name` query parameter.
pub fn parse_parameter_names(param: &str) -> Vec<String> {
    param
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A parsed `datetime` parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DateTimeQuery {
    /// A specific instant.
    Instant(NaiveDateTime),

    /// Multiple specific instants (comma-separated list).
    List(Vec<NaiveDateTime>),

    /// An interval; `None` marks an open bound (`..`).
    Interval {
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    },
}

impl DateTimeQuery {
    /// Parse one ISO 8601 instant.
    ///
    /// Offsets are normalised to UTC; a bare date means midnight.
    pub fn parse_instant(dt: &str) -> Result<NaiveDateTime, CoordinateParseError> {
        let dt = dt.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(dt) {
            return Ok(parsed.with_timezone(&Utc).naive_utc());
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(dt, format) {
                return Ok(parsed);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(dt, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight);
            }
        }

        Err(CoordinateParseError::InvalidDatetime(format!(
            "'{}' is not ISO 8601 (e.g., 2024-12-29T12:00:00Z or 2024-12-29)",
            dt
        )))
    }

    /// Parse a datetime parameter.
    ///
    /// Accepts formats:
    /// - Instant: `2024-12-29T12:00:00Z`
    /// - List: `2024-12-29T12:00:00Z,2024-12-29T13:00:00Z`
    /// - Interval: `2024-12-29T00:00:00Z/2024-12-29T23:59:59Z`
    /// - Open start: `../2024-12-29T23:59:59Z`
    /// - Open end: `2024-12-29T00:00:00Z/..`
    pub fn parse(datetime: &str) -> Result<Self, CoordinateParseError> {
        let datetime = datetime.trim();

        if datetime.is_empty() {
            return Err(CoordinateParseError::InvalidDatetime(
                "empty datetime".to_string(),
            ));
        }

        if datetime.contains('/') {
            let parts: Vec<&str> = datetime.split('/').collect();
            if parts.len() != 2 || datetime.contains(',') {
                return Err(CoordinateParseError::InvalidDatetime(format!(
                    "'{}' is not a start/end interval",
                    datetime
                )));
            }

            let bound = |part: &str| -> Result<Option<NaiveDateTime>, CoordinateParseError> {
                let part = part.trim();
                if part == ".." || part.is_empty() {
                    Ok(None)
                } else {
                    Self::parse_instant(part).map(Some)
                }
            };

            let start = bound(parts[0])?;
            let end = bound(parts[1])?;

            if let (Some(s), Some(e)) = (start, end) {
                if s > e {
                    return Err(CoordinateParseError::InvalidDatetime(format!(
                        "interval start {} is after end {}",
                        s, e
                    )));
                }
            }

            return Ok(DateTimeQuery::Interval { start, end });
        }

        if datetime.contains(',') {
            let mut times = datetime
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Self::parse_instant)
                .collect::<Result<Vec<_>, _>>()?;

            return match times.len() {
                0 => Err(CoordinateParseError::InvalidDatetime(
                    "empty datetime list".to_string(),
                )),
                1 => Ok(DateTimeQuery::Instant(times.remove(0))),
                _ => Ok(DateTimeQuery::List(times)),
            };
        }

        Ok(DateTimeQuery::Instant(Self::parse_instant(datetime)?))
    }

    /// True for `../..`, which filters nothing.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, DateTimeQuery::Interval { start: None, end: None })
    }

    /// Check if this is an interval query (with potential open ends).
    pub fn is_interval(&self) -> bool {
        matches!(self, DateTimeQuery::Interval { .. })
    }
}

/// Vertical level selection (`z` parameter).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerticalQuery {
    /// Explicit levels.
    Levels(Vec<f64>),
    /// Inclusive range between two levels, in either order.
    Range { from: f64, to: f64 },
}

impl VerticalQuery {
    /// Parse vertical level parameter.
    ///
    /// Accepts formats:
    /// - Single value: `850`
    /// - Multiple values: `850,700,500`
    /// - Range: `1000/250` (from/to)
    /// - Recurring intervals: `R5/1000/100` (R{count}/{start}/{increment})
    pub fn parse(z_param: &str) -> Result<Self, CoordinateParseError> {
        let z_param = z_param.trim();

        if let Some(recurring) = z_param
            .strip_prefix('R')
            .or_else(|| z_param.strip_prefix('r'))
        {
            let parts: Vec<&str> = recurring.split('/').collect();
            if parts.len() != 3 {
                return Err(CoordinateParseError::InvalidWkt(
                    "Invalid recurring z format, expected R{count}/{start}/{increment}"
                        .to_string(),
                ));
            }

            let count: usize = parts[0]
                .trim()
                .parse()
                .map_err(|_| CoordinateParseError::InvalidCoordinate(parts[0].to_string()))?;
            let start = parse_number(parts[1])?;
            let increment = parse_number(parts[2])?;

            if count == 0 || count > 100 {
                return Err(CoordinateParseError::OutOfRange(
                    "Recurring count must be between 1 and 100".to_string(),
                ));
            }

            let levels = (0..count)
                .map(|i| start - (i as f64 * increment))
                .collect();
            return Ok(VerticalQuery::Levels(levels));
        }

        if z_param.contains('/') {
            let parts: Vec<&str> = z_param.split('/').collect();
            if parts.len() != 2 {
                return Err(CoordinateParseError::InvalidWkt(
                    "Invalid z range format, expected from/to".to_string(),
                ));
            }
            return Ok(VerticalQuery::Range {
                from: parse_number(parts[0])?,
                to: parse_number(parts[1])?,
            });
        }

        let levels = z_param
            .split(',')
            .map(parse_number)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VerticalQuery::Levels(levels))
    }
}

/// Distance units supported for radius and corridor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    /// Kilometers
    Kilometers,
    /// Miles
    Miles,
    /// Meters
    Meters,
    /// Nautical miles
    NauticalMiles,
}

impl DistanceUnit {
    /// Parse a distance unit string.
    ///
    /// Accepts: "km", "kilometers", "mi", "miles", "m", "meters", "nm", "nautical_miles"
    pub fn parse(unit: &str) -> Result<Self, CoordinateParseError> {
        match unit.to_lowercase().trim() {
            "km" | "kilometers" | "kilometre" | "kilometres" => Ok(DistanceUnit::Kilometers),
            "mi" | "miles" | "mile" => Ok(DistanceUnit::Miles),
            "m" | "meters" | "metre" | "metres" => Ok(DistanceUnit::Meters),
            "nm" | "nautical_miles" | "nautical miles" | "nauticalmiles" => {
                Ok(DistanceUnit::NauticalMiles)
            }
            _ => Err(CoordinateParseError::InvalidWkt(format!(
                "Unknown distance unit '{}'. Supported units: km, mi, m, nm",
                unit
            ))),
        }
    }

    /// Convert a value in this unit to meters.
    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            DistanceUnit::Kilometers => value * 1000.0,
            DistanceUnit::Miles => value * 1609.344,
            DistanceUnit::Meters => value,
            DistanceUnit::NauticalMiles => value * 1852.0,
        }
    }

    /// Get the string representation of this unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::Meters => "m",
            DistanceUnit::NauticalMiles => "nm",
        }
    }
}

/// Parse the `within` parameter (radius or corridor width).
///
/// Accepts numeric string like "100" or "50.5"
pub fn parse_within(within: &str) -> Result<f64, CoordinateParseError> {
    let value = parse_number(within).map_err(|_| {
        CoordinateParseError::InvalidCoordinate(format!(
            "Invalid distance '{}'. Expected a number.",
            within.trim()
        ))
    })?;

    if value <= 0.0 {
        return Err(CoordinateParseError::OutOfRange(
            "Distance must be a positive number".to_string(),
        ));
    }

    Ok(value)
}

/// Bounding box query parameters (for cube and locations queries).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BboxQuery {
    /// Western longitude.
    pub west: f64,

    /// Southern latitude.
    pub south: f64,

    /// Eastern longitude.
    pub east: f64,

    /// Northern latitude.
    pub north: f64,
}

impl BboxQuery {
    /// Parse a bbox parameter.
    ///
    /// Format: `west,south,east,north`. A six-value 3D bbox keeps only the
    /// horizontal part.
    pub fn parse(bbox: &str) -> Result<Self, CoordinateParseError> {
        let values = bbox
            .split(',')
            .map(parse_number)
            .collect::<Result<Vec<_>, _>>()?;

        let (west, south, east, north) = match values.as_slice() {
            [w, s, e, n] => (*w, *s, *e, *n),
            [w, s, _, e, n, _] => (*w, *s, *e, *n),
            _ => {
                return Err(CoordinateParseError::InvalidWkt(format!(
                    "Expected 4 values for bbox, got {}",
                    values.len()
                )))
            }
        };

        validate_coordinates(west, south)?;
        validate_coordinates(east, north)?;

        if south > north {
            return Err(CoordinateParseError::OutOfRange(
                "South must be less than or equal to north".to_string(),
            ));
        }

        if west > east {
            return Err(CoordinateParseError::OutOfRange(
                "West must be less than or equal to east".to_string(),
            ));
        }

        Ok(BboxQuery {
            west,
            south,
            east,
            north,
        })
    }

    /// The bbox as a closed polygon ring.
    pub fn to_polygon(&self) -> QueryGeometry {
        QueryGeometry::Polygon(vec![vec![
            (self.west, self.south),
            (self.east, self.south),
            (self.east, self.north),
            (self.west, self.north),
            (self.west, self.south),
        ]])
    }

    /// Whether the point lies inside or on the edge of the bbox.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}
