//! EDR query requests and their validation.
//!
//! A [`QueryRequest`] carries the raw query-string values. [`QueryRequest::validate`]
//! parses them into a [`ParsedRequest`] and is the only place request input
//! can fail, so malformed input never reaches SQL generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use edr_protocol::queries::{parse_parameter_names, parse_within};
use edr_protocol::{BboxQuery, DateTimeQuery, DistanceUnit, QueryGeometry, VerticalQuery};

use crate::error::{ProviderError, ProviderResult};

/// The EDR data query kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Position,
    Radius,
    Area,
    Cube,
    Trajectory,
    Corridor,
    Locations,
    Instances,
}

impl QueryKind {
    pub const ALL: [QueryKind; 8] = [
        QueryKind::Position,
        QueryKind::Radius,
        QueryKind::Area,
        QueryKind::Cube,
        QueryKind::Trajectory,
        QueryKind::Corridor,
        QueryKind::Locations,
        QueryKind::Instances,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Position => "position",
            QueryKind::Radius => "radius",
            QueryKind::Area => "area",
            QueryKind::Cube => "cube",
            QueryKind::Trajectory => "trajectory",
            QueryKind::Corridor => "corridor",
            QueryKind::Locations => "locations",
            QueryKind::Instances => "instances",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        QueryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ProviderError::Configuration(format!("Unknown query kind '{}'", s)))
    }
}

/// Raw request values, as they arrive from the query string.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub kind: QueryKind,
    /// `coords` WKT (position, radius, area, trajectory, corridor).
    pub coords: Option<String>,
    /// `bbox` (cube, and optionally locations and instances).
    pub bbox: Option<String>,
    /// Location identifiers (locations).
    pub location_ids: Vec<String>,
    pub datetime: Option<String>,
    pub parameter_names: Vec<String>,
    pub z: Option<String>,
    pub within: Option<String>,
    pub within_units: Option<String>,
    pub limit: Option<usize>,
}

impl QueryRequest {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            coords: None,
            bbox: None,
            location_ids: Vec::new(),
            datetime: None,
            parameter_names: Vec::new(),
            z: None,
            within: None,
            within_units: None,
            limit: None,
        }
    }

    pub fn position(coords: impl Into<String>) -> Self {
        Self::new(QueryKind::Position).with_coords(coords)
    }

    pub fn radius(coords: impl Into<String>, within: impl Into<String>, units: impl Into<String>) -> Self {
        Self::new(QueryKind::Radius)
            .with_coords(coords)
            .with_within(within, units)
    }

    pub fn area(coords: impl Into<String>) -> Self {
        Self::new(QueryKind::Area).with_coords(coords)
    }

    pub fn cube(bbox: impl Into<String>) -> Self {
        Self::new(QueryKind::Cube).with_bbox(bbox)
    }

    pub fn trajectory(coords: impl Into<String>) -> Self {
        Self::new(QueryKind::Trajectory).with_coords(coords)
    }

    pub fn corridor(coords: impl Into<String>) -> Self {
        Self::new(QueryKind::Corridor).with_coords(coords)
    }

    /// Locations query for the given identifiers; none means all locations.
    pub fn locations<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = Self::new(QueryKind::Locations);
        request.location_ids = ids.into_iter().map(Into::into).collect();
        request
    }

    pub fn instances() -> Self {
        Self::new(QueryKind::Instances)
    }

    pub fn with_coords(mut self, coords: impl Into<String>) -> Self {
        self.coords = Some(coords.into());
        self
    }

    pub fn with_bbox(mut self, bbox: impl Into<String>) -> Self {
        self.bbox = Some(bbox.into());
        self
    }

    pub fn with_datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = Some(datetime.into());
        self
    }

    /// Set the parameter filter from a comma separated `parameter-name` value.
    pub fn with_parameter_names(mut self, names: &str) -> Self {
        self.parameter_names = parse_parameter_names(names);
        self
    }

    pub fn with_z(mut self, z: impl Into<String>) -> Self {
        self.z = Some(z.into());
        self
    }

    pub fn with_within(mut self, within: impl Into<String>, units: impl Into<String>) -> Self {
        self.within = Some(within.into());
        self.within_units = Some(units.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parse and check every request value.
    pub fn validate(&self) -> ProviderResult<ParsedRequest> {
        let spatial = self.spatial_filter()?;

        let datetime = match self.datetime.as_deref() {
            Some(dt) => Some(DateTimeQuery::parse(dt)?).filter(|dt| !dt.is_unbounded()),
            None => None,
        };

        let z = self.z.as_deref().map(VerticalQuery::parse).transpose()?;

        if self.limit == Some(0) {
            return Err(ProviderError::Validation(
                "limit must be greater than zero".to_string(),
            ));
        }

        let mut parameter_names: Vec<String> = Vec::with_capacity(self.parameter_names.len());
        for name in &self.parameter_names {
            let name = name.trim();
            if !name.is_empty() && !parameter_names.iter().any(|n| n == name) {
                parameter_names.push(name.to_string());
            }
        }

        Ok(ParsedRequest {
            kind: self.kind,
            spatial,
            datetime,
            parameter_names,
            z,
            limit: self.limit,
        })
    }

    fn spatial_filter(&self) -> ProviderResult<SpatialFilter> {
        let filter = match self.kind {
            QueryKind::Position => {
                SpatialFilter::Intersects(QueryGeometry::parse_position(self.require_coords()?)?)
            }
            QueryKind::Radius => {
                let center = QueryGeometry::parse_position(self.require_coords()?)?;
                let within = self.within.as_deref().ok_or_else(|| {
                    ProviderError::Validation("radius query requires 'within'".to_string())
                })?;
                SpatialFilter::DWithin {
                    geometry: center,
                    meters: self.within_meters(within)?,
                }
            }
            QueryKind::Area => {
                SpatialFilter::Intersects(QueryGeometry::parse_area(self.require_coords()?)?)
            }
            QueryKind::Cube => {
                let bbox = self.bbox.as_deref().ok_or_else(|| {
                    ProviderError::Validation("cube query requires 'bbox'".to_string())
                })?;
                SpatialFilter::Intersects(QueryGeometry::Bbox(BboxQuery::parse(bbox)?))
            }
            QueryKind::Trajectory => {
                SpatialFilter::Intersects(QueryGeometry::parse_line(self.require_coords()?)?)
            }
            QueryKind::Corridor => {
                let line = QueryGeometry::parse_line(self.require_coords()?)?;
                match self.within.as_deref() {
                    Some(width) => SpatialFilter::DWithin {
                        geometry: line,
                        meters: self.within_meters(width)? / 2.0,
                    },
                    None => SpatialFilter::Intersects(line),
                }
            }
            QueryKind::Locations => {
                let ids: Vec<String> = self
                    .location_ids
                    .iter()
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect();
                if !ids.is_empty() {
                    SpatialFilter::LocationIds(ids)
                } else {
                    self.optional_bbox()?
                }
            }
            QueryKind::Instances => self.optional_bbox()?,
        };
        Ok(filter)
    }

    fn require_coords(&self) -> ProviderResult<&str> {
        self.coords.as_deref().ok_or_else(|| {
            ProviderError::Validation(format!("{} query requires 'coords'", self.kind))
        })
    }

    fn optional_bbox(&self) -> ProviderResult<SpatialFilter> {
        Ok(match self.bbox.as_deref() {
            Some(bbox) => SpatialFilter::Intersects(QueryGeometry::Bbox(BboxQuery::parse(bbox)?)),
            None => SpatialFilter::None,
        })
    }

    fn within_meters(&self, within: &str) -> ProviderResult<f64> {
        let distance = parse_within(within)?;
        let unit = match self.within_units.as_deref() {
            Some(units) if !units.trim().is_empty() => DistanceUnit::parse(units)?,
            _ => DistanceUnit::Kilometers,
        };
        Ok(unit.to_meters(distance))
    }
}

/// How rows are restricted in space.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialFilter {
    None,
    Intersects(QueryGeometry),
    /// Within `meters` of the geometry.
    DWithin { geometry: QueryGeometry, meters: f64 },
    LocationIds(Vec<String>),
}

/// A request whose values all parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub kind: QueryKind,
    pub spatial: SpatialFilter,
    /// `None` when absent or `../..`.
    pub datetime: Option<DateTimeQuery>,
    pub parameter_names: Vec<String>,
    pub z: Option<VerticalQuery>,
    pub limit: Option<usize>,
}
