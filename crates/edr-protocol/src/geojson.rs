//! EDR GeoJSON types for location listings.
//!
//! A locations query without a location id answers with a GeoJSON
//! FeatureCollection: one Feature per monitoring location, carrying the
//! observed time span and the parameters measured there.
//!
//! See: <https://www.opengis.net/spec/ogcapi-edr-1/1.1/req/edr-geojson>

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::parameters::Parameter;
use crate::queries::{CoordinateParseError, QueryGeometry};

/// A GeoJSON FeatureCollection for EDR responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Array of features.
    pub features: Vec<Feature>,

    /// Parameters observed across all features.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,

    /// Number of features in this response.
    #[serde(rename = "numberReturned")]
    pub number_returned: usize,
}

impl FeatureCollection {
    /// Create a collection from features and the parameters they reference.
    pub fn new(features: Vec<Feature>, parameters: BTreeMap<String, Parameter>) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            number_returned: features.len(),
            features,
            parameters,
        }
    }
}

/// A GeoJSON Feature for EDR responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// Location identifier.
    pub id: String,

    /// Location geometry, absent when the stored value was null.
    pub geometry: Option<Geometry>,

    /// Time span and observed parameters.
    pub properties: LocationProperties,
}

impl Feature {
    /// Create a feature for a location.
    pub fn new(id: impl Into<String>, geometry: Option<Geometry>) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: id.into(),
            geometry,
            properties: LocationProperties::default(),
        }
    }

    /// Set the properties.
    pub fn with_properties(mut self, properties: LocationProperties) -> Self {
        self.properties = properties;
        self
    }
}

/// GeoJSON geometry types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    MultiPoint { coordinates: Vec<[f64; 2]> },
    LineString { coordinates: Vec<[f64; 2]> },
    MultiLineString { coordinates: Vec<Vec<[f64; 2]>> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: [lon, lat],
        }
    }

    /// Convert WKT text into a GeoJSON geometry.
    pub fn from_wkt(wkt: &str) -> Result<Self, CoordinateParseError> {
        Ok(Self::from(&QueryGeometry::parse_wkt(wkt)?))
    }
}

fn pairs(points: &[(f64, f64)]) -> Vec<[f64; 2]> {
    points.iter().map(|(lon, lat)| [*lon, *lat]).collect()
}

impl From<&QueryGeometry> for Geometry {
    fn from(geometry: &QueryGeometry) -> Self {
        match geometry {
            QueryGeometry::Point(lon, lat) => Geometry::point(*lon, *lat),
            QueryGeometry::MultiPoint(points) => Geometry::MultiPoint {
                coordinates: pairs(points),
            },
            QueryGeometry::LineString(points) => Geometry::LineString {
                coordinates: pairs(points),
            },
            QueryGeometry::MultiLineString(parts) => Geometry::MultiLineString {
                coordinates: parts.iter().map(|part| pairs(part)).collect(),
            },
            QueryGeometry::Polygon(rings) => Geometry::Polygon {
                coordinates: rings.iter().map(|ring| pairs(ring)).collect(),
            },
            QueryGeometry::MultiPolygon(polygons) => Geometry::MultiPolygon {
                coordinates: polygons
                    .iter()
                    .map(|rings| rings.iter().map(|ring| pairs(ring)).collect())
                    .collect(),
            },
            QueryGeometry::Bbox(bbox) => Geometry::from(&bbox.to_polygon()),
        }
    }
}

/// Properties of a location feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LocationProperties {
    /// Observed time span as `start/end`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Names of the parameters observed at this location.
    #[serde(rename = "parameter-name")]
    pub parameter_names: Vec<String>,
}
