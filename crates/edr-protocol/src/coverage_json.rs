//! CoverageJSON types for EDR query responses.
//!
//! CoverageJSON is the primary response format for EDR data queries.
//! It provides a structured way to represent coverage data with
//! domain, parameters, and ranges.
//!
//! See: <https://covjson.org/>

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::parameters::{I18nString, ObservedProperty, Parameter, Unit};

/// CRS84 longitude/latitude.
pub const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";

/// A CoverageJSON document containing coverage data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageJson {
    /// Document type (always "Coverage" for single coverage).
    #[serde(rename = "type")]
    pub type_: CoverageType,

    /// The domain defining the coverage's spatial/temporal extent.
    pub domain: Domain,

    /// Parameter definitions.
    pub parameters: HashMap<String, CovJsonParameter>,

    /// Data ranges for each parameter.
    pub ranges: HashMap<String, NdArray>,
}

impl CoverageJson {
    /// Create an empty coverage over a domain.
    pub fn new(domain: Domain) -> Self {
        Self {
            type_: CoverageType::Coverage,
            domain,
            parameters: HashMap::new(),
            ranges: HashMap::new(),
        }
    }

    /// Add a parameter for a time series (1D array along time axis).
    pub fn with_time_series(
        mut self,
        name: &str,
        param: CovJsonParameter,
        values: Vec<Option<f64>>,
    ) -> Self {
        self.parameters.insert(name.to_string(), param);
        self.ranges
            .insert(name.to_string(), NdArray::along("t", values));
        self
    }
}

/// Several coverages sharing parameter definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageCollection {
    /// Document type (always "CoverageCollection").
    #[serde(rename = "type")]
    pub type_: CoverageType,

    /// Union of the member coverages' parameters.
    pub parameters: HashMap<String, CovJsonParameter>,

    /// Member coverages.
    pub coverages: Vec<CoverageJson>,
}

impl CoverageCollection {
    /// Collect coverages, hoisting their parameter definitions.
    pub fn new(coverages: Vec<CoverageJson>) -> Self {
        let mut parameters = HashMap::new();
        for coverage in &coverages {
            for (id, param) in &coverage.parameters {
                parameters
                    .entry(id.clone())
                    .or_insert_with(|| param.clone());
            }
        }

        Self {
            type_: CoverageType::CoverageCollection,
            parameters,
            coverages,
        }
    }
}

/// Coverage type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CoverageType {
    /// Single coverage.
    Coverage,
    /// Collection of coverages.
    CoverageCollection,
}

/// The domain of a coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    /// Domain type (always "Domain").
    #[serde(rename = "type")]
    pub type_: String,

    /// The domain type (Point, PointSeries, etc.).
    #[serde(rename = "domainType")]
    pub domain_type: DomainType,

    /// Axis definitions.
    pub axes: HashMap<String, Axis>,

    /// Reference systems for axes.
    pub referencing: Vec<ReferenceSystemConnection>,
}

impl Domain {
    /// A point, or a point series when more than one time is present.
    pub fn point_series(x: f64, y: f64, t_values: Vec<String>) -> Self {
        let domain_type = if t_values.len() > 1 {
            DomainType::PointSeries
        } else {
            DomainType::Point
        };

        let mut axes = HashMap::new();
        axes.insert("x".to_string(), Axis::values(vec![AxisValue::Float(x)]));
        axes.insert("y".to_string(), Axis::values(vec![AxisValue::Float(y)]));
        axes.insert("t".to_string(), Axis::times(t_values));

        Self {
            type_: "Domain".to_string(),
            domain_type,
            axes,
            referencing: Self::default_referencing(),
        }
    }

    /// A non-point geometry carried as a WKT composite axis.
    pub fn composite(geometry_wkt: &str, t_values: Vec<String>) -> Self {
        let geometry_type = geometry_wkt
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_uppercase();
        let series = t_values.len() > 1;

        let mut axes = HashMap::new();
        axes.insert(
            "composite".to_string(),
            Axis::Composite {
                data_type: geometry_type.to_lowercase(),
                coordinates: vec!["x".to_string(), "y".to_string()],
                values: vec![AxisValue::String(geometry_wkt.to_string())],
            },
        );
        axes.insert("t".to_string(), Axis::times(t_values));

        Self {
            type_: "Domain".to_string(),
            domain_type: DomainType::for_geometry(&geometry_type, series),
            axes,
            referencing: Self::default_referencing(),
        }
    }

    fn default_referencing() -> Vec<ReferenceSystemConnection> {
        vec![
            ReferenceSystemConnection {
                coordinates: vec!["x".to_string(), "y".to_string()],
                system: ReferenceSystem::Geographic {
                    id: CRS84.to_string(),
                },
            },
            ReferenceSystemConnection {
                coordinates: vec!["t".to_string()],
                system: ReferenceSystem::Temporal {
                    calendar: "Gregorian".to_string(),
                },
            },
        ]
    }
}

/// Domain types supported by CoverageJSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DomainType {
    /// Point (0D).
    Point,
    /// Point series (time series at a point).
    PointSeries,
    /// Multi-point set.
    MultiPoint,
    /// Multi-point set over time.
    MultiPointSeries,
    /// Polygon.
    Polygon,
    /// Polygon over time.
    PolygonSeries,
    /// Trajectory (1D path through space).
    Trajectory,
}

impl DomainType {
    /// Pick the domain type for a WKT geometry type name.
    pub fn for_geometry(geometry_type: &str, series: bool) -> Self {
        match (geometry_type, series) {
            ("POINT", false) => DomainType::Point,
            ("POINT", true) => DomainType::PointSeries,
            ("MULTIPOINT", false) => DomainType::MultiPoint,
            ("MULTIPOINT", true) => DomainType::MultiPointSeries,
            ("LINESTRING", _) | ("MULTILINESTRING", _) => DomainType::Trajectory,
            (_, false) => DomainType::Polygon,
            (_, true) => DomainType::PolygonSeries,
        }
    }
}

/// An axis in the domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Axis {
    /// Tuple axis whose values are whole geometries.
    Composite {
        #[serde(rename = "dataType")]
        data_type: String,
        coordinates: Vec<String>,
        values: Vec<AxisValue>,
    },
    /// Explicit list of values.
    Values { values: Vec<AxisValue> },
}

impl Axis {
    /// An axis with explicit values.
    pub fn values(values: Vec<AxisValue>) -> Self {
        Axis::Values { values }
    }

    /// A time axis.
    pub fn times(times: Vec<String>) -> Self {
        Axis::Values {
            values: times.into_iter().map(AxisValue::String).collect(),
        }
    }

    /// Get the number of values in this axis.
    pub fn len(&self) -> usize {
        match self {
            Axis::Values { values } | Axis::Composite { values, .. } => values.len(),
        }
    }

    /// Check if axis is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value on an axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AxisValue {
    /// Floating-point value (coordinates, levels).
    Float(f64),
    /// String value (timestamps, WKT).
    String(String),
}

/// Connection between axes and their reference system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSystemConnection {
    /// Axes that use this reference system.
    pub coordinates: Vec<String>,

    /// The reference system.
    pub system: ReferenceSystem,
}

/// Reference system definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ReferenceSystem {
    /// Geographic coordinate reference system.
    #[serde(rename = "GeographicCRS")]
    Geographic {
        /// CRS identifier URI.
        id: String,
    },

    /// Temporal reference system.
    #[serde(rename = "TemporalRS")]
    Temporal {
        /// Calendar system (e.g., "Gregorian").
        calendar: String,
    },
}

/// A parameter in CoverageJSON format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CovJsonParameter {
    /// Type (always "Parameter").
    #[serde(rename = "type")]
    pub type_: String,

    /// Description of the parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,

    /// The observed property.
    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,

    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl CovJsonParameter {
    /// Convert from an EDR Parameter.
    pub fn from_parameter(param: &Parameter) -> Self {
        Self {
            type_: "Parameter".to_string(),
            description: param.description.clone(),
            observed_property: param.observed_property.clone(),
            unit: param.unit.clone(),
        }
    }
}

/// N-dimensional array containing data values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdArray {
    /// Type (always "NdArray").
    #[serde(rename = "type")]
    pub type_: String,

    /// Data type of values.
    #[serde(rename = "dataType")]
    pub data_type: String,

    /// Names of axes in order.
    #[serde(rename = "axisNames")]
    pub axis_names: Vec<String>,

    /// Shape of the array.
    pub shape: Vec<usize>,

    /// The data values (null for missing data).
    pub values: Vec<Option<f64>>,
}

impl NdArray {
    /// A one-dimensional array along the named axis.
    pub fn along(axis: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            type_: "NdArray".to_string(),
            data_type: "float".to_string(),
            axis_names: vec![axis.to_string()],
            shape: vec![values.len()],
            values,
        }
    }
}
