//! OGC API - Environmental Data Retrieval (EDR) Protocol
//!
//! Types shared by the EDR query engine: query parameter parsing,
//! parameter metadata, and the CoverageJSON and GeoJSON documents a
//! query answers with.
//!
//! # Example
//!
//! ```rust
//! use edr_protocol::{DateTimeQuery, QueryGeometry};
//!
//! let point = QueryGeometry::parse_position("POINT(-77.04 38.85)").unwrap();
//! assert_eq!(point.to_wkt(), "POINT(-77.04 38.85)");
//!
//! let window = DateTimeQuery::parse("2025-05-01/2025-05-03").unwrap();
//! assert!(window.is_interval());
//! ```

pub mod coverage_json;
pub mod errors;
pub mod geojson;
pub mod parameters;
pub mod queries;

// Re-export commonly used types
pub use coverage_json::{
    Axis, AxisValue, CovJsonParameter, CoverageCollection, CoverageJson, Domain, DomainType,
    NdArray, ReferenceSystem,
};
pub use errors::{EdrError, ExceptionResponse};
pub use geojson::{Feature, FeatureCollection, Geometry, LocationProperties};
pub use parameters::{I18nString, ObservedProperty, Parameter, Unit, UnitSymbol};
pub use queries::{
    BboxQuery, Coord, CoordinateParseError, DateTimeQuery, DistanceUnit, QueryGeometry,
    VerticalQuery,
};

/// Media types used in EDR responses
pub mod media_types {
    /// CoverageJSON media type
    pub const COVERAGE_JSON: &str = "application/vnd.cov+json";
    /// GeoJSON media type
    pub const GEO_JSON: &str = "application/geo+json";
    /// JSON media type
    pub const JSON: &str = "application/json";
}
