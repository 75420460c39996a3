//! SQL-backed OGC EDR query engine.
//!
//! Maps a primary observation table (and any tables joined to it) onto the
//! EDR concepts of location, geometry, time, parameter and value, then turns
//! each EDR query into one parameterized statement and folds the ordered
//! rows it returns into coverage output.
//!
//! # Example
//!
//! ```ignore
//! use sql_edr::{EdrProvider, ProviderConfig, QueryRequest};
//!
//! let config = ProviderConfig::from_file("landings.yaml")?;
//! let provider = EdrProvider::connect(&config).await?;
//!
//! let request = QueryRequest::locations(["DCA"]).with_datetime("2025-05-01/2025-05-03");
//! let coverage = provider.query(&request).await?.to_coverage_json()?;
//! ```

pub mod builder;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod joins;
pub mod mapper;
pub mod mapping;
pub mod provider;
pub mod request;
pub mod sqlx_executor;

pub use builder::QueryBuilder;
pub use dialect::{Backend, Dialect, MySqlDialect, PostgresDialect};
pub use error::{ProviderError, ProviderResult};
pub use executor::{QueryExecutor, Row, SqlValue, Statement};
pub use joins::{JoinClause, JoinGraph, ResolvedField};
pub use mapper::{
    CoverageDocument, CoverageOutput, ListedLocation, LocationCoverage, LocationListing,
    ParameterInfo, ParameterSeries, ResultRow, TimedValue,
};
pub use mapping::{
    ConnectionConfig, EdrFields, ExternalTable, FieldMapping, GeometryEncoding, LimitsConfig,
    ProviderConfig,
};
pub use provider::EdrProvider;
pub use request::{ParsedRequest, QueryKind, QueryRequest, SpatialFilter};
pub use sqlx_executor::SqlxExecutor;
