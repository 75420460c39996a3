//! The EDR provider: one validated mapping plus an executor.

use tracing::{debug, info, instrument};

use edr_protocol::FeatureCollection;

use crate::builder::QueryBuilder;
use crate::error::ProviderResult;
use crate::executor::{QueryExecutor, Statement};
use crate::mapper::{CoverageOutput, LocationListing, ParameterInfo};
use crate::mapping::{FieldMapping, ProviderConfig};
use crate::request::QueryRequest;
use crate::sqlx_executor::SqlxExecutor;

/// Answers EDR queries for one configured table.
///
/// A provider only exists once its mapping validated, so every request it
/// sees runs against a consistent join graph and dialect.
#[derive(Debug)]
pub struct EdrProvider<E> {
    mapping: FieldMapping,
    executor: E,
}

impl EdrProvider<SqlxExecutor> {
    /// Validate the configuration and open a connection pool.
    pub async fn connect(config: &ProviderConfig) -> ProviderResult<Self> {
        let mapping = FieldMapping::from_config(config)?;
        let executor = SqlxExecutor::connect(mapping.backend(), &config.data).await?;
        Ok(Self::with_mapping(mapping, executor))
    }
}

impl<E: QueryExecutor> EdrProvider<E> {
    /// Validate the configuration and attach an executor.
    pub fn new(config: &ProviderConfig, executor: E) -> ProviderResult<Self> {
        Ok(Self::with_mapping(FieldMapping::from_config(config)?, executor))
    }

    pub fn with_mapping(mapping: FieldMapping, executor: E) -> Self {
        info!(table = %mapping.table(), backend = %mapping.backend(), "EDR provider ready");
        Self { mapping, executor }
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The statement a request would run, without running it.
    pub fn explain(&self, request: &QueryRequest) -> ProviderResult<Statement> {
        let parsed = request.validate()?;
        Ok(QueryBuilder::new(&self.mapping).build(&parsed))
    }

    /// Run an EDR query and fold the rows into coverage output.
    #[instrument(skip(self, request), fields(kind = %request.kind))]
    pub async fn query(&self, request: &QueryRequest) -> ProviderResult<CoverageOutput> {
        let statement = self.explain(request)?;
        let rows = self.executor.fetch_all(&statement).await?;
        let output = CoverageOutput::from_rows(rows)?;

        debug!(locations = output.locations.len(), "Query answered");
        Ok(output)
    }

    /// Distinct parameters available in the mapped table.
    #[instrument(skip(self))]
    pub async fn parameters(&self) -> ProviderResult<Vec<ParameterInfo>> {
        let statement = QueryBuilder::new(&self.mapping).parameter_catalog();
        let rows = self.executor.fetch_all(&statement).await?;
        rows.iter().map(ParameterInfo::from_row).collect()
    }

    /// List locations matching a request as GeoJSON features.
    ///
    /// The request limit caps the number of features, not observation rows.
    #[instrument(skip(self, request), fields(kind = %request.kind))]
    pub async fn locations(&self, request: &QueryRequest) -> ProviderResult<FeatureCollection> {
        let parsed = request.validate()?;
        let statement = QueryBuilder::new(&self.mapping).locations_listing(&parsed);
        let rows = self.executor.fetch_all(&statement).await?;
        let listing = LocationListing::from_rows(rows)?;

        debug!(locations = listing.len(), "Locations listed");
        Ok(listing.to_feature_collection())
    }
}
