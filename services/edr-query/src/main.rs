//! EDR Query CLI
//!
//! Runs OGC EDR queries against a SQL table described by a provider YAML file.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use edr_protocol::media_types;
use sql_edr::{EdrProvider, ProviderConfig, QueryKind, QueryRequest, SqlValue};

/// EDR Query CLI
#[derive(Parser, Debug)]
#[command(name = "edr-query")]
#[command(about = "OGC API - Environmental Data Retrieval queries over SQL tables")]
struct Cli {
    /// Provider configuration file
    #[arg(short, long, env = "EDR_PROVIDER_CONFIG")]
    config: PathBuf,

    /// Database password, overriding the one in the config file
    #[arg(long, env = "DATABASE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log level
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an EDR query
    Query(QueryArgs),

    /// List the parameters available in the mapped table
    Parameters,

    /// List locations as a GeoJSON feature collection
    Locations(FilterArgs),

    /// Print the effective provider configuration
    Config,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Query type (position, radius, area, cube, trajectory, corridor, locations, instances)
    kind: QueryKind,

    /// WKT geometry or "x,y" coordinates
    #[arg(long)]
    coords: Option<String>,

    /// Location identifiers for a locations query
    #[arg(long = "location-id", value_delimiter = ',')]
    location_ids: Vec<String>,

    /// Distance for radius and corridor queries
    #[arg(long)]
    within: Option<String>,

    /// Units for --within (km, m, mi, nm)
    #[arg(long)]
    within_units: Option<String>,

    /// Vertical levels or range
    #[arg(short, long)]
    z: Option<String>,

    /// Print the generated SQL instead of running it
    #[arg(long)]
    explain: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Covjson)]
    format: OutputFormat,

    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Bounding box as west,south,east,north
    #[arg(long)]
    bbox: Option<String>,

    /// Instant, comma separated instants, or start/end interval
    #[arg(long)]
    datetime: Option<String>,

    /// Comma separated parameter ids or names
    #[arg(long = "parameter-name")]
    parameter_name: Option<String>,

    /// Maximum number of rows
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Covjson,
    Geojson,
}

impl FilterArgs {
    fn apply(&self, mut request: QueryRequest) -> QueryRequest {
        if let Some(bbox) = &self.bbox {
            request = request.with_bbox(bbox);
        }
        if let Some(datetime) = &self.datetime {
            request = request.with_datetime(datetime);
        }
        if let Some(names) = &self.parameter_name {
            request = request.with_parameter_names(names);
        }
        if let Some(limit) = self.limit {
            request = request.with_limit(limit);
        }
        request
    }
}

impl QueryArgs {
    fn to_request(&self) -> QueryRequest {
        let mut request = QueryRequest::new(self.kind);
        if let Some(coords) = &self.coords {
            request = request.with_coords(coords);
        }
        request.location_ids = self.location_ids.clone();
        if let Some(within) = &self.within {
            request = request.with_within(within, self.within_units.as_deref().unwrap_or(""));
        }
        if let Some(z) = &self.z {
            request = request.with_z(z);
        }
        self.filter.apply(request)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli);

    let config = config::load_provider_config(&cli.config, cli.password.as_deref())?;

    match &cli.command {
        Command::Config => {
            print!("{}", config::render_config(&config)?);
        }
        Command::Query(args) if args.explain => {
            let provider = EdrProvider::new(&config, NoExecutor)?;
            let statement = provider.explain(&args.to_request())?;
            println!("{}", statement.sql);
            for (index, param) in statement.params.iter().enumerate() {
                println!("  {}: {}", index + 1, describe(param));
            }
        }
        Command::Query(args) => {
            let provider = connect(&config).await?;
            let output = provider.query(&args.to_request()).await?;
            info!(locations = output.locations.len(), "Query complete");

            let body = match args.format {
                OutputFormat::Covjson => {
                    info!(media_type = media_types::COVERAGE_JSON, "Rendering");
                    serde_json::to_string_pretty(&output.to_coverage_json()?)?
                }
                OutputFormat::Geojson => {
                    info!(media_type = media_types::GEO_JSON, "Rendering");
                    serde_json::to_string_pretty(&output.to_feature_collection())?
                }
            };
            println!("{}", body);
        }
        Command::Parameters => {
            let provider = connect(&config).await?;
            let parameters: Vec<_> = provider
                .parameters()
                .await?
                .iter()
                .map(|p| p.to_parameter())
                .collect();
            println!("{}", serde_json::to_string_pretty(&parameters)?);
        }
        Command::Locations(filter) => {
            let provider = connect(&config).await?;
            let request = filter.apply(QueryRequest::new(QueryKind::Locations));
            let features = provider.locations(&request).await?;
            println!("{}", serde_json::to_string_pretty(&features)?);
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn connect(config: &ProviderConfig) -> Result<EdrProvider<sql_edr::SqlxExecutor>> {
    EdrProvider::connect(config).await.with_context(|| {
        format!(
            "Failed to connect to {} database '{}' on {}",
            config.name, config.data.dbname, config.data.host
        )
    })
}

fn describe(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Text(v) => format!("'{}'", v),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Integer(v) => v.to_string(),
        SqlValue::Timestamp(v) => v.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Executor for `--explain`, which never touches the database.
struct NoExecutor;

#[async_trait::async_trait]
impl sql_edr::QueryExecutor for NoExecutor {
    async fn fetch_all(
        &self,
        _statement: &sql_edr::Statement,
    ) -> sql_edr::ProviderResult<Vec<sql_edr::Row>> {
        Err(sql_edr::ProviderError::QueryExecution(
            "explain mode does not execute statements".to_string(),
        ))
    }
}
