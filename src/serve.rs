/*!
salesviz interactive export server

Serves the 3D scatter as a page with an export button and reruns the
pipeline on demand.

## Usage

```bash
salesviz-serve --config salesviz.toml --host 127.0.0.1 --port 3335
salesviz-serve --sample
```

## Endpoints

- `GET /` - Chart page with an export button
- `POST /api/v1/export?format=html|json` - Rerun the pipeline and download the export
- `GET /api/v1/points` - Encoded points and run statistics
- `GET /api/v1/health` - Health check
- `GET /api/v1/version` - Version information
*/

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesviz::encode::EncodedPoint;
use salesviz::reader::{CsvSourceReader, SourceReader};
use salesviz::writer::{ExportButton, ExportFormat, HtmlWriter, Writer};
use salesviz::{Pipeline, PipelineConfig, PipelineOutput, PipelineStats, SalesvizError, VERSION};

/// CLI arguments for the export server
#[derive(Parser)]
#[command(name = "salesviz-serve")]
#[command(about = "salesviz interactive export server")]
#[command(version = VERSION)]
struct Cli {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind to
    #[arg(long, default_value = "3335")]
    port: u16,

    /// CORS allowed origins (comma-separated)
    #[arg(long, default_value = "*")]
    cors_origin: String,

    /// TOML manifest describing the inputs
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Serve the built-in sample dataset instead of files on disk
    #[cfg(feature = "builtin-data")]
    #[arg(long, conflicts_with = "config")]
    sample: bool,
}

/// Where the pipeline reads its tables from
#[derive(Debug, Clone, Copy)]
enum DataSource {
    Files,
    #[cfg(feature = "builtin-data")]
    Builtin,
}

impl DataSource {
    fn reader(self) -> Box<dyn SourceReader> {
        match self {
            DataSource::Files => Box::new(CsvSourceReader::new()),
            #[cfg(feature = "builtin-data")]
            DataSource::Builtin => Box::new(salesviz::reader::BuiltinReader::new()),
        }
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Validated once at startup; every request reruns it from the sources
    pipeline: Arc<Pipeline>,
    source: DataSource,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExportParams {
    #[serde(default)]
    format: Option<String>,
}

/// Successful API response
#[derive(Debug, Serialize)]
struct ApiSuccess<T> {
    status: String,
    data: T,
}

/// Error API response
#[derive(Debug, Serialize)]
struct ApiError {
    status: String,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

#[derive(Debug, Serialize)]
struct PointsResult {
    points: Vec<EncodedPoint>,
    stats: PipelineStats,
    sources: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Version response
#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
    features: Vec<String>,
}

// ============================================================================
// Error Handling
// ============================================================================

/// Custom error type for API responses
struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error_type: &str, message: String) -> Self {
        ApiErrorResponse {
            status,
            error: ApiError {
                status: "error".to_string(),
                error: ErrorDetails {
                    message,
                    error_type: error_type.to_string(),
                },
            },
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let json = Json(self.error);
        (self.status, json).into_response()
    }
}

impl From<SalesvizError> for ApiErrorResponse {
    fn from(err: SalesvizError) -> Self {
        let (status, error_type) = match &err {
            SalesvizError::MissingInput(_) => (StatusCode::NOT_FOUND, "MissingInput"),
            SalesvizError::SchemaMismatch(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SchemaMismatch")
            }
            SalesvizError::ReaderError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ReaderError"),
            SalesvizError::ConfigError(_) => (StatusCode::BAD_REQUEST, "ConfigError"),
            SalesvizError::WriterError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "WriterError"),
            SalesvizError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };
        ApiErrorResponse::new(status, error_type, err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiErrorResponse {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiErrorResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalError",
            format!("Pipeline task failed: {}", err),
        )
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Rerun the pipeline off the async runtime
async fn run_pipeline(state: &AppState) -> Result<PipelineOutput, ApiErrorResponse> {
    let pipeline = state.pipeline.clone();
    let source = state.source;
    let output =
        tokio::task::spawn_blocking(move || pipeline.run(source.reader().as_ref())).await??;
    info!(
        "Pipeline run: {} sales rows, {} groups",
        output.stats.sales_rows, output.stats.groups
    );
    Ok(output)
}

fn export_button(format: ExportFormat) -> ExportButton {
    ExportButton {
        url: format!("/api/v1/export?format={}", format),
        label: format!("Export {}", format.extension().to_uppercase()),
        file_name: format.file_name(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - Chart page with an export button
async fn root_handler(State(state): State<AppState>) -> Result<Html<String>, ApiErrorResponse> {
    let output = run_pipeline(&state).await?;
    let html = HtmlWriter::new()
        .with_export_button(export_button(ExportFormat::Html))
        .write(&state.pipeline.chart_data(&output))?;
    Ok(Html(html))
}

/// POST /api/v1/export - Rerun the pipeline and return the export as a download
async fn export_handler(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiErrorResponse> {
    let format = match params.format.as_deref() {
        Some(format) => format.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };

    let output = run_pipeline(&state).await?;
    let bytes = state.pipeline.render(&output, format)?;
    info!("Exported {} bytes of {}", bytes.len(), format);

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.file_name()),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/v1/points - Encoded points and run statistics
async fn points_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<PointsResult>>, ApiErrorResponse> {
    let output = run_pipeline(&state).await?;
    Ok(Json(ApiSuccess {
        status: "success".to_string(),
        data: PointsResult {
            points: output.encoded,
            stats: output.stats,
            sources: output.sources,
        },
    }))
}

/// GET /api/v1/health - Health check
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

/// GET /api/v1/version - Version information
async fn version_handler() -> Json<VersionResponse> {
    let mut features = vec!["html".to_string(), "json".to_string()];

    #[cfg(feature = "builtin-data")]
    features.push("builtin-data".to_string());

    Json(VersionResponse {
        version: VERSION.to_string(),
        features,
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/v1/export", post(export_handler))
        .route("/api/v1/points", get(points_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/version", get(version_handler))
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salesviz=info,salesviz_serve=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    #[cfg(feature = "builtin-data")]
    let (config, source) = if cli.sample {
        info!("Serving the built-in sample dataset");
        let config = PipelineConfig {
            sources: salesviz::reader::data::sample_sources(),
            ..Default::default()
        };
        (config, DataSource::Builtin)
    } else {
        (load_config(cli.config.as_ref())?, DataSource::Files)
    };

    #[cfg(not(feature = "builtin-data"))]
    let (config, source) = (load_config(cli.config.as_ref())?, DataSource::Files);

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(config)?),
        source,
    };

    // Configure CORS
    let cors = if cli.cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    } else {
        let origins: Vec<_> = cli
            .cors_origin
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    };

    let app = router(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid host or port: {}", e))?;

    info!("Starting salesviz export server on {}", addr);
    info!("  GET  /                - Chart page");
    info!("  POST /api/v1/export   - Download html or json export");
    info!("  GET  /api/v1/points   - Encoded points");
    info!("  GET  /api/v1/health   - Health check");
    info!("  GET  /api/v1/version  - Version info");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> salesviz::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path),
        None => Ok(PipelineConfig::default()),
    }
}
