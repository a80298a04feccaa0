use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rowsight_core::{ExtractorConfig, PdfiumRasterizer};
use rowsight_server::{build_router, AppState};

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rowsight=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ExtractorConfig::from_env().context("resolving configuration")?;
    let backends = config.backends().context("building backend chain")?;

    let state = AppState {
        schema: Arc::new(config.schema.clone()),
        backends,
        rasterizer: Arc::new(PdfiumRasterizer::new(config.render_width)),
    };

    let addr = std::env::var("ROWSIGHT_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!(%addr, "rowsight listening");
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
