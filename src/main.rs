mod api;
mod calibration;
mod config;
mod db;
mod error;
mod narrative;
mod types;

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::narrative::{GeminiNarrator, Narrator, Telemetry};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    if cfg.seed_demo {
        let inserted = db::seed::seed_demo(&pool).await?;
        info!(event = "SEED_DEMO", inserted, "seeded {inserted} demo forecasts");
    }

    // --- Narrative generator (optional) ---
    let narrator: Option<Arc<dyn Narrator>> = match GeminiNarrator::from_config(&cfg)? {
        Some(n) => {
            info!(
                model = %cfg.gemini_model,
                timeout_secs = cfg.summary_timeout.as_secs(),
                "narrative generator enabled"
            );
            Some(Arc::new(n))
        }
        None => {
            warn!("GEMINI_API_KEY not set; stats summaries, insights and generated suggestions are disabled");
            None
        }
    };

    // --- HTTP API server ---
    let api_state = ApiState {
        pool,
        narrator,
        telemetry: Arc::new(Telemetry::new()),
        summary_timeout: cfg.summary_timeout,
        started_at: Instant::now(),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
