use apartment_board::config::AppConfig;
use apartment_board::geocoding::NominatimGeocoder;
use apartment_board::scrapers::{BrowserListingScraper, HttpListingScraper, ScraperTrait};
use apartment_board::service::ApartmentService;
use apartment_board::store::JsonFileStore;
use apartment_board::web::{create_axum_router, AppState};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Personal apartment-hunting board", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Apartment Board");
    info!("==================");

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    let store = JsonFileStore::new(&config.data_dir);
    info!("💾 Storing apartments under {}", store.data_dir().display());

    let scraper: Arc<dyn ScraperTrait> = if config.browser_scraping {
        Arc::new(BrowserListingScraper::new(config.upstream_timeout()))
    } else {
        Arc::new(HttpListingScraper::new(config.upstream_timeout())?)
    };
    info!("Scraping with the {} backend", scraper.source_name());

    let geocoder = Arc::new(NominatimGeocoder::new(
        config.geocoder_url.clone(),
        config.upstream_timeout(),
    )?);

    let app_state = Arc::new(AppState {
        service: ApartmentService::new(store),
        scraper,
        geocoder,
        config: config.clone(),
    });
    let app = create_axum_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
