use axum::http::{HeaderValue, Method};
use melodia_db::{CacheStore, MemoryCache};
use melodia_media::{AssetStore, BlobStore, CdnConfig, CloudinaryAssets, S3BlobStore, S3Config};
use melodia_payment::{PaymentClient, PaymentConfig};
use melodia_server::search::SeaOrmCatalog;
use melodia_server::side_effects::SideEffects;
use melodia_server::AppState;
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me-in-production";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Database connection
    let db_config = melodia_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = melodia_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    melodia_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");
    let db = Arc::new(db);

    let jwt_secret =
        std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
    if jwt_secret == DEFAULT_JWT_SECRET {
        tracing::error!(
            "JWT_SECRET is not set; admin tokens can be forged. \
             Set JWT_SECRET to the identity provider's signing secret."
        );
    }

    let cache = build_cache();

    let s3_config = S3Config::from_env().expect("S3_BUCKET is required");
    let blobs: Arc<dyn BlobStore> =
        Arc::new(S3BlobStore::from_config(&s3_config).expect("failed to initialize S3 storage"));
    tracing::info!(bucket = %s3_config.bucket, "blob store ready");

    let cdn_config = CdnConfig::from_env().expect("CDN_CLOUD_NAME is required");
    let assets: Arc<dyn AssetStore> =
        Arc::new(CloudinaryAssets::new(cdn_config).expect("failed to build CDN client"));

    let payment_config = PaymentConfig::from_env();
    if payment_config.uses_sandbox_keys() {
        tracing::warn!("payment client is using the public sandbox credentials");
    }
    let payments =
        Arc::new(PaymentClient::new(payment_config).expect("failed to build payment client"));

    let (side_effects, _worker) = SideEffects::spawn(blobs.clone(), assets.clone());

    let state = Arc::new(AppState {
        catalog: Arc::new(SeaOrmCatalog::new(Arc::clone(&db))),
        db,
        jwt_secret,
        cache,
        blobs,
        assets,
        payments,
        side_effects,
    });

    // Rate limiter for payment endpoints: bursts of 10, one more every 6 seconds per IP
    let payment_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(6)
            .burst_size(10)
            .finish()
            .expect("failed to build rate limiter config"),
    );
    let payments = melodia_server::payment_routes().layer(GovernorLayer::new(payment_governor_conf));

    let app = melodia_server::app_with(state, payments).layer(cors_layer());

    let addr: SocketAddr = std::env::var("MELODIA_BIND")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));
    tracing::info!(%addr, "server started");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}

#[cfg(feature = "redis")]
fn build_cache() -> Arc<dyn CacheStore> {
    match std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty()) {
        Some(url) => match melodia_db::RedisCache::from_url(&url) {
            Ok(cache) => {
                tracing::info!("response cache: redis");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!("redis unavailable ({e}), using in-process cache");
                Arc::new(MemoryCache::new())
            }
        },
        None => {
            tracing::info!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}

#[cfg(not(feature = "redis"))]
fn build_cache() -> Arc<dyn CacheStore> {
    tracing::info!("response cache: in-process");
    Arc::new(MemoryCache::new())
}

/// CORS restricted to `CORS_ORIGINS`; same-origin only when unset.
fn cors_layer() -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let allowed_origins_str = std::env::var("CORS_ORIGINS").unwrap_or_default();
    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ORIGINS not set, cross-origin requests will be refused");
        return CorsLayer::new()
            .allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new()))
            .allow_methods(methods);
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
        .collect();
    tracing::info!("CORS allowed origins: {:?}", origins);
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(tower_http::cors::Any)
}
