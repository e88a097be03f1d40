use agentkit::challenge::{self, SupportedChain};
use agentkit::{AgentBook, InMemoryUsageStore, PolicyEngine, SignatureVerifier};
use agentkit_axum::{AgentKitChallengeResponse, AgentKitGrant, AgentKitLayer};
use agentkit_types::ChainId;
use axum::Extension;
use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// CLI arguments for the AgentKit example server.
#[derive(Parser, Debug)]
#[command(name = "agentkit-axum-example")]
#[command(about = "Demo server gating a route behind an AgentKit access policy")]
struct CliArgs {
    /// Path to the JSON configuration file describing the access mode,
    /// supported chains, and AgentBook RPC endpoints.
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = CliArgs::parse();
    let contents = fs::read_to_string(&args.config)?;
    let config: agentkit::config::AgentKitConfig = serde_json::from_str(&contents)?;
    let (contract_overrides, rpc_urls) = config.parse_agentbook_settings()?;

    let agentbook = Arc::new(AgentBook::new(contract_overrides, rpc_urls));
    let usage_store = Arc::new(InMemoryUsageStore::new());
    let policy = Arc::new(
        PolicyEngine::new(config.mode.clone(), SignatureVerifier::default(), agentbook, usage_store)?
            .with_max_age(config.max_age()),
    );

    let supported_chains: Vec<SupportedChain> = config
        .supported_chains
        .iter()
        .cloned()
        .map(|chain_id: ChainId| SupportedChain { chain_id })
        .collect();

    let mode = config.mode.clone();
    let app = Router::new().route(
        "/vip-content",
        get(move |grant: Option<Extension<AgentKitGrant>>| {
            vip_content(grant, supported_chains.clone(), mode.clone())
        })
        .layer(AgentKitLayer::new(policy)),
    );

    let bind_address = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Serves the protected resource when the request carries an
/// [`AgentKitGrant`] extension, and the unsigned `agentkit` challenge
/// otherwise. Wiring the grant check into the handler itself (rather than
/// short-circuiting in the layer) keeps `AgentKitLayer` a pure observer that
/// never denies a request on its own, per its own contract.
async fn vip_content(
    grant: Option<Extension<AgentKitGrant>>,
    supported_chains: Vec<SupportedChain>,
    mode: agentkit::AccessMode,
) -> impl IntoResponse {
    if let Some(Extension(grant)) = grant {
        tracing::info!(human_id = %grant.human_id.0, "serving vip content");
        return (StatusCode::OK, "This is a VIP content!").into_response();
    }

    let issued_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    match challenge::declare(
        "http://localhost:3000/vip-content",
        Some("Sign in to prove you're a verified human agent.".to_string()),
        &supported_chains,
        Some(mode),
        issued_at,
        None,
    ) {
        Ok(declared) => AgentKitChallengeResponse::new(declared).into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to build agentkit challenge");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();
}
