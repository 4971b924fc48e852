use anyhow::{Context, Result};
use clap::Parser;
use loqa_phone::{
    create_router, AppState, CallDispatcher, CallServices, Config, ConversationClient,
    MetricsLedger, ProviderFactory,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "loqa-phone", about = "Voice call orchestrator")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/loqa-phone")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Loqa Phone v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let registry = ProviderFactory::build(&cfg.providers).await?;
    let provider_timeout = Duration::from_millis(cfg.call.provider_timeout_ms);
    let stt = registry.transcription_chain(&cfg.dispatch.stt, provider_timeout)?;
    let tts = registry.synthesis_chain(&cfg.dispatch.tts, provider_timeout)?;
    info!(
        "STT: {} (fallback {:?}), TTS: {} (fallback {:?})",
        stt.primary_name(),
        stt.fallback_name(),
        tts.primary_name(),
        tts.fallback_name()
    );

    let services = Arc::new(CallServices {
        config: cfg.call.clone(),
        stt,
        tts,
        conversation: ConversationClient::new(&cfg.conversation)?,
        ledger: MetricsLedger::new(),
    });
    let dispatcher = Arc::new(CallDispatcher::new(services));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    let app = create_router(AppState::new(Arc::clone(&dispatcher)));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    let outcomes = dispatcher.shutdown().await;
    info!("Drained {} call(s), exiting", outcomes.len());

    Ok(())
}
