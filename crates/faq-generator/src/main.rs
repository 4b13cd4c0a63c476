mod archive;
mod cache;
mod config;
mod error;
mod format;
mod generator;
mod model;
mod parser;
mod server;
mod service;
mod store;
mod validation;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use faq_common::openai::{OpenAiClient, OpenAiClientConfig};
use faq_common::redis::RedisCache;
use faq_common::supabase::{SupabaseClient, SupabaseConfig};

use cache::FaqCache;
use config::Config;
use server::FaqGeneratorServer;
use service::FaqService;
use store::SupabaseBackend;
use validation::LlmValidator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal; the real environment still applies.
    let dotenv = dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!(dotenv = ?dotenv, "starting faq-generator MCP server");

    let config = Config::from_env()?;
    info!(
        supabase_url = %config.supabase_url,
        table = %config.faq_table,
        screenshot_bucket = %config.screenshot_bucket,
        document_bucket = %config.document_bucket,
        llm_model = %config.llm_model,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let redis_cache = RedisCache::new(config.redis_url.as_deref());
    if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }
    let cache = Arc::new(FaqCache::new(redis_cache));

    let supabase = SupabaseClient::new(
        SupabaseConfig::new(&config.supabase_url, &config.supabase_key)
            .with_timeout(config.supabase_timeout),
    )?;
    let backend = Arc::new(SupabaseBackend::new(
        supabase,
        config.faq_table.clone(),
        config.screenshot_bucket.clone(),
        config.document_bucket.clone(),
    ));

    let llm_config = OpenAiClientConfig::from_env();
    info!(base_url = %llm_config.base_url, "llm client configured");
    let llm = Arc::new(OpenAiClient::new(llm_config)?);
    let validator = Arc::new(LlmValidator::new(llm, config.llm_model.clone()));

    let service = Arc::new(FaqService::new(
        backend.clone(),
        backend.clone(),
        backend,
        validator,
        cache,
    ));
    let server = FaqGeneratorServer::new(service);

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
