//! ssr-lambda entry point.
//!
//! Runs under the Lambda runtime when `AWS_LAMBDA_RUNTIME_API` is set and as
//! a local HTTP server otherwise. Manifests are read from `SSR_MANIFEST_DIR`.

use ssr_lambda::prelude::*;
use ssr_lambda::runtime;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[page(path = "pages/404.js", description = "Server-rendered not found page")]
async fn not_found(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    Ok(RenderOutput::html(format!(
        "<!DOCTYPE html><html><body><h1>404</h1><p>{} could not be found.</p></body></html>",
        ctx.path
    ))
    .with_status(404))
}

#[page(path = "pages/posts/[id].js", description = "Post detail")]
async fn post(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    let id = ctx
        .param("id")
        .ok_or_else(|| PageError::render("missing id parameter"))?;
    let props = serde_json::json!({ "pageProps": { "id": id } });

    RenderOutput::html(format!(
        "<!DOCTYPE html><html><body><h1>Post {id}</h1></body></html>"
    ))
    .with_page_data(&props)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RuntimeConfig::from_env();
    let manifests = Manifests::load_dir(&config.manifest_dir)?;
    tracing::info!(
        build_id = %manifests.build_id(),
        bucket = %manifests.build.bucket_name,
        "Loaded manifests from {}",
        config.manifest_dir.display()
    );

    let pages = PageRegistry::new();
    pages.register(Box::new(NotFoundPage::new())).await?;
    pages.register(Box::new(PostPage::new())).await?;
    tracing::info!("Registered pages: {:?}", pages.list().await);

    let controller = Arc::new(DispatchController::new(Arc::new(manifests), Arc::new(pages)));

    if RuntimeConfig::in_lambda() {
        tracing::info!("Starting Lambda runtime...");
        runtime::lambda::run(controller).await
    } else {
        tracing::info!("Starting dev server...");
        DevServer::new(config, controller).run().await
    }
}
