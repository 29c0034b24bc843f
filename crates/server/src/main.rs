#[cfg(not(feature = "lambda"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = t3ext_server::prepare().await?;
    t3ext_server::serve(app).await
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    let app = t3ext_server::prepare().await.map_err(|error| lambda_http::Error::from(error.to_string()))?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        source = app.handler.source_name(),
        "t3ext-server running as a lambda function"
    );
    lambda_http::run(t3ext_server::router(app.handler)).await
}
