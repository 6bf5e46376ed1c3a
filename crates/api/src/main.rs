use stockroom_api::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let settings = Settings::load()?;
    let app = stockroom_api::app::build_app(&settings)?;

    let listener = tokio::net::TcpListener::bind(settings.bind_address()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
