use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = scs_mission::config::load()?;
    scs_mission::logging::init_tracing(&settings.logger);

    tracing::info!(mode = %settings.server.mode, "starting scs-mission");

    let ax = scs_mission::build(&settings).await?;
    let addr = settings.server.addr();

    ax.listen(addr, settings.server.shutdown_timeout).await?;

    Ok(())
}
