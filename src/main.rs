mod config;
mod derive;
mod desired;
mod errors;
mod identity;
mod live;
mod merge;
mod models;
mod reconcile;
mod remote;
mod workbook;

use anyhow::bail;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use identity::IdentityResolver;
use remote::{MistClient, ResourceKind};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evpn_fabric=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let cfg = Config::load()?.with_workbook_dir(std::env::args().nth(1));
    tracing::info!("Starting EVPN fabric reconciler");
    tracing::info!("API: {}", cfg.api_url);
    tracing::info!("Workbook: {}", cfg.workbook_dir.display());

    // Validate the whole workbook before talking to the API
    let workbook = workbook::read_workbook(&cfg.workbook_dir)?;
    let built = match desired::build(&workbook) {
        Ok(built) => built,
        Err(errors) => {
            for e in &errors {
                tracing::error!("{}", e);
            }
            let report = serde_json::json!({
                "message": "workbook validation failed; nothing was changed",
                "errors": errors,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            bail!("workbook has {} validation error(s)", errors.len());
        }
    };
    for warning in &built.warnings {
        tracing::warn!("{}", warning);
    }

    let client = MistClient::new(
        cfg.api_url.clone(),
        cfg.api_token.clone(),
        cfg.org_id.clone(),
        cfg.timeout,
    )?;
    if !client.test_connection().await {
        bail!("cannot reach the Mist API at {}", cfg.api_url);
    }

    // Everything else is site-scoped, so a missing site ends the run
    let site_name = built.state.settings.site_name.clone();
    let site_id = IdentityResolver::new(&client)
        .require(ResourceKind::Site, &site_name)
        .await?;
    tracing::info!("Site '{}' -> {}", site_name, site_id);
    let client = client.with_site(&site_id);

    let mut outcome = reconcile::run(&client, &built.state, &site_id).await;
    outcome
        .report
        .warnings
        .extend(built.warnings.iter().map(ToString::to_string));

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    if !outcome.report.is_success() {
        bail!("{}", outcome.report.message);
    }
    Ok(())
}
