mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shelfwatch-cli")]
#[command(about = "Retail shelf extraction workers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process one batch of targets for a site and deliver the artifacts.
    Run {
        /// Site tag from the profile catalog (e.g. `fr`).
        #[arg(long)]
        site: String,
        /// Upper bound on targets pulled for this batch.
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Apply pending database migrations and exit.
    Migrate,
    /// Load and validate configuration and the site catalog.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = shelfwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { site, limit } => run::run_worker(&config, &site, limit).await,
        Commands::Migrate => migrate(&config).await,
        Commands::CheckConfig => check_config(&config),
    }
}

async fn migrate(config: &shelfwatch_core::AppConfig) -> anyhow::Result<()> {
    let pool_config = shelfwatch_db::PoolConfig::from_app_config(config);
    let pool = shelfwatch_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = shelfwatch_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database schema up to date");
    Ok(())
}

fn check_config(config: &shelfwatch_core::AppConfig) -> anyhow::Result<()> {
    config
        .reference_timezone
        .parse::<chrono_tz::Tz>()
        .map_err(|_| {
            anyhow::anyhow!(
                "unknown reference timezone '{}'",
                config.reference_timezone
            )
        })?;
    let sites = shelfwatch_core::load_sites(&config.sites_path)?;
    println!("configuration ok: {} site profiles", sites.sites.len());
    for profile in &sites.sites {
        println!(
            "  {} ({}, {}, grammar {:?})",
            profile.site,
            profile.domain,
            profile.timezone,
            profile.price_grammar()
        );
    }
    println!("{config:#?}");
    Ok(())
}
