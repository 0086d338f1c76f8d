//! Warden demo
//!
//! Loads a static realm, installs it as the process-wide fallback authority,
//! logs a user in on the main thread and hands permission checks to plain
//! worker threads and to tokio tasks. Each unit of work resolves the ambient
//! identity on whatever thread it lands on.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_security::{AuthorityResolver, Credential, Identity, thread_context};

mod work;

#[derive(Parser)]
#[command(name = "warden-demo")]
#[command(about = "Ambient identity propagation across threads and tasks", long_about = None)]
#[command(version)]
struct Cli {
    /// Realm configuration file
    #[arg(short, long, default_value = "apps/warden-demo/config/warden.yaml")]
    config: PathBuf,

    #[arg(short, long, default_value = "alice")]
    user: String,

    #[arg(short, long, default_value = "wonderland")]
    password: String,

    /// Host the login claims to originate from
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    remember_me: bool,

    /// Permission to check from every worker (repeatable)
    #[arg(long = "permission", default_values = ["docs:read", "docs:write"])]
    permissions: Vec<String>,

    /// Number of worker threads and of tokio tasks
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn login(cli: &Cli) -> anyhow::Result<Identity> {
    let identity = warden_security::resolve_identity()?;
    info!(state = ?identity.state(), "Resolved ambient identity");

    let mut credential =
        Credential::new(cli.user.as_str(), cli.password.clone()).with_remember_me(cli.remember_me);
    if let Some(host) = &cli.host {
        credential = credential.with_host(host.as_str());
    }
    identity
        .login(&credential)
        .with_context(|| format!("login failed for {}", cli.user))?;

    info!(
        principal = ?identity.primary_principal(),
        session_id = ?identity.session_id(),
        state = ?identity.state(),
        "Logged in"
    );
    Ok(identity)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let cfg = static_realm::StaticRealmConfig::load(&cli.config)?;
    let authority = static_realm::build_authority(&cfg);
    let _fallback = AuthorityResolver::global().install(authority);

    let identity = login(&cli)?;
    let permissions: Arc<[String]> = cli.permissions.into();

    let thread_reports = work::on_threads(&identity, cli.workers, &permissions)?;
    let task_reports = work::on_tasks(&identity, cli.workers, &permissions).await?;

    for report in thread_reports.iter().chain(&task_reports) {
        if report.principal.as_deref() != Some(cli.user.as_str()) {
            warn!(worker = %report.worker, "Worker resolved a different identity");
        }
        info!(
            worker = %report.worker,
            principal = ?report.principal,
            granted = ?report.granted,
            denied = ?report.denied,
            "Worker report"
        );
    }

    identity.logout();
    info!(state = ?identity.state(), "Logged out");
    thread_context::clear();
    Ok(())
}
