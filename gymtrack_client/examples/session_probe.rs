use clap::Parser;
use gymtrack_client::session::store::FileCredentialStore;
use gymtrack_client::session::SessionStatus;
use gymtrack_client::{ClientConfig, GymClient, Service};
use std::sync::Arc;

#[derive(Debug, Parser)]
struct Opts {
    /// Base address of the primary backend service
    #[arg(short, long, env = "BACKEND_BASE_URL")]
    backend_url: Option<reqwest::Url>,

    /// Base address of the assistant service
    #[arg(short, long, env = "LLM_SERVICE_BASE_URL")]
    assistant_url: Option<reqwest::Url>,

    /// The local file used to persist the credential
    #[arg(short = 'f', long, env, value_name = "FILE", default_value = ".credential.json")]
    credentials_file: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let config = match (opts.backend_url, opts.assistant_url) {
        (Some(backend), Some(assistant)) => ClientConfig::with_base_urls(backend, assistant),
        _ => ClientConfig::from_env()?,
    };

    let store = Arc::new(FileCredentialStore::new(opts.credentials_file));
    let client = GymClient::with_store(config, store)?;

    for service in [Service::Backend, Service::Assistant] {
        let healthy = client.check_service_health(service).await;
        tracing::info!(service = %service, healthy, "probed service");
    }

    let mut session = client.session_updates();
    tokio::spawn(async move {
        while session.changed().await.is_ok() {
            if *session.borrow() == SessionStatus::Expired {
                tracing::error!("session expired, a new login is required");
            }
        }
    });

    let exercises = client.exercises().list().await?;
    tracing::info!(count = exercises.len(), "fetched exercise catalog");
    for exercise in exercises.iter().take(5) {
        tracing::info!(name = %exercise.name, group = ?exercise.muscle_group, "exercise");
    }

    Ok(())
}
