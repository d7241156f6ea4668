//! Service wiring: configuration, repository selection, engine.

use std::sync::Arc;

use anyhow::{Context, bail};

use medibook_auth::StaticSession;
use medibook_core::SystemClock;
use medibook_infra::{
    AppointmentRepository, BookingEngine, ClinicConfig, InMemoryAppointmentRepository,
    PostgresAppointmentRepository,
};

pub const USE_PERSISTENT_STORES_VAR: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Engine as wired by the binary: any repository, wall clock.
pub type Engine = BookingEngine<Arc<dyn AppointmentRepository>, SystemClock>;

/// Which repository backs the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    InMemory,
    Postgres { database_url: String },
}

impl StoreSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let use_persistent = lookup(USE_PERSISTENT_STORES_VAR)
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(false);

        if !use_persistent {
            return Ok(StoreSettings::InMemory);
        }

        match lookup(DATABASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            Some(database_url) => Ok(StoreSettings::Postgres { database_url }),
            None => bail!("{DATABASE_URL_VAR} must be set when {USE_PERSISTENT_STORES_VAR}=true"),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            StoreSettings::InMemory => "in-memory",
            StoreSettings::Postgres { .. } => "postgres",
        }
    }
}

/// Everything one front-desk terminal needs.
pub struct AppServices {
    pub config: ClinicConfig,
    pub engine: Engine,
    pub session: Arc<StaticSession>,
    pub backend: &'static str,
}

pub async fn build_services() -> anyhow::Result<AppServices> {
    let config = ClinicConfig::from_env().context("loading clinic configuration")?;
    let stores = StoreSettings::from_env()?;
    build_services_with(config, stores).await
}

pub async fn build_services_with(
    config: ClinicConfig,
    stores: StoreSettings,
) -> anyhow::Result<AppServices> {
    let backend = stores.backend();
    let repository: Arc<dyn AppointmentRepository> = match stores {
        StoreSettings::InMemory => Arc::new(InMemoryAppointmentRepository::new()),
        StoreSettings::Postgres { database_url } => {
            let repo = PostgresAppointmentRepository::connect(&database_url)
                .await
                .context("connecting to Postgres")?;
            repo.migrate().await.context("applying appointment schema")?;
            Arc::new(repo)
        }
    };

    tracing::info!(backend, "appointment repository ready");

    Ok(AppServices {
        config,
        engine: BookingEngine::new(repository, SystemClock, config),
        session: Arc::new(StaticSession::new()),
        backend,
    })
}
