// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    cache::TtlCache,
    db::{LedgerStore, PgLedgerStore},
    services::{AvailabilityService, DriverLedgerService, FinanceService, SettlementService},
};

/// Inicializa o logger. Chame uma única vez, no início do binário que
/// embute o motor.
pub fn init_tracing() {
    tracing_subscriber::fmt().with_target(false).compact().init();
}

/// Configurações carregadas do ambiente.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub finance_cache_ttl: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        // TTL do cache de resumos financeiros, em segundos
        let cache_ttl_secs = env::var("FINANCE_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Ok(Self {
            database_url,
            max_connections,
            finance_cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }
}

// O estado compartilhado que a camada de cima (UI, relatórios) enxerga
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub availability_service: AvailabilityService,
    pub finance_service: FinanceService,
    pub settlement_service: SettlementService,
    pub driver_ledger_service: DriverLedgerService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(db_pool.clone()));
        let finance_cache = Arc::new(TtlCache::new(settings.finance_cache_ttl));

        Ok(Self {
            db_pool,
            availability_service: AvailabilityService::new(store.clone()),
            finance_service: FinanceService::new(store.clone(), finance_cache),
            settlement_service: SettlementService::new(store.clone()),
            driver_ledger_service: DriverLedgerService::new(store),
        })
    }
}
