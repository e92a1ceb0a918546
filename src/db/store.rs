// src/db/store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{PackageFinancials, VehicleExpense},
    models::scheduling::{DateRange, ResourceType, ScheduledActivity},
    models::settlement::{DriverCostPackage, DriverDailyRate, LedgerEntry, SettlementRecord},
};

/// Contrato de persistência consumido pelos serviços. A camada de
/// persistência é um colaborador externo: o motor só conhece este trait.
///
/// Falhas de acesso são fatais para a operação em andamento e devem ser
/// propagadas; nenhum método pode degradar para uma lista vazia.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Atividades já comprometidas (pacotes confirmados ou em andamento)
    /// do recurso nas datas pedidas, ignorando `exclude_package_id`.
    async fn fetch_activities_for_resource(
        &self,
        resource: ResourceType,
        resource_id: Uuid,
        dates: &[NaiveDate],
        exclude_package_id: Option<Uuid>,
    ) -> Result<Vec<ScheduledActivity>, AppError>;

    /// Pacote com diária do motorista e atividades (com valor NET da
    /// atração) já juntadas.
    async fn fetch_package(&self, id: Uuid) -> Result<PackageFinancials, AppError>;

    async fn fetch_vehicle_expenses(
        &self,
        vehicle_id: Uuid,
        period: DateRange,
    ) -> Result<Vec<VehicleExpense>, AppError>;

    // --- Fechamento por agência ---

    async fn fetch_agency_charges(
        &self,
        agency_id: Uuid,
        period: DateRange,
    ) -> Result<Vec<LedgerEntry>, AppError>;

    async fn fetch_charges_by_ids(&self, charge_ids: &[Uuid]) -> Result<Vec<LedgerEntry>, AppError>;

    /// Marca as cobranças como pagas e registra o lote, tudo em uma
    /// única transação.
    async fn persist_settlement_flip(
        &self,
        agency_id: Uuid,
        period: DateRange,
        charge_ids: &[Uuid],
    ) -> Result<(), AppError>;

    /// Reverte as cobranças para pendente, atomicamente.
    async fn revert_settlement_flip(&self, charge_ids: &[Uuid]) -> Result<(), AppError>;

    async fn fetch_last_settlement(
        &self,
        agency_id: Uuid,
    ) -> Result<Option<SettlementRecord>, AppError>;

    // --- Diárias de motorista ---

    /// Pacotes que geram diária automática no período (com motorista
    /// atribuído e `consider_driver_daily_cost` ligado).
    async fn fetch_driver_cost_packages(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Vec<DriverCostPackage>, AppError>;

    async fn fetch_driver_daily_rates(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Vec<DriverDailyRate>, AppError>;

    async fn upsert_driver_daily_rate(
        &self,
        entry: &DriverDailyRate,
    ) -> Result<DriverDailyRate, AppError>;

    async fn set_driver_rate_paid(&self, id: Uuid, paid: bool) -> Result<(), AppError>;

    async fn delete_driver_daily_rate(&self, id: Uuid) -> Result<(), AppError>;
}
