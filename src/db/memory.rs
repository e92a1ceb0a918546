// src/db/memory.rs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::LedgerStore,
    models::finance::{PackageFinancials, VehicleExpense},
    models::scheduling::{DateRange, PackageStatus, ResourceType, ScheduledActivity},
    models::settlement::{DriverCostPackage, DriverDailyRate, LedgerEntry, SettlementRecord},
};

#[derive(Default)]
struct StoreData {
    packages: Vec<PackageFinancials>,
    expenses: Vec<VehicleExpense>,
    charges: Vec<LedgerEntry>,
    settlements: Vec<SettlementRecord>,
    driver_rates: Vec<DriverDailyRate>,
}

/// Implementação em memória do `LedgerStore`. É o dublê usado pela
/// suíte de testes dos serviços; também serve para quem integra o motor
/// e quer testar sem Postgres.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    data: RwLock<StoreData>,
    fail_activities: AtomicBool,
    fail_expenses: AtomicBool,
    package_fetches: AtomicUsize,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_package(&self, package: PackageFinancials) {
        self.data.write().await.packages.push(package);
    }

    pub async fn insert_expense(&self, expense: VehicleExpense) {
        self.data.write().await.expenses.push(expense);
    }

    pub async fn insert_charge(&self, charge: LedgerEntry) {
        self.data.write().await.charges.push(charge);
    }

    pub async fn insert_driver_rate(&self, rate: DriverDailyRate) {
        self.data.write().await.driver_rates.push(rate);
    }

    /// Faz a próxima busca de atividades falhar, simulando o store fora
    /// do ar.
    pub fn fail_activities(&self, fail: bool) {
        self.fail_activities.store(fail, Ordering::SeqCst);
    }

    pub fn fail_expenses(&self, fail: bool) {
        self.fail_expenses.store(fail, Ordering::SeqCst);
    }

    /// Quantas vezes `fetch_package` foi chamado (para observar o cache).
    pub fn package_fetch_count(&self) -> usize {
        self.package_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn fetch_activities_for_resource(
        &self,
        resource: ResourceType,
        resource_id: Uuid,
        dates: &[NaiveDate],
        exclude_package_id: Option<Uuid>,
    ) -> Result<Vec<ScheduledActivity>, AppError> {
        if self.fail_activities.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("falha simulada ao buscar atividades").into());
        }

        let data = self.data.read().await;
        let mut result = Vec::new();

        for package in &data.packages {
            if !package.status.occupies_resources() {
                continue;
            }
            if exclude_package_id == Some(package.id) {
                continue;
            }
            let occupies = match resource {
                ResourceType::Vehicle => package.vehicle_id == Some(resource_id),
                ResourceType::Driver => package.driver_id == Some(resource_id),
            };
            if !occupies {
                continue;
            }
            result.extend(
                package
                    .activities
                    .iter()
                    .filter(|a| dates.contains(&a.scheduled_date))
                    .cloned(),
            );
        }

        Ok(result)
    }

    async fn fetch_package(&self, id: Uuid) -> Result<PackageFinancials, AppError> {
        self.package_fetches.fetch_add(1, Ordering::SeqCst);

        let data = self.data.read().await;
        data.packages
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(AppError::PackageNotFound(id))
    }

    async fn fetch_vehicle_expenses(
        &self,
        vehicle_id: Uuid,
        period: DateRange,
    ) -> Result<Vec<VehicleExpense>, AppError> {
        if self.fail_expenses.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("falha simulada ao buscar despesas").into());
        }

        let data = self.data.read().await;
        Ok(data
            .expenses
            .iter()
            .filter(|e| e.vehicle_id == vehicle_id && period.contains(e.date))
            .cloned()
            .collect())
    }

    async fn fetch_agency_charges(
        &self,
        agency_id: Uuid,
        period: DateRange,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .charges
            .iter()
            .filter(|c| c.agency_id == agency_id && period.contains(c.date))
            .cloned()
            .collect())
    }

    async fn fetch_charges_by_ids(&self, charge_ids: &[Uuid]) -> Result<Vec<LedgerEntry>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .charges
            .iter()
            .filter(|c| charge_ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn persist_settlement_flip(
        &self,
        agency_id: Uuid,
        period: DateRange,
        charge_ids: &[Uuid],
    ) -> Result<(), AppError> {
        // Um único write lock cobre a virada e o registro do lote, como
        // a transação faz no Postgres.
        let mut data = self.data.write().await;

        for charge in data.charges.iter_mut() {
            if charge_ids.contains(&charge.id) {
                charge.paid = true;
            }
        }

        data.settlements.push(SettlementRecord {
            id: Uuid::new_v4(),
            agency_id,
            period,
            charge_ids: charge_ids.to_vec(),
            settled_at: Utc::now(),
        });

        Ok(())
    }

    async fn revert_settlement_flip(&self, charge_ids: &[Uuid]) -> Result<(), AppError> {
        let mut data = self.data.write().await;

        for charge in data.charges.iter_mut() {
            if charge_ids.contains(&charge.id) {
                charge.paid = false;
            }
        }

        Ok(())
    }

    async fn fetch_last_settlement(
        &self,
        agency_id: Uuid,
    ) -> Result<Option<SettlementRecord>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .settlements
            .iter()
            .rev()
            .find(|s| s.agency_id == agency_id)
            .cloned())
    }

    async fn fetch_driver_cost_packages(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Vec<DriverCostPackage>, AppError> {
        let data = self.data.read().await;
        let mut result = Vec::new();

        for package in &data.packages {
            let generates = matches!(
                package.status,
                PackageStatus::Confirmed | PackageStatus::InProgress | PackageStatus::Completed
            );
            if !generates || !package.consider_driver_daily_cost {
                continue;
            }
            let Some(package_driver) = package.driver_id else {
                continue;
            };
            if driver_id.is_some() && driver_id != Some(package_driver) {
                continue;
            }
            if package.start_date > period.end || package.end_date < period.start {
                continue;
            }
            result.push(DriverCostPackage {
                id: package.id,
                driver_id: package_driver,
                start_date: package.start_date,
                end_date: package.end_date,
                driver_daily_rate: package.driver_daily_rate,
            });
        }

        Ok(result)
    }

    async fn fetch_driver_daily_rates(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Vec<DriverDailyRate>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .driver_rates
            .iter()
            .filter(|r| period.contains(r.date))
            .filter(|r| driver_id.is_none() || driver_id == Some(r.driver_id))
            .cloned()
            .collect())
    }

    async fn upsert_driver_daily_rate(
        &self,
        entry: &DriverDailyRate,
    ) -> Result<DriverDailyRate, AppError> {
        let mut data = self.data.write().await;

        if let Some(existing) = data.driver_rates.iter_mut().find(|r| r.id == entry.id) {
            *existing = entry.clone();
        } else {
            data.driver_rates.push(entry.clone());
        }

        Ok(entry.clone())
    }

    async fn set_driver_rate_paid(&self, id: Uuid, paid: bool) -> Result<(), AppError> {
        let mut data = self.data.write().await;
        if let Some(rate) = data.driver_rates.iter_mut().find(|r| r.id == id) {
            rate.paid = paid;
        }
        Ok(())
    }

    async fn delete_driver_daily_rate(&self, id: Uuid) -> Result<(), AppError> {
        let mut data = self.data.write().await;
        data.driver_rates.retain(|r| r.id != id);
        Ok(())
    }
}
