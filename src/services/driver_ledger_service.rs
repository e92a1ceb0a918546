// src/services/driver_ledger_service.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::scheduling::DateRange,
    models::settlement::{DriverDailyRate, LedgerEntryKind, NewDriverDailyRate},
};

#[derive(Clone)]
pub struct DriverLedgerService {
    store: Arc<dyn LedgerStore>,
}

impl DriverLedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Diárias do período: uma entrada automática por dia de pacote que
    /// considera diária de motorista, mesclada com as diárias salvas.
    /// Uma diária salva para o mesmo (motorista, pacote, data) substitui
    /// a gerada — o status de pagamento vem sempre da linha salva.
    pub async fn daily_rates_for_period(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Vec<DriverDailyRate>, AppError> {
        let packages = self.store.fetch_driver_cost_packages(driver_id, period).await?;
        let stored = self.store.fetch_driver_daily_rates(driver_id, period).await?;

        let stored_keys: HashSet<(Uuid, Option<Uuid>, NaiveDate)> = stored
            .iter()
            .map(|r| (r.driver_id, r.package_id, r.date))
            .collect();

        let mut rates: Vec<DriverDailyRate> = Vec::new();

        for package in &packages {
            // Só os dias do pacote que caem dentro do período pedido
            let mut day = package.start_date.max(period.start);
            let last = package.end_date.min(period.end);

            while day <= last {
                if !stored_keys.contains(&(package.driver_id, Some(package.id), day)) {
                    rates.push(DriverDailyRate {
                        id: Uuid::new_v4(),
                        kind: LedgerEntryKind::Automatic,
                        driver_id: package.driver_id,
                        package_id: Some(package.id),
                        date: day,
                        amount: package.driver_daily_rate,
                        paid: false,
                        is_substitute: false,
                        notes: None,
                    });
                }
                let Some(next) = day.succ_opt() else { break };
                day = next;
            }
        }

        rates.extend(stored);
        rates.sort_by(|a, b| (a.date, a.driver_id).cmp(&(b.date, b.driver_id)));

        Ok(rates)
    }

    /// Soma das diárias ainda não pagas no período.
    pub async fn pending_total(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Decimal, AppError> {
        let rates = self.daily_rates_for_period(driver_id, period).await?;
        Ok(rates.iter().filter(|r| !r.paid).map(|r| r.amount).sum())
    }

    /// Cadastra uma diária manual (avulsa ou de substituto).
    pub async fn save_manual_rate(
        &self,
        payload: NewDriverDailyRate,
    ) -> Result<DriverDailyRate, AppError> {
        payload.validate()?;

        let entry = DriverDailyRate {
            id: Uuid::new_v4(),
            kind: LedgerEntryKind::Manual,
            driver_id: payload.driver_id,
            package_id: payload.package_id,
            date: payload.date,
            amount: payload.amount,
            paid: payload.paid,
            is_substitute: payload.is_substitute,
            notes: payload.notes,
        };

        let saved = self.store.upsert_driver_daily_rate(&entry).await?;
        tracing::info!(motorista = %saved.driver_id, data = %saved.date, "diária manual cadastrada");
        Ok(saved)
    }

    pub async fn set_paid(&self, id: Uuid, paid: bool) -> Result<(), AppError> {
        self.store.set_driver_rate_paid(id, paid).await
    }

    pub async fn delete_rate(&self, id: Uuid) -> Result<(), AppError> {
        self.store.delete_driver_daily_rate(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryLedgerStore;
    use crate::models::finance::PackageFinancials;
    use crate::models::scheduling::PackageStatus;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn october() -> DateRange {
        DateRange::new(date("2024-10-01"), date("2024-10-31"))
    }

    fn driver_package(
        driver_id: Uuid,
        start: &str,
        end: &str,
        daily_rate: i64,
    ) -> PackageFinancials {
        PackageFinancials {
            id: Uuid::new_v4(),
            agency_id: None,
            vehicle_id: Some(Uuid::new_v4()),
            driver_id: Some(driver_id),
            status: PackageStatus::Confirmed,
            start_date: date(start),
            end_date: date(end),
            daily_service_rate: Decimal::from(100),
            consider_driver_daily_cost: true,
            driver_daily_rate: Decimal::from(daily_rate),
            activities: vec![],
        }
    }

    async fn service_with(packages: Vec<PackageFinancials>) -> (DriverLedgerService, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        for package in packages {
            store.insert_package(package).await;
        }
        (DriverLedgerService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn gera_uma_diaria_automatica_por_dia_de_pacote() {
        let driver = Uuid::new_v4();
        let (service, _store) =
            service_with(vec![driver_package(driver, "2024-10-10", "2024-10-12", 50)]).await;

        let rates = service.daily_rates_for_period(None, october()).await.unwrap();

        assert_eq!(rates.len(), 3);
        assert!(rates.iter().all(|r| r.kind == LedgerEntryKind::Automatic));
        assert!(rates.iter().all(|r| r.amount == Decimal::from(50)));
        assert!(rates.iter().all(|r| !r.paid));
        assert_eq!(rates[0].date, date("2024-10-10"));
        assert_eq!(rates[2].date, date("2024-10-12"));
    }

    #[tokio::test]
    async fn diaria_salva_substitui_a_gerada() {
        let driver = Uuid::new_v4();
        let (service, store) =
            service_with(vec![driver_package(driver, "2024-10-10", "2024-10-11", 50)]).await;

        let package_id = {
            let packages = store
                .fetch_driver_cost_packages(None, october())
                .await
                .unwrap();
            packages[0].id
        };

        // Diária do dia 10 já foi salva (e paga) com valor negociado
        store
            .insert_driver_rate(DriverDailyRate {
                id: Uuid::new_v4(),
                kind: LedgerEntryKind::Manual,
                driver_id: driver,
                package_id: Some(package_id),
                date: date("2024-10-10"),
                amount: Decimal::from(65),
                paid: true,
                is_substitute: false,
                notes: None,
            })
            .await;

        let rates = service.daily_rates_for_period(None, october()).await.unwrap();

        assert_eq!(rates.len(), 2);
        let day_ten = rates.iter().find(|r| r.date == date("2024-10-10")).unwrap();
        assert_eq!(day_ten.kind, LedgerEntryKind::Manual);
        assert_eq!(day_ten.amount, Decimal::from(65));
        assert!(day_ten.paid);

        let day_eleven = rates.iter().find(|r| r.date == date("2024-10-11")).unwrap();
        assert_eq!(day_eleven.kind, LedgerEntryKind::Automatic);
    }

    #[tokio::test]
    async fn diaria_avulsa_sem_pacote_entra_na_lista() {
        let driver = Uuid::new_v4();
        let (service, store) = service_with(vec![]).await;

        store
            .insert_driver_rate(DriverDailyRate {
                id: Uuid::new_v4(),
                kind: LedgerEntryKind::Manual,
                driver_id: driver,
                package_id: None,
                date: date("2024-10-05"),
                amount: Decimal::from(90),
                paid: false,
                is_substitute: true,
                notes: Some("cobriu a folga do titular".into()),
            })
            .await;

        let rates = service.daily_rates_for_period(None, october()).await.unwrap();
        assert_eq!(rates.len(), 1);
        assert!(rates[0].is_substitute);
    }

    #[tokio::test]
    async fn total_pendente_ignora_diarias_pagas() {
        let driver = Uuid::new_v4();
        let (service, store) =
            service_with(vec![driver_package(driver, "2024-10-10", "2024-10-11", 50)]).await;

        let package_id = {
            let packages = store
                .fetch_driver_cost_packages(None, october())
                .await
                .unwrap();
            packages[0].id
        };

        store
            .insert_driver_rate(DriverDailyRate {
                id: Uuid::new_v4(),
                kind: LedgerEntryKind::Manual,
                driver_id: driver,
                package_id: Some(package_id),
                date: date("2024-10-10"),
                amount: Decimal::from(50),
                paid: true,
                is_substitute: false,
                notes: None,
            })
            .await;

        let total = service.pending_total(None, october()).await.unwrap();
        assert_eq!(total, Decimal::from(50));
    }

    #[tokio::test]
    async fn filtra_por_motorista() {
        let driver_a = Uuid::new_v4();
        let driver_b = Uuid::new_v4();
        let (service, _store) = service_with(vec![
            driver_package(driver_a, "2024-10-10", "2024-10-10", 50),
            driver_package(driver_b, "2024-10-10", "2024-10-10", 70),
        ])
        .await;

        let rates = service
            .daily_rates_for_period(Some(driver_a), october())
            .await
            .unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].driver_id, driver_a);
    }

    #[tokio::test]
    async fn dias_fora_do_periodo_nao_geram_diaria() {
        let driver = Uuid::new_v4();
        // Pacote atravessa a virada do mês
        let (service, _store) =
            service_with(vec![driver_package(driver, "2024-10-30", "2024-11-02", 50)]).await;

        let rates = service.daily_rates_for_period(None, october()).await.unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].date, date("2024-10-30"));
        assert_eq!(rates[1].date, date("2024-10-31"));
    }

    #[tokio::test]
    async fn diaria_manual_com_valor_invalido_e_rejeitada() {
        let (service, _store) = service_with(vec![]).await;

        let result = service
            .save_manual_rate(NewDriverDailyRate {
                driver_id: Uuid::new_v4(),
                package_id: None,
                date: date("2024-10-05"),
                amount: Decimal::ZERO,
                paid: false,
                is_substitute: false,
                notes: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn marcar_como_paga_persiste() {
        let (service, store) = service_with(vec![]).await;

        let saved = service
            .save_manual_rate(NewDriverDailyRate {
                driver_id: Uuid::new_v4(),
                package_id: None,
                date: date("2024-10-05"),
                amount: Decimal::from(80),
                paid: false,
                is_substitute: false,
                notes: None,
            })
            .await
            .unwrap();

        service.set_paid(saved.id, true).await.unwrap();

        let rates = store
            .fetch_driver_daily_rates(None, october())
            .await
            .unwrap();
        assert!(rates[0].paid);
    }
}
