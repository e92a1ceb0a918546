// src/services/availability_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::scheduling::{
        AvailabilityRequest, CandidateActivity, ResourceType, ScheduledActivity, ValidationResult,
    },
};

/// Folga mínima entre atividades com horário, em minutos, antes do
/// início e depois do fim.
const CONFLICT_BUFFER_MINUTES: i64 = 30;

// Entrada com horário na checagem de janelas. Os cálculos ficam em
// minutos (i64) para a folga poder atravessar a meia-noite sem o
// wrapping de NaiveTime.
struct TimedEntry {
    start_min: i64,
    duration_min: i64,
    time: NaiveTime,
}

impl TimedEntry {
    fn new(time: NaiveTime, duration_minutes: i32) -> Self {
        Self {
            start_min: i64::from(time.hour()) * 60 + i64::from(time.minute()),
            duration_min: i64::from(duration_minutes),
            time,
        }
    }
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn LedgerStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Valida se um pacote pode ser criado/atualizado sem conflito de
    /// veículo ou de motorista. Não altera estado algum; chamadas
    /// repetidas sem escrita no meio devolvem o mesmo resultado.
    ///
    /// Falha de acesso ao store aborta a validação inteira — nunca é
    /// interpretada como "sem conflito".
    pub async fn check_package(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<ValidationResult, AppError> {
        request.validate()?;

        let mut dates: Vec<NaiveDate> = request
            .activities
            .iter()
            .map(|a| a.scheduled_date)
            .collect();
        dates.sort_unstable();
        dates.dedup();

        let vehicle_conflicts = self
            .check_resource(
                ResourceType::Vehicle,
                request.vehicle_id,
                &dates,
                &request.activities,
                request.exclude_package_id,
            )
            .await?;

        let driver_conflicts = self
            .check_resource(
                ResourceType::Driver,
                request.driver_id,
                &dates,
                &request.activities,
                request.exclude_package_id,
            )
            .await?;

        let is_valid = vehicle_conflicts.is_empty() && driver_conflicts.is_empty();
        if !is_valid {
            tracing::info!(
                veiculo = vehicle_conflicts.len(),
                motorista = driver_conflicts.len(),
                "pacote reprovado na verificação de disponibilidade"
            );
        }

        Ok(ValidationResult {
            is_valid,
            vehicle_conflicts,
            driver_conflicts,
        })
    }

    // Veículo e motorista são verificados de forma independente: os dois
    // podem acusar conflito na mesma data.
    async fn check_resource(
        &self,
        resource: ResourceType,
        resource_id: Uuid,
        dates: &[NaiveDate],
        candidates: &[CandidateActivity],
        exclude_package_id: Option<Uuid>,
    ) -> Result<Vec<String>, AppError> {
        let existing = self
            .store
            .fetch_activities_for_resource(resource, resource_id, dates, exclude_package_id)
            .await
            .inspect_err(|e| {
                tracing::error!(?resource, %resource_id, "falha ao buscar atividades comprometidas: {e}");
            })?;

        let mut existing_by_date: HashMap<NaiveDate, Vec<&ScheduledActivity>> = HashMap::new();
        for activity in &existing {
            existing_by_date
                .entry(activity.scheduled_date)
                .or_default()
                .push(activity);
        }

        let mut conflicts = Vec::new();

        for date in dates {
            let candidates_today: Vec<&CandidateActivity> = candidates
                .iter()
                .filter(|a| a.scheduled_date == *date)
                .collect();
            let existing_today = existing_by_date.get(date).map_or(&[][..], Vec::as_slice);

            // 1. Dia inteiro já reservado bloqueia qualquer atividade
            if existing_today.iter().any(|a| a.is_full_day()) {
                conflicts.push(format!("{date}: já existe reserva de dia inteiro"));
                continue;
            }

            // 2. Candidato de dia inteiro não cabe em dia já ocupado
            if candidates_today.iter().any(|a| !a.consider_net_value)
                && !existing_today.is_empty()
            {
                conflicts.push(format!(
                    "{date}: não é possível reservar o dia inteiro com atividades já agendadas"
                ));
                continue;
            }

            // 3. Todas com horário: checa as janelas com folga
            let mut timed: Vec<TimedEntry> = Vec::new();
            for activity in existing_today {
                if let Some(time) = activity.start_time {
                    timed.push(TimedEntry::new(time, activity.duration_minutes));
                }
            }
            for candidate in &candidates_today {
                if !candidate.consider_net_value {
                    continue;
                }
                if let Some(time) = candidate.start_time {
                    timed.push(TimedEntry::new(time, candidate.duration_minutes));
                }
            }
            timed.sort_by_key(|e| e.start_min);

            for pair in timed.windows(2) {
                let (current, next) = (&pair[0], &pair[1]);
                // Janela da atividade corrente com folga dos dois lados,
                // meio-aberta no fim. O próximo entra só com o horário
                // de início, sem a própria duração.
                let window_start = current.start_min - CONFLICT_BUFFER_MINUTES;
                let window_end = current.start_min + current.duration_min + CONFLICT_BUFFER_MINUTES;

                if next.start_min >= window_start && next.start_min < window_end {
                    conflicts.push(format!(
                        "{date}: conflito de horário entre {} e {} (folga mínima de {} minutos)",
                        current.time.format("%H:%M"),
                        next.time.format("%H:%M"),
                        CONFLICT_BUFFER_MINUTES,
                    ));
                }
            }
        }

        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryLedgerStore;
    use crate::models::finance::PackageFinancials;
    use crate::models::scheduling::PackageStatus;
    use rust_decimal::Decimal;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn activity(
        package_id: Uuid,
        day: &str,
        start: Option<NaiveTime>,
        duration_minutes: i32,
        net: bool,
    ) -> ScheduledActivity {
        ScheduledActivity {
            id: Uuid::new_v4(),
            package_id,
            attraction_id: Uuid::new_v4(),
            attraction_name: "Gruta do Lago Azul".into(),
            scheduled_date: date(day),
            start_time: start,
            duration_minutes,
            consider_net_value: net,
            net_value: Decimal::from(100),
            notes: None,
        }
    }

    fn committed_package(
        vehicle_id: Uuid,
        driver_id: Uuid,
        activities: Vec<ScheduledActivity>,
    ) -> PackageFinancials {
        PackageFinancials {
            id: activities.first().map(|a| a.package_id).unwrap_or_else(Uuid::new_v4),
            agency_id: None,
            vehicle_id: Some(vehicle_id),
            driver_id: Some(driver_id),
            status: PackageStatus::Confirmed,
            start_date: date("2024-10-01"),
            end_date: date("2024-10-31"),
            daily_service_rate: Decimal::from(100),
            consider_driver_daily_cost: false,
            driver_daily_rate: Decimal::ZERO,
            activities,
        }
    }

    fn candidate(day: &str, start: Option<NaiveTime>, duration: i32, net: bool) -> CandidateActivity {
        CandidateActivity {
            scheduled_date: date(day),
            start_time: start,
            duration_minutes: duration,
            consider_net_value: net,
        }
    }

    fn request(
        vehicle_id: Uuid,
        driver_id: Uuid,
        activities: Vec<CandidateActivity>,
    ) -> AvailabilityRequest {
        AvailabilityRequest {
            vehicle_id,
            driver_id,
            activities,
            exclude_package_id: None,
        }
    }

    async fn service_with(packages: Vec<PackageFinancials>) -> (AvailabilityService, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        for package in packages {
            store.insert_package(package).await;
        }
        (AvailabilityService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn dia_inteiro_bloqueia_qualquer_atividade() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let other_driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        let (service, _store) = service_with(vec![committed_package(
            vehicle,
            other_driver,
            vec![activity(pkg, "2024-10-10", None, 0, false)],
        )])
        .await;

        let result = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-10", Some(hm(9, 0)), 60, true)],
            ))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.vehicle_conflicts.len(), 1);
        assert!(result.vehicle_conflicts[0].starts_with("2024-10-10:"));
        assert!(result.driver_conflicts.is_empty());
    }

    #[tokio::test]
    async fn candidato_de_dia_inteiro_nao_cabe_em_dia_ocupado() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        let (service, _store) = service_with(vec![committed_package(
            vehicle,
            Uuid::new_v4(),
            vec![activity(pkg, "2024-10-12", Some(hm(9, 0)), 60, true)],
        )])
        .await;

        let result = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-12", None, 0, false)],
            ))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.vehicle_conflicts.len(), 1);
    }

    #[tokio::test]
    async fn janela_com_folga_acusa_sobreposicao() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        // Atividade existente 09:00 + 60min: janela [08:30, 10:30)
        let (service, _store) = service_with(vec![committed_package(
            vehicle,
            Uuid::new_v4(),
            vec![activity(pkg, "2024-10-15", Some(hm(9, 0)), 60, true)],
        )])
        .await;

        let result = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-15", Some(hm(10, 0)), 60, true)],
            ))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.vehicle_conflicts.len(), 1);
        assert!(result.vehicle_conflicts[0].contains("conflito de horário"));
    }

    #[tokio::test]
    async fn limite_da_janela_e_meio_aberto() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        let (service, _store) = service_with(vec![committed_package(
            vehicle,
            Uuid::new_v4(),
            vec![activity(pkg, "2024-10-15", Some(hm(9, 0)), 60, true)],
        )])
        .await;

        // 10:30 é exatamente o fim da janela: não conflita
        let at_boundary = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-15", Some(hm(10, 30)), 60, true)],
            ))
            .await
            .unwrap();
        assert!(at_boundary.is_valid);

        let after_boundary = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-15", Some(hm(10, 31)), 60, true)],
            ))
            .await
            .unwrap();
        assert!(after_boundary.is_valid);

        let inside = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-15", Some(hm(10, 29)), 60, true)],
            ))
            .await
            .unwrap();
        assert!(!inside.is_valid);
    }

    #[tokio::test]
    async fn duracao_zero_degrada_para_checagem_pontual() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        // Duração desconhecida: janela [08:30, 09:30)
        let (service, _store) = service_with(vec![committed_package(
            vehicle,
            Uuid::new_v4(),
            vec![activity(pkg, "2024-10-15", Some(hm(9, 0)), 0, true)],
        )])
        .await;

        let inside = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-15", Some(hm(9, 20)), 60, true)],
            ))
            .await
            .unwrap();
        assert!(!inside.is_valid);

        let outside = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-15", Some(hm(9, 30)), 60, true)],
            ))
            .await
            .unwrap();
        assert!(outside.is_valid);
    }

    #[tokio::test]
    async fn motorista_e_veiculo_sao_independentes() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        // O motorista está ocupado em outro veículo
        let (service, _store) = service_with(vec![committed_package(
            Uuid::new_v4(),
            driver,
            vec![activity(pkg, "2024-10-20", None, 0, false)],
        )])
        .await;

        let result = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-20", Some(hm(9, 0)), 60, true)],
            ))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert!(result.vehicle_conflicts.is_empty());
        assert_eq!(result.driver_conflicts.len(), 1);
    }

    #[tokio::test]
    async fn edicao_ignora_o_proprio_pacote() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        let (service, _store) = service_with(vec![committed_package(
            vehicle,
            driver,
            vec![activity(pkg, "2024-10-22", None, 0, false)],
        )])
        .await;

        let mut req = request(
            vehicle,
            driver,
            vec![candidate("2024-10-22", None, 0, false)],
        );
        req.exclude_package_id = Some(pkg);

        let result = service.check_package(&req).await.unwrap();
        assert!(result.is_valid);
    }

    #[tokio::test]
    async fn candidatos_entre_si_tambem_conflitam() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();

        let (service, _store) = service_with(vec![]).await;

        let result = service
            .check_package(&request(
                vehicle,
                driver,
                vec![
                    candidate("2024-10-25", Some(hm(9, 0)), 60, true),
                    candidate("2024-10-25", Some(hm(10, 0)), 60, true),
                ],
            ))
            .await
            .unwrap();

        // O mesmo par aparece na checagem do veículo e do motorista
        assert!(!result.is_valid);
        assert_eq!(result.vehicle_conflicts.len(), 1);
        assert_eq!(result.driver_conflicts.len(), 1);
    }

    #[tokio::test]
    async fn validacao_e_idempotente() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        let (service, _store) = service_with(vec![committed_package(
            vehicle,
            Uuid::new_v4(),
            vec![activity(pkg, "2024-10-10", None, 0, false)],
        )])
        .await;

        let req = request(
            vehicle,
            driver,
            vec![candidate("2024-10-10", Some(hm(9, 0)), 60, true)],
        );

        let first = service.check_package(&req).await.unwrap();
        let second = service.check_package(&req).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn atividade_net_sem_horario_e_rejeitada() {
        let (service, _store) = service_with(vec![]).await;

        let result = service
            .check_package(&request(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![candidate("2024-10-10", None, 60, true)],
            ))
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn falha_do_store_aborta_a_validacao() {
        let (service, store) = service_with(vec![]).await;
        store.fail_activities(true);

        let result = service
            .check_package(&request(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![candidate("2024-10-10", Some(hm(9, 0)), 60, true)],
            ))
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn pacote_cancelado_nao_ocupa_agenda() {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let pkg = Uuid::new_v4();

        let mut cancelled = committed_package(
            vehicle,
            driver,
            vec![activity(pkg, "2024-10-10", None, 0, false)],
        );
        cancelled.status = PackageStatus::Cancelled;

        let (service, _store) = service_with(vec![cancelled]).await;

        let result = service
            .check_package(&request(
                vehicle,
                driver,
                vec![candidate("2024-10-10", Some(hm(9, 0)), 60, true)],
            ))
            .await
            .unwrap();

        assert!(result.is_valid);
    }
}
