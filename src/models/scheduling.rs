// src/models/scheduling.rs

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "package_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl PackageStatus {
    /// Somente pacotes confirmados ou em andamento ocupam veículo e
    /// motorista na agenda.
    pub fn occupies_resources(&self) -> bool {
        matches!(self, PackageStatus::Confirmed | PackageStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Vehicle,
    Driver,
}

// --- Structs ---

/// Intervalo fechado de datas [start, end].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Atividade agendada de um pacote, já juntada com os dados da atração
/// (duração e valor NET).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledActivity {
    pub id: Uuid,
    pub package_id: Uuid,
    pub attraction_id: Uuid,
    pub attraction_name: String,
    pub scheduled_date: NaiveDate,
    // Atividades de dia inteiro não têm horário marcado
    pub start_time: Option<NaiveTime>,
    pub duration_minutes: i32,
    // true = cobrança NET por atividade; false = diária de serviço (dia inteiro)
    pub consider_net_value: bool,
    pub net_value: Decimal,
    pub notes: Option<String>,
}

impl ScheduledActivity {
    pub fn is_full_day(&self) -> bool {
        !self.consider_net_value
    }
}

/// Atividade candidata enviada pela camada de UI antes de persistir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_net_start_time"))]
pub struct CandidateActivity {
    pub scheduled_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    #[validate(range(min = 0, message = "A duração não pode ser negativa."))]
    pub duration_minutes: i32,
    pub consider_net_value: bool,
}

// Atividades NET entram na checagem de janelas de horário, então o
// horário de início é obrigatório para elas.
fn validate_net_start_time(activity: &CandidateActivity) -> Result<(), ValidationError> {
    if activity.consider_net_value && activity.start_time.is_none() {
        let mut err = ValidationError::new("start_time");
        err.message = Some("Atividades NET precisam de horário de início.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,

    #[validate(length(min = 1, message = "O pacote precisa de ao menos uma atividade."), nested)]
    pub activities: Vec<CandidateActivity>,

    // Permite que a edição de um pacote ignore as próprias atividades
    pub exclude_package_id: Option<Uuid>,
}

/// Resultado da verificação de disponibilidade. Conflitos são dados,
/// não erros: cada entrada é uma mensagem "{data}: {motivo}".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub vehicle_conflicts: Vec<String>,
    pub driver_conflicts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // A camada de UI consome esses contratos em camelCase; o formato do
    // JSON faz parte do contrato.
    #[test]
    fn contrato_json_em_camel_case() {
        let result = ValidationResult {
            is_valid: false,
            vehicle_conflicts: vec!["2024-10-10: já existe reserva de dia inteiro".into()],
            driver_conflicts: vec![],
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "isValid": false,
                "vehicleConflicts": ["2024-10-10: já existe reserva de dia inteiro"],
                "driverConflicts": [],
            })
        );
    }

    #[test]
    fn candidato_net_sem_horario_reprova_na_validacao() {
        use validator::Validate;

        let candidate = CandidateActivity {
            scheduled_date: "2024-10-10".parse().unwrap(),
            start_time: None,
            duration_minutes: 60,
            consider_net_value: true,
        };
        assert!(candidate.validate().is_err());

        let full_day = CandidateActivity {
            scheduled_date: "2024-10-10".parse().unwrap(),
            start_time: None,
            duration_minutes: 0,
            consider_net_value: false,
        };
        assert!(full_day.validate().is_ok());
    }
}
