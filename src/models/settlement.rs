// src/models/settlement.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::scheduling::DateRange;

// --- Enums (Mapeando o Postgres) ---

/// Origem de um lançamento do livro-razão: gerado a partir do pacote ou
/// cadastrado à mão (substituição, ajuste, diária avulsa). O tipo é uma
/// variante explícita, nunca deduzido do formato do id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Automatic,
    Manual,
}

/// Status do fechamento de uma agência no período.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    Pendente,
    Parcial,
    Pago,
}

// --- Structs ---

/// Cobrança de uma agência em um dia: a unidade que o fechamento marca
/// como paga e o cancelamento reverte.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub kind: LedgerEntryKind,
    pub agency_id: Uuid,
    pub package_id: Option<Uuid>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub paid: bool,
}

/// Diária de motorista: gerada automaticamente a partir do pacote ou
/// cadastrada à mão (avulsa/substituto).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverDailyRate {
    pub id: Uuid,
    pub kind: LedgerEntryKind,
    pub driver_id: Uuid,
    pub package_id: Option<Uuid>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub paid: bool,
    pub is_substitute: bool,
    pub notes: Option<String>,
}

fn validate_positive_amount(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || val.is_zero() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor da diária deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

/// Payload de cadastro de diária avulsa.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDriverDailyRate {
    pub driver_id: Uuid,
    pub package_id: Option<Uuid>,
    pub date: NaiveDate,

    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,

    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub is_substitute: bool,
    pub notes: Option<String>,
}

/// Projeção leve de pacote usada na geração de diárias automáticas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverCostPackage {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub driver_daily_rate: Decimal,
}

/// Registro de um fechamento efetivado: guarda exatamente os ids das
/// cobranças viradas naquele lote, para permitir a reversão precisa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub period: DateRange,
    pub charge_ids: Vec<Uuid>,
    pub settled_at: DateTime<Utc>,
}

/// Resultado de um `settle_period`: o lote de cobranças viradas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementBatch {
    pub agency_id: Uuid,
    pub period: DateRange,
    pub paid_amount: Decimal,
    pub flipped_ids: Vec<Uuid>,
    pub status: SettlementStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDay {
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
}

/// Visão computada do fechamento de uma agência no período. Não é
/// persistida: deriva das cobranças e do último lote registrado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencySettlementView {
    pub agency_id: Uuid,
    pub period: DateRange,
    pub total_value_to_pay: Decimal,
    pub total_value_paid: Decimal,
    pub daily_breakdown: Vec<SettlementDay>,
    pub settlement_status: SettlementStatus,
    // Ids virados pelo último "pagar"; é o que o cancelamento reverte
    pub settlement_ids: Vec<Uuid>,
}
