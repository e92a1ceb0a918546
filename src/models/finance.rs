// src/models/finance.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::scheduling::{PackageStatus, ScheduledActivity};

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleExpense {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    // Despesa pode existir sem pacote (ex.: manutenção avulsa)
    pub package_id: Option<Uuid>,
    pub description: String,
    pub category: String,
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// Pacote com os dados financeiros já juntados: diária do motorista e
/// atividades com o valor NET da atração. É o formato que o store
/// devolve em `fetch_package`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFinancials {
    pub id: Uuid,
    pub agency_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: PackageStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    // Diária de serviço: valor fixo por dia com atividade de dia inteiro
    pub daily_service_rate: Decimal,
    pub consider_driver_daily_cost: bool,
    pub driver_daily_rate: Decimal,
    pub activities: Vec<ScheduledActivity>,
}

/// Uma atividade NET que entrou na receita do dia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetActivityEntry {
    pub attraction_name: String,
    pub net_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseEntry {
    pub description: String,
    pub category: String,
    pub amount: Decimal,
}

/// Quebra diária de receita e custo de um pacote. Um dia aparece se
/// tiver atividade OU despesa de veículo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub has_daily_service_rate: bool,
    pub daily_service_rate_amount: Decimal,
    pub net_activities: Vec<NetActivityEntry>,
    pub total_net: Decimal,
    pub has_driver_daily_cost: bool,
    pub driver_daily_cost_amount: Decimal,
    pub vehicle_expenses: Vec<ExpenseEntry>,
    pub total_vehicle_expenses: Decimal,
    pub daily_revenue: Decimal,
    pub daily_cost: Decimal,
    pub daily_margin: Decimal,
}

/// Resumo financeiro de um pacote. Garantia: a soma dos campos diários
/// bate exatamente com os totais agregados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFinancialSummary {
    pub package_id: Uuid,
    pub total_daily_service_rates: Decimal,
    pub total_net_values: Decimal,
    pub total_revenue: Decimal,
    pub total_driver_daily_costs: Decimal,
    pub total_vehicle_expenses: Decimal,
    pub total_costs: Decimal,
    pub gross_margin: Decimal,
    pub margin_percentage: Decimal,
    pub days_with_service_rate: u32,
    pub days_with_driver_cost: u32,
    pub daily_breakdown: Vec<DailyBreakdown>,
}
