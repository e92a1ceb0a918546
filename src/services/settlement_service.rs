// src/services/settlement_service.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::scheduling::DateRange,
    models::settlement::{
        AgencySettlementView, LedgerEntry, SettlementBatch, SettlementDay, SettlementRecord,
        SettlementStatus,
    },
};

#[derive(Clone)]
pub struct SettlementService {
    store: Arc<dyn LedgerStore>,
    // Serializa mutações por agência: duas viradas concorrentes sobre o
    // mesmo conjunto de cobranças não podem se intercalar. Períodos
    // sobrepostos da mesma agência disputam o mesmo lock.
    agency_locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SettlementService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            agency_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn agency_lock(&self, agency_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.agency_locks.lock().expect("lock de agências envenenado");
        locks
            .entry(agency_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Visão do fechamento da agência no período: totais, quebra diária,
    /// status e os ids virados pelo último "pagar". Leitura pura.
    pub async fn settlement_view(
        &self,
        agency_id: Uuid,
        period: DateRange,
    ) -> Result<AgencySettlementView, AppError> {
        let charges = self.store.fetch_agency_charges(agency_id, period).await?;
        let last_settlement = self.store.fetch_last_settlement(agency_id).await?;

        Ok(build_view(agency_id, period, &charges, last_settlement))
    }

    /// Marca como paga toda cobrança pendente da agência no período e
    /// devolve exatamente os ids virados. Com nada pendente, é no-op:
    /// `flipped_ids` vazio e o status corrente.
    pub async fn settle_period(
        &self,
        agency_id: Uuid,
        period: DateRange,
    ) -> Result<SettlementBatch, AppError> {
        let lock = self.agency_lock(agency_id);
        let _guard = lock.lock().await;

        let charges = self.store.fetch_agency_charges(agency_id, period).await?;
        let pending: Vec<&LedgerEntry> = charges.iter().filter(|c| !c.paid).collect();

        if pending.is_empty() {
            tracing::info!(%agency_id, "nenhuma cobrança pendente no período; fechamento já está quitado");
            return Ok(SettlementBatch {
                agency_id,
                period,
                paid_amount: Decimal::ZERO,
                flipped_ids: Vec::new(),
                status: derive_status(&charges),
            });
        }

        let flipped_ids: Vec<Uuid> = pending.iter().map(|c| c.id).collect();
        let paid_amount: Decimal = pending.iter().map(|c| c.amount).sum();

        self.store
            .persist_settlement_flip(agency_id, period, &flipped_ids)
            .await?;

        tracing::info!(
            %agency_id,
            total = %paid_amount,
            cobrancas = flipped_ids.len(),
            "fechamento do período efetivado"
        );

        // Tudo que estava pendente no período acabou de virar
        Ok(SettlementBatch {
            agency_id,
            period,
            paid_amount,
            flipped_ids,
            status: SettlementStatus::Pago,
        })
    }

    /// Reverte para pendente somente as cobranças informadas. Ids
    /// desconhecidos ou que já estão pendentes são ignorados, o que
    /// mantém a operação idempotente sob retentativas. Devolve os ids
    /// efetivamente revertidos.
    pub async fn cancel_settlement(&self, charge_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if charge_ids.is_empty() {
            return Ok(Vec::new());
        }

        let current = self.store.fetch_charges_by_ids(charge_ids).await?;
        let to_revert: Vec<Uuid> = current.iter().filter(|c| c.paid).map(|c| c.id).collect();

        if to_revert.is_empty() {
            tracing::info!("cancelamento sem efeito: nenhuma das cobranças está paga");
            return Ok(Vec::new());
        }

        self.store.revert_settlement_flip(&to_revert).await?;

        tracing::info!(cobrancas = to_revert.len(), "fechamento revertido");
        Ok(to_revert)
    }
}

fn derive_status(charges: &[LedgerEntry]) -> SettlementStatus {
    let paid_count = charges.iter().filter(|c| c.paid).count();

    if !charges.is_empty() && paid_count == charges.len() {
        SettlementStatus::Pago
    } else if paid_count > 0 {
        SettlementStatus::Parcial
    } else {
        SettlementStatus::Pendente
    }
}

fn build_view(
    agency_id: Uuid,
    period: DateRange,
    charges: &[LedgerEntry],
    last_settlement: Option<SettlementRecord>,
) -> AgencySettlementView {
    let mut by_day: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    let mut total_value_to_pay = Decimal::ZERO;
    let mut total_value_paid = Decimal::ZERO;

    for charge in charges {
        let day = by_day.entry(charge.date).or_insert((Decimal::ZERO, Decimal::ZERO));
        day.0 += charge.amount;
        total_value_to_pay += charge.amount;
        if charge.paid {
            day.1 += charge.amount;
            total_value_paid += charge.amount;
        }
    }

    let daily_breakdown = by_day
        .into_iter()
        .map(|(date, (total, paid))| SettlementDay {
            date,
            total_amount: total,
            paid_amount: paid,
            pending_amount: total - paid,
        })
        .collect();

    AgencySettlementView {
        agency_id,
        period,
        total_value_to_pay,
        total_value_paid,
        daily_breakdown,
        settlement_status: derive_status(charges),
        settlement_ids: last_settlement.map(|s| s.charge_ids).unwrap_or_default(),
    }
}
