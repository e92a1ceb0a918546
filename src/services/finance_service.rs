// src/services/finance_service.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    cache::TtlCache,
    common::error::AppError,
    db::LedgerStore,
    models::finance::{
        DailyBreakdown, ExpenseEntry, NetActivityEntry, PackageFinancialSummary,
        PackageFinancials, VehicleExpense,
    },
    models::scheduling::{DateRange, ScheduledActivity},
};

#[derive(Clone)]
pub struct FinanceService {
    store: Arc<dyn LedgerStore>,
    cache: Arc<TtlCache<PackageFinancialSummary>>,
}

impl FinanceService {
    pub fn new(store: Arc<dyn LedgerStore>, cache: Arc<TtlCache<PackageFinancialSummary>>) -> Self {
        Self { store, cache }
    }

    /// Calcula o resumo financeiro dia a dia de um pacote, opcionalmente
    /// recortado por uma janela de datas. Leitura pura: mesma entrada,
    /// mesmo resultado; a soma dos campos diários bate com os totais.
    pub async fn reconcile(
        &self,
        package_id: Uuid,
        window: Option<DateRange>,
    ) -> Result<PackageFinancialSummary, AppError> {
        let cache_key = Self::cache_key(package_id, window);
        if let Some(summary) = self.cache.get(&cache_key) {
            return Ok(summary);
        }

        let package = self.store.fetch_package(package_id).await?;

        // As despesas acompanham o recorte; sem janela, vale o período
        // completo do pacote. Uma falha aqui aborta o cálculo: custo
        // subnotificado é pior que erro.
        let expense_range =
            window.unwrap_or_else(|| DateRange::new(package.start_date, package.end_date));
        let expenses = match package.vehicle_id {
            Some(vehicle_id) => self
                .store
                .fetch_vehicle_expenses(vehicle_id, expense_range)
                .await
                .inspect_err(|e| {
                    tracing::error!(%package_id, "falha ao buscar despesas do veículo: {e}");
                })?,
            None => Vec::new(),
        };

        let summary = build_summary(&package, &expenses, window);
        self.cache.insert(cache_key, summary.clone());
        Ok(summary)
    }

    /// Gancho de invalidação: chame após persistir qualquer mutação que
    /// afete o pacote (atividades, despesas, diárias).
    pub fn invalidate_package(&self, package_id: Uuid) {
        self.cache.invalidate_prefix(&format!("pacote:{package_id}"));
    }

    fn cache_key(package_id: Uuid, window: Option<DateRange>) -> String {
        match window {
            Some(w) => format!("pacote:{package_id}:{}:{}", w.start, w.end),
            None => format!("pacote:{package_id}:completo"),
        }
    }
}

fn build_summary(
    package: &PackageFinancials,
    expenses: &[VehicleExpense],
    window: Option<DateRange>,
) -> PackageFinancialSummary {
    let mut activities_by_day: BTreeMap<NaiveDate, Vec<&ScheduledActivity>> = BTreeMap::new();
    for activity in &package.activities {
        if let Some(w) = window {
            if !w.contains(activity.scheduled_date) {
                continue;
            }
        }
        activities_by_day
            .entry(activity.scheduled_date)
            .or_default()
            .push(activity);
    }

    let mut expenses_by_day: BTreeMap<NaiveDate, Vec<&VehicleExpense>> = BTreeMap::new();
    for expense in expenses {
        expenses_by_day.entry(expense.date).or_default().push(expense);
    }

    // Um dia entra na quebra se tiver atividade OU despesa; o BTreeSet
    // já devolve as datas em ordem.
    let all_dates: BTreeSet<NaiveDate> = activities_by_day
        .keys()
        .chain(expenses_by_day.keys())
        .copied()
        .collect();

    let hundred = Decimal::from(100);
    let empty_activities: Vec<&ScheduledActivity> = Vec::new();
    let empty_expenses: Vec<&VehicleExpense> = Vec::new();

    let mut daily_breakdown: Vec<DailyBreakdown> = Vec::new();
    let mut total_daily_service_rates = Decimal::ZERO;
    let mut total_net_values = Decimal::ZERO;
    let mut total_driver_daily_costs = Decimal::ZERO;
    let mut total_vehicle_expenses = Decimal::ZERO;
    let mut days_with_service_rate = 0u32;
    let mut days_with_driver_cost = 0u32;

    for date in all_dates {
        let day_activities = activities_by_day.get(&date).unwrap_or(&empty_activities);
        let day_expenses = expenses_by_day.get(&date).unwrap_or(&empty_expenses);

        let net_activities: Vec<NetActivityEntry> = day_activities
            .iter()
            .filter(|a| a.consider_net_value && !a.net_value.is_zero())
            .map(|a| NetActivityEntry {
                attraction_name: a.attraction_name.clone(),
                net_value: a.net_value,
            })
            .collect();
        let total_net: Decimal = net_activities.iter().map(|n| n.net_value).sum();
        total_net_values += total_net;

        // A diária de serviço entra UMA vez por dia que tenha atividade
        // de dia inteiro, nunca por atividade.
        let has_daily_service_rate = day_activities.iter().any(|a| a.is_full_day())
            && package.daily_service_rate > Decimal::ZERO;
        let daily_service_rate_amount = if has_daily_service_rate {
            days_with_service_rate += 1;
            total_daily_service_rates += package.daily_service_rate;
            package.daily_service_rate
        } else {
            Decimal::ZERO
        };

        // A diária do motorista vale em qualquer dia com atividade,
        // inclusive dias só com NET.
        let has_driver_daily_cost =
            package.consider_driver_daily_cost && !day_activities.is_empty();
        let driver_daily_cost_amount = if has_driver_daily_cost {
            days_with_driver_cost += 1;
            total_driver_daily_costs += package.driver_daily_rate;
            package.driver_daily_rate
        } else {
            Decimal::ZERO
        };

        let vehicle_expenses: Vec<ExpenseEntry> = day_expenses
            .iter()
            .map(|e| ExpenseEntry {
                description: e.description.clone(),
                category: e.category.clone(),
                amount: e.amount,
            })
            .collect();
        let day_expense_total: Decimal = vehicle_expenses.iter().map(|e| e.amount).sum();
        total_vehicle_expenses += day_expense_total;

        let daily_revenue = daily_service_rate_amount + total_net;
        let daily_cost = driver_daily_cost_amount + day_expense_total;

        daily_breakdown.push(DailyBreakdown {
            date,
            has_daily_service_rate,
            daily_service_rate_amount,
            net_activities,
            total_net,
            has_driver_daily_cost,
            driver_daily_cost_amount,
            vehicle_expenses,
            total_vehicle_expenses: day_expense_total,
            daily_revenue,
            daily_cost,
            daily_margin: daily_revenue - daily_cost,
        });
    }

    let total_revenue = total_daily_service_rates + total_net_values;
    let total_costs = total_driver_daily_costs + total_vehicle_expenses;
    let gross_margin = total_revenue - total_costs;
    let margin_percentage = if total_revenue > Decimal::ZERO {
        (gross_margin / total_revenue) * hundred
    } else {
        Decimal::ZERO
    };

    PackageFinancialSummary {
        package_id: package.id,
        total_daily_service_rates,
        total_net_values,
        total_revenue,
        total_driver_daily_costs,
        total_vehicle_expenses,
        total_costs,
        gross_margin,
        margin_percentage,
        days_with_service_rate,
        days_with_driver_cost,
        daily_breakdown,
    }
}
