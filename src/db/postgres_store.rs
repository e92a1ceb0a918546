// src/db/postgres_store.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::LedgerStore,
    models::finance::{PackageFinancials, VehicleExpense},
    models::scheduling::{DateRange, PackageStatus, ResourceType, ScheduledActivity},
    models::settlement::{DriverCostPackage, DriverDailyRate, LedgerEntry, SettlementRecord},
};

// Linha crua de `packages` juntada com a diária do motorista; as
// atividades vêm em uma segunda consulta.
#[derive(FromRow)]
struct PackageRow {
    id: Uuid,
    agency_id: Option<Uuid>,
    vehicle_id: Option<Uuid>,
    driver_id: Option<Uuid>,
    status: PackageStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
    daily_service_rate: Decimal,
    consider_driver_daily_cost: bool,
    driver_daily_rate: Decimal,
}

#[derive(FromRow)]
struct SettlementRow {
    id: Uuid,
    agency_id: Uuid,
    period_start: NaiveDate,
    period_end: NaiveDate,
    charge_ids: Vec<Uuid>,
    settled_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn fetch_activities_for_resource(
        &self,
        resource: ResourceType,
        resource_id: Uuid,
        dates: &[NaiveDate],
        exclude_package_id: Option<Uuid>,
    ) -> Result<Vec<ScheduledActivity>, AppError> {
        let resource_column = match resource {
            ResourceType::Vehicle => "p.vehicle_id",
            ResourceType::Driver => "p.driver_id",
        };

        let sql = format!(
            r#"
            SELECT
                pa.id, pa.package_id, pa.attraction_id,
                a.name AS attraction_name,
                pa.scheduled_date, pa.start_time,
                a.duration_minutes, pa.consider_net_value, a.net_value,
                pa.notes
            FROM package_activities pa
            JOIN attractions a ON a.id = pa.attraction_id
            JOIN packages p ON p.id = pa.package_id
            WHERE {resource_column} = $1
              AND pa.scheduled_date = ANY($2)
              AND p.status IN ('confirmed', 'in_progress')
              AND ($3::uuid IS NULL OR pa.package_id <> $3)
            ORDER BY pa.scheduled_date, pa.start_time
            "#
        );

        let activities = sqlx::query_as::<_, ScheduledActivity>(&sql)
            .bind(resource_id)
            .bind(dates)
            .bind(exclude_package_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(activities)
    }

    async fn fetch_package(&self, id: Uuid) -> Result<PackageFinancials, AppError> {
        let row = sqlx::query_as::<_, PackageRow>(
            r#"
            SELECT
                p.id, p.agency_id, p.vehicle_id, p.driver_id, p.status,
                p.start_date, p.end_date,
                p.daily_service_rate, p.consider_driver_daily_cost,
                COALESCE(d.daily_rate, 0) AS driver_daily_rate
            FROM packages p
            LEFT JOIN drivers d ON d.id = p.driver_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::PackageNotFound(id))?;

        let activities = sqlx::query_as::<_, ScheduledActivity>(
            r#"
            SELECT
                pa.id, pa.package_id, pa.attraction_id,
                a.name AS attraction_name,
                pa.scheduled_date, pa.start_time,
                a.duration_minutes, pa.consider_net_value, a.net_value,
                pa.notes
            FROM package_activities pa
            JOIN attractions a ON a.id = pa.attraction_id
            WHERE pa.package_id = $1
            ORDER BY pa.scheduled_date, pa.start_time
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PackageFinancials {
            id: row.id,
            agency_id: row.agency_id,
            vehicle_id: row.vehicle_id,
            driver_id: row.driver_id,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            daily_service_rate: row.daily_service_rate,
            consider_driver_daily_cost: row.consider_driver_daily_cost,
            driver_daily_rate: row.driver_daily_rate,
            activities,
        })
    }

    async fn fetch_vehicle_expenses(
        &self,
        vehicle_id: Uuid,
        period: DateRange,
    ) -> Result<Vec<VehicleExpense>, AppError> {
        let expenses = sqlx::query_as::<_, VehicleExpense>(
            r#"
            SELECT id, vehicle_id, package_id, description, category, amount, date
            FROM vehicle_expenses
            WHERE vehicle_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date
            "#,
        )
        .bind(vehicle_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    async fn fetch_agency_charges(
        &self,
        agency_id: Uuid,
        period: DateRange,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let charges = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, kind, agency_id, package_id, date, amount, paid
            FROM agency_charges
            WHERE agency_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date
            "#,
        )
        .bind(agency_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(charges)
    }

    async fn fetch_charges_by_ids(&self, charge_ids: &[Uuid]) -> Result<Vec<LedgerEntry>, AppError> {
        let charges = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, kind, agency_id, package_id, date, amount, paid
            FROM agency_charges
            WHERE id = ANY($1)
            "#,
        )
        .bind(charge_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(charges)
    }

    async fn persist_settlement_flip(
        &self,
        agency_id: Uuid,
        period: DateRange,
        charge_ids: &[Uuid],
    ) -> Result<(), AppError> {
        // A virada das cobranças e o registro do lote precisam ser um
        // ponto único de escrita: ou tudo, ou nada.
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE agency_charges SET paid = TRUE WHERE id = ANY($1)")
            .bind(charge_ids)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO agency_settlements (id, agency_id, period_start, period_end, charge_ids, settled_at)
            VALUES ($1, $2, $3, $4, $5, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(agency_id)
        .bind(period.start)
        .bind(period.end)
        .bind(charge_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn revert_settlement_flip(&self, charge_ids: &[Uuid]) -> Result<(), AppError> {
        sqlx::query("UPDATE agency_charges SET paid = FALSE WHERE id = ANY($1)")
            .bind(charge_ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fetch_last_settlement(
        &self,
        agency_id: Uuid,
    ) -> Result<Option<SettlementRecord>, AppError> {
        let row = sqlx::query_as::<_, SettlementRow>(
            r#"
            SELECT id, agency_id, period_start, period_end, charge_ids, settled_at
            FROM agency_settlements
            WHERE agency_id = $1
            ORDER BY settled_at DESC
            LIMIT 1
            "#,
        )
        .bind(agency_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SettlementRecord {
            id: r.id,
            agency_id: r.agency_id,
            period: DateRange::new(r.period_start, r.period_end),
            charge_ids: r.charge_ids,
            settled_at: r.settled_at,
        }))
    }

    async fn fetch_driver_cost_packages(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Vec<DriverCostPackage>, AppError> {
        let packages = sqlx::query_as::<_, DriverCostPackage>(
            r#"
            SELECT p.id, p.driver_id, p.start_date, p.end_date,
                   d.daily_rate AS driver_daily_rate
            FROM packages p
            JOIN drivers d ON d.id = p.driver_id
            WHERE p.consider_driver_daily_cost = TRUE
              AND p.status IN ('confirmed', 'in_progress', 'completed')
              AND p.start_date <= $2 AND p.end_date >= $1
              AND ($3::uuid IS NULL OR p.driver_id = $3)
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }

    async fn fetch_driver_daily_rates(
        &self,
        driver_id: Option<Uuid>,
        period: DateRange,
    ) -> Result<Vec<DriverDailyRate>, AppError> {
        let rates = sqlx::query_as::<_, DriverDailyRate>(
            r#"
            SELECT id, kind, driver_id, package_id, date, amount, paid, is_substitute, notes
            FROM driver_daily_rates
            WHERE date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR driver_id = $3)
            ORDER BY date
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }

    async fn upsert_driver_daily_rate(
        &self,
        entry: &DriverDailyRate,
    ) -> Result<DriverDailyRate, AppError> {
        let saved = sqlx::query_as::<_, DriverDailyRate>(
            r#"
            INSERT INTO driver_daily_rates
                (id, kind, driver_id, package_id, date, amount, paid, is_substitute, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                driver_id = EXCLUDED.driver_id,
                package_id = EXCLUDED.package_id,
                date = EXCLUDED.date,
                amount = EXCLUDED.amount,
                paid = EXCLUDED.paid,
                is_substitute = EXCLUDED.is_substitute,
                notes = EXCLUDED.notes
            RETURNING id, kind, driver_id, package_id, date, amount, paid, is_substitute, notes
            "#,
        )
        .bind(entry.id)
        .bind(entry.kind)
        .bind(entry.driver_id)
        .bind(entry.package_id)
        .bind(entry.date)
        .bind(entry.amount)
        .bind(entry.paid)
        .bind(entry.is_substitute)
        .bind(entry.notes.clone())
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn set_driver_rate_paid(&self, id: Uuid, paid: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE driver_daily_rates SET paid = $2 WHERE id = $1")
            .bind(id)
            .bind(paid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_driver_daily_rate(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM driver_daily_rates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
