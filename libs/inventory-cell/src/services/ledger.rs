use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, instrument};

use shared_database::{record_activity, AppState, DbPool};
use shared_models::auth::AuthContext;
use shared_models::{ActivityAction, BloodType, DbId};

use crate::models::{
    AddStockRequest, BloodAvailability, InventoryError, InventoryUnit, StockEntry, StockRules,
    StockSummary, MAX_UNITS,
};

fn check_units(units: i64) -> Result<(), InventoryError> {
    if units <= 0 {
        return Err(InventoryError::ValidationError(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    if units > MAX_UNITS {
        return Err(InventoryError::ValidationError(format!(
            "Quantity cannot exceed {} units",
            MAX_UNITS
        )));
    }
    Ok(())
}

/// Add `units` to the (hospital, blood type, expiry) bucket, creating it if
/// it does not exist yet. A bucket never grows past `MAX_UNITS`.
pub async fn credit_units(
    conn: &mut SqliteConnection,
    hospital_id: DbId,
    blood_type: BloodType,
    units: i64,
    expiry_date: NaiveDate,
) -> Result<InventoryUnit, InventoryError> {
    check_units(units)?;

    let now = Utc::now();
    // The conflict branch only fires while the sum stays within the cap;
    // otherwise nothing is written and no row comes back.
    let unit = sqlx::query_as::<_, InventoryUnit>(
        "INSERT INTO inventory (hospital_id, blood_type, quantity, expiry_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (hospital_id, blood_type, expiry_date) \
         DO UPDATE SET quantity = inventory.quantity + excluded.quantity, updated_at = excluded.updated_at \
         WHERE inventory.quantity + excluded.quantity <= ? \
         RETURNING id, hospital_id, blood_type, quantity, expiry_date, created_at, updated_at",
    )
    .bind(hospital_id)
    .bind(blood_type)
    .bind(units)
    .bind(expiry_date)
    .bind(now)
    .bind(now)
    .bind(MAX_UNITS)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        InventoryError::ValidationError(format!(
            "A {} bucket expiring {} cannot hold more than {} units",
            blood_type, expiry_date, MAX_UNITS
        ))
    })?;

    record_activity(
        conn,
        Some(hospital_id),
        ActivityAction::StockIn,
        &format!("{} x {} (expires {}), bucket now {}", units, blood_type, expiry_date, unit.quantity),
    )
    .await?;

    Ok(unit)
}

pub struct InventoryService {
    db: DbPool,
    rules: StockRules,
}

impl InventoryService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            rules: StockRules::from_config(&state.config),
        }
    }

    pub fn rules(&self) -> StockRules {
        self.rules
    }

    async fn ensure_hospital(&self, hospital_id: DbId) -> Result<(), InventoryError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hospitals WHERE id = ?")
            .bind(hospital_id)
            .fetch_one(&self.db)
            .await?;

        if exists == 0 {
            return Err(InventoryError::HospitalNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_or_increment_stock(
        &self,
        context: &AuthContext,
        request: AddStockRequest,
    ) -> Result<InventoryUnit, InventoryError> {
        let hospital_id = context.hospital_id().ok_or(InventoryError::Unauthorized)?;

        check_units(request.quantity)?;

        let mut tx = self.db.begin().await?;
        let unit = credit_units(
            &mut tx,
            hospital_id,
            request.blood_type,
            request.quantity,
            request.expiry_date,
        )
        .await?;
        tx.commit().await?;

        info!(
            "Hospital {} stocked {} x {} (expires {}), bucket now {}",
            hospital_id, request.quantity, request.blood_type, request.expiry_date, unit.quantity
        );

        Ok(unit)
    }

    /// Non-empty rows for a hospital with their derived status.
    #[instrument(skip(self))]
    pub async fn list_stock(
        &self,
        hospital_id: DbId,
        today: NaiveDate,
    ) -> Result<Vec<StockEntry>, InventoryError> {
        let units = sqlx::query_as::<_, InventoryUnit>(
            "SELECT id, hospital_id, blood_type, quantity, expiry_date, created_at, updated_at \
             FROM inventory WHERE hospital_id = ? AND quantity > 0 \
             ORDER BY blood_type ASC, expiry_date ASC",
        )
        .bind(hospital_id)
        .fetch_all(&self.db)
        .await?;

        debug!("Hospital {} has {} stocked rows", hospital_id, units.len());

        Ok(units
            .into_iter()
            .map(|unit| StockEntry {
                status: self.rules.classify(unit.expiry_date, unit.quantity, today),
                unit,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn stock_summary(
        &self,
        hospital_id: DbId,
        today: NaiveDate,
    ) -> Result<Vec<StockSummary>, InventoryError> {
        let cutoff = self.rules.expiring_cutoff(today);

        let summary = sqlx::query_as::<_, StockSummary>(
            "SELECT blood_type, \
                    SUM(quantity) AS total_units, \
                    SUM(CASE WHEN expiry_date <= ? THEN quantity ELSE 0 END) AS expiring_soon \
             FROM inventory WHERE hospital_id = ? AND quantity > 0 \
             GROUP BY blood_type ORDER BY blood_type ASC",
        )
        .bind(cutoff)
        .bind(hospital_id)
        .fetch_all(&self.db)
        .await?;

        Ok(summary)
    }

    /// Public per-type totals of usable (non-expired) stock.
    #[instrument(skip(self))]
    pub async fn availability(
        &self,
        hospital_id: DbId,
        today: NaiveDate,
    ) -> Result<Vec<BloodAvailability>, InventoryError> {
        self.ensure_hospital(hospital_id).await?;

        let rows = sqlx::query_as::<_, BloodAvailability>(
            "SELECT blood_type, SUM(quantity) AS total_units \
             FROM inventory WHERE hospital_id = ? AND quantity > 0 AND expiry_date >= ? \
             GROUP BY blood_type ORDER BY blood_type ASC",
        )
        .bind(hospital_id)
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}
