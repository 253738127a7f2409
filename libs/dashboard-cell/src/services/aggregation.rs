use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, instrument};

use inventory_cell::models::StockRules;
use inventory_cell::services::InventoryService;
use shared_database::{AppState, DbPool};
use shared_models::auth::AuthContext;
use shared_models::{ActivityEntry, DbId};

use crate::models::{
    AdminOverview, DashboardError, DonorRecord, HospitalDashboard, RareDonorContact, RosterEntry,
    UrgencyIndexEntry, ADMIN_LOG_LIMIT, ADMIN_RECENT_ACTIVITY, HOSPITAL_RECENT_ACTIVITY,
};

const ACTIVITY_SQL: &str = "SELECT a.id, a.hospital_id, h.name AS hospital_name, a.action, a.detail, a.created_at \
     FROM activity_log a LEFT JOIN hospitals h ON h.id = a.hospital_id";

pub struct DashboardService {
    db: DbPool,
    rules: StockRules,
    inventory: InventoryService,
}

impl DashboardService {
    pub fn new(state: &AppState) -> Self {
        let inventory = InventoryService::new(state);
        Self {
            db: state.db.clone(),
            rules: inventory.rules(),
            inventory,
        }
    }

    /// Blood Urgency Index for every blood type with Pending incoming
    /// transfers, highest pressure first.
    #[instrument(skip(self))]
    pub async fn urgency_index(
        &self,
        hospital_id: DbId,
        today: NaiveDate,
    ) -> Result<Vec<UrgencyIndexEntry>, DashboardError> {
        let cutoff = self.rules.expiring_cutoff(today);

        let mut entries = sqlx::query_as::<_, UrgencyIndexEntry>(
            "SELECT t.blood_type AS blood_type, \
                    SUM(t.units_needed) AS requested, \
                    COALESCE((SELECT SUM(i.quantity) FROM inventory i \
                              WHERE i.hospital_id = t.to_hospital_id AND i.blood_type = t.blood_type \
                                AND i.quantity > 0 AND i.expiry_date >= ?), 0) AS available, \
                    COALESCE((SELECT SUM(i.quantity) FROM inventory i \
                              WHERE i.hospital_id = t.to_hospital_id AND i.blood_type = t.blood_type \
                                AND i.quantity > 0 AND i.expiry_date >= ? AND i.expiry_date <= ?), 0) AS expiring_soon \
             FROM transfer_requests t \
             WHERE t.to_hospital_id = ? AND t.status = 'Pending' \
             GROUP BY t.blood_type",
        )
        .bind(today)
        .bind(today)
        .bind(cutoff)
        .bind(hospital_id)
        .fetch_all(&self.db)
        .await?;

        for entry in &mut entries {
            entry.index = entry.requested - entry.available;
        }
        entries.sort_by(|a, b| b.index.cmp(&a.index).then(a.blood_type.cmp(&b.blood_type)));

        debug!("Urgency index for hospital {} covers {} blood types", hospital_id, entries.len());

        Ok(entries)
    }

    /// Newest activity first, optionally narrowed to one hospital.
    async fn recent_activity(
        &self,
        hospital_id: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, DashboardError> {
        let entries = match hospital_id {
            Some(hospital_id) => {
                let sql = format!("{} WHERE a.hospital_id = ? ORDER BY a.id DESC LIMIT ?", ACTIVITY_SQL);
                sqlx::query_as::<_, ActivityEntry>(&sql)
                    .bind(hospital_id)
                    .bind(limit)
                    .fetch_all(&self.db)
                    .await?
            }
            None => {
                let sql = format!("{} ORDER BY a.id DESC LIMIT ?", ACTIVITY_SQL);
                sqlx::query_as::<_, ActivityEntry>(&sql)
                    .bind(limit)
                    .fetch_all(&self.db)
                    .await?
            }
        };

        Ok(entries)
    }

    async fn count(&self, sql: &str, hospital_id: DbId) -> Result<i64, DashboardError> {
        let count = sqlx::query_scalar::<_, i64>(sql)
            .bind(hospital_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    pub async fn dashboard(
        &self,
        hospital_id: DbId,
        today: NaiveDate,
    ) -> Result<HospitalDashboard, DashboardError> {
        let (hospital_name, city) = sqlx::query_as::<_, (String, String)>(
            "SELECT name, city FROM hospitals WHERE id = ?",
        )
        .bind(hospital_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DashboardError::HospitalNotFound)?;

        let inventory_summary = self.inventory.stock_summary(hospital_id, today).await?;
        let urgency_index = self.urgency_index(hospital_id, today).await?;

        let pending_appointments = self
            .count(
                "SELECT COUNT(*) FROM appointments WHERE hospital_id = ? AND status = 'Pending'",
                hospital_id,
            )
            .await?;

        let day_start = today.and_time(NaiveTime::MIN);
        let todays_appointments = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM appointments \
             WHERE hospital_id = ? AND status IN ('Pending', 'Approved') \
               AND preferred_time >= ? AND preferred_time < ?",
        )
        .bind(hospital_id)
        .bind(day_start)
        .bind(day_start + Duration::days(1))
        .fetch_one(&self.db)
        .await?;

        let pending_incoming_transfers = self
            .count(
                "SELECT COUNT(*) FROM transfer_requests WHERE to_hospital_id = ? AND status = 'Pending'",
                hospital_id,
            )
            .await?;
        let pending_outgoing_transfers = self
            .count(
                "SELECT COUNT(*) FROM transfer_requests WHERE from_hospital_id = ? AND status = 'Pending'",
                hospital_id,
            )
            .await?;

        let rare_donors = sqlx::query_as::<_, RareDonorContact>(
            "SELECT d.id AS donor_id, d.name, d.phone, d.blood_type, d.city, r.reason \
             FROM rare_donors r JOIN donors d ON d.id = r.donor_id \
             WHERE LOWER(d.city) = LOWER(?) \
             ORDER BY d.blood_type, d.name",
        )
        .bind(&city)
        .fetch_all(&self.db)
        .await?;

        let recent_activity = self
            .recent_activity(Some(hospital_id), HOSPITAL_RECENT_ACTIVITY)
            .await?;

        Ok(HospitalDashboard {
            hospital_id,
            hospital_name,
            city,
            inventory_summary,
            urgency_index,
            pending_appointments,
            todays_appointments,
            pending_incoming_transfers,
            pending_outgoing_transfers,
            rare_donors,
            recent_activity,
        })
    }

    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn admin_overview(&self, context: &AuthContext) -> Result<AdminOverview, DashboardError> {
        if !context.is_admin() {
            return Err(DashboardError::AdminOnly);
        }

        let mut overview = sqlx::query_as::<_, AdminOverview>(
            "SELECT \
                (SELECT COUNT(*) FROM hospitals) AS total_hospitals, \
                (SELECT COUNT(*) FROM donors) AS total_donors, \
                (SELECT COUNT(*) FROM appointments WHERE status = 'Pending') AS pending_appointments, \
                (SELECT COUNT(*) FROM transfer_requests WHERE status = 'Pending') AS pending_transfers, \
                (SELECT COUNT(*) FROM emergency_requests WHERE status = 'Pending') AS pending_emergencies",
        )
        .fetch_one(&self.db)
        .await?;
        overview.recent_activity = self.recent_activity(None, ADMIN_RECENT_ACTIVITY).await?;

        Ok(overview)
    }

    /// The network's activity log, newest first.
    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn activity_log(&self, context: &AuthContext) -> Result<Vec<ActivityEntry>, DashboardError> {
        if !context.is_admin() {
            return Err(DashboardError::AdminOnly);
        }

        self.recent_activity(None, ADMIN_LOG_LIMIT).await
    }

    /// Every hospital ordered by city then name, with usable stock.
    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn hospital_roster(
        &self,
        context: &AuthContext,
        today: NaiveDate,
    ) -> Result<Vec<RosterEntry>, DashboardError> {
        if !context.is_admin() {
            return Err(DashboardError::AdminOnly);
        }

        let roster = sqlx::query_as::<_, RosterEntry>(
            "SELECT h.id, h.name, h.email, h.city, h.address, h.phone, h.reliability_score, h.created_at, \
                    COALESCE((SELECT SUM(i.quantity) FROM inventory i \
                              WHERE i.hospital_id = h.id AND i.quantity > 0 AND i.expiry_date >= ?), 0) \
                        AS usable_units \
             FROM hospitals h \
             ORDER BY h.city, h.name, h.id",
        )
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        Ok(roster)
    }

    /// Every registered donor, newest first.
    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn donor_list(&self, context: &AuthContext) -> Result<Vec<DonorRecord>, DashboardError> {
        if !context.is_admin() {
            return Err(DashboardError::AdminOnly);
        }

        let donors = sqlx::query_as::<_, DonorRecord>(
            "SELECT d.id, d.name, d.age, d.gender, d.phone, d.city, d.blood_type, d.goodwill_score, \
                    d.last_donation_date, d.created_at, \
                    EXISTS (SELECT 1 FROM rare_donors r WHERE r.donor_id = d.id) AS is_rare \
             FROM donors d \
             ORDER BY d.id DESC",
        )
        .fetch_all(&self.db)
        .await?;

        debug!("Admin donor list holds {} donors", donors.len());

        Ok(donors)
    }
}
