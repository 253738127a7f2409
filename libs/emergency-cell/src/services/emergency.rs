use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{info, instrument, warn};

use inventory_cell::models::AllocationScope;
use inventory_cell::services::allocate;
use shared_config::FulfillmentPolicy;
use shared_database::{record_activity, AppState, DbPool};
use shared_models::auth::AuthContext;
use shared_models::{ActivityAction, DbId};
use shared_utils::validation::required_text;

use crate::models::{
    EmergencyApproval, EmergencyError, EmergencyRequest, EmergencyStatus, EmergencyView,
    SubmitEmergencyRequest,
};

const LIST_SQL: &str = "SELECT e.*, h.name AS hospital_name, h.city AS hospital_city \
     FROM emergency_requests e JOIN hospitals h ON h.id = e.hospital_id";

const NEWEST_FIRST: &str = " ORDER BY e.requested_at DESC, e.id DESC";

pub struct EmergencyService {
    db: DbPool,
    policy: FulfillmentPolicy,
}

impl EmergencyService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            policy: state.config.emergency_fulfillment,
        }
    }

    /// Work out why a claim on a Pending request matched no row.
    async fn refusal(
        conn: &mut SqliteConnection,
        request_id: DbId,
        new_status: EmergencyStatus,
    ) -> EmergencyError {
        let current = sqlx::query_scalar::<_, EmergencyStatus>(
            "SELECT status FROM emergency_requests WHERE id = ?",
        )
        .bind(request_id)
        .fetch_optional(&mut *conn)
        .await;

        match current {
            Ok(Some(current)) => {
                warn!("Emergency request {} is {}, cannot become {}", request_id, current, new_status);
                EmergencyError::InvalidStatusTransition {
                    from: current,
                    to: new_status,
                }
            }
            Ok(None) => EmergencyError::NotFound,
            Err(err) => err.into(),
        }
    }

    /// Move a Pending request to `new_status`. This is the first statement
    /// of the caller's transaction, so racing callers queue on the write
    /// lock and the loser matches nothing.
    async fn claim(
        conn: &mut SqliteConnection,
        request_id: DbId,
        new_status: EmergencyStatus,
    ) -> Result<EmergencyRequest, EmergencyError> {
        let claimed = sqlx::query_as::<_, EmergencyRequest>(
            "UPDATE emergency_requests SET status = ?, resolved_at = ? \
             WHERE id = ? AND status = 'Pending' RETURNING *",
        )
        .bind(new_status)
        .bind(Utc::now())
        .bind(request_id)
        .fetch_optional(&mut *conn)
        .await?;

        match claimed {
            Some(claimed) => Ok(claimed),
            None => Err(Self::refusal(conn, request_id, new_status).await),
        }
    }

    #[instrument(skip(self, context, request), fields(caller = context.subject_id))]
    pub async fn submit(
        &self,
        context: &AuthContext,
        request: SubmitEmergencyRequest,
    ) -> Result<EmergencyRequest, EmergencyError> {
        let hospital_id = context.hospital_id().ok_or(EmergencyError::HospitalOnly)?;

        let requester_name = required_text("requester_name", &request.requester_name)
            .map_err(EmergencyError::ValidationError)?;
        if request.units_required <= 0 {
            return Err(EmergencyError::ValidationError(
                "Units required must be greater than zero".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let created = sqlx::query_as::<_, EmergencyRequest>(
            "INSERT INTO emergency_requests \
                (hospital_id, requester_name, blood_type, units_required, urgency, status, notes, requested_at) \
             VALUES (?, ?, ?, ?, ?, 'Pending', ?, ?) RETURNING *",
        )
        .bind(hospital_id)
        .bind(&requester_name)
        .bind(request.blood_type)
        .bind(request.units_required)
        .bind(request.urgency)
        .bind(request.notes.as_deref().map(str::trim).filter(|notes| !notes.is_empty()))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        record_activity(
            &mut tx,
            Some(hospital_id),
            ActivityAction::EmergencySubmitted,
            &format!(
                "{} request {} for {} x {}",
                created.urgency, created.id, created.units_required, created.blood_type
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            "{} emergency request {} for {} x {} from hospital {}",
            created.urgency, created.id, created.units_required, created.blood_type, hospital_id
        );

        Ok(created)
    }

    /// Approve a Pending request and draw matching units from the whole
    /// network, soonest expiry first.
    ///
    /// Under the strict policy a shortfall fails the call and the request
    /// stays Pending. Under the partial policy whatever exists is drawn and
    /// the shortfall is reported.
    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn approve(
        &self,
        context: &AuthContext,
        request_id: DbId,
        today: NaiveDate,
    ) -> Result<EmergencyApproval, EmergencyError> {
        if !context.is_admin() {
            return Err(EmergencyError::AdminOnly);
        }

        let mut tx = self.db.begin().await?;

        let current = Self::claim(&mut tx, request_id, EmergencyStatus::Approved).await?;

        let allocation = allocate(
            &mut tx,
            current.blood_type,
            current.units_required,
            AllocationScope::Network { preferred_hospital: current.hospital_id },
            today,
            self.policy == FulfillmentPolicy::Partial,
        )
        .await?;

        let request = sqlx::query_as::<_, EmergencyRequest>(
            "UPDATE emergency_requests SET units_fulfilled = ? WHERE id = ? RETURNING *",
        )
        .bind(allocation.allocated())
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        record_activity(
            &mut tx,
            Some(request.hospital_id),
            ActivityAction::EmergencyStatusChanged,
            &format!(
                "Emergency request {} approved with {}/{} units",
                request_id,
                allocation.allocated(),
                allocation.requested
            ),
        )
        .await?;

        tx.commit().await?;

        if allocation.shortfall() > 0 {
            warn!(
                "Emergency request {} approved short by {} units",
                request_id,
                allocation.shortfall()
            );
        }
        info!(
            "Emergency request {} approved: {}/{} units allocated",
            request_id,
            allocation.allocated(),
            allocation.requested
        );

        Ok(EmergencyApproval {
            shortfall: allocation.shortfall(),
            draws: allocation.draws,
            request,
        })
    }

    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn reject(
        &self,
        context: &AuthContext,
        request_id: DbId,
    ) -> Result<EmergencyRequest, EmergencyError> {
        if !context.is_admin() {
            return Err(EmergencyError::AdminOnly);
        }

        let mut tx = self.db.begin().await?;

        let rejected = Self::claim(&mut tx, request_id, EmergencyStatus::Rejected).await?;

        record_activity(
            &mut tx,
            Some(rejected.hospital_id),
            ActivityAction::EmergencyStatusChanged,
            &format!("Emergency request {} rejected", request_id),
        )
        .await?;

        tx.commit().await?;

        info!("Emergency request {} rejected", request_id);

        Ok(rejected)
    }

    /// Network-wide queue, most urgent first and newest first within an
    /// urgency.
    pub async fn list(&self) -> Result<Vec<EmergencyView>, EmergencyError> {
        let sql = format!("{}{}", LIST_SQL, NEWEST_FIRST);
        let mut requests = sqlx::query_as::<_, EmergencyView>(&sql)
            .fetch_all(&self.db)
            .await?;

        // Stable, so the newest-first order survives inside each urgency.
        requests.sort_by_key(|view| view.request.urgency);
        Ok(requests)
    }

    pub async fn list_for_hospital(&self, hospital_id: DbId) -> Result<Vec<EmergencyView>, EmergencyError> {
        let sql = format!("{} WHERE e.hospital_id = ?{}", LIST_SQL, NEWEST_FIRST);
        let mut requests = sqlx::query_as::<_, EmergencyView>(&sql)
            .bind(hospital_id)
            .fetch_all(&self.db)
            .await?;

        requests.sort_by_key(|view| view.request.urgency);
        Ok(requests)
    }
}
