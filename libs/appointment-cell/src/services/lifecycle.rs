// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use sqlx::SqliteConnection;

use shared_database::{record_activity, AppState, DbPool};
use shared_models::auth::AuthContext;
use shared_models::{ActivityAction, DbId};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService {
    db: DbPool,
}

impl AppointmentLifecycleService {
    pub fn new(state: &AppState) -> Self {
        Self { db: state.db.clone() }
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![AppointmentStatus::Approved, AppointmentStatus::Rejected],
            AppointmentStatus::Approved => vec![AppointmentStatus::Completed, AppointmentStatus::Rejected],
            // Terminal states - no transitions allowed
            AppointmentStatus::Rejected => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if !Self::get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        debug!("Status transition validated: {:?} -> {:?}", current_status, new_status);
        Ok(())
    }

    /// Statuses from which `new_status` can be reached.
    fn sources_of(new_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        [
            AppointmentStatus::Pending,
            AppointmentStatus::Approved,
            AppointmentStatus::Rejected,
            AppointmentStatus::Completed,
        ]
        .into_iter()
        .filter(|source| Self::get_valid_transitions(*source).contains(&new_status))
        .collect()
    }

    /// Work out why a status update matched no row.
    async fn refusal(
        conn: &mut SqliteConnection,
        hospital_id: DbId,
        appointment_id: DbId,
        new_status: AppointmentStatus,
    ) -> AppointmentError {
        let current = match sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
            .bind(appointment_id)
            .fetch_optional(&mut *conn)
            .await
        {
            Ok(Some(current)) => current,
            Ok(None) => return AppointmentError::NotFound,
            Err(err) => return err.into(),
        };

        if current.hospital_id != hospital_id {
            warn!(
                "Hospital {} tried to update appointment {} owned by {}",
                hospital_id, appointment_id, current.hospital_id
            );
            return AppointmentError::Unauthorized;
        }

        Self::validate_status_transition(current.status, new_status)
            .err()
            .unwrap_or(AppointmentError::InvalidStatusTransition {
                from: current.status,
                to: new_status,
            })
    }

    /// Move an appointment owned by the calling hospital to `new_status`.
    ///
    /// Completing an appointment stamps the donor's last donation date with
    /// `today` and adds one goodwill point.
    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn set_status(
        &self,
        context: &AuthContext,
        appointment_id: DbId,
        new_status: AppointmentStatus,
        today: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        let hospital_id = context.hospital_id().ok_or(AppointmentError::Unauthorized)?;

        let mut tx = self.db.begin().await?;

        // The conditional update is the first statement, so a concurrent
        // caller waits on the write lock and then matches nothing.
        let mut updated = None;
        for source in Self::sources_of(new_status) {
            updated = sqlx::query_as::<_, Appointment>(
                "UPDATE appointments SET status = ?, updated_at = ? \
                 WHERE id = ? AND hospital_id = ? AND status = ? RETURNING *",
            )
            .bind(new_status)
            .bind(Utc::now())
            .bind(appointment_id)
            .bind(hospital_id)
            .bind(source)
            .fetch_optional(&mut *tx)
            .await?;

            if updated.is_some() {
                debug!("Appointment {} left {}", appointment_id, source);
                break;
            }
        }

        let updated = match updated {
            Some(updated) => updated,
            None => return Err(Self::refusal(&mut tx, hospital_id, appointment_id, new_status).await),
        };

        if new_status == AppointmentStatus::Completed {
            sqlx::query(
                "UPDATE donors SET last_donation_date = ?, goodwill_score = goodwill_score + 1, updated_at = ? \
                 WHERE id = ?",
            )
            .bind(today)
            .bind(Utc::now())
            .bind(updated.donor_id)
            .execute(&mut *tx)
            .await?;
        }

        record_activity(
            &mut tx,
            Some(hospital_id),
            ActivityAction::AppointmentStatusChanged,
            &format!("Appointment {} is now {}", appointment_id, updated.status),
        )
        .await?;

        tx.commit().await?;

        info!("Appointment {} moved to {}", appointment_id, updated.status);

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn transition_table() {
        use AppointmentStatus::*;

        assert!(AppointmentLifecycleService::validate_status_transition(Pending, Approved).is_ok());
        assert!(AppointmentLifecycleService::validate_status_transition(Pending, Rejected).is_ok());
        assert!(AppointmentLifecycleService::validate_status_transition(Approved, Completed).is_ok());
        assert!(AppointmentLifecycleService::validate_status_transition(Approved, Rejected).is_ok());

        assert_matches!(
            AppointmentLifecycleService::validate_status_transition(Pending, Completed),
            Err(AppointmentError::InvalidStatusTransition { from: Pending, to: Completed })
        );
        assert_matches!(
            AppointmentLifecycleService::validate_status_transition(Completed, Approved),
            Err(AppointmentError::InvalidStatusTransition { .. })
        );
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for status in [AppointmentStatus::Rejected, AppointmentStatus::Completed] {
            assert!(status.is_terminal());
            assert!(AppointmentLifecycleService::get_valid_transitions(status).is_empty());
        }
    }

    #[test]
    fn status_updates_claim_only_from_legal_sources() {
        use AppointmentStatus::*;

        assert_eq!(AppointmentLifecycleService::sources_of(Approved), vec![Pending]);
        assert_eq!(AppointmentLifecycleService::sources_of(Rejected), vec![Pending, Approved]);
        assert_eq!(AppointmentLifecycleService::sources_of(Completed), vec![Approved]);
        assert!(AppointmentLifecycleService::sources_of(Pending).is_empty());
    }
}
