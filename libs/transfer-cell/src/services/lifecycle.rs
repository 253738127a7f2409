use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, instrument, warn};

use inventory_cell::models::AllocationScope;
use inventory_cell::services::{allocate, credit_units};
use shared_database::{record_activity, AppState, DbPool};
use shared_models::auth::AuthContext;
use shared_models::{ActivityAction, DbId};

use crate::models::{TransferDecision, TransferError, TransferRequest, TransferResolution, TransferStatus};

pub struct TransferLifecycleService {
    db: DbPool,
}

impl TransferLifecycleService {
    pub fn new(state: &AppState) -> Self {
        Self { db: state.db.clone() }
    }

    pub fn get_valid_transitions(current_status: TransferStatus) -> Vec<TransferStatus> {
        match current_status {
            TransferStatus::Pending => vec![TransferStatus::Approved, TransferStatus::Rejected],
            TransferStatus::Approved => vec![TransferStatus::Completed, TransferStatus::Rejected],
            TransferStatus::Rejected | TransferStatus::Completed => vec![],
        }
    }

    pub fn validate_status_transition(
        current_status: TransferStatus,
        new_status: TransferStatus,
    ) -> Result<(), TransferError> {
        if Self::get_valid_transitions(current_status).contains(&new_status) {
            Ok(())
        } else {
            Err(TransferError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            })
        }
    }

    /// Statuses from which `new_status` can be reached.
    fn sources_of(new_status: TransferStatus) -> Vec<TransferStatus> {
        [
            TransferStatus::Pending,
            TransferStatus::Approved,
            TransferStatus::Rejected,
            TransferStatus::Completed,
        ]
        .into_iter()
        .filter(|source| Self::get_valid_transitions(*source).contains(&new_status))
        .collect()
    }

    /// Work out why a status update matched no row.
    async fn refusal(
        conn: &mut SqliteConnection,
        hospital_id: DbId,
        request_id: DbId,
        decision: TransferDecision,
    ) -> TransferError {
        let current = match sqlx::query_as::<_, TransferRequest>("SELECT * FROM transfer_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&mut *conn)
            .await
        {
            Ok(Some(current)) => current,
            Ok(None) => return TransferError::NotFound,
            Err(err) => return err.into(),
        };

        if current.to_hospital_id != hospital_id {
            warn!(
                "Hospital {} tried to {:?} transfer {} addressed to {}",
                hospital_id, decision, request_id, current.to_hospital_id
            );
            return TransferError::Unauthorized;
        }

        Self::validate_status_transition(current.status, decision.target_status())
            .err()
            .unwrap_or(TransferError::InvalidStatusTransition {
                from: current.status,
                to: decision.target_status(),
            })
    }

    /// Apply the receiving hospital's decision.
    ///
    /// Fulfilment draws the supplier's stock oldest-expiry-first and credits
    /// the requester with the same expiry dates. A shortfall aborts the whole
    /// transaction; no partial transfers. Fulfilling one row of a broadcast
    /// rejects the rows of that broadcast still Pending or Approved.
    #[instrument(skip(self, context), fields(caller = context.subject_id))]
    pub async fn resolve_transfer(
        &self,
        context: &AuthContext,
        request_id: DbId,
        decision: TransferDecision,
        today: NaiveDate,
    ) -> Result<TransferResolution, TransferError> {
        let hospital_id = context.hospital_id().ok_or(TransferError::Unauthorized)?;
        let new_status = decision.target_status();

        let mut tx = self.db.begin().await?;

        // The conditional update is the first statement, so a concurrent
        // caller waits on the write lock and then matches nothing.
        let mut claimed = None;
        for source in Self::sources_of(new_status) {
            claimed = sqlx::query_as::<_, TransferRequest>(
                "UPDATE transfer_requests SET status = ?, resolved_at = ? \
                 WHERE id = ? AND to_hospital_id = ? AND status = ? RETURNING *",
            )
            .bind(new_status)
            .bind(Utc::now())
            .bind(request_id)
            .bind(hospital_id)
            .bind(source)
            .fetch_optional(&mut *tx)
            .await?
            .map(|transfer| (source, transfer));

            if claimed.is_some() {
                break;
            }
        }

        let (previous, transfer) = match claimed {
            Some(claimed) => claimed,
            None => return Err(Self::refusal(&mut tx, hospital_id, request_id, decision).await),
        };

        let mut moved = Vec::new();
        let mut superseded = Vec::new();
        if decision == TransferDecision::Fulfil {
            let allocation = allocate(
                &mut tx,
                transfer.blood_type,
                transfer.units_needed,
                AllocationScope::Hospital(transfer.to_hospital_id),
                today,
                false,
            )
            .await?;

            for draw in &allocation.draws {
                credit_units(
                    &mut tx,
                    transfer.from_hospital_id,
                    transfer.blood_type,
                    draw.units,
                    draw.expiry_date,
                )
                .await?;
            }
            debug!("Transfer {} moved {} rows", request_id, allocation.draws.len());
            moved = allocation.draws;

            if let Some(broadcast_id) = &transfer.broadcast_id {
                superseded = sqlx::query_scalar::<_, DbId>(
                    "UPDATE transfer_requests SET status = 'Rejected', resolved_at = ? \
                     WHERE broadcast_id = ? AND id <> ? AND status IN ('Pending', 'Approved') \
                     RETURNING id",
                )
                .bind(Utc::now())
                .bind(broadcast_id)
                .bind(request_id)
                .fetch_all(&mut *tx)
                .await?;
                superseded.sort_unstable();

                if !superseded.is_empty() {
                    info!(
                        "Transfer {} closed {} other row(s) of broadcast {}",
                        request_id,
                        superseded.len(),
                        broadcast_id
                    );
                }
            }
        }

        record_activity(
            &mut tx,
            Some(hospital_id),
            ActivityAction::TransferStatusChanged,
            &format!(
                "Transfer {} for hospital {} is now {}",
                request_id, transfer.from_hospital_id, transfer.status
            ),
        )
        .await?;

        tx.commit().await?;

        info!("Transfer {} moved {} -> {}", request_id, previous, transfer.status);

        Ok(TransferResolution {
            transfer,
            moved,
            superseded,
        })
    }
}
