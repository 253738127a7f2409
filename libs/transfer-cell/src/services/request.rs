use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_database::{record_activity, AppState, DbPool};
use shared_models::auth::AuthContext;
use shared_models::{ActivityAction, DbId};

use crate::models::{
    CreateTransferRequest, TransferError, TransferListing, TransferRequest, TransferTarget,
    TransferView,
};

pub struct TransferService {
    db: DbPool,
}

impl TransferService {
    pub fn new(state: &AppState) -> Self {
        Self { db: state.db.clone() }
    }

    /// Create one Pending request per recipient. A broadcast fans out to
    /// every other hospital in the network, and its rows share a
    /// `broadcast_id` so the first fulfilment can close the rest.
    #[instrument(skip(self, context, request), fields(sender = context.subject_id))]
    pub async fn request_transfer(
        &self,
        context: &AuthContext,
        request: CreateTransferRequest,
    ) -> Result<Vec<TransferRequest>, TransferError> {
        let sender = context.hospital_id().ok_or(TransferError::Unauthorized)?;

        if request.units_needed <= 0 {
            return Err(TransferError::ValidationError(
                "Units needed must be greater than zero".to_string(),
            ));
        }
        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);

        let mut tx = self.db.begin().await?;

        let broadcast_id = match request.target() {
            TransferTarget::Broadcast => Some(Uuid::new_v4().to_string()),
            TransferTarget::Direct(_) => None,
        };

        let recipients: Vec<DbId> = match request.target() {
            TransferTarget::Broadcast => {
                let ids = sqlx::query_scalar::<_, DbId>("SELECT id FROM hospitals WHERE id <> ? ORDER BY id")
                    .bind(sender)
                    .fetch_all(&mut *tx)
                    .await?;
                if ids.is_empty() {
                    return Err(TransferError::NoRecipients);
                }
                ids
            }
            TransferTarget::Direct(recipient) => {
                if recipient == sender {
                    return Err(TransferError::ValidationError(
                        "A hospital cannot request a transfer from itself".to_string(),
                    ));
                }
                let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hospitals WHERE id = ?")
                    .bind(recipient)
                    .fetch_one(&mut *tx)
                    .await?;
                if exists == 0 {
                    return Err(TransferError::HospitalNotFound);
                }
                vec![recipient]
            }
        };

        let now = Utc::now();
        let mut created = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let row = sqlx::query_as::<_, TransferRequest>(
                "INSERT INTO transfer_requests \
                    (from_hospital_id, to_hospital_id, blood_type, units_needed, urgency, status, notes, \
                     broadcast_id, created_at) \
                 VALUES (?, ?, ?, ?, ?, 'Pending', ?, ?, ?) RETURNING *",
            )
            .bind(sender)
            .bind(recipient)
            .bind(request.blood_type)
            .bind(request.units_needed)
            .bind(request.urgency)
            .bind(&notes)
            .bind(&broadcast_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        record_activity(
            &mut tx,
            Some(sender),
            ActivityAction::TransferRequested,
            &format!(
                "Requested {} x {} from {} hospital(s)",
                request.units_needed,
                request.blood_type,
                created.len()
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            "Hospital {} requested {} x {} from {} hospital(s)",
            sender,
            request.units_needed,
            request.blood_type,
            created.len()
        );

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_transfers(&self, hospital_id: DbId) -> Result<TransferListing, TransferError> {
        let incoming = sqlx::query_as::<_, TransferView>(
            "SELECT t.*, h.name AS counterparty_name, h.city AS counterparty_city \
             FROM transfer_requests t JOIN hospitals h ON h.id = t.from_hospital_id \
             WHERE t.to_hospital_id = ? \
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .bind(hospital_id)
        .fetch_all(&self.db)
        .await?;

        let outgoing = sqlx::query_as::<_, TransferView>(
            "SELECT t.*, h.name AS counterparty_name, h.city AS counterparty_city \
             FROM transfer_requests t JOIN hospitals h ON h.id = t.to_hospital_id \
             WHERE t.from_hospital_id = ? \
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .bind(hospital_id)
        .fetch_all(&self.db)
        .await?;

        debug!(
            "Hospital {} has {} incoming and {} outgoing transfers",
            hospital_id,
            incoming.len(),
            outgoing.len()
        );

        Ok(TransferListing { incoming, outgoing })
    }
}
