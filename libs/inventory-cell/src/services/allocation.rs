use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, instrument, warn};

use shared_database::record_activity;
use shared_models::{ActivityAction, BloodType};

use crate::models::{Allocation, AllocationScope, Candidate, Draw, InventoryError};

/// Walk the candidates in order, taking as much as each row holds until
/// `units` is covered. Candidates must already be sorted.
pub fn plan_draws(candidates: &[Candidate], units: i64) -> Vec<Draw> {
    let mut remaining = units;
    let mut draws = Vec::new();

    for candidate in candidates {
        if remaining <= 0 {
            break;
        }
        if candidate.quantity <= 0 {
            continue;
        }

        let take = remaining.min(candidate.quantity);
        draws.push(Draw {
            inventory_id: candidate.id,
            hospital_id: candidate.hospital_id,
            expiry_date: candidate.expiry_date,
            units: take,
        });
        remaining -= take;
    }

    draws
}

async fn load_candidates(
    conn: &mut SqliteConnection,
    blood_type: BloodType,
    scope: AllocationScope,
    today: NaiveDate,
) -> Result<Vec<Candidate>, InventoryError> {
    let candidates = match scope {
        AllocationScope::Hospital(hospital_id) => {
            sqlx::query_as::<_, Candidate>(
                "SELECT id, hospital_id, quantity, expiry_date FROM inventory \
                 WHERE hospital_id = ? AND blood_type = ? AND quantity > 0 AND expiry_date >= ? \
                 ORDER BY expiry_date ASC, id ASC",
            )
            .bind(hospital_id)
            .bind(blood_type)
            .bind(today)
            .fetch_all(&mut *conn)
            .await?
        }
        AllocationScope::Network { preferred_hospital } => {
            sqlx::query_as::<_, Candidate>(
                "SELECT id, hospital_id, quantity, expiry_date FROM inventory \
                 WHERE blood_type = ? AND quantity > 0 AND expiry_date >= ? \
                 ORDER BY expiry_date ASC, \
                          CASE WHEN hospital_id = ? THEN 0 ELSE 1 END ASC, \
                          id ASC",
            )
            .bind(blood_type)
            .bind(today)
            .bind(preferred_hospital)
            .fetch_all(&mut *conn)
            .await?
        }
    };

    Ok(candidates)
}

/// Draw `units` of `blood_type` from non-expired stock, soonest expiry first.
///
/// Runs on the caller's connection so it joins the caller's transaction.
/// With `allow_partial == false` a shortfall fails before anything is
/// decremented; otherwise whatever exists is drawn and the shortfall is
/// reported on the returned `Allocation`.
#[instrument(skip(conn))]
pub async fn allocate(
    conn: &mut SqliteConnection,
    blood_type: BloodType,
    units: i64,
    scope: AllocationScope,
    today: NaiveDate,
    allow_partial: bool,
) -> Result<Allocation, InventoryError> {
    if units <= 0 {
        return Err(InventoryError::ValidationError(
            "Units to allocate must be greater than zero".to_string(),
        ));
    }

    let candidates = load_candidates(conn, blood_type, scope, today).await?;
    let draws = plan_draws(&candidates, units);
    let allocation = Allocation {
        blood_type,
        requested: units,
        draws,
    };

    if !allocation.is_complete() && !allow_partial {
        warn!(
            "Allocation of {} {} units short by {}",
            units,
            blood_type,
            allocation.shortfall()
        );
        return Err(InventoryError::InsufficientStock {
            blood_type,
            requested: units,
            available: allocation.allocated(),
        });
    }

    let now = Utc::now();
    for draw in &allocation.draws {
        let result = sqlx::query(
            "UPDATE inventory SET quantity = quantity - ?, updated_at = ? \
             WHERE id = ? AND quantity >= ?",
        )
        .bind(draw.units)
        .bind(now)
        .bind(draw.inventory_id)
        .bind(draw.units)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            // Row drained underneath us; the caller rolls back.
            return Err(InventoryError::InsufficientStock {
                blood_type,
                requested: units,
                available: allocation.allocated() - draw.units,
            });
        }

        record_activity(
            conn,
            Some(draw.hospital_id),
            ActivityAction::StockOut,
            &format!("{} x {} from bucket {} (expires {})", draw.units, blood_type, draw.inventory_id, draw.expiry_date),
        )
        .await?;
    }

    debug!(
        "Allocated {}/{} {} units across {} rows",
        allocation.allocated(),
        units,
        blood_type,
        allocation.draws.len()
    );

    Ok(allocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared_models::DbId;

    fn candidate(id: DbId, hospital_id: DbId, quantity: i64, offset: i64) -> Candidate {
        Candidate {
            id,
            hospital_id,
            quantity,
            expiry_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + Duration::days(offset),
        }
    }

    #[test]
    fn plan_takes_rows_in_order() {
        let candidates = vec![candidate(1, 1, 3, 1), candidate(2, 2, 4, 2), candidate(3, 1, 10, 5)];
        let draws = plan_draws(&candidates, 6);

        assert_eq!(draws.len(), 2);
        assert_eq!((draws[0].inventory_id, draws[0].units), (1, 3));
        assert_eq!((draws[1].inventory_id, draws[1].units), (2, 3));
    }

    #[test]
    fn plan_stops_when_stock_runs_out() {
        let candidates = vec![candidate(1, 1, 2, 1), candidate(2, 1, 0, 2)];
        let draws = plan_draws(&candidates, 5);

        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].units, 2);
    }
}
