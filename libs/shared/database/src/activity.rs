use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use shared_models::{ActivityAction, DbId};

/// Append an entry to the activity log on the caller's connection, so it
/// commits or rolls back with the change it describes.
pub async fn record_activity(
    conn: &mut SqliteConnection,
    hospital_id: Option<DbId>,
    action: ActivityAction,
    detail: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO activity_log (hospital_id, action, detail, created_at) VALUES (?, ?, ?, ?)")
        .bind(hospital_id)
        .bind(action)
        .bind(detail)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    debug!("Activity {}: {}", action, detail);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect_in_memory;

    #[tokio::test]
    async fn entries_roll_back_with_their_transaction() {
        let pool = connect_in_memory().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        record_activity(&mut tx, None, ActivityAction::StockIn, "kept").await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        record_activity(&mut tx, None, ActivityAction::StockOut, "discarded").await.unwrap();
        tx.rollback().await.unwrap();

        let details: Vec<String> = sqlx::query_scalar("SELECT detail FROM activity_log ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(details, vec!["kept"]);

        let action: ActivityAction = sqlx::query_scalar("SELECT action FROM activity_log")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(action, ActivityAction::StockIn);
    }
}
