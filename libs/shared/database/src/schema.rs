use tracing::debug;

use crate::pool::DbPool;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS hospitals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        city TEXT NOT NULL,
        address TEXT,
        phone TEXT,
        reliability_score INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_hospitals_city ON hospitals (city)",
    "CREATE TABLE IF NOT EXISTS admins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS donors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        age INTEGER NOT NULL,
        gender TEXT NOT NULL,
        phone TEXT NOT NULL UNIQUE,
        city TEXT NOT NULL,
        blood_type TEXT NOT NULL,
        goodwill_score INTEGER NOT NULL DEFAULT 0,
        last_donation_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_donors_city ON donors (city)",
    "CREATE TABLE IF NOT EXISTS rare_donors (
        donor_id INTEGER PRIMARY KEY REFERENCES donors (id),
        reason TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS inventory (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hospital_id INTEGER NOT NULL REFERENCES hospitals (id),
        blood_type TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (typeof(quantity) = 'integer' AND quantity >= 0),
        expiry_date TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (hospital_id, blood_type, expiry_date)
    )",
    "CREATE INDEX IF NOT EXISTS idx_inventory_type_expiry ON inventory (blood_type, expiry_date)",
    "CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        donor_id INTEGER NOT NULL REFERENCES donors (id),
        hospital_id INTEGER NOT NULL REFERENCES hospitals (id),
        preferred_time TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'Pending',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_appointments_hospital ON appointments (hospital_id, status)",
    "CREATE TABLE IF NOT EXISTS transfer_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_hospital_id INTEGER NOT NULL REFERENCES hospitals (id),
        to_hospital_id INTEGER NOT NULL REFERENCES hospitals (id),
        blood_type TEXT NOT NULL,
        units_needed INTEGER NOT NULL CHECK (units_needed > 0),
        urgency TEXT NOT NULL DEFAULT 'Medium',
        status TEXT NOT NULL DEFAULT 'Pending',
        notes TEXT,
        broadcast_id TEXT,
        created_at TEXT NOT NULL,
        resolved_at TEXT,
        CHECK (from_hospital_id <> to_hospital_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfer_requests (to_hospital_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfer_requests (from_hospital_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_transfers_broadcast ON transfer_requests (broadcast_id)",
    "CREATE TABLE IF NOT EXISTS emergency_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hospital_id INTEGER NOT NULL REFERENCES hospitals (id),
        requester_name TEXT NOT NULL,
        blood_type TEXT NOT NULL,
        units_required INTEGER NOT NULL CHECK (units_required > 0),
        units_fulfilled INTEGER NOT NULL DEFAULT 0,
        urgency TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'Pending',
        notes TEXT,
        requested_at TEXT NOT NULL,
        resolved_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS activity_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hospital_id INTEGER REFERENCES hospitals (id),
        action TEXT NOT NULL,
        detail TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_activity_hospital ON activity_log (hospital_id, created_at)",
];

/// Create any missing table or index. Safe to run on every start.
pub async fn bootstrap(pool: &DbPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    debug!("Schema bootstrap applied {} statements", STATEMENTS.len());

    Ok(())
}
