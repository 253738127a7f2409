use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use shared_database::{is_unique_violation, record_activity, AppState, DbPool};
use shared_models::{ActivityAction, DbId};
use shared_utils::password::{hash_password, MIN_PASSWORD_LENGTH};
use shared_utils::validation::{is_valid_email, is_valid_phone, required_text};

use crate::models::{
    Hospital, HospitalError, HospitalListing, NetworkHospital, NetworkRow, NetworkStock,
    RegisterHospitalRequest,
};

pub struct HospitalService {
    db: DbPool,
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

impl HospitalService {
    pub fn new(state: &AppState) -> Self {
        Self { db: state.db.clone() }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterHospitalRequest) -> Result<Hospital, HospitalError> {
        let name = required_text("name", &request.name).map_err(HospitalError::ValidationError)?;
        let city = required_text("city", &request.city).map_err(HospitalError::ValidationError)?;

        let email = request.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(HospitalError::ValidationError("Invalid email address".to_string()));
        }
        if request.password.len() < MIN_PASSWORD_LENGTH {
            return Err(HospitalError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        let phone = optional_text(request.phone);
        if let Some(phone) = &phone {
            if !is_valid_phone(phone) {
                return Err(HospitalError::ValidationError(
                    "Phone number must be exactly 10 digits".to_string(),
                ));
            }
        }

        let password_hash =
            hash_password(&request.password).map_err(|e| HospitalError::HashingError(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query_as::<_, Hospital>(
            "INSERT INTO hospitals (name, email, password_hash, city, address, phone, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .bind(&city)
        .bind(optional_text(request.address))
        .bind(&phone)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let hospital = match inserted {
            Ok(hospital) => hospital,
            Err(err) if is_unique_violation(&err) => {
                warn!("Registration rejected, email already in use");
                return Err(HospitalError::DuplicateEmail);
            }
            Err(err) => return Err(err.into()),
        };

        record_activity(
            &mut tx,
            Some(hospital.id),
            ActivityAction::HospitalRegistered,
            &format!("{} joined the network from {}", hospital.name, hospital.city),
        )
        .await?;

        tx.commit().await?;

        info!("Registered hospital {} ({}) in {}", hospital.id, hospital.name, hospital.city);
        Ok(hospital)
    }

    pub async fn get(&self, hospital_id: DbId) -> Result<Hospital, HospitalError> {
        sqlx::query_as::<_, Hospital>("SELECT * FROM hospitals WHERE id = ?")
            .bind(hospital_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(HospitalError::NotFound)
    }

    /// Case-insensitive city lookup for the public booking form.
    pub async fn hospitals_in_city(&self, city: &str) -> Result<Vec<HospitalListing>, HospitalError> {
        let hospitals = sqlx::query_as::<_, HospitalListing>(
            "SELECT id, name FROM hospitals WHERE LOWER(city) = LOWER(?) ORDER BY name",
        )
        .bind(city.trim())
        .fetch_all(&self.db)
        .await?;

        Ok(hospitals)
    }

    pub async fn cities(&self) -> Result<Vec<String>, HospitalError> {
        let cities = sqlx::query_scalar::<_, String>("SELECT DISTINCT city FROM hospitals ORDER BY city")
            .fetch_all(&self.db)
            .await?;

        Ok(cities)
    }

    /// Every hospital except the caller, with its usable stock per blood type.
    #[instrument(skip(self))]
    pub async fn network(
        &self,
        hospital_id: DbId,
        today: NaiveDate,
    ) -> Result<Vec<NetworkHospital>, HospitalError> {
        let rows = sqlx::query_as::<_, NetworkRow>(
            "SELECT h.id, h.name, h.city, h.phone, h.reliability_score, \
                    i.blood_type, SUM(i.quantity) AS units \
             FROM hospitals h \
             LEFT JOIN inventory i \
                    ON i.hospital_id = h.id AND i.quantity > 0 AND i.expiry_date >= ? \
             WHERE h.id <> ? \
             GROUP BY h.id, i.blood_type \
             ORDER BY h.city, h.name, h.id, i.blood_type",
        )
        .bind(today)
        .bind(hospital_id)
        .fetch_all(&self.db)
        .await?;

        let mut network: Vec<NetworkHospital> = Vec::new();
        for row in rows {
            let stock = match (row.blood_type, row.units) {
                (Some(blood_type), Some(units)) => Some(NetworkStock { blood_type, units }),
                _ => None,
            };

            match network.last_mut() {
                Some(current) if current.id == row.id => current.stock.extend(stock),
                _ => network.push(NetworkHospital {
                    id: row.id,
                    name: row.name,
                    city: row.city,
                    phone: row.phone,
                    reliability_score: row.reliability_score,
                    stock: stock.into_iter().collect(),
                }),
            }
        }

        debug!("Network view for hospital {} lists {} peers", hospital_id, network.len());

        Ok(network)
    }
}
