// libs/appointment-cell/src/services/booking.rs
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, instrument, warn};

use shared_database::{record_activity, AppState, DbPool};
use shared_models::{ActivityAction, BloodType, DbId};
use shared_utils::validation::{is_valid_phone, required_text};

use crate::models::{
    Appointment, AppointmentError, AppointmentView, BookAppointmentRequest, BookingConfirmation,
    Donor, DonorInfo, MAX_DONOR_AGE, MIN_DONOR_AGE,
};

/// Donor details after validation.
#[derive(Debug, Clone)]
struct ValidDonor {
    name: String,
    age: i64,
    gender: String,
    phone: String,
    city: String,
    blood_type: BloodType,
}

pub struct BookingService {
    db: DbPool,
    donation_interval_days: i64,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            donation_interval_days: state.config.donation_interval_days,
        }
    }

    fn validate_donor(&self, donor: &DonorInfo) -> Result<ValidDonor, AppointmentError> {
        let name = required_text("name", &donor.name).map_err(AppointmentError::ValidationError)?;

        if !(MIN_DONOR_AGE..=MAX_DONOR_AGE).contains(&donor.age) {
            return Err(AppointmentError::ValidationError(format!(
                "Donor age must be between {} and {}",
                MIN_DONOR_AGE, MAX_DONOR_AGE
            )));
        }

        let phone = donor.phone.trim().to_string();
        if !is_valid_phone(&phone) {
            return Err(AppointmentError::ValidationError(
                "Phone number must be exactly 10 digits".to_string(),
            ));
        }

        let blood_type = donor
            .blood_type
            .parse::<BloodType>()
            .map_err(AppointmentError::ValidationError)?;

        Ok(ValidDonor {
            name,
            age: donor.age,
            gender: donor.gender.trim().to_string(),
            phone,
            city: donor.city.trim().to_string(),
            blood_type,
        })
    }

    /// Days still to wait before `preferred` is far enough from the last
    /// donation; zero when the donor may book.
    pub fn remaining_interval_days(
        &self,
        last_donation: Option<NaiveDate>,
        preferred: NaiveDateTime,
    ) -> i64 {
        match last_donation {
            Some(last) => {
                let elapsed = (preferred.date() - last).num_days();
                (self.donation_interval_days - elapsed).max(0)
            }
            None => 0,
        }
    }

    /// Resolve the donor by phone, creating it on first booking.
    /// Returns the donor id and whether it was newly created.
    async fn resolve_donor(
        &self,
        conn: &mut SqliteConnection,
        donor: &ValidDonor,
        preferred: NaiveDateTime,
    ) -> Result<(DbId, bool), AppointmentError> {
        let now = Utc::now();

        let existing = sqlx::query_as::<_, Donor>("SELECT * FROM donors WHERE phone = ?")
            .bind(&donor.phone)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(existing) = existing {
            let remaining_days = self.remaining_interval_days(existing.last_donation_date, preferred);
            if remaining_days > 0 {
                warn!("Donor {} booked {} days too early", existing.id, remaining_days);
                return Err(AppointmentError::DonationIntervalNotElapsed { remaining_days });
            }

            // Most recent booking wins.
            sqlx::query(
                "UPDATE donors SET name = ?, age = ?, gender = ?, city = ?, blood_type = ?, updated_at = ? \
                 WHERE id = ?",
            )
            .bind(&donor.name)
            .bind(donor.age)
            .bind(&donor.gender)
            .bind(&donor.city)
            .bind(donor.blood_type)
            .bind(now)
            .bind(existing.id)
            .execute(&mut *conn)
            .await?;

            debug!("Reusing donor {} for phone booking", existing.id);
            return Ok((existing.id, false));
        }

        let donor_id = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO donors (name, age, gender, phone, city, blood_type, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&donor.name)
        .bind(donor.age)
        .bind(&donor.gender)
        .bind(&donor.phone)
        .bind(&donor.city)
        .bind(donor.blood_type)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        if donor.blood_type.is_rare() {
            sqlx::query("INSERT INTO rare_donors (donor_id, reason, created_at) VALUES (?, ?, ?)")
                .bind(donor_id)
                .bind(format!("Rare blood type {}", donor.blood_type))
                .bind(now)
                .execute(&mut *conn)
                .await?;
            info!("Donor {} flagged as rare ({})", donor_id, donor.blood_type);
        }

        Ok((donor_id, true))
    }

    #[instrument(skip(self, request), fields(hospital_id = request.hospital_id))]
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let donor = self.validate_donor(&request.donor)?;

        let mut tx = self.db.begin().await?;

        let hospital_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hospitals WHERE id = ?")
            .bind(request.hospital_id)
            .fetch_one(&mut *tx)
            .await?;
        if hospital_exists == 0 {
            return Err(AppointmentError::HospitalNotFound);
        }

        let (donor_id, new_donor) = self.resolve_donor(&mut tx, &donor, request.preferred_time).await?;

        let now = Utc::now();
        let appointment = sqlx::query_as::<_, Appointment>(
            "INSERT INTO appointments (donor_id, hospital_id, preferred_time, status, created_at, updated_at) \
             VALUES (?, ?, ?, 'Pending', ?, ?) RETURNING *",
        )
        .bind(donor_id)
        .bind(request.hospital_id)
        .bind(request.preferred_time)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let rare_donor = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM rare_donors WHERE donor_id = ?)",
        )
        .bind(donor_id)
        .fetch_one(&mut *tx)
        .await?;

        record_activity(
            &mut tx,
            Some(request.hospital_id),
            ActivityAction::AppointmentBooked,
            &format!("Appointment {} booked by {} ({})", appointment.id, donor.name, donor.blood_type),
        )
        .await?;

        tx.commit().await?;

        info!(
            "Booked appointment {} for donor {} at hospital {}",
            appointment.id, donor_id, request.hospital_id
        );

        Ok(BookingConfirmation {
            appointment,
            donor_id,
            new_donor,
            rare_donor,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_for_hospital(
        &self,
        hospital_id: DbId,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        let appointments = sqlx::query_as::<_, AppointmentView>(
            "SELECT a.id, a.hospital_id, a.preferred_time, a.status, a.created_at, \
                    d.id AS donor_id, d.name AS donor_name, d.age AS donor_age, \
                    d.gender AS donor_gender, d.phone AS donor_phone, d.city AS donor_city, \
                    d.blood_type, d.goodwill_score, \
                    EXISTS (SELECT 1 FROM rare_donors r WHERE r.donor_id = d.id) AS is_rare \
             FROM appointments a \
             JOIN donors d ON d.id = a.donor_id \
             WHERE a.hospital_id = ? \
             ORDER BY a.preferred_time DESC, a.id DESC",
        )
        .bind(hospital_id)
        .fetch_all(&self.db)
        .await?;

        Ok(appointments)
    }
}
