//! Postgres-backed appointment repository.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError | Scenario |
//! |------------|----------------------|-----------------|----------|
//! | Database (unique violation) | `23505` | `ConstraintViolation` | Two active appointments for one doctor slot |
//! | Database (check violation) | `23514` | `Corrupt` | Row rejected by a CHECK (bad status, blank reason) |
//! | Database (other) | Any other | `Unavailable` | Other database errors |
//! | PoolClosed / Io / PoolTimedOut | N/A | `Unavailable` | Connection trouble |
//! | ColumnDecode / Decode | N/A | `Corrupt` | Stored value cannot be read back |
//!
//! The uniqueness rule lives in the partial index
//! `appointments_active_slot_uq` (see `migrations/0001_appointments.sql`), so
//! concurrent bookings across processes are arbitrated by the database.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use medibook_core::{AppointmentId, PatientId, UserId};
use medibook_scheduling::{Appointment, AppointmentStatus, NewAppointment};

use super::r#trait::{AppointmentRepository, RepositoryError};

const SCHEMA: &str = include_str!("../../migrations/0001_appointments.sql");

const SELECT_COLUMNS: &str = r#"
    SELECT
        appointment_id,
        patient_id,
        doctor_id,
        appointment_date,
        appointment_time,
        reason,
        status,
        notes,
        created_by,
        created_date,
        updated_date
    FROM appointments
"#;

const ORDER: &str = " ORDER BY appointment_date ASC, appointment_time ASC, appointment_id ASC";

/// Postgres appointment repository.
///
/// Uses an SQLx connection pool, so it is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresAppointmentRepository {
    pool: Arc<PgPool>,
}

impl PostgresAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn fetch_list<'q>(
        &self,
        operation: &'static str,
        query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.iter().map(decode_row).collect()
    }
}

#[async_trait::async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    #[instrument(skip(self), fields(doctor_id = %doctor_id, date = %date), err)]
    async fn find_booked_times(
        &self,
        doctor_id: UserId,
        date: NaiveDate,
    ) -> Result<BTreeSet<NaiveTime>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT appointment_time
            FROM appointments
            WHERE doctor_id = $1 AND appointment_date = $2 AND status <> 'cancelled'
            "#,
        )
        .bind(doctor_id.as_uuid())
        .bind(date)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_booked_times", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<NaiveTime, _>("appointment_time")
                    .map_err(|e| map_sqlx_error("find_booked_times", e))
            })
            .collect()
    }

    #[instrument(skip(self, appointment), fields(slot = %appointment.slot()), err)]
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO appointments (
                patient_id, doctor_id, appointment_date, appointment_time,
                reason, status, notes, created_by, created_date, updated_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING appointment_id
            "#,
        )
        .bind(appointment.patient_id.as_uuid())
        .bind(appointment.doctor_id.as_uuid())
        .bind(appointment.date)
        .bind(appointment.time)
        .bind(&appointment.reason)
        .bind(AppointmentStatus::Scheduled.as_str())
        .bind(appointment.notes.as_deref())
        .bind(appointment.created_by.as_uuid())
        .bind(appointment.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        let id: i64 = row
            .try_get("appointment_id")
            .map_err(|e| map_sqlx_error("insert", e))?;

        Ok(appointment.into_appointment(AppointmentId::new(id)))
    }

    #[instrument(skip(self), fields(appointment_id = %id), err)]
    async fn find_by_id(&self, id: AppointmentId) -> Result<Appointment, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE appointment_id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?
            .ok_or(RepositoryError::NotFound(id))?;

        decode_row(&row)
    }

    #[instrument(
        skip(self, appointment),
        fields(appointment_id = %appointment.id, status = appointment.status.as_str()),
        err
    )]
    async fn update(&self, appointment: &Appointment) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET status = $2, notes = $3, updated_date = $4
            WHERE appointment_id = $1
            "#,
        )
        .bind(appointment.id.get())
        .bind(appointment.status.as_str())
        .bind(appointment.notes.as_deref())
        .bind(appointment.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(appointment.id));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_all(&self) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS}{ORDER}");
        self.fetch_list("find_all", sqlx::query(&sql)).await
    }

    #[instrument(skip(self), fields(doctor_id = %doctor_id), err)]
    async fn find_by_doctor(&self, doctor_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE doctor_id = $1{ORDER}");
        self.fetch_list("find_by_doctor", sqlx::query(&sql).bind(doctor_id.as_uuid()))
            .await
    }

    #[instrument(skip(self), fields(created_by = %user_id), err)]
    async fn find_by_creator(&self, user_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE created_by = $1{ORDER}");
        self.fetch_list("find_by_creator", sqlx::query(&sql).bind(user_id.as_uuid()))
            .await
    }

    #[instrument(skip(self), fields(date = %date), err)]
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE appointment_date = $1{ORDER}");
        self.fetch_list("find_by_date", sqlx::query(&sql).bind(date)).await
    }

    #[instrument(skip(self), fields(appointment_id = %id), err)]
    async fn delete(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM appointments WHERE appointment_id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> Result<Appointment, RepositoryError> {
    let raw = AppointmentRow::from_row(row).map_err(|e| map_sqlx_error("decode_row", e))?;
    Appointment::try_from(raw)
}

/// Map SQLx errors to `RepositoryError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::ConstraintViolation(msg),
                Some("23514") => RepositoryError::Corrupt(msg),
                _ => RepositoryError::Unavailable(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            RepositoryError::Corrupt(format!("failed to decode row in {}: {}", operation, err))
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => RepositoryError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug, Clone)]
struct AppointmentRow {
    appointment_id: i64,
    patient_id: uuid::Uuid,
    doctor_id: uuid::Uuid,
    appointment_date: NaiveDate,
    appointment_time: NaiveTime,
    reason: String,
    status: String,
    notes: Option<String>,
    created_by: uuid::Uuid,
    created_date: DateTime<Utc>,
    updated_date: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for AppointmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AppointmentRow {
            appointment_id: row.try_get("appointment_id")?,
            patient_id: row.try_get("patient_id")?,
            doctor_id: row.try_get("doctor_id")?,
            appointment_date: row.try_get("appointment_date")?,
            appointment_time: row.try_get("appointment_time")?,
            reason: row.try_get("reason")?,
            status: row.try_get("status")?,
            notes: row.try_get("notes")?,
            created_by: row.try_get("created_by")?,
            created_date: row.try_get("created_date")?,
            updated_date: row.try_get("updated_date")?,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = RepositoryError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<AppointmentStatus>().map_err(|e| {
            RepositoryError::Corrupt(format!("appointment {}: {}", row.appointment_id, e))
        })?;

        Ok(Appointment {
            id: AppointmentId::new(row.appointment_id),
            patient_id: PatientId::from_uuid(row.patient_id),
            doctor_id: UserId::from_uuid(row.doctor_id),
            date: row.appointment_date,
            time: row.appointment_time,
            reason: row.reason,
            status,
            notes: row.notes,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_date,
            updated_at: row.updated_date,
        })
    }
}
