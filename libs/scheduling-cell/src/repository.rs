// libs/scheduling-cell/src/repository.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, NewAppointment, ProfessionalProfile, SchedulingError};

// ==============================================================================
// REPOSITORY CONTRACTS
// ==============================================================================

/// Read-only directory of clinic professionals.
#[async_trait]
pub trait ProfessionalRepository: Send + Sync {
    async fn list_active(&self, auth_token: &str)
        -> Result<Vec<ProfessionalProfile>, SchedulingError>;

    async fn exists(&self, professional_id: Uuid, auth_token: &str)
        -> Result<bool, SchedulingError>;
}

/// Patient lookups needed by block creation.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn exists(&self, patient_id: Uuid, auth_token: &str)
        -> Result<bool, SchedulingError>;
}

/// Appointment reads and writes used by the scheduling core.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_id(&self, appointment_id: Uuid, auth_token: &str)
        -> Result<Option<Appointment>, SchedulingError>;

    /// Appointments for one professional overlapping the given window.
    async fn list_for_professional_in_range(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// All appointments of one block, ordered by sequence index.
    async fn list_group(&self, group_id: Uuid, auth_token: &str)
        -> Result<Vec<Appointment>, SchedulingError>;

    /// Booked block appointments starting on or after `from`, optionally
    /// narrowed to one patient.
    async fn list_grouped_from(
        &self,
        patient_id: Option<Uuid>,
        from: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// Persist all rows as a single atomic write. Either every appointment is
    /// stored or none is.
    async fn insert_batch(
        &self,
        appointments: &[NewAppointment],
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// Flag an appointment so it never surfaces as a renewal candidate again.
    async fn mark_renewal_dismissed(&self, appointment_id: Uuid, auth_token: &str)
        -> Result<(), SchedulingError>;
}

// ==============================================================================
// SUPABASE IMPLEMENTATIONS
// ==============================================================================

pub struct SupabaseProfessionalRepository {
    supabase: SupabaseClient,
}

impl SupabaseProfessionalRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl ProfessionalRepository for SupabaseProfessionalRepository {
    async fn list_active(&self, auth_token: &str)
        -> Result<Vec<ProfessionalProfile>, SchedulingError> {
        let path = "/rest/v1/professionals?status=eq.active&order=full_name.asc";
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let professionals: Vec<ProfessionalProfile> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<ProfessionalProfile>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse professionals: {}", e)))?;

        Ok(professionals)
    }

    async fn exists(&self, professional_id: Uuid, auth_token: &str)
        -> Result<bool, SchedulingError> {
        let path = format!("/rest/v1/professionals?id=eq.{}&select=id", professional_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }
}

pub struct SupabasePatientRepository {
    supabase: SupabaseClient,
}

impl SupabasePatientRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl PatientRepository for SupabasePatientRepository {
    async fn exists(&self, patient_id: Uuid, auth_token: &str)
        -> Result<bool, SchedulingError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }
}

pub struct SupabaseAppointmentRepository {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn parse_appointments(result: Vec<Value>) -> Result<Vec<Appointment>, SchedulingError> {
        result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn find_by_id(&self, appointment_id: Uuid, auth_token: &str)
        -> Result<Option<Appointment>, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(Self::parse_appointments(result)?.into_iter().next())
    }

    async fn list_for_professional_in_range(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            professional_id,
            to.to_rfc3339(),
            from.to_rfc3339(),
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Self::parse_appointments(result)
    }

    async fn list_group(&self, group_id: Uuid, auth_token: &str)
        -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?group_id=eq.{}&order=sequence_index.asc",
            group_id,
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Self::parse_appointments(result)
    }

    async fn list_grouped_from(
        &self,
        patient_id: Option<Uuid>,
        from: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut query_parts = vec![
            "group_id=not.is.null".to_string(),
            "status=eq.agendado".to_string(),
            format!("start_time=gte.{}", from.to_rfc3339()),
        ];

        if let Some(patient_id) = patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&"),
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Self::parse_appointments(result)
    }

    async fn insert_batch(
        &self,
        appointments: &[NewAppointment],
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Inserting batch of {} appointments", appointments.len());

        let rows: Vec<Value> = appointments.iter()
            .map(|apt| json!({
                "professional_id": apt.professional_id,
                "patient_id": apt.patient_id,
                "start_time": apt.start_time.to_rfc3339(),
                "end_time": apt.end_time.to_rfc3339(),
                "group_id": apt.group_id,
                "sequence_index": apt.sequence_index,
                "status": apt.status.to_string(),
                "renewal_dismissed": false,
            }))
            .collect();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        // One multi-row insert is one statement on the store side, so a
        // failure persists nothing.
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(Value::Array(rows)),
            Some(headers),
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if result.len() != appointments.len() {
            return Err(SchedulingError::DatabaseError(format!(
                "Batch insert returned {} rows, expected {}",
                result.len(),
                appointments.len(),
            )));
        }

        Self::parse_appointments(result)
    }

    async fn mark_renewal_dismissed(&self, appointment_id: Uuid, auth_token: &str)
        -> Result<(), SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "renewal_dismissed": true })),
            Some(headers),
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
