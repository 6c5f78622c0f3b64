// libs/scheduling-cell/src/services/blocks.rs
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentStatus, CreateBlockRequest, Frequency, NewAppointment,
    RenewableGroup, SchedulingError, SESSION_MINUTES,
};
use crate::repository::{
    AppointmentRepository, PatientRepository, ProfessionalRepository,
    SupabaseAppointmentRepository, SupabasePatientRepository, SupabaseProfessionalRepository,
};

/// A block tail whose next session starts within this many days is offered
/// for renewal.
pub const RENEWAL_LOOKAHEAD_DAYS: i64 = 14;

/// Manages the lifecycle of recurring appointment blocks: creation, renewal
/// detection, renewal, and dismissal. Every state transition of a block tail
/// goes through here.
pub struct BlockLifecycleManager {
    patients: Arc<dyn PatientRepository>,
    professionals: Arc<dyn ProfessionalRepository>,
    appointments: Arc<dyn AppointmentRepository>,
}

impl BlockLifecycleManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            patients: Arc::new(SupabasePatientRepository::new(config)),
            professionals: Arc::new(SupabaseProfessionalRepository::new(config)),
            appointments: Arc::new(SupabaseAppointmentRepository::new(config)),
        }
    }

    pub fn with_repositories(
        patients: Arc<dyn PatientRepository>,
        professionals: Arc<dyn ProfessionalRepository>,
        appointments: Arc<dyn AppointmentRepository>,
    ) -> Self {
        Self { patients, professionals, appointments }
    }

    /// Create a recurring block: exactly `session_count` appointments, spaced
    /// by the frequency interval, under a fresh group id. Preconditions are
    /// checked before anything is written, and the write itself is one atomic
    /// batch, so a failure leaves the store untouched.
    pub async fn create_block(
        &self,
        request: &CreateBlockRequest,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Self::validate_create_request(request)?;

        if !self.patients.exists(request.patient_id, auth_token).await? {
            return Err(SchedulingError::PatientNotFound);
        }
        if !self.professionals.exists(request.professional_id, auth_token).await? {
            return Err(SchedulingError::ProfessionalNotFound);
        }

        let group_id = Uuid::new_v4();
        let first_start = request.start_date.and_time(request.start_time).and_utc();

        let rows: Vec<NewAppointment> = (0..request.session_count)
            .map(|index| {
                let start_time = first_start + request.frequency.interval() * index;
                NewAppointment {
                    professional_id: request.professional_id,
                    patient_id: request.patient_id,
                    start_time,
                    end_time: start_time + Duration::minutes(SESSION_MINUTES),
                    group_id,
                    sequence_index: index,
                    status: AppointmentStatus::Agendado,
                }
            })
            .collect();

        let created = self.appointments.insert_batch(&rows, auth_token).await?;

        info!("Created {} block {} with {} sessions for patient {}",
              request.frequency, group_id, created.len(), request.patient_id);

        Ok(created)
    }

    /// Find block tails eligible for renewal: the highest-index appointment of
    /// each group, still booked, not dismissed, starting within the lookahead
    /// window.
    pub async fn detect_renewable(
        &self,
        patient_id: Option<Uuid>,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<RenewableGroup>, SchedulingError> {
        let upcoming = self.appointments.list_grouped_from(patient_id, now, auth_token).await?;

        let mut tails: HashMap<Uuid, Appointment> = HashMap::new();
        for appointment in upcoming {
            let Some(group_id) = appointment.group_id else { continue };
            match tails.entry(group_id) {
                Entry::Occupied(mut tail) => {
                    if appointment.sequence_index > tail.get().sequence_index {
                        tail.insert(appointment);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(appointment);
                }
            }
        }

        let window_end = now + Duration::days(RENEWAL_LOOKAHEAD_DAYS);
        let mut renewable: Vec<RenewableGroup> = tails.into_iter()
            .filter(|(_, tail)| !tail.renewal_dismissed && tail.start_time <= window_end)
            .map(|(group_id, tail)| RenewableGroup {
                group_id,
                patient_id: tail.patient_id,
                last_appointment: tail,
            })
            .collect();

        renewable.sort_by_key(|group| group.last_appointment.start_time);

        debug!("Found {} renewable blocks", renewable.len());
        Ok(renewable)
    }

    /// Append sessions to an existing block, continuing its cadence and
    /// sequence. Renewal extends a committed block, so unlike discovery
    /// scoring the conflict check is hard: any overlapping booking aborts the
    /// whole renewal before anything is written.
    pub async fn renew(
        &self,
        last_appointment: &Appointment,
        additional_sessions: i32,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if additional_sessions < 1 {
            return Err(SchedulingError::ValidationError(
                "Additional session count must be at least 1".to_string()
            ));
        }

        let group_id = last_appointment.group_id.ok_or_else(|| {
            SchedulingError::ValidationError(
                "Appointment does not belong to a recurring block".to_string()
            )
        })?;

        let group = self.appointments.list_group(group_id, auth_token).await?;
        if group.is_empty() {
            return Err(SchedulingError::AppointmentNotFound);
        }

        let frequency = Self::derive_frequency(&group);
        let last_index = group.iter()
            .filter_map(|appointment| appointment.sequence_index)
            .max()
            .unwrap_or(group.len() as i32 - 1);

        let rows: Vec<NewAppointment> = (1..=additional_sessions)
            .map(|offset| {
                let start_time = last_appointment.start_time + frequency.interval() * offset;
                NewAppointment {
                    professional_id: last_appointment.professional_id,
                    patient_id: last_appointment.patient_id,
                    start_time,
                    end_time: start_time + Duration::minutes(SESSION_MINUTES),
                    group_id,
                    sequence_index: last_index + offset,
                    status: AppointmentStatus::Agendado,
                }
            })
            .collect();

        let range_from = rows[0].start_time;
        let range_to = rows[rows.len() - 1].end_time;
        let existing = self.appointments.list_for_professional_in_range(
            last_appointment.professional_id,
            range_from,
            range_to,
            auth_token,
        ).await?;

        for row in &rows {
            let collides = existing.iter().any(|appointment| {
                appointment.status.occupies_slot()
                    && appointment.overlaps(row.start_time, row.end_time)
            });

            if collides {
                warn!("Renewal of block {} aborted: slot at {} already booked",
                      group_id, row.start_time);
                return Err(SchedulingError::RenewalConflict {
                    professional_id: last_appointment.professional_id,
                    start_time: row.start_time,
                });
            }
        }

        let created = self.appointments.insert_batch(&rows, auth_token).await?;

        info!("Renewed block {} with {} additional sessions", group_id, created.len());
        Ok(created)
    }

    /// Renew a block identified by its tail appointment id.
    pub async fn renew_by_id(
        &self,
        appointment_id: Uuid,
        additional_sessions: i32,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let last_appointment = self.appointments.find_by_id(appointment_id, auth_token).await?
            .ok_or(SchedulingError::AppointmentNotFound)?;

        self.renew(&last_appointment, additional_sessions, auth_token).await
    }

    /// Permanently dismiss the renewal offer for one appointment. Repeating
    /// the call is a no-op success.
    pub async fn dismiss(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let appointment = self.appointments.find_by_id(appointment_id, auth_token).await?
            .ok_or(SchedulingError::AppointmentNotFound)?;

        if appointment.renewal_dismissed {
            debug!("Renewal already dismissed for appointment {}", appointment_id);
            return Ok(());
        }

        self.appointments.mark_renewal_dismissed(appointment_id, auth_token).await?;

        info!("Dismissed renewal for appointment {}", appointment_id);
        Ok(())
    }

    fn validate_create_request(request: &CreateBlockRequest) -> Result<(), SchedulingError> {
        if request.need.specialty.trim().is_empty() {
            return Err(SchedulingError::ValidationError(
                "Therapy need specialty must not be empty".to_string()
            ));
        }
        if request.need.weekly_frequency < 1 {
            return Err(SchedulingError::ValidationError(
                "Weekly frequency must be at least 1".to_string()
            ));
        }
        if request.session_count < 1 {
            return Err(SchedulingError::ValidationError(
                "Session count must be at least 1".to_string()
            ));
        }

        let session_minutes = (request.end_time - request.start_time).num_minutes();
        if session_minutes != SESSION_MINUTES {
            return Err(SchedulingError::ValidationError(format!(
                "A session must be exactly {} minutes, got {}",
                SESSION_MINUTES, session_minutes,
            )));
        }

        Ok(())
    }

    /// The block's cadence is not stored; it is recovered from the spacing of
    /// its two most recent sessions. Single-session blocks renew weekly.
    fn derive_frequency(group: &[Appointment]) -> Frequency {
        if group.len() < 2 {
            return Frequency::Weekly;
        }

        let mut starts: Vec<DateTime<Utc>> = group.iter()
            .map(|appointment| appointment.start_time)
            .collect();
        starts.sort();

        let spacing = starts[starts.len() - 1] - starts[starts.len() - 2];
        Frequency::from_interval_days(spacing.num_days()).unwrap_or(Frequency::Weekly)
    }
}
