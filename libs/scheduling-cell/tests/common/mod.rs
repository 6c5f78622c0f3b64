// libs/scheduling-cell/tests/common/mod.rs
//
// In-memory repository fakes shared by the scheduling integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use scheduling_cell::models::{
    Appointment, AppointmentStatus, ClinicWeekday, NewAppointment,
    ProfessionalProfile, ProfessionalStatus, SchedulingError, SESSION_MINUTES,
};
use scheduling_cell::repository::{
    AppointmentRepository, PatientRepository, ProfessionalRepository,
};

// ==============================================================================
// IN-MEMORY REPOSITORIES
// ==============================================================================

#[derive(Default)]
pub struct InMemoryProfessionalRepository {
    professionals: Vec<ProfessionalProfile>,
}

impl InMemoryProfessionalRepository {
    pub fn with_professionals(professionals: Vec<ProfessionalProfile>) -> Self {
        Self { professionals }
    }
}

#[async_trait]
impl ProfessionalRepository for InMemoryProfessionalRepository {
    async fn list_active(&self, _auth_token: &str)
        -> Result<Vec<ProfessionalProfile>, SchedulingError> {
        Ok(self.professionals.iter()
            .filter(|profile| profile.status == ProfessionalStatus::Active)
            .cloned()
            .collect())
    }

    async fn exists(&self, professional_id: Uuid, _auth_token: &str)
        -> Result<bool, SchedulingError> {
        Ok(self.professionals.iter().any(|profile| profile.id == professional_id))
    }
}

#[derive(Default)]
pub struct InMemoryPatientRepository {
    patient_ids: Vec<Uuid>,
}

impl InMemoryPatientRepository {
    pub fn with_patients(patient_ids: Vec<Uuid>) -> Self {
        Self { patient_ids }
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn exists(&self, patient_id: Uuid, _auth_token: &str)
        -> Result<bool, SchedulingError> {
        Ok(self.patient_ids.contains(&patient_id))
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: Mutex<Vec<Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        Self { appointments: Mutex::new(appointments) }
    }

    pub fn snapshot(&self) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn find_by_id(&self, appointment_id: Uuid, _auth_token: &str)
        -> Result<Option<Appointment>, SchedulingError> {
        Ok(self.snapshot().into_iter().find(|apt| apt.id == appointment_id))
    }

    async fn list_for_professional_in_range(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut result: Vec<Appointment> = self.snapshot().into_iter()
            .filter(|apt| apt.professional_id == professional_id)
            .filter(|apt| apt.start_time < to && apt.end_time > from)
            .collect();
        result.sort_by_key(|apt| apt.start_time);
        Ok(result)
    }

    async fn list_group(&self, group_id: Uuid, _auth_token: &str)
        -> Result<Vec<Appointment>, SchedulingError> {
        let mut result: Vec<Appointment> = self.snapshot().into_iter()
            .filter(|apt| apt.group_id == Some(group_id))
            .collect();
        result.sort_by_key(|apt| apt.sequence_index);
        Ok(result)
    }

    async fn list_grouped_from(
        &self,
        patient_id: Option<Uuid>,
        from: DateTime<Utc>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut result: Vec<Appointment> = self.snapshot().into_iter()
            .filter(|apt| apt.group_id.is_some())
            .filter(|apt| apt.status == AppointmentStatus::Agendado)
            .filter(|apt| apt.start_time >= from)
            .filter(|apt| patient_id.map_or(true, |id| apt.patient_id == id))
            .collect();
        result.sort_by_key(|apt| apt.start_time);
        Ok(result)
    }

    async fn insert_batch(
        &self,
        appointments: &[NewAppointment],
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let created: Vec<Appointment> = appointments.iter()
            .map(|row| Appointment {
                id: Uuid::new_v4(),
                professional_id: row.professional_id,
                patient_id: row.patient_id,
                start_time: row.start_time,
                end_time: row.end_time,
                group_id: Some(row.group_id),
                sequence_index: Some(row.sequence_index),
                status: row.status,
                renewal_dismissed: false,
            })
            .collect();

        self.appointments.lock().unwrap().extend(created.clone());
        Ok(created)
    }

    async fn mark_renewal_dismissed(&self, appointment_id: Uuid, _auth_token: &str)
        -> Result<(), SchedulingError> {
        let mut appointments = self.appointments.lock().unwrap();
        for appointment in appointments.iter_mut() {
            if appointment.id == appointment_id {
                appointment.renewal_dismissed = true;
            }
        }
        Ok(())
    }
}

// ==============================================================================
// FIXTURE BUILDERS
// ==============================================================================

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn professional(
    specialty: &str,
    weekdays: &[ClinicWeekday],
    window: (&str, &str),
) -> ProfessionalProfile {
    ProfessionalProfile {
        id: Uuid::new_v4(),
        full_name: format!("Dr. {}", specialty),
        specialty: specialty.to_string(),
        active_weekdays: weekdays.to_vec(),
        window_start: Some(window.0.to_string()),
        window_end: Some(window.1.to_string()),
        status: ProfessionalStatus::Active,
    }
}

pub fn booked_at(professional_id: Uuid, start: DateTime<Utc>) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        professional_id,
        patient_id: Uuid::new_v4(),
        start_time: start,
        end_time: start + Duration::minutes(SESSION_MINUTES),
        group_id: None,
        sequence_index: None,
        status: AppointmentStatus::Agendado,
        renewal_dismissed: false,
    }
}

pub fn block_session(
    professional_id: Uuid,
    patient_id: Uuid,
    group_id: Uuid,
    sequence_index: i32,
    start: DateTime<Utc>,
) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        professional_id,
        patient_id,
        start_time: start,
        end_time: start + Duration::minutes(SESSION_MINUTES),
        group_id: Some(group_id),
        sequence_index: Some(sequence_index),
        status: AppointmentStatus::Agendado,
        renewal_dismissed: false,
    }
}
