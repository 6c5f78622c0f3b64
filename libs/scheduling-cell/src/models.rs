// libs/scheduling-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use std::fmt;

/// Every therapy session is exactly 50 minutes.
pub const SESSION_MINUTES: i64 = 50;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// One treatment requirement for a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapyNeed {
    pub specialty: String,
    pub weekly_frequency: i32,
}

/// Optional narrowing constraints for pattern discovery. Advisory, never a
/// hard exclusion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulingPreferences {
    #[serde(default)]
    pub shift: Option<Shift>,
    #[serde(default)]
    pub preferred_professional_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
}

impl Shift {
    /// Morning admits session starts before noon, afternoon from noon onward.
    pub fn admits(&self, start: NaiveTime) -> bool {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        match self {
            Shift::Morning => start < noon,
            Shift::Afternoon => start >= noon,
        }
    }
}

/// The clinic books Monday through Friday only; weekend candidates are
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClinicWeekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl ClinicWeekday {
    pub const ALL: [ClinicWeekday; 5] = [
        ClinicWeekday::Monday,
        ClinicWeekday::Tuesday,
        ClinicWeekday::Wednesday,
        ClinicWeekday::Thursday,
        ClinicWeekday::Friday,
    ];

    pub fn from_chrono(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(ClinicWeekday::Monday),
            Weekday::Tue => Some(ClinicWeekday::Tuesday),
            Weekday::Wed => Some(ClinicWeekday::Wednesday),
            Weekday::Thu => Some(ClinicWeekday::Thursday),
            Weekday::Fri => Some(ClinicWeekday::Friday),
            Weekday::Sat | Weekday::Sun => None,
        }
    }

    pub fn days_from_monday(&self) -> i64 {
        match self {
            ClinicWeekday::Monday => 0,
            ClinicWeekday::Tuesday => 1,
            ClinicWeekday::Wednesday => 2,
            ClinicWeekday::Thursday => 3,
            ClinicWeekday::Friday => 4,
        }
    }

    /// First calendar date on or after `from` that falls on this weekday.
    pub fn first_occurrence_from(&self, from: NaiveDate) -> NaiveDate {
        let current = from.weekday().num_days_from_monday() as i64;
        let delta = (self.days_from_monday() - current).rem_euclid(7);
        from + Duration::days(delta)
    }
}

impl fmt::Display for ClinicWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClinicWeekday::Monday => write!(f, "Monday"),
            ClinicWeekday::Tuesday => write!(f, "Tuesday"),
            ClinicWeekday::Wednesday => write!(f, "Wednesday"),
            ClinicWeekday::Thursday => write!(f, "Thursday"),
            ClinicWeekday::Friday => write!(f, "Friday"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalStatus {
    Active,
    Inactive,
}

/// Raw directory record for a professional. Working-window fields are kept as
/// stored; normalization into `ProfessionalAvailability` happens in the
/// availability index, which drops records it cannot parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    #[serde(default)]
    pub active_weekdays: Vec<ClinicWeekday>,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub status: ProfessionalStatus,
}

/// Normalized availability for one professional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalAvailability {
    pub professional_id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub weekdays: Vec<ClinicWeekday>,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Agendado,
    Finalizado,
    Cancelado,
}

impl AppointmentStatus {
    /// Only booked sessions hold their slot; cancelled ones free it and
    /// finished ones are history.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Agendado)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Agendado => write!(f, "agendado"),
            AppointmentStatus::Finalizado => write!(f, "finalizado"),
            AppointmentStatus::Cancelado => write!(f, "cancelado"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub group_id: Option<Uuid>,
    pub sequence_index: Option<i32>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub renewal_dismissed: bool,
}

impl Appointment {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        // Half-open intervals: back-to-back sessions do not collide.
        self.start_time < end && self.end_time > start
    }
}

/// An appointment row that has not been persisted yet. Ids are assigned by
/// the store.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub professional_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub group_id: Uuid,
    pub sequence_index: i32,
    pub status: AppointmentStatus,
}

/// Cadence of a recurring block, mapped to an explicit interval table so a
/// future monthly cadence is one new row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
}

impl Frequency {
    pub fn interval_days(&self) -> i64 {
        match self {
            Frequency::Weekly => 7,
            Frequency::Biweekly => 14,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::days(self.interval_days())
    }

    pub fn from_interval_days(days: i64) -> Option<Self> {
        match days {
            7 => Some(Frequency::Weekly),
            14 => Some(Frequency::Biweekly),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Biweekly => write!(f, "biweekly"),
        }
    }
}

// ==============================================================================
// DERIVED MODELS (never persisted)
// ==============================================================================

/// One candidate recurring slot with its advisory consistency score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePattern {
    pub specialty: String,
    pub professional_id: Uuid,
    pub professional_name: String,
    pub weekday: ClinicWeekday,
    #[serde(with = "hhmm")]
    pub time_of_day: NaiveTime,
    pub consistency_score: f64,
}

/// The chronologically-last, not-yet-dismissed appointment of a block whose
/// start falls inside the renewal lookahead window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewableGroup {
    pub group_id: Uuid,
    pub patient_id: Uuid,
    pub last_appointment: Appointment,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDiscoveryRequest {
    pub needs: Vec<TherapyNeed>,
    #[serde(default)]
    pub preferences: SchedulingPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockRequest {
    pub need: TherapyNeed,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub start_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub frequency: Frequency,
    pub session_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewBlockRequest {
    pub appointment_id: Uuid,
    pub additional_sessions: i32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchedulingError {
    #[error("Patient not found")]
    PatientNotFound,

    #[error("Professional not found")]
    ProfessionalNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Renewal slot at {start_time} conflicts with an existing booking for professional {professional_id}")]
    RenewalConflict {
        professional_id: Uuid,
        start_time: DateTime<Utc>,
    },

    #[error("Formatting service error: {0}")]
    UpstreamError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Serialize `NaiveTime` as "HH:MM", accepting "HH:MM:SS" on the way in.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
