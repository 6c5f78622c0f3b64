// libs/scheduling-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{Appointment, ClinicWeekday, SchedulingError, SESSION_MINUTES};
use crate::repository::{AppointmentRepository, SupabaseAppointmentRepository};

/// Default look-ahead window for conflict scanning, in weeks.
pub const DEFAULT_HORIZON_WEEKS: u32 = 12;

/// Scores how consistently a weekly slot is free of conflicting bookings over
/// a rolling horizon. The score is advisory; it never locks the slot.
pub struct ConflictEngine {
    appointments: Arc<dyn AppointmentRepository>,
}

impl ConflictEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            appointments: Arc::new(SupabaseAppointmentRepository::new(config)),
        }
    }

    pub fn with_repository(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    /// Fraction of the horizon in which the candidate slot is conflict-free.
    /// One range read, then a synchronous in-memory scan.
    pub async fn score(
        &self,
        professional_id: Uuid,
        weekday: ClinicWeekday,
        time_of_day: NaiveTime,
        from: DateTime<Utc>,
        horizon_weeks: u32,
        auth_token: &str,
    ) -> Result<f64, SchedulingError> {
        let horizon_end = from + Duration::weeks(horizon_weeks as i64 + 1);
        let existing = self.appointments.list_for_professional_in_range(
            professional_id,
            from,
            horizon_end,
            auth_token,
        ).await?;

        let score = self.score_against(&existing, weekday, time_of_day, from, horizon_weeks);

        debug!("Consistency score for professional {} on {} at {}: {:.2}",
               professional_id, weekday, time_of_day, score);

        Ok(score)
    }

    /// The pure scan, for callers that already hold the professional's
    /// appointments for the horizon.
    pub fn score_against(
        &self,
        existing: &[Appointment],
        weekday: ClinicWeekday,
        time_of_day: NaiveTime,
        from: DateTime<Utc>,
        horizon_weeks: u32,
    ) -> f64 {
        if horizon_weeks == 0 {
            return 1.0;
        }

        let first_date = weekday.first_occurrence_from(from.date_naive());
        let mut conflicted_weeks = 0u32;

        for week in 0..horizon_weeks {
            let candidate_start = (first_date + Duration::weeks(week as i64))
                .and_time(time_of_day)
                .and_utc();
            let candidate_end = candidate_start + Duration::minutes(SESSION_MINUTES);

            let has_conflict = existing.iter().any(|apt| {
                apt.status.occupies_slot() && apt.overlaps(candidate_start, candidate_end)
            });

            if has_conflict {
                conflicted_weeks += 1;
            }
        }

        1.0 - f64::from(conflicted_weeks) / f64::from(horizon_weeks)
    }
}
