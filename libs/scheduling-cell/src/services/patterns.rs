// libs/scheduling-cell/src/services/patterns.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, ProfessionalAvailability, SchedulePattern, SchedulingError,
    SchedulingPreferences, Shift, TherapyNeed, SESSION_MINUTES,
};
use crate::repository::{
    AppointmentRepository, ProfessionalRepository, SupabaseAppointmentRepository,
};
use crate::services::availability::AvailabilityIndex;
use crate::services::conflict::{ConflictEngine, DEFAULT_HORIZON_WEEKS};

/// Candidate starts are generated on the hour, anchored at each
/// professional's own window start.
pub const SLOT_STEP_MINUTES: u32 = 60;

/// Enumerates therapy-need x professional x weekday x time-slot combinations
/// and scores each with the conflict engine. Output is unsorted; banding into
/// ideal/alternative is the consumer's concern.
pub struct PatternGenerator {
    availability: AvailabilityIndex,
    appointments: Arc<dyn AppointmentRepository>,
    conflict: ConflictEngine,
    horizon_weeks: u32,
}

impl PatternGenerator {
    pub fn new(config: &AppConfig) -> Self {
        let appointments: Arc<dyn AppointmentRepository> =
            Arc::new(SupabaseAppointmentRepository::new(config));

        Self {
            availability: AvailabilityIndex::new(config),
            conflict: ConflictEngine::with_repository(appointments.clone()),
            appointments,
            horizon_weeks: DEFAULT_HORIZON_WEEKS,
        }
    }

    pub fn with_repositories(
        professionals: Arc<dyn ProfessionalRepository>,
        appointments: Arc<dyn AppointmentRepository>,
    ) -> Self {
        Self {
            availability: AvailabilityIndex::with_repository(professionals),
            conflict: ConflictEngine::with_repository(appointments.clone()),
            appointments,
            horizon_weeks: DEFAULT_HORIZON_WEEKS,
        }
    }

    pub async fn generate(
        &self,
        needs: &[TherapyNeed],
        preferences: &SchedulingPreferences,
        from: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<SchedulePattern>, SchedulingError> {
        Self::validate_needs(needs)?;

        let roster = self.availability.build(auth_token).await?;
        let horizon_end = from + Duration::weeks(self.horizon_weeks as i64 + 1);

        let mut booked_by_professional: HashMap<Uuid, Vec<Appointment>> = HashMap::new();
        let mut patterns = Vec::new();

        for need in needs {
            let qualified = Self::qualify(&roster, &need.specialty);
            debug!("{} professionals qualified for '{}'", qualified.len(), need.specialty);

            let candidates =
                Self::apply_professional_preference(qualified, &preferences.preferred_professional_ids);

            for professional in candidates {
                if !booked_by_professional.contains_key(&professional.professional_id) {
                    let existing = self.appointments.list_for_professional_in_range(
                        professional.professional_id,
                        from,
                        horizon_end,
                        auth_token,
                    ).await?;
                    booked_by_professional.insert(professional.professional_id, existing);
                }
                let existing = &booked_by_professional[&professional.professional_id];

                for weekday in &professional.weekdays {
                    for time_of_day in Self::candidate_times(professional, preferences.shift) {
                        let consistency_score = self.conflict.score_against(
                            existing,
                            *weekday,
                            time_of_day,
                            from,
                            self.horizon_weeks,
                        );

                        patterns.push(SchedulePattern {
                            specialty: need.specialty.clone(),
                            professional_id: professional.professional_id,
                            professional_name: professional.full_name.clone(),
                            weekday: *weekday,
                            time_of_day,
                            consistency_score,
                        });
                    }
                }
            }
        }

        info!("Generated {} schedule patterns for {} needs", patterns.len(), needs.len());
        Ok(patterns)
    }

    fn validate_needs(needs: &[TherapyNeed]) -> Result<(), SchedulingError> {
        if needs.is_empty() {
            return Err(SchedulingError::ValidationError(
                "At least one therapy need is required".to_string()
            ));
        }

        for need in needs {
            if need.specialty.trim().is_empty() {
                return Err(SchedulingError::ValidationError(
                    "Therapy need specialty must not be empty".to_string()
                ));
            }
            if need.weekly_frequency < 1 {
                return Err(SchedulingError::ValidationError(
                    "Weekly frequency must be at least 1".to_string()
                ));
            }
        }

        Ok(())
    }

    /// Case-insensitive substring containment on the specialty name. A broad
    /// specialty like "Fisioterapia" also qualifies "Fisioterapia Motora"
    /// professionals; accepted until specialties get a normalized table.
    fn qualify<'a>(
        roster: &'a [ProfessionalAvailability],
        specialty: &str,
    ) -> Vec<&'a ProfessionalAvailability> {
        let needle = specialty.to_lowercase();
        roster.iter()
            .filter(|professional| professional.specialty.to_lowercase().contains(&needle))
            .collect()
    }

    /// Preferred professionals narrow the qualified set only when the
    /// intersection is non-empty; the preference never empties the result.
    fn apply_professional_preference<'a>(
        qualified: Vec<&'a ProfessionalAvailability>,
        preferred_ids: &[Uuid],
    ) -> Vec<&'a ProfessionalAvailability> {
        if preferred_ids.is_empty() {
            return qualified;
        }

        let narrowed: Vec<&ProfessionalAvailability> = qualified.iter()
            .filter(|professional| preferred_ids.contains(&professional.professional_id))
            .copied()
            .collect();

        if narrowed.is_empty() {
            qualified
        } else {
            narrowed
        }
    }

    /// Hourly starts within the professional's working window, keeping only
    /// those where the full 50-minute session still fits.
    fn candidate_times(
        professional: &ProfessionalAvailability,
        shift: Option<Shift>,
    ) -> Vec<NaiveTime> {
        let window_start_minutes = professional.window_start.num_seconds_from_midnight() / 60;
        let window_end_minutes = professional.window_end.num_seconds_from_midnight() / 60;

        let mut times = Vec::new();
        let mut minute = window_start_minutes;

        while minute + SESSION_MINUTES as u32 <= window_end_minutes {
            let time = NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0).unwrap();

            if shift.map_or(true, |shift| shift.admits(time)) {
                times.push(time);
            }

            minute += SLOT_STEP_MINUTES;
        }

        times
    }
}
