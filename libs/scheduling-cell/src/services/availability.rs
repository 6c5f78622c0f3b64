// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveTime;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{ProfessionalAvailability, ProfessionalProfile};
use crate::models::SchedulingError;
use crate::repository::{ProfessionalRepository, SupabaseProfessionalRepository};

/// Normalizes directory records into per-professional availability: active
/// weekday set plus a parsed daily working window.
pub struct AvailabilityIndex {
    professionals: Arc<dyn ProfessionalRepository>,
}

impl AvailabilityIndex {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            professionals: Arc::new(SupabaseProfessionalRepository::new(config)),
        }
    }

    pub fn with_repository(professionals: Arc<dyn ProfessionalRepository>) -> Self {
        Self { professionals }
    }

    /// Build the availability roster for all active professionals. A record
    /// without a usable working window is skipped, not rejected: absence of
    /// configured hours means "unavailable".
    pub async fn build(&self, auth_token: &str)
        -> Result<Vec<ProfessionalAvailability>, SchedulingError> {
        let profiles = self.professionals.list_active(auth_token).await?;

        let roster: Vec<ProfessionalAvailability> = profiles.iter()
            .filter_map(Self::normalize)
            .collect();

        debug!("Availability index built for {} of {} professionals",
               roster.len(), profiles.len());

        Ok(roster)
    }

    fn normalize(profile: &ProfessionalProfile) -> Option<ProfessionalAvailability> {
        let window_start = Self::parse_window_field(profile.window_start.as_deref())?;
        let window_end = Self::parse_window_field(profile.window_end.as_deref())?;

        if window_start >= window_end {
            debug!("Skipping professional {} with inverted working window", profile.id);
            return None;
        }

        Some(ProfessionalAvailability {
            professional_id: profile.id,
            full_name: profile.full_name.clone(),
            specialty: profile.specialty.clone(),
            weekdays: profile.active_weekdays.clone(),
            window_start,
            window_end,
        })
    }

    fn parse_window_field(raw: Option<&str>) -> Option<NaiveTime> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }

        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|e| debug!("Unparsable working window '{}': {}", raw, e))
            .ok()
    }
}
