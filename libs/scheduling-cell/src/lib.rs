pub mod handlers;
pub mod router;
pub mod models;
pub mod repository;
pub mod services;

// Re-export the core contracts for external use
pub use models::*;
pub use repository::{AppointmentRepository, PatientRepository, ProfessionalRepository};
pub use services::availability::AvailabilityIndex;
pub use services::blocks::{BlockLifecycleManager, RENEWAL_LOOKAHEAD_DAYS};
pub use services::conflict::{ConflictEngine, DEFAULT_HORIZON_WEEKS};
pub use services::formatter::PatternFormatterService;
pub use services::patterns::PatternGenerator;
