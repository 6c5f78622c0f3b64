// libs/scheduling-cell/tests/supabase_repository_test.rs
use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::{method, path}};

use scheduling_cell::models::{
    AppointmentStatus, ClinicWeekday, NewAppointment, ProfessionalStatus, SchedulingError,
};
use scheduling_cell::repository::{
    AppointmentRepository, ProfessionalRepository, SupabaseAppointmentRepository,
    SupabaseProfessionalRepository,
};
use scheduling_cell::services::formatter::PatternFormatterService;
use shared_config::AppConfig;

mod common;
use common::at;

fn supabase_config(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test_anon_key".to_string(),
        formatter_base_url: String::new(),
        formatter_api_key: String::new(),
    }
}

fn formatter_config(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: String::new(),
        supabase_anon_key: String::new(),
        formatter_base_url: server.uri(),
        formatter_api_key: "test_formatter_key".to_string(),
    }
}

fn appointment_row(id: Uuid, group_id: Uuid, sequence_index: i32, start: &str, end: &str) -> serde_json::Value {
    json!({
        "id": id,
        "professional_id": "9b2cdbd8-3b8a-4b0e-9ff1-5a3d7c2f1a10",
        "patient_id": "4f6d3c1e-8a2b-4c5d-9e7f-1b2a3c4d5e6f",
        "start_time": start,
        "end_time": end,
        "group_id": group_id,
        "sequence_index": sequence_index,
        "status": "agendado",
        "renewal_dismissed": false
    })
}

// ==============================================================================
// PROFESSIONAL DIRECTORY
// ==============================================================================

#[tokio::test]
async fn list_active_parses_directory_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            json!({
                "id": "9b2cdbd8-3b8a-4b0e-9ff1-5a3d7c2f1a10",
                "full_name": "Dra. Ana Souza",
                "specialty": "Fonoaudiologia",
                "active_weekdays": ["Monday", "Wednesday"],
                "window_start": "08:00",
                "window_end": "12:00",
                "status": "active"
            })
        ]))
        .mount(&mock_server)
        .await;

    let repository = SupabaseProfessionalRepository::new(&supabase_config(&mock_server));
    let professionals = repository.list_active("test_token").await.unwrap();

    assert_eq!(professionals.len(), 1);
    assert_eq!(professionals[0].full_name, "Dra. Ana Souza");
    assert_eq!(professionals[0].specialty, "Fonoaudiologia");
    assert_eq!(
        professionals[0].active_weekdays,
        vec![ClinicWeekday::Monday, ClinicWeekday::Wednesday],
    );
    assert_eq!(professionals[0].status, ProfessionalStatus::Active);
}

#[tokio::test]
async fn exists_is_false_for_an_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let repository = SupabaseProfessionalRepository::new(&supabase_config(&mock_server));
    let exists = repository.exists(Uuid::new_v4(), "test_token").await.unwrap();

    assert!(!exists);
}

// ==============================================================================
// APPOINTMENT STORE
// ==============================================================================

fn new_rows(group_id: Uuid) -> Vec<NewAppointment> {
    (0..2)
        .map(|index| {
            let start = at(2025, 10, 10, 10, 0) + chrono::Duration::weeks(index as i64);
            NewAppointment {
                professional_id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                start_time: start,
                end_time: start + chrono::Duration::minutes(50),
                group_id,
                sequence_index: index,
                status: AppointmentStatus::Agendado,
            }
        })
        .collect()
}

#[tokio::test]
async fn insert_batch_posts_once_and_returns_all_rows() {
    let mock_server = MockServer::start().await;
    let group_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![
            appointment_row(Uuid::new_v4(), group_id, 0,
                            "2025-10-10T10:00:00Z", "2025-10-10T10:50:00Z"),
            appointment_row(Uuid::new_v4(), group_id, 1,
                            "2025-10-17T10:00:00Z", "2025-10-17T10:50:00Z"),
        ]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let repository = SupabaseAppointmentRepository::new(&supabase_config(&mock_server));
    let created = repository.insert_batch(&new_rows(group_id), "test_token").await.unwrap();

    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|a| a.group_id == Some(group_id)));
    assert_eq!(created[1].start_time, at(2025, 10, 17, 10, 0));
}

#[tokio::test]
async fn a_short_batch_response_is_a_database_error() {
    let mock_server = MockServer::start().await;
    let group_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![
            appointment_row(Uuid::new_v4(), group_id, 0,
                            "2025-10-10T10:00:00Z", "2025-10-10T10:50:00Z"),
        ]))
        .mount(&mock_server)
        .await;

    let repository = SupabaseAppointmentRepository::new(&supabase_config(&mock_server));
    let result = repository.insert_batch(&new_rows(group_id), "test_token").await;

    assert_matches!(result, Err(SchedulingError::DatabaseError(_)));
}

#[tokio::test]
async fn a_failed_batch_write_surfaces_as_a_database_error() {
    let mock_server = MockServer::start().await;
    let group_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&mock_server)
        .await;

    let repository = SupabaseAppointmentRepository::new(&supabase_config(&mock_server));
    let result = repository.insert_batch(&new_rows(group_id), "test_token").await;

    assert_matches!(result, Err(SchedulingError::DatabaseError(_)));
}

#[tokio::test]
async fn find_by_id_returns_none_for_an_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let repository = SupabaseAppointmentRepository::new(&supabase_config(&mock_server));
    let found = repository.find_by_id(Uuid::new_v4(), "test_token").await.unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn dismissal_patches_the_renewal_flag() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_row(appointment_id, Uuid::new_v4(), 3,
                            "2025-10-31T10:00:00Z", "2025-10-31T10:50:00Z"),
        ]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let repository = SupabaseAppointmentRepository::new(&supabase_config(&mock_server));
    repository.mark_renewal_dismissed(appointment_id, "test_token").await.unwrap();
}

// ==============================================================================
// FORMATTER UPSTREAM
// ==============================================================================

#[tokio::test]
async fn formatter_extracts_the_summary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/schedule-summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "Melhor opção: segunda-feira às 09:00."
        })))
        .mount(&mock_server)
        .await;

    let formatter = PatternFormatterService::new(&formatter_config(&mock_server));
    let summary = formatter.format_patterns(&[]).await.unwrap();

    assert_eq!(summary, "Melhor opção: segunda-feira às 09:00.");
}

#[tokio::test]
async fn an_unavailable_formatter_is_an_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/schedule-summaries"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let formatter = PatternFormatterService::new(&formatter_config(&mock_server));
    let result = formatter.format_patterns(&[]).await;

    assert_matches!(result, Err(SchedulingError::UpstreamError(_)));
}
