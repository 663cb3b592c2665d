//! Project operations against a wiremock server.

use bcapi::{
    BasecampClient, Create, ErrorKind, Get, List, PageLimits, Project, ProjectCreateParams,
    ProjectListQuery, ProjectStatus, ProjectUpdateParams, Update,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn project_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "status": "active",
        "name": name,
        "description": null,
        "purpose": "topic",
        "created_at": "2024-01-15T09:30:00Z",
        "updated_at": "2024-01-15T09:30:00Z",
        "url": format!("https://3.basecampapi.com/42/projects/{id}.json"),
        "app_url": format!("https://3.basecamp.com/42/projects/{id}"),
        "bookmarked": false
    })
}

async fn setup() -> (MockServer, BasecampClient) {
    let server = MockServer::start().await;
    let client = BasecampClient::new("test-token", "42", &server.uri()).unwrap();
    (server, client)
}

#[tokio::test]
async fn test_get_project() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/42/projects/7.json"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json(7, "Launch")))
        .expect(1)
        .mount(&server)
        .await;

    let project = Project::get(&client, 7).await.unwrap();
    assert_eq!(project.id, 7);
    assert_eq!(project.name, "Launch");
    assert_eq!(project.status, Some(ProjectStatus::Active));
}

#[tokio::test]
async fn test_get_missing_project_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "Not found"})),
        )
        .mount(&server)
        .await;

    let err = Project::get(&client, 404).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("Not found"));
}

#[tokio::test]
async fn test_list_projects_with_status_filter() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/42/projects.json"))
        .and(query_param("status", "archived"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "1")
                .set_body_json(json!([project_json(3, "Old")])),
        )
        .mount(&server)
        .await;

    let query = ProjectListQuery {
        status: Some(ProjectStatus::Archived),
    };
    let result = Project::list_all(&client, &query, &PageLimits::default())
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.total_count, Some(1));
    assert_eq!(result.items[0].name, "Old");
}

#[tokio::test]
async fn test_list_page_reports_next_page() {
    let (server, client) = setup().await;
    let next = format!("{}/42/projects.json?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/42/projects.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", format!("<{next}>; rel=\"next\"").as_str())
                .set_body_json(json!([project_json(1, "One"), project_json(2, "Two")])),
        )
        .mount(&server)
        .await;

    let page = Project::list_page(&client, &ProjectListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.next.map(String::from), Some(next));
}

#[tokio::test]
async fn test_create_project() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/42/projects.json"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"name": "New", "description": "Fresh start"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(project_json(11, "New")))
        .expect(1)
        .mount(&server)
        .await;

    let project = Project::create(
        &client,
        ProjectCreateParams {
            name: "New".to_string(),
            description: Some("Fresh start".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(project.id, 11);
}

#[tokio::test]
async fn test_create_rejects_blank_name_locally() {
    let (server, client) = setup().await;

    let err = Project::create(
        &client,
        ProjectCreateParams {
            name: "   ".to_string(),
            description: None,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_project_sends_only_set_fields() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/42/projects/7.json"))
        .and(body_json(json!({"name": "Renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json(7, "Renamed")))
        .expect(1)
        .mount(&server)
        .await;

    let params = ProjectUpdateParams {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let project = Project::update(&client, 7, params).await.unwrap();
    assert_eq!(project.name, "Renamed");
}

#[tokio::test]
async fn test_trash_project_invalidates_cached_get() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/42/projects/7.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"p7\"")
                .set_body_json(project_json(7, "Launch")),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/42/projects/7.json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Project::get(&client, 7).await.unwrap();
    let cache = client.cache().unwrap();
    assert_eq!(cache.len(), 1);

    Project::trash(&client, 7).await.unwrap();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_validation_error_carries_server_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "Name can't be blank"})),
        )
        .mount(&server)
        .await;

    let err = Project::create(
        &client,
        ProjectCreateParams {
            name: "x".to_string(),
            description: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.to_string().contains("Name can't be blank"));
}
