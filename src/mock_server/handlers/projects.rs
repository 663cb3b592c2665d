//! Project endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{error_response, json_with_etag};
use crate::mock_server::state::MockState;
use crate::{Project, ProjectStatus};

/// Query parameters for listing projects.
#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub page: Option<usize>,
    pub status: Option<ProjectStatus>,
}

/// Body for creating or updating a project.
#[derive(Debug, Deserialize)]
pub struct ProjectParams {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Parse the `{id}.json` path segment.
fn project_id(file: &str) -> Option<u64> {
    file.strip_suffix(".json").unwrap_or(file).parse().ok()
}

fn not_found(file: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        &format!("No project found with id: {}", file.trim_end_matches(".json")),
    )
}

/// GET /{account}/projects.json
pub async fn list_projects(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(account): Path<String>,
    Query(query): Query<ListProjectsQuery>,
    headers: HeaderMap,
) -> Response {
    let state = state.read().await;

    let page = query.page.unwrap_or(1).max(1);
    let all_projects = state.list_projects(query.status);
    let total = all_projects.len();

    let start = (page - 1).saturating_mul(state.page_size);
    let end = start.saturating_add(state.page_size).min(total);
    let projects: Vec<Project> = if start < total {
        all_projects[start..end].iter().map(|p| (*p).clone()).collect()
    } else {
        vec![]
    };

    let mut response = json_with_etag(&headers, StatusCode::OK, &projects);
    let response_headers = response.headers_mut();
    response_headers.insert("x-total-count", HeaderValue::from(total));
    if end < total {
        let mut next = format!("/{account}/projects.json?page={}", page + 1);
        if let Some(status) = query.status {
            next.push_str(&format!("&status={status}"));
        }
        if let Ok(link) = HeaderValue::from_str(&format!("<{next}>; rel=\"next\"")) {
            response_headers.insert(header::LINK, link);
        }
    }
    response
}

/// GET /{account}/projects/{id}.json
pub async fn get_project(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((_account, file)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let state = state.read().await;

    match project_id(&file).and_then(|id| state.get_project(id)) {
        Some(project) => json_with_etag(&headers, StatusCode::OK, project),
        None => not_found(&file),
    }
}

/// POST /{account}/projects.json
pub async fn create_project(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(_account): Path<String>,
    Json(params): Json<ProjectParams>,
) -> Response {
    let name = match params.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Name can't be blank"),
    };

    let mut state = state.write().await;
    let project = state.create_project(name, params.description);
    (StatusCode::CREATED, Json(project.clone())).into_response()
}

/// PUT /{account}/projects/{id}.json
pub async fn update_project(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((_account, file)): Path<(String, String)>,
    Json(params): Json<ProjectParams>,
) -> Response {
    let mut state = state.write().await;

    match project_id(&file)
        .and_then(|id| state.update_project(id, params.name, params.description))
    {
        Some(project) => (StatusCode::OK, Json(project.clone())).into_response(),
        None => not_found(&file),
    }
}

/// DELETE /{account}/projects/{id}.json
pub async fn trash_project(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((_account, file)): Path<(String, String)>,
) -> Response {
    let mut state = state.write().await;

    match project_id(&file) {
        Some(id) if state.trash_project(id) => StatusCode::NO_CONTENT.into_response(),
        _ => not_found(&file),
    }
}
