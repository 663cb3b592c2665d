//! Project model and trait implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::BasecampClient;
use crate::error::{BasecampError, Result};
use crate::executor::CallOptions;
use crate::operation::OperationDescriptor;
use crate::traits::{Create, Get, List, Update};

const SERVICE: &str = "Projects";
const RESOURCE: &str = "project";

/// A Basecamp project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// `active`, `archived` or `trashed`.
    #[serde(default)]
    pub status: Option<ProjectStatus>,

    #[serde(default)]
    pub purpose: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// API URL of this project.
    #[serde(default)]
    pub url: Option<String>,

    /// Browser URL of this project.
    #[serde(default)]
    pub app_url: Option<String>,

    #[serde(default)]
    pub bookmarked: bool,
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Archived,
    Trashed,
}

impl ProjectStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
            ProjectStatus::Trashed => "trashed",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Project {
    /// Whether the project is archived or trashed.
    pub fn is_archived(&self) -> bool {
        matches!(
            self.status,
            Some(ProjectStatus::Archived | ProjectStatus::Trashed)
        )
    }

    /// Move a project to the trash.
    #[tracing::instrument(skip(client))]
    pub async fn trash(client: &BasecampClient, id: u64) -> Result<()> {
        let op = OperationDescriptor::new(SERVICE, "Trash", Method::DELETE)
            .resource_type(RESOURCE)
            .resource(id);
        client
            .delete(&op, &format!("projects/{id}.json"), &CallOptions::default())
            .await
    }
}

/// Query parameters for listing projects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectListQuery {
    /// Filter by status. The server defaults to active projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

/// Parameters for creating a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCreateParams {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Parameters for updating a project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectUpdateParams {
    /// New project name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New project description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[async_trait]
impl Get for Project {
    type Id = u64;

    #[tracing::instrument(skip(client))]
    async fn get(client: &BasecampClient, id: u64) -> Result<Self> {
        let op = OperationDescriptor::new(SERVICE, "Get", Method::GET)
            .resource_type(RESOURCE)
            .resource(id);
        client
            .get(&op, &format!("projects/{id}.json"), &CallOptions::default())
            .await
    }
}

#[async_trait]
impl List for Project {
    type Query = ProjectListQuery;

    fn list_operation(_query: &Self::Query) -> OperationDescriptor {
        OperationDescriptor::new(SERVICE, "List", Method::GET).resource_type(RESOURCE)
    }

    fn list_url(client: &BasecampClient, query: &Self::Query) -> Result<Url> {
        let mut url = client.url("projects.json")?;
        let params = serde_qs::to_string(query)
            .map_err(|e| BasecampError::Validation(format!("invalid project query: {e}")))?;
        if !params.is_empty() {
            url.set_query(Some(&params));
        }
        Ok(url)
    }
}

#[async_trait]
impl Create for Project {
    type Params = ProjectCreateParams;

    #[tracing::instrument(skip(client))]
    async fn create(client: &BasecampClient, params: Self::Params) -> Result<Self> {
        if params.name.trim().is_empty() {
            return Err(BasecampError::Validation(
                "project name is required".to_string(),
            ));
        }
        let op = OperationDescriptor::new(SERVICE, "Create", Method::POST).resource_type(RESOURCE);
        client
            .post(&op, "projects.json", &params, &CallOptions::default())
            .await
    }
}

#[async_trait]
impl Update for Project {
    type Id = u64;
    type Params = ProjectUpdateParams;

    #[tracing::instrument(skip(client))]
    async fn update(client: &BasecampClient, id: u64, params: Self::Params) -> Result<Self> {
        let op = OperationDescriptor::new(SERVICE, "Update", Method::PUT)
            .resource_type(RESOURCE)
            .resource(id);
        client
            .put(&op, &format!("projects/{id}.json"), &params, &CallOptions::default())
            .await
    }
}
