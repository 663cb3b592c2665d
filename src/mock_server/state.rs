//! Mock server state management.
//!
//! Provides the in-memory data store for the mock Basecamp API server.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{Project, ProjectStatus};

/// Basecamp's list page size.
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// A canned failure returned instead of the next request's real response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub status: u16,
    /// `Retry-After` value in seconds.
    pub retry_after: Option<u64>,
}

/// Shared state for the mock server.
///
/// Wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug)]
pub struct MockState {
    /// Projects by ID, iterated in ID order.
    pub projects: BTreeMap<u64, Project>,

    /// Items per list page.
    pub page_size: usize,

    /// Optional authentication token. If set, requests must carry it as a bearer token.
    pub required_token: Option<String>,

    /// Pending injected failures, consumed one per request.
    pub faults: VecDeque<Fault>,

    /// Requests received, including rejected ones.
    pub request_count: u64,

    next_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            projects: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            required_token: None,
            faults: VecDeque::new(),
            request_count: 0,
            next_id: 1,
        }
    }
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Add a project to the state.
    pub fn with_project(mut self, project: Project) -> Self {
        self.next_id = self.next_id.max(project.id + 1);
        self.projects.insert(project.id, project);
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Answer the next request with `status` (and optionally `Retry-After`).
    ///
    /// Faults queue up; each request consumes one.
    pub fn fail_next(&mut self, status: u16, retry_after: Option<u64>) {
        self.faults.push_back(Fault {
            status,
            retry_after,
        });
    }

    pub(crate) fn take_fault(&mut self) -> Option<Fault> {
        self.faults.pop_front()
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: u64) -> Option<&Project> {
        self.projects.get(&id)
    }

    /// List projects with the given status (active when unspecified).
    pub fn list_projects(&self, status: Option<ProjectStatus>) -> Vec<&Project> {
        let wanted = status.unwrap_or(ProjectStatus::Active);
        self.projects
            .values()
            .filter(|p| p.status.unwrap_or(ProjectStatus::Active) == wanted)
            .collect()
    }

    /// Create a project and return it.
    pub fn create_project(&mut self, name: String, description: Option<String>) -> &Project {
        let id = self.next_id;
        self.next_id += 1;
        let now = Utc::now();
        let project = Project {
            id,
            name,
            description,
            status: Some(ProjectStatus::Active),
            purpose: Some("topic".to_string()),
            created_at: Some(now),
            updated_at: Some(now),
            url: None,
            app_url: None,
            bookmarked: false,
        };
        self.projects.entry(id).or_insert(project)
    }

    /// Update a project and return the updated version.
    pub fn update_project(
        &mut self,
        id: u64,
        name: Option<String>,
        description: Option<String>,
    ) -> Option<&Project> {
        let project = self.projects.get_mut(&id)?;
        if let Some(name) = name {
            project.name = name;
        }
        if let Some(description) = description {
            project.description = Some(description);
        }
        project.updated_at = Some(Utc::now());
        Some(project)
    }

    /// Mark a project as trashed. Returns false if it does not exist.
    pub fn trash_project(&mut self, id: u64) -> bool {
        match self.projects.get_mut(&id) {
            Some(project) => {
                project.status = Some(ProjectStatus::Trashed);
                project.updated_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }
}
