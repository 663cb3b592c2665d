//! Test data fixtures for the mock server.

use chrono::{TimeZone, Utc};

use crate::{Project, ProjectStatus};

/// Account ID the default scenario lives under. The mock accepts any account.
pub const MOCK_ACCOUNT_ID: &str = "999999999";

/// Collection of fixture factories for test data.
pub struct Fixtures;

impl Fixtures {
    /// An active project with fixed timestamps.
    pub fn project(id: u64, name: &str) -> Project {
        let created = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).single();
        Project {
            id,
            name: name.to_string(),
            description: None,
            status: Some(ProjectStatus::Active),
            purpose: Some("topic".to_string()),
            created_at: created,
            updated_at: created,
            url: Some(format!(
                "https://3.basecampapi.com/{MOCK_ACCOUNT_ID}/projects/{id}.json"
            )),
            app_url: Some(format!(
                "https://3.basecamp.com/{MOCK_ACCOUNT_ID}/projects/{id}"
            )),
            bookmarked: false,
        }
    }

    /// An archived project.
    pub fn archived_project(id: u64, name: &str) -> Project {
        let mut project = Self::project(id, name);
        project.status = Some(ProjectStatus::Archived);
        project
    }

    /// Twenty active projects (two pages at the default page size) and one
    /// archived project. Project 1001 is "Test Project".
    pub fn default_projects() -> Vec<Project> {
        let mut projects = vec![{
            let mut p = Self::project(1001, "Test Project");
            p.description = Some("Default fixture project".to_string());
            p.bookmarked = true;
            p
        }];
        projects.extend((1002..=1020).map(|id| Self::project(id, &format!("Project {id}"))));
        projects.push(Self::archived_project(1021, "Old Launch"));
        projects
    }
}
