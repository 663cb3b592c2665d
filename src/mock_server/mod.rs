//! Mock Basecamp API server for E2E testing.
//!
//! An in-memory server that keeps state across requests, so whole workflows
//! (create, list across pages, revalidate, trash) can be exercised against
//! real HTTP. Faults can be queued to drive the retry and breaker paths.
//!
//! # Example
//!
//! ```ignore
//! use bcapi::mock_server::{MockServer, MOCK_ACCOUNT_ID};
//! use bcapi::{BasecampClient, Get, Project};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await.unwrap();
//!     let client = BasecampClient::new("test-token", MOCK_ACCOUNT_ID, server.url()).unwrap();
//!
//!     // Server comes with default fixtures
//!     let project = Project::get(&client, 1001).await.unwrap();
//!     assert_eq!(project.name, "Test Project");
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{Fixtures, MOCK_ACCOUNT_ID};
pub use server::MockServer;
pub use state::{Fault, MockState, DEFAULT_PAGE_SIZE};
