//! Descriptions of logical operations and physical requests, as seen by hooks.

use std::time::Duration;

use reqwest::Method;
use url::Url;

use crate::error::BasecampError;

/// Identifies one logical SDK call, e.g. `Projects.List`.
///
/// Built once per call by the caller and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Logical service, e.g. `"Projects"`.
    pub service: String,
    /// Method on the service, e.g. `"List"`.
    pub operation: String,
    pub method: Method,
    /// Resource type, e.g. `"project"`.
    pub resource_type: String,
    /// Whether the operation changes server state.
    pub is_mutation: bool,
    /// Project (bucket) the call targets, if any.
    pub project_id: Option<u64>,
    /// Specific resource the call targets, if any.
    pub resource_id: Option<u64>,
}

impl OperationDescriptor {
    /// Describe an operation. Anything other than GET/HEAD is a mutation.
    pub fn new(service: impl Into<String>, operation: impl Into<String>, method: Method) -> Self {
        let is_mutation = !matches!(method, Method::GET | Method::HEAD);
        Self {
            service: service.into(),
            operation: operation.into(),
            method,
            resource_type: String::new(),
            is_mutation,
            project_id: None,
            resource_id: None,
        }
    }

    #[must_use]
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    #[must_use]
    pub fn project(mut self, project_id: u64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    #[must_use]
    pub fn resource(mut self, resource_id: u64) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// `"Service.Operation"`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.service, self.operation)
    }
}

/// One physical attempt.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub url: Url,
    /// 1-based attempt number within the call.
    pub attempt: u32,
}

/// Outcome of one physical attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestResult<'a> {
    /// HTTP status, `None` if the exchange failed before a response.
    pub status: Option<u16>,
    pub duration: Duration,
    /// Size of the response body in bytes.
    pub bytes: usize,
    /// The body came from the ETag cache after a 304.
    pub from_cache: bool,
    pub error: Option<&'a BasecampError>,
    /// The executor will try again after this attempt.
    pub will_retry: bool,
}

/// Outcome of a whole logical operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationResult<'a> {
    /// Final HTTP status, if a response was received.
    pub status: Option<u16>,
    pub duration: Duration,
    pub error: Option<&'a BasecampError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_flag_follows_method() {
        assert!(!OperationDescriptor::new("Projects", "List", Method::GET).is_mutation);
        assert!(OperationDescriptor::new("Projects", "Create", Method::POST).is_mutation);
        assert!(OperationDescriptor::new("Projects", "Trash", Method::DELETE).is_mutation);
    }

    #[test]
    fn test_descriptor_builder() {
        let op = OperationDescriptor::new("Todos", "Get", Method::GET)
            .resource_type("todo")
            .project(12)
            .resource(34);
        assert_eq!(op.name(), "Todos.Get");
        assert_eq!(op.resource_type, "todo");
        assert_eq!(op.project_id, Some(12));
        assert_eq!(op.resource_id, Some(34));
    }
}
