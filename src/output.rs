//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization.

use crate::Project;

/// Trait for human-readable key-value output.
///
/// Implemented by entity types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Project {
    fn pretty_print(&self) -> String {
        let header = format!("Project #{}", self.id);
        let divider = "─".repeat(header.len().max(30));

        let mut lines = vec![header, divider, format!("Name:           {}", self.name)];

        if let Some(ref description) = self.description {
            if !description.is_empty() {
                lines.push(format!("Description:    {}", description));
            }
        }

        if let Some(status) = self.status {
            lines.push(format!("Status:         {}", status));
        }

        if let Some(ref created) = self.created_at {
            lines.push(format!("Created:        {}", created.format("%Y-%m-%d %H:%M:%S UTC")));
        }

        if let Some(ref updated) = self.updated_at {
            lines.push(format!("Updated:        {}", updated.format("%Y-%m-%d %H:%M:%S UTC")));
        }

        if let Some(ref app_url) = self.app_url {
            lines.push(format!("URL:            {}", app_url));
        }

        if self.bookmarked {
            lines.push("Bookmarked:     yes".to_string());
        }

        lines.join("\n")
    }
}
