//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the bcapi binary.

use clap::{Parser, Subcommand, ValueEnum};

use crate::ProjectStatus;

/// Basecamp API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "bcapi", about = "Basecamp API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Overall deadline for the command, in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get a single entity by ID.
    Get {
        /// The type of entity to get.
        entity: Entity,

        /// The entity ID.
        id: u64,
    },

    /// List entities, following pagination links.
    List {
        /// The type of entity to list.
        entity: Entity,

        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Stop after this many items.
        #[arg(long)]
        max_items: Option<usize>,

        /// Stop after this many pages.
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Create an entity.
    Create {
        /// The type of entity to create.
        entity: Entity,

        /// Name of the new entity.
        #[arg(long)]
        name: String,

        /// Description of the new entity.
        #[arg(long)]
        description: Option<String>,
    },

    /// Update an entity.
    Update {
        /// The type of entity to update.
        entity: Entity,

        /// The ID of the entity to update.
        id: u64,

        /// New name for the entity.
        #[arg(long)]
        name: Option<String>,

        /// New description for the entity.
        #[arg(long)]
        description: Option<String>,
    },

    /// Move an entity to the trash.
    Trash {
        /// The type of entity to trash.
        entity: Entity,

        /// The ID of the entity to trash.
        id: u64,
    },
}

/// Entity types that can be operated on.
#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    /// A Basecamp project.
    #[value(alias = "projects")]
    Project,
}

/// Project status filter.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusArg {
    Active,
    Archived,
    Trashed,
}

impl From<StatusArg> for ProjectStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => ProjectStatus::Active,
            StatusArg::Archived => ProjectStatus::Archived,
            StatusArg::Trashed => ProjectStatus::Trashed,
        }
    }
}
