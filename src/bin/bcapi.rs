//! Basecamp API CLI binary.
//!
//! A command-line interface for interacting with the Basecamp API.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use bcapi::cli::{Cli, Command, Entity};
use bcapi::output::PrettyPrint;
use bcapi::{
    BasecampClient, BasecampError, CallOptions, Create, Get, List, ListResult, PageLimits,
    Project, ProjectCreateParams, ProjectListQuery, ProjectUpdateParams, TracingHooks,
    Update,
};
use clap::Parser;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let client = match build_client() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set BASECAMP_ACCESS_TOKEN and BASECAMP_ACCOUNT_ID environment variables");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {e}", e.kind());
            if e.is_retryable() {
                eprintln!("Hint: This failure is transient; try again later");
            }
            ExitCode::FAILURE
        }
    }
}

fn build_client() -> bcapi::Result<BasecampClient> {
    let token = std::env::var("BASECAMP_ACCESS_TOKEN").map_err(|_| {
        BasecampError::ConfigMissing("BASECAMP_ACCESS_TOKEN environment variable not set".to_string())
    })?;
    let account_id = std::env::var("BASECAMP_ACCOUNT_ID").map_err(|_| {
        BasecampError::ConfigMissing("BASECAMP_ACCOUNT_ID environment variable not set".to_string())
    })?;

    let mut builder = BasecampClient::builder(token, account_id).hooks(Arc::new(TracingHooks::default()));
    if let Ok(base_url) = std::env::var("BASECAMP_API_URL") {
        builder = builder.base_url(base_url);
    }
    builder.build()
}

async fn run(client: &BasecampClient, cli: Cli) -> bcapi::Result<()> {
    let opts = match cli.timeout {
        Some(secs) => CallOptions::default().deadline(Duration::from_secs(secs)),
        None => CallOptions::default(),
    };

    match cli.command {
        Command::Get { entity, id } => handle_get(client, entity, id, cli.json).await,
        Command::List {
            entity,
            status,
            max_items,
            max_pages,
        } => {
            let query = ProjectListQuery {
                status: status.map(Into::into),
            };
            let mut limits = PageLimits::from(client.config());
            if let Some(max) = max_items {
                limits = limits.max_items(max);
            }
            if let Some(max) = max_pages {
                limits = limits.max_pages(max);
            }
            handle_list(client, entity, &query, &limits, &opts, cli.json).await
        }
        Command::Create {
            entity,
            name,
            description,
        } => handle_create(client, entity, name, description, cli.json).await,
        Command::Update {
            entity,
            id,
            name,
            description,
        } => handle_update(client, entity, id, name, description, cli.json).await,
        Command::Trash { entity, id } => match entity {
            Entity::Project => {
                Project::trash(client, id).await?;
                println!("Project {id} moved to trash");
                Ok(())
            }
        },
    }
}

async fn handle_get(client: &BasecampClient, entity: Entity, id: u64, json: bool) -> bcapi::Result<()> {
    match entity {
        Entity::Project => {
            let project = Project::get(client, id).await?;
            output_single(&project, json)?;
        }
    }
    Ok(())
}

async fn handle_list(
    client: &BasecampClient,
    entity: Entity,
    query: &ProjectListQuery,
    limits: &PageLimits,
    opts: &CallOptions,
    json: bool,
) -> bcapi::Result<()> {
    match entity {
        Entity::Project => {
            // Same as Project::list_all, but honouring the CLI deadline.
            let op = <Project as List>::list_operation(query);
            let url = Project::list_url(client, query)?;
            let projects: ListResult<Project> =
                client.get_all_with(&op, url.as_str(), limits, opts).await?;
            output_list(&projects, json, |p| ProjectRow::from(p))?;
        }
    }
    Ok(())
}

async fn handle_create(
    client: &BasecampClient,
    entity: Entity,
    name: String,
    description: Option<String>,
    json: bool,
) -> bcapi::Result<()> {
    match entity {
        Entity::Project => {
            let project = Project::create(client, ProjectCreateParams { name, description }).await?;
            output_single(&project, json)?;
        }
    }
    Ok(())
}

async fn handle_update(
    client: &BasecampClient,
    entity: Entity,
    id: u64,
    name: Option<String>,
    description: Option<String>,
    json: bool,
) -> bcapi::Result<()> {
    match entity {
        Entity::Project => {
            // Basecamp requires a name on update; keep the current one if none was given.
            let name = match name {
                Some(name) => name,
                None => Project::get(client, id).await?.name,
            };
            let params = ProjectUpdateParams {
                name: Some(name),
                description,
            };
            let project = Project::update(client, id, params).await?;
            output_single(&project, json)?;
        }
    }
    Ok(())
}

fn output_single<T: Serialize + PrettyPrint>(item: &T, json: bool) -> bcapi::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(item)?);
    } else {
        println!("{}", item.pretty_print());
    }
    Ok(())
}

fn output_list<T, R, F>(list: &ListResult<T>, json: bool, to_row: F) -> bcapi::Result<()>
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if json {
        println!("{}", serde_json::to_string_pretty(&list.items)?);
    } else {
        let rows: Vec<R> = list.items.iter().map(to_row).collect();
        println!("{}", Table::new(rows));
        match list.total_count {
            Some(total) => println!(
                "\n{} of {} items ({} pages)",
                list.len(),
                total,
                list.pages_fetched
            ),
            None => println!("\n{} items ({} pages)", list.len(), list.pages_fetched),
        }
        if list.truncated {
            println!("(truncated; raise --max-items or --max-pages to see more)");
        }
    }
    if let Some(ref err) = list.partial_error {
        eprintln!("Warning: listing stopped early: {err}");
    }
    Ok(())
}

// Table row types for non-JSON output

#[derive(Tabled)]
struct ProjectRow {
    id: u64,
    name: String,
    status: String,
    updated: String,
}

impl From<&Project> for ProjectRow {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            status: p.status.map(|s| s.to_string()).unwrap_or_default(),
            updated: p
                .updated_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}
