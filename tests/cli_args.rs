//! CLI argument parsing tests.

use bcapi::cli::{Cli, Command, Entity, StatusArg};
use clap::Parser;

#[test]
fn test_cli_parses_get_subcommand() {
    let cli = Cli::parse_from(["bcapi", "get", "project", "2085958499"]);

    assert!(!cli.json);
    assert_eq!(cli.timeout, None);
    match cli.command {
        Command::Get { entity, id } => {
            assert!(matches!(entity, Entity::Project));
            assert_eq!(id, 2085958499);
        }
        _ => panic!("Expected Get command"),
    }
}

#[test]
fn test_cli_rejects_non_numeric_id() {
    assert!(Cli::try_parse_from(["bcapi", "get", "project", "abc"]).is_err());
}

#[test]
fn test_cli_parses_list_subcommand() {
    let cli = Cli::parse_from(["bcapi", "list", "projects"]);

    match cli.command {
        Command::List {
            entity,
            status,
            max_items,
            max_pages,
        } => {
            assert!(matches!(entity, Entity::Project));
            assert_eq!(status, None);
            assert_eq!(max_items, None);
            assert_eq!(max_pages, None);
        }
        _ => panic!("Expected List command"),
    }
}

#[test]
fn test_list_limit_and_filter_args() {
    let cli = Cli::parse_from([
        "bcapi",
        "list",
        "projects",
        "--status",
        "archived",
        "--max-items",
        "25",
        "--max-pages",
        "3",
    ]);

    match cli.command {
        Command::List {
            status,
            max_items,
            max_pages,
            ..
        } => {
            assert_eq!(status, Some(StatusArg::Archived));
            assert_eq!(max_items, Some(25));
            assert_eq!(max_pages, Some(3));
        }
        _ => panic!("Expected List command"),
    }
}

#[test]
fn test_cli_parses_create_subcommand() {
    let cli = Cli::parse_from(["bcapi", "create", "project", "--name", "Launch"]);

    match cli.command {
        Command::Create {
            entity,
            name,
            description,
        } => {
            assert!(matches!(entity, Entity::Project));
            assert_eq!(name, "Launch");
            assert_eq!(description, None);
        }
        _ => panic!("Expected Create command"),
    }

    // --name is required
    assert!(Cli::try_parse_from(["bcapi", "create", "project"]).is_err());
}

#[test]
fn test_cli_parses_update_subcommand() {
    let cli = Cli::parse_from([
        "bcapi",
        "update",
        "project",
        "42",
        "--name",
        "New Name",
        "--description",
        "Details",
    ]);

    match cli.command {
        Command::Update {
            entity,
            id,
            name,
            description,
        } => {
            assert!(matches!(entity, Entity::Project));
            assert_eq!(id, 42);
            assert_eq!(name, Some("New Name".to_string()));
            assert_eq!(description, Some("Details".to_string()));
        }
        _ => panic!("Expected Update command"),
    }
}

#[test]
fn test_cli_parses_trash_subcommand() {
    let cli = Cli::parse_from(["bcapi", "trash", "project", "42"]);
    assert!(matches!(
        cli.command,
        Command::Trash {
            entity: Entity::Project,
            id: 42
        }
    ));
}

#[test]
fn test_global_flags() {
    // --json before subcommand
    let cli = Cli::parse_from(["bcapi", "--json", "list", "projects"]);
    assert!(cli.json);

    // --json and --timeout after subcommand (global flags)
    let cli = Cli::parse_from(["bcapi", "list", "projects", "--json", "--timeout", "10"]);
    assert!(cli.json);
    assert_eq!(cli.timeout, Some(10));
}
