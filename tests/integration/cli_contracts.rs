use std::fs;
use std::path::PathBuf;

use clap::Parser;
use coursetree::config::TreeConfig;
use coursetree::error::ApiError;
use coursetree::tooling::{Cli, CliContext, Commands, ConfigCommands};
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("coursetree.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn config_show_json_reflects_the_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[api]
base_url = "https://courses.example.org/api"

[paging]
page_size = 20
max_cached_pages = 6
"#,
    );
    let context = CliContext::new(dir.path().to_path_buf(), Some(path)).unwrap();

    let output = context
        .execute(&Commands::Config {
            command: ConfigCommands::Show {
                format: "json".to_string(),
            },
        })
        .unwrap();
    let shown: TreeConfig = serde_json::from_str(&output).unwrap();
    assert_eq!(&shown, context.config());
    assert_eq!(shown.paging.page_size, 20);
    assert_eq!(shown.paging.max_cached_pages, 6);
    assert_eq!(shown.api.base_url, "https://courses.example.org/api");
}

#[test]
fn config_show_toml_parses_back() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[materializer]\neager_threshold = 7\n");
    let context = CliContext::new(dir.path().to_path_buf(), Some(path)).unwrap();

    let output = context
        .execute(&Commands::Config {
            command: ConfigCommands::Show {
                format: "toml".to_string(),
            },
        })
        .unwrap();
    let shown: TreeConfig = toml::from_str(&output).unwrap();
    assert_eq!(shown.materializer.eager_threshold, 7);
}

#[test]
fn config_show_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    let context = CliContext::new(dir.path().to_path_buf(), Some(path)).unwrap();

    let result = context.execute(&Commands::Config {
        command: ConfigCommands::Show {
            format: "yaml".to_string(),
        },
    });
    assert!(matches!(result, Err(ApiError::ConfigError(_))));
}

#[test]
fn validate_reports_errors_as_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[paging]\npage_size = 0\n");
    let context = CliContext::new(dir.path().to_path_buf(), Some(path)).unwrap();

    match context.execute(&Commands::Config {
        command: ConfigCommands::Validate,
    }) {
        Err(ApiError::ConfigError(report)) => assert!(report.contains("page_size")),
        other => panic!("expected a validation failure, got {:?}", other),
    }
}

#[test]
fn validate_passes_for_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    let context = CliContext::new(dir.path().to_path_buf(), Some(path)).unwrap();

    let report = context
        .execute(&Commands::Config {
            command: ConfigCommands::Validate,
        })
        .unwrap();
    assert!(!report.is_empty());
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let result = CliContext::new(
        dir.path().to_path_buf(),
        Some(dir.path().join("absent.toml")),
    );
    assert!(matches!(result, Err(ApiError::ConfigError(_))));
}

#[test]
fn workspace_config_is_picked_up() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join(".coursetree");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[paging]\npreload_pages = 2\n").unwrap();

    let context = CliContext::new(dir.path().to_path_buf(), None).unwrap();
    assert_eq!(context.config().paging.preload_pages, 2);
    assert_eq!(context.workspace_root(), &dir.path().to_path_buf());
}

#[test]
fn cli_parses_assign_and_config_commands() {
    let cli = Cli::try_parse_from([
        "coursetree",
        "--workspace",
        "/tmp/ws",
        "assign",
        "--course",
        "c1",
        "--content",
        "x1",
        "--example",
        "e1",
        "--yes",
    ])
    .unwrap();
    assert_eq!(cli.workspace, PathBuf::from("/tmp/ws"));
    match cli.command {
        Commands::Assign {
            course,
            content,
            example,
            yes,
        } => {
            assert_eq!((course.as_str(), content.as_str(), example.as_str()), ("c1", "x1", "e1"));
            assert!(yes);
        }
        other => panic!("unexpected command {:?}", other),
    }

    let cli = Cli::try_parse_from(["coursetree", "config", "show", "--format", "json"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommands::Show { .. }
        }
    ));
}
