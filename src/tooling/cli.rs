//! CLI Tooling
//!
//! Command-line inspection of the course tree: browse the hierarchy, run an example
//! assignment and inspect the effective configuration.

use crate::config::{ConfigLoader, TreeConfig};
use crate::error::ApiError;
use crate::expand_state::JsonFileExpandStateStore;
use crate::logging::LoggingConfig;
use crate::remote::{CourseDataService, HttpCourseDataService};
use crate::tooling::format::{
    format_cache_state, format_tree_json, format_tree_text, format_validation,
};
use crate::tree::{AssignmentOutcome, ConfirmationPrompt, NodeData, TreeNode, TreeProvider};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// coursetree - browse a remote course hierarchy
#[derive(Parser, Debug)]
#[command(name = "coursetree")]
#[command(about = "Browse and manage a remote course hierarchy")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings from the config file with command-line overrides applied.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the tree down to a given depth
    Browse {
        /// Levels below the starting point to expand
        #[arg(long, default_value = "3")]
        depth: usize,

        /// Start at this course instead of the organization list
        #[arg(long)]
        course: Option<String>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Attach an example to a content item
    Assign {
        #[arg(long)]
        course: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        example: String,

        /// Replace an attached example without asking
        #[arg(long)]
        yes: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Output format (toml, json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Check the configuration for errors
    Validate,
}

/// Replace prompt backed by a terminal confirmation.
pub struct TerminalPrompt {
    pub assume_yes: bool,
}

#[async_trait]
impl ConfirmationPrompt for TerminalPrompt {
    async fn confirm_replace(&self, content_title: &str, current: &str, replacement: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = format!(
            "'{}' already has example '{}'. Replace it with '{}'?",
            content_title, current, replacement
        );
        let answer = tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await;
        match answer {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to get user input");
                false
            }
            Err(e) => {
                warn!(error = %e, "Prompt task failed");
                false
            }
        }
    }
}

/// CLI context: loaded configuration plus the runtime commands execute on.
pub struct CliContext {
    workspace_root: PathBuf,
    config: TreeConfig,
    runtime: tokio::runtime::Runtime,
}

impl CliContext {
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;
        Ok(Self {
            workspace_root,
            config,
            runtime,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Browse {
                depth,
                course,
                format,
            } => self
                .runtime
                .block_on(self.handle_browse(*depth, course.as_deref(), format)),
            Commands::Assign {
                course,
                content,
                example,
                yes,
            } => self
                .runtime
                .block_on(self.handle_assign(course, content, example, *yes)),
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn remote(&self) -> Result<Arc<dyn CourseDataService>, ApiError> {
        Ok(Arc::new(HttpCourseDataService::from_config(&self.config.api)?))
    }

    async fn provider(&self, service: Arc<dyn CourseDataService>) -> Result<TreeProvider, ApiError> {
        let store = JsonFileExpandStateStore::new(self.config.expand_state.resolve_file()?);
        Ok(TreeProvider::new(service, &self.config, Arc::new(store)).await)
    }

    async fn handle_browse(
        &self,
        depth: usize,
        course: Option<&str>,
        format: &str,
    ) -> Result<String, ApiError> {
        let provider = self.provider(self.remote()?).await?;
        let roots = match course {
            Some(course_id) => vec![
                TreeNode::new(
                    NodeData::ContentsFolder {
                        course_id: course_id.to_string(),
                    },
                    true,
                ),
                TreeNode::new(
                    NodeData::GroupsFolder {
                        course_id: course_id.to_string(),
                    },
                    true,
                ),
            ],
            None => provider.get_children(None).await?,
        };
        let rows = collect_rows(&provider, roots, depth).await;
        info!(rows = rows.len(), depth, "Browse finished");

        if format == "json" {
            return format_tree_json(&rows).map_err(ApiError::from);
        }
        let mut out = format_tree_text(&rows);
        let states = provider.cache_state();
        if !states.is_empty() {
            out.push('\n');
            out.push_str(&format_cache_state(&states));
        }
        Ok(out)
    }

    async fn handle_assign(
        &self,
        course_id: &str,
        content_id: &str,
        example_id: &str,
        yes: bool,
    ) -> Result<String, ApiError> {
        let service = self.remote()?;
        let example = service
            .get_example(example_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Example {}", example_id)))?;
        let provider = self.provider(service).await?;
        let target = provider.find_content(course_id, content_id).await?;
        let prompt = TerminalPrompt { assume_yes: yes };
        match provider.assign_example(&target, &example, &prompt).await? {
            AssignmentOutcome::Assigned { .. } => Ok(format!(
                "Assigned example '{}' to '{}'",
                example.title,
                target.label()
            )),
            AssignmentOutcome::Declined => Ok("Assignment cancelled".to_string()),
        }
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show { format } => match format.as_str() {
                "json" => Ok(serde_json::to_string_pretty(&self.config)?),
                "toml" => toml::to_string_pretty(&self.config).map_err(|e| {
                    ApiError::ConfigError(format!("Failed to serialize config: {}", e))
                }),
                other => Err(ApiError::ConfigError(format!(
                    "Invalid format: {} (must be 'toml' or 'json')",
                    other
                ))),
            },
            ConfigCommands::Validate => {
                let result = self.config.validate();
                let report = format_validation(&result);
                if result.is_valid() {
                    Ok(report)
                } else {
                    Err(ApiError::ConfigError(report))
                }
            }
        }
    }
}

/// Pre-order walk expanding nodes down to `max_depth`. Branches that fail to load are
/// logged and left unexpanded.
async fn collect_rows(
    provider: &TreeProvider,
    roots: Vec<TreeNode>,
    max_depth: usize,
) -> Vec<(usize, TreeNode)> {
    let mut rows = Vec::new();
    let mut stack: Vec<(usize, TreeNode)> = roots.into_iter().rev().map(|n| (0, n)).collect();
    while let Some((depth, node)) = stack.pop() {
        let expand = node.has_children && depth < max_depth;
        if expand {
            match provider.get_children(Some(&node)).await {
                Ok(children) => {
                    stack.extend(children.into_iter().rev().map(|c| (depth + 1, c)));
                }
                Err(e) => warn!(node_id = %node.id(), error = %e, "Skipping branch"),
            }
        }
        rows.push((depth, node));
    }
    rows
}
