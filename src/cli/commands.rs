//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::RecordId;
use crate::infrastructure::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree {
            file,
            filter,
            label,
        }) => cmd_tree(cli, file, filter.as_deref(), label.as_deref()),
        Some(Commands::Flat {
            file,
            filter,
            label,
            indent,
        }) => cmd_flat(cli, file, filter.as_deref(), label.as_deref(), *indent),
        Some(Commands::Relations { file, filter }) => cmd_relations(cli, file, filter.as_deref()),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see 'restree --help'".to_string(),
        )),
    }
}

/// Layered settings with command line flags applied last.
fn resolve_settings(cli: &Cli, dir: Option<&Path>) -> CliResult<Settings> {
    let mut settings = Settings::load(dir)?;
    if let Some(field) = &cli.id_field {
        settings.id_field = field.clone();
    }
    if let Some(field) = &cli.parent_field {
        settings.parent_field = field.clone();
    }
    if cli.strict {
        settings.strict = true;
    }
    if settings.id_field == settings.parent_field {
        return Err(CliError::InvalidArgs(format!(
            "id and parent field must differ, both are '{}'",
            settings.id_field
        )));
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn container_for(cli: &Cli, file: &Path) -> CliResult<ServiceContainer> {
    let settings = resolve_settings(cli, file.parent())?;
    Ok(ServiceContainer::new(settings))
}

fn record_label(record: &Value, id: Option<&RecordId>, label_field: Option<&str>) -> String {
    let id = id.map_or_else(|| "-".to_string(), RecordId::to_string);
    match label_field.and_then(|field| record.get(field)) {
        Some(Value::String(s)) => format!("{}: {}", id, s),
        Some(value) => format!("{}: {}", id, value),
        None => record.to_string(),
    }
}

#[instrument(skip(cli))]
fn cmd_tree(cli: &Cli, file: &Path, filter: Option<&str>, label: Option<&str>) -> CliResult<()> {
    let container = container_for(cli, file)?;
    let settings = &container.settings;
    let label = label.or(settings.label_field.as_deref());
    let filter = filter.map(RecordId::from);

    let mut builder = container.records.builder(file, settings)?;
    let view = builder.build_tree(filter.as_ref());
    if view.is_empty() {
        output::warning(&format!("no records in {}", file.display()));
        return Ok(());
    }

    let rendered = view.to_termtree(|node| match (node.data(), node.id()) {
        (Some(record), id) => record_label(record, id, label),
        (None, Some(id)) => id.to_string(),
        (None, None) => String::new(),
    });
    output::info(&rendered);
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_flat(
    cli: &Cli,
    file: &Path,
    filter: Option<&str>,
    label: Option<&str>,
    indent: bool,
) -> CliResult<()> {
    let container = container_for(cli, file)?;
    let settings = &container.settings;
    let label = label.or(settings.label_field.as_deref());
    let filter = filter.map(RecordId::from);

    let mut builder = container.records.builder(file, settings)?;
    let entries = builder.flatten_entries(filter.as_ref(), true);
    if entries.is_empty() {
        output::warning(&format!("no records in {}", file.display()));
        return Ok(());
    }

    let lines = entries
        .iter()
        .map(|entry| {
            let pad = if indent { "  ".repeat(entry.depth) } else { String::new() };
            format!("{}{}", pad, record_label(entry.data, entry.id, label))
        })
        .join("\n");
    output::info(&lines);
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_relations(cli: &Cli, file: &Path, filter: Option<&str>) -> CliResult<()> {
    let container = container_for(cli, file)?;
    let filter = filter.map(RecordId::from);

    let mut builder = container.records.builder(file, &container.settings)?;
    let relationships = builder.build_relationships(filter.as_ref());
    let json = serde_json::to_string_pretty(&relationships)
        .map_err(|e| CliError::Output(e.to_string()))?;
    output::info(&json);
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show { dir } => {
            let settings = resolve_settings(cli, dir.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::action("global config", &path.display()),
            None => output::warning("cannot determine config directory"),
        },
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}
