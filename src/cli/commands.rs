//! Command dispatch

use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::listing::{DROID_TYPE, LISTING_TYPE, VEHICLE_TYPE};
use crate::application::services::ListingReport;
use crate::application::{ApplicationError, Edit};
use crate::cli::args::{Cli, Commands, ConfigCommands, Invocation};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, OutputFormat, Settings};
use crate::domain::{FieldPath, TreeNodeConvert};
use crate::infrastructure::{InfraError, ServiceContainer};

/// Effective output options: config merged with command-line flags.
#[derive(Debug, Clone, Copy)]
struct Render {
    format: OutputFormat,
    pretty: bool,
}

pub fn execute_command(invocation: &Invocation) -> CliResult<()> {
    let cli = &invocation.cli;
    let settings = Settings::load(cli.config.as_deref())?;
    if !settings.output.color {
        colored::control::set_override(false);
    }
    let render = Render {
        format: cli.format.unwrap_or(settings.output.format),
        pretty: settings.output.pretty,
    };
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Some(Commands::Check { file }) => _check(&container, render, file),
        Some(Commands::Edit { file, write, .. }) => {
            let edits = invocation.edits()?;
            if edits.is_empty() {
                return Err(CliError::Usage(
                    "edit needs at least one --set, --append or --remove".into(),
                ));
            }
            _edit(&container, render, file, &edits, *write)
        }
        Some(Commands::Schema {
            listing_type,
            product_type,
        }) => _schema(&container, listing_type.as_deref(), product_type.as_deref()),
        Some(Commands::Config { command }) => _config(&container, command),
        Some(Commands::Completion { shell }) => _completion(*shell),
        None => Ok(()),
    }
}

#[instrument(skip(container))]
fn _check(container: &ServiceContainer, render: Render, file: &Path) -> CliResult<()> {
    let report = container.listing.check(file)?;
    print_report(render, file, &report)?;
    if !report.valid && container.settings.check.fail_on_errors {
        let fields = report.errors.as_ref().map_or(0, |e| e.len());
        return Err(CliError::Invalid(format!(
            "{} ({} top-level field(s) with errors)",
            file.display(),
            fields
        )));
    }
    Ok(())
}

#[instrument(skip(container, edits))]
fn _edit(
    container: &ServiceContainer,
    render: Render,
    file: &Path,
    edits: &[Edit],
    write: bool,
) -> CliResult<()> {
    debug!(count = edits.len(), "edits collected");
    let report = container.listing.edit(file, edits, write)?;
    print_report(render, file, &report)?;
    if write {
        output::action("Written", &file.display());
    }
    Ok(())
}

#[instrument(skip(container))]
fn _schema(
    container: &ServiceContainer,
    listing_type: Option<&str>,
    product_type: Option<&str>,
) -> CliResult<()> {
    let mut form = container.listing.draft()?;
    if let Some(listing_type) = listing_type {
        form.set_value(LISTING_TYPE, listing_type)
            .map_err(ApplicationError::from)?;
    }
    if let Some(product_type) = product_type {
        let discriminant = match listing_type {
            Some("Vehicle") => FieldPath::root().field("vehicleProduct").field(VEHICLE_TYPE),
            Some("Droid") => FieldPath::root().field("droidProduct").field(DROID_TYPE),
            _ => {
                return Err(CliError::Usage(
                    "--product-type needs --listing-type Vehicle or Droid".into(),
                ))
            }
        };
        form.set_value(&discriminant, product_type)
            .map_err(ApplicationError::from)?;
    }
    output::info(&form.describe());
    Ok(())
}

fn _config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) if path.exists() => output::success(&path.display()),
            Some(path) => output::failure(&format!("{} (not present)", path.display())),
            None => output::warning("no config directory on this platform"),
        },
    }
    Ok(())
}

fn _completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut script = Vec::new();
    generate(shell, &mut cmd, name, &mut script);
    io::stdout()
        .write_all(&script)
        .map_err(|e| InfraError::io("write completion script", e))?;
    Ok(())
}

fn print_report(render: Render, file: &Path, report: &ListingReport) -> CliResult<()> {
    match render.format {
        OutputFormat::Json => output::info(&to_json(report, render.pretty)?),
        OutputFormat::Tree => {
            if report.valid {
                output::success(&format!("{} is valid", file.display()));
            } else {
                output::header(&format!("{} has errors", file.display()));
            }
            if let Some(errors) = &report.errors {
                output::info(&errors.to_tree_string());
            }
            if report.edits > 0 {
                output::info(&to_json(&report.value, render.pretty)?);
            }
        }
    }
    Ok(())
}

fn to_json(value: &impl Serialize, pretty: bool) -> CliResult<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| {
        ApplicationError::OperationFailed {
            context: "render report".into(),
            source: Box::new(e),
        }
        .into()
    })
}
