use std::io::{self, Write};

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::{ConfigAction, ConfigArgs, ConfigNameArgs};
use crate::paper_config::Workspace;
use crate::util;

pub fn run(args: ConfigArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace, None, None);

    match args.action {
        ConfigAction::Create(name_args) => create(&workspace, &name_args),
        ConfigAction::List => list(&workspace),
        ConfigAction::Select(name_args) => select(&workspace, &name_args),
    }
}

fn create(workspace: &Workspace, args: &ConfigNameArgs) -> Result<()> {
    validate_name(&args.name)?;

    let path = workspace.config_path(&args.name);
    if path.exists() {
        bail!("paper config '{}' already exists", args.name);
    }
    util::ensure_directory(&path)?;
    info!(name = %args.name, path = %path.display(), "created paper config");

    let mut settings = workspace.load_settings()?;
    if settings.current_config.is_none() {
        settings.current_config = Some(args.name.clone());
        workspace.store_settings(&settings)?;
        info!(name = %args.name, "selected paper config");
    }

    Ok(())
}

fn list(workspace: &Workspace) -> Result<()> {
    let names = workspace.list_config_names()?;
    let current = workspace.load_settings()?.current_config;

    if names.is_empty() {
        info!("no paper configs in this workspace");
        return Ok(());
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    for name in &names {
        let marker = if current.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        writeln!(output, "{marker} {name}")?;
    }
    output.flush()?;

    Ok(())
}

fn select(workspace: &Workspace, args: &ConfigNameArgs) -> Result<()> {
    validate_name(&args.name)?;

    if !workspace.config_path(&args.name).is_dir() {
        bail!(
            "paper config '{}' does not exist, run 'casepin config create --name {}' first",
            args.name,
            args.name
        );
    }

    let mut settings = workspace.load_settings()?;
    settings.current_config = Some(args.name.clone());
    workspace.store_settings(&settings)?;
    info!(name = %args.name, "selected paper config");

    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    let starts_clean = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric());
    let charset_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !starts_clean || !charset_ok {
        bail!("paper config name '{name}' must start with a letter or digit and use only letters, digits, '-', '_' or '.'");
    }

    Ok(())
}
