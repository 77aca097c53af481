//! Operator command line for driving alarm resources by hand.
//!
//! Every command reads a resource definition file, builds the adapter the
//! registry maps its type to and prints a JSON document on stdout.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;

use crate::client::AlarmClients;
use crate::config::AlarmServiceConfig;
use crate::context::ResourceContext;
use crate::definition::{DefinitionContext, ResourceDefinition};
use crate::lifecycle::{AlarmResource, ResourceUpdate};
use crate::registry::registry;
use crate::types::PropertyMap;

/// Metering alarm resources for Stackform.
#[derive(Parser, Debug, Clone)]
#[command(name = "stackform-alarms")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Alarm service configuration file (TOML).
    #[arg(short, long, env = "STACKFORM_ALARMS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Alarm service endpoint, overriding the configuration file.
    #[arg(short, long, env = "STACKFORM_ALARMS_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the registered resource types.
    Types,

    /// Print the body a create would send, without contacting the service.
    Render(DefinitionArgs),

    /// Create the alarm described by a definition.
    Create(DefinitionArgs),

    /// Apply changed properties to an existing alarm.
    Update(UpdateArgs),

    /// Disable an existing alarm.
    Suspend(AlarmArgs),

    /// Re-enable an existing alarm.
    Resume(AlarmArgs),

    /// Delete an existing alarm.
    Delete(AlarmArgs),
}

/// Arguments naming a definition file.
#[derive(Args, Debug, Clone)]
pub struct DefinitionArgs {
    /// Resource definition file (JSON).
    #[arg(short, long)]
    pub definition: PathBuf,

    /// Physical name of the resource, overriding the definition file.
    #[arg(long)]
    pub physical_name: Option<String>,
}

/// Arguments naming a definition and the alarm it was created as.
#[derive(Args, Debug, Clone)]
pub struct AlarmArgs {
    /// Resource definition file (JSON).
    #[arg(short, long)]
    pub definition: PathBuf,

    /// Identifier of the alarm.
    #[arg(short, long)]
    pub alarm_id: String,

    /// Physical name printed by `create`, unless the definition fixes it.
    #[arg(long)]
    pub physical_name: Option<String>,
}

/// Arguments of `update`.
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Resource definition file (JSON).
    #[arg(short, long)]
    pub definition: PathBuf,

    /// Identifier of the alarm.
    #[arg(short, long)]
    pub alarm_id: String,

    /// Physical name printed by `create`, unless the definition fixes it.
    #[arg(long)]
    pub physical_name: Option<String>,

    /// JSON object of changed properties and their new values.
    #[arg(long)]
    pub changes: PathBuf,
}

impl Cli {
    /// Loads the configuration file, if any, and applies `--endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded.
    pub fn service_config(&self) -> anyhow::Result<AlarmServiceConfig> {
        let config = match &self.config {
            Some(path) => AlarmServiceConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AlarmServiceConfig::default(),
        };
        Ok(match &self.endpoint {
            Some(endpoint) => config.with_endpoint(endpoint.clone()),
            None => config,
        })
    }

    fn clients(&self) -> anyhow::Result<AlarmClients> {
        Ok(AlarmClients::from_config(&self.service_config()?)?)
    }
}

/// Runs a parsed command line, writing its result to `out`.
///
/// # Errors
///
/// Returns the first error met, with context.
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let output = match &cli.command {
        Commands::Types => list_types(),
        Commands::Render(args) => {
            let definition = read_definition(&args.definition, args.physical_name.as_deref())?;
            let (_, adapter) = load(definition, AlarmClients::in_memory())?;
            adapter.validate()?;
            Value::Object(adapter.create_payload()?)
        }
        Commands::Create(args) => create(args, cli.clients()?)?,
        Commands::Update(args) => update(args, cli.clients()?)?,
        Commands::Suspend(args) => {
            toggle(args, cli.clients()?, |adapter| adapter.handle_suspend())?
        }
        Commands::Resume(args) => toggle(args, cli.clients()?, |adapter| adapter.handle_resume())?,
        Commands::Delete(args) => toggle(args, cli.clients()?, |adapter| adapter.handle_delete())?,
    };

    serde_json::to_writer_pretty(&mut *out, &output)?;
    writeln!(out)?;
    Ok(())
}

fn list_types() -> Value {
    let types: Vec<Value> = registry()
        .iter()
        .map(|info| {
            let properties: Vec<&str> = info.schema().iter().map(|p| p.name).collect();
            json!({
                "type": info.type_name(),
                "support_status": info.support_status().to_string(),
                "properties": properties,
            })
        })
        .collect();
    Value::Array(types)
}

fn read_definition(
    path: &Path,
    physical_name: Option<&str>,
) -> anyhow::Result<ResourceDefinition> {
    let mut definition = ResourceDefinition::from_file(path)
        .with_context(|| format!("loading definition {}", path.display()))?;
    if let Some(name) = physical_name {
        definition.physical_name = Some(name.to_string());
    }
    Ok(definition)
}

/// Reads the definition of a resource created by an earlier run.
///
/// The watch rule of a single-metric alarm is keyed by the physical name,
/// so it must be the one `create` used rather than a freshly generated one.
fn existing_definition(
    path: &Path,
    physical_name: Option<&str>,
) -> anyhow::Result<ResourceDefinition> {
    let definition = read_definition(path, physical_name)?;
    if definition.physical_name.is_none() {
        bail!(
            "definition {} has no physical_name; pass --physical-name with the name printed by create",
            path.display()
        );
    }
    Ok(definition)
}

fn load(
    definition: ResourceDefinition,
    clients: AlarmClients,
) -> anyhow::Result<(Arc<DefinitionContext>, Box<dyn AlarmResource>)> {
    let context = Arc::new(DefinitionContext::new(definition));
    let type_name = context.resource_type().to_string();
    let shared: Arc<dyn ResourceContext> = context.clone();
    let adapter = registry().instantiate(&type_name, shared, clients)?;
    info!(resource_type = %type_name, resource = %context.physical_name(), "loaded definition");
    Ok((context, adapter))
}

fn read_changes(path: &Path) -> anyhow::Result<PropertyMap> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading changes {}", path.display()))?;
    match serde_json::from_str(&content)? {
        Value::Object(changes) => Ok(changes),
        other => bail!("changes must be a JSON object, got {other}"),
    }
}

fn create(args: &DefinitionArgs, clients: AlarmClients) -> anyhow::Result<Value> {
    let definition = read_definition(&args.definition, args.physical_name.as_deref())?;
    let (context, mut adapter) = load(definition, clients)?;
    adapter.validate()?;
    adapter.handle_create()?;
    Ok(json!({
        "alarm_id": adapter.resource_id(),
        "physical_name": context.physical_name(),
        "state": adapter.state().as_str(),
    }))
}

fn update(args: &UpdateArgs, clients: AlarmClients) -> anyhow::Result<Value> {
    let changes = read_changes(&args.changes)?;
    let definition = existing_definition(&args.definition, args.physical_name.as_deref())?;
    let (context, mut adapter) = load(definition, clients)?;
    adapter.attach(args.alarm_id.clone());
    adapter.handle_update(&ResourceUpdate::properties(changes.clone()))?;

    // Report the alarm as the definition now describes it.
    for (name, value) in &changes {
        context.set_property(name.clone(), value.clone());
    }
    let updated: Vec<&String> = changes.keys().collect();
    Ok(json!({
        "alarm_id": args.alarm_id,
        "updated": updated,
        "alarm": adapter.create_payload()?,
    }))
}

fn toggle(
    args: &AlarmArgs,
    clients: AlarmClients,
    action: impl FnOnce(&mut dyn AlarmResource) -> crate::error::Result<()>,
) -> anyhow::Result<Value> {
    let definition = existing_definition(&args.definition, args.physical_name.as_deref())?;
    let (_, mut adapter) = load(definition, clients)?;
    adapter.attach(args.alarm_id.clone());
    action(adapter.as_mut())?;
    Ok(json!({"alarm_id": args.alarm_id, "state": adapter.state().as_str()}))
}
