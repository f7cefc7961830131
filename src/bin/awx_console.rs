use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use awx_console::api::models::{Credential, Id, Listable, Organization, Schedule};
use awx_console::api::{ApiClient, ResourceKind};
use awx_console::config::{self, Settings};
use awx_console::forms::ListController;
use awx_console::prompt::payload::{launch, preview, unprompted_values};
use awx_console::prompt::{PromptWizard, StepId};
use awx_console::workflow::layout::link_endpoints;
use awx_console::workflow::{GraphBuildPolicy, load_visualizer};
use awx_console::ConsoleError;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the settings YAML file
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateType {
    Job,
    Workflow,
}

impl From<TemplateType> for ResourceKind {
    fn from(t: TemplateType) -> Self {
        match t {
            TemplateType::Job => ResourceKind::JobTemplates,
            TemplateType::Workflow => ResourceKind::WorkflowJobTemplates,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the laid-out nodes and links of a workflow job template
    Graph {
        template_id: Id,

        /// Drop links to nodes missing from the listing instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Launch a template, printing the masked payload first
    Launch {
        template_id: Id,

        #[arg(long, value_enum, default_value = "job")]
        kind: TemplateType,

        /// Extra variables as YAML or JSON
        #[arg(long)]
        extra_vars: Option<String>,

        #[arg(long)]
        limit: Option<String>,

        #[arg(long)]
        job_type: Option<String>,

        /// Survey answer (KEY=value), repeatable
        #[arg(long = "survey", short = 'S', value_parser = parse_key_val)]
        survey: Vec<(String, serde_json::Value)>,

        /// Only print the preview
        #[arg(long)]
        dry_run: bool,
    },

    /// List credentials, organizations or schedules
    List {
        resource: String,

        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Delete a resource. Requires --yes.
    Delete {
        resource: String,
        id: Id,

        #[arg(long)]
        yes: bool,
    },
}

fn parse_key_val(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    // JSON when it parses (numbers, lists for multiselect), otherwise a string.
    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn parse_resource(name: &str) -> Result<ResourceKind> {
    ResourceKind::parse(name).ok_or_else(|| anyhow!("unknown resource `{}`", name))
}

async fn print_list<T: Listable + DeserializeOwned>(
    client: &ApiClient,
    kind: ResourceKind,
    settings: &Settings,
    search: Option<&str>,
    page: u32,
) -> Result<()> {
    let mut list: ListController<T> = ListController::new(kind, settings.page_size);
    list.search(search.unwrap_or_default());
    list.query.page = page.max(1);
    if let Err(e) = list.fetch(client).await {
        if let Some(alert) = &list.alert {
            bail!("{}", alert);
        }
        return Err(e.into());
    }

    println!("{} (page {} of {}, {} total)", kind.segment(), list.query.page, list.page_count(), list.count);
    for row in &list.rows {
        println!("{:>6}  {}", row.id(), row.display_name());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    config::init(settings).context("installing settings")?;
    let settings = config::get();
    let client = ApiClient::from_settings(settings).context("building API client")?;

    match cli.command {
        Commands::Graph { template_id, lenient } => {
            let policy = if lenient { GraphBuildPolicy::DropDangling } else { GraphBuildPolicy::Strict };
            let state = load_visualizer(&client, template_id, settings.workflow_node_page_size, policy).await;
            if let Some(error) = &state.content_error {
                bail!("{}", error);
            }

            let positions = state.node_positions.clone().unwrap_or_default();
            println!("{} nodes", state.total_nodes());
            for node in state.nodes.iter().filter(|n| !n.is_deleted) {
                match positions.get(&node.id) {
                    Some(p) => println!("{:>4}  ({:>7.1}, {:>7.1})  {}", node.id, p.x, p.y, node.label()),
                    None => println!("{:>4}  {}", node.id, node.label()),
                }
            }
            for link in &state.links {
                match link_endpoints(&positions, link) {
                    Some(((sx, sy), (tx, ty))) => println!(
                        "{:>4} -> {:<4} {:<8} ({:.1}, {:.1}) -> ({:.1}, {:.1})",
                        link.source, link.target, link.link_type, sx, sy, tx, ty
                    ),
                    None => println!("{:>4} -> {:<4} {}", link.source, link.target, link.link_type),
                }
            }
        }

        Commands::Launch {
            template_id,
            kind,
            extra_vars,
            limit,
            job_type,
            survey,
            dry_run,
        } => {
            let kind = ResourceKind::from(kind);
            let mut wizard = PromptWizard::load(&client, kind, template_id)
                .await
                .map_err(|e| match e {
                    ConsoleError::Api(api) => anyhow!("{}", api.to_message("retrieve launch configuration")),
                    other => anyhow!(other),
                })?;
            info!(template_id, steps = ?wizard.step_ids(), "Prompting");

            if let Some(vars) = extra_vars {
                wizard.values.extra_vars = vars;
            }
            if limit.is_some() {
                wizard.values.limit = limit;
            }
            if job_type.is_some() {
                wizard.values.job_type = job_type;
            }
            wizard.values.survey.extend(survey);

            let ignored = unprompted_values(wizard.config(), &wizard.values, wizard.survey());
            if !ignored.is_empty() {
                bail!(
                    "template {} does not prompt for {}; refusing to drop them from the launch",
                    template_id,
                    ignored.join(", ")
                );
            }
            if wizard.step_ids().contains(&StepId::CredentialPasswords) {
                bail!("the selected credentials require passwords; launch from the console instead");
            }

            let payload = wizard.submit().context("validating launch prompts")?;
            let shown = preview(&payload, wizard.survey())?;
            println!("{}", serde_json::to_string_pretty(&shown)?);

            if !dry_run {
                let job = launch(&client, kind, template_id, &payload)
                    .await
                    .map_err(|e| anyhow!("{}", e.to_message("launch template")))?;
                let id = job.get("id").and_then(|v| v.as_i64()).unwrap_or_default();
                println!("Launched job {}", id);
            }
        }

        Commands::List { resource, search, page } => {
            let kind = parse_resource(&resource)?;
            let search = search.as_deref();
            match kind {
                ResourceKind::Credentials => print_list::<Credential>(&client, kind, settings, search, page).await?,
                ResourceKind::Organizations => print_list::<Organization>(&client, kind, settings, search, page).await?,
                ResourceKind::Schedules => print_list::<Schedule>(&client, kind, settings, search, page).await?,
                other => bail!("listing {} is not supported", other.segment()),
            }
        }

        Commands::Delete { resource, id, yes } => {
            let kind = parse_resource(&resource)?;
            if !yes {
                bail!("refusing to delete {} {} without --yes", kind.noun(), id);
            }
            client
                .delete(&kind.detail_path(id))
                .await
                .map_err(|e| anyhow!("{}", e.to_message(&format!("delete {}", kind.noun()))))?;
            println!("Deleted {} {}", kind.noun(), id);
        }
    }

    Ok(())
}
