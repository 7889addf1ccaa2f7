use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::RouterConfig;
use crate::dispatcher::{Dispatcher, HandlerRequest};
use crate::echo::echo_handler;
use crate::hooks::HookStage;
use crate::router::Router;

/// Command-line interface for inspecting route manifests
#[derive(Parser)]
#[command(name = "hookrouter", version, about = "Inspect and exercise hookrouter route tables")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the route table built from a manifest
    Routes {
        /// Path to the route manifest (YAML)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Router configuration file (YAML); defaults plus `HOOKROUTER_*` variables otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dispatch one request through a manifest's routes and print the outcome
    Resolve {
        /// Path to the route manifest (YAML)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Router configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Request method
        #[arg(long, default_value = "GET")]
        method: String,

        /// Request host (port is ignored)
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Request path
        #[arg(long)]
        path: String,
    },
}

/// A route manifest: one entry per registration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub routes: Vec<ManifestRoute>,
}

/// One manifest entry. Entries without a `stage` are serve routes.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ManifestRoute {
    /// `[METHOD:]/uri[@domain]`
    pub pattern: String,
    /// Name echoed into the response body when the entry runs
    pub name: String,
    /// Hook stage name (case-insensitive)
    #[serde(default)]
    pub stage: Option<String>,
}

impl Manifest {
    /// Parse a manifest from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse route manifest")
    }

    /// Load a manifest from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route manifest {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid route manifest {}", path.display()))
    }

    /// Register every entry with an echo handler and start the router.
    pub fn build_router(&self, config: RouterConfig) -> Result<Router> {
        let mut router = Router::new(config);
        for entry in &self.routes {
            let handler = echo_handler(&entry.name);
            match &entry.stage {
                None => router
                    .register_serve_handler(&entry.pattern, handler, &entry.name)
                    .with_context(|| format!("Cannot register route '{}'", entry.name))?,
                Some(stage) => {
                    let stage: HookStage = stage
                        .parse()
                        .with_context(|| format!("Cannot register hook '{}'", entry.name))?;
                    router
                        .register_hook_handler(&entry.pattern, stage, handler, &entry.name)
                        .with_context(|| format!("Cannot register hook '{}'", entry.name))?;
                }
            }
        }
        router.start().context("Failed to start router")?;
        Ok(router)
    }
}

/// Render the route table as aligned text or JSON
pub fn render_routes(router: &Router, json: bool) -> Result<String> {
    let routes = router.routes();
    if json {
        return serde_json::to_string_pretty(&routes).context("Failed to serialize route table");
    }
    let mut out = String::new();
    for info in &routes {
        let stage = info.stage.map_or("serve", |s| s.as_str());
        out.push_str(&format!(
            "{:<16} {:<8} {:<32} {:<13} {:>3}  {}\n",
            info.domain, info.method, info.uri, stage, info.priority, info.handler
        ));
    }
    Ok(out)
}

/// Run a request through the full dispatch and return it with its response filled in
pub fn resolve_request(router: Router, method: &str, host: &str, path: &str) -> Result<HandlerRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid request method '{method}'"))?;
    let dispatcher = Dispatcher::new(Arc::new(router));
    let mut req = HandlerRequest::new(method, host, path);
    dispatcher.dispatch(&mut req);
    Ok(req)
}

/// Render a dispatched request: status, body, parameters, faults
pub fn render_outcome(req: &HandlerRequest) -> String {
    let mut out = format!(
        "request: {} {} {}\nstatus:  {}\nbody:    {}\n",
        req.method, req.host, req.path, req.response.status, req.response.body
    );
    if let Some(route) = &req.route {
        out.push_str(&format!("route:   {} ({})\n", route.pattern, route.handler_name));
    }
    for (name, value) in &req.path_params {
        out.push_str(&format!("param:   {name} = {value}\n"));
    }
    for fault in &req.response.faults {
        out.push_str(&format!("fault:   {fault}\n"));
    }
    out
}

/// Execute the CLI command provided by the user
///
/// # Errors
///
/// Returns an error if:
/// - The manifest or configuration cannot be read or parsed
/// - A manifest entry cannot be registered
/// - The request method is not a valid HTTP token
pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Routes {
            manifest,
            config,
            json,
        } => {
            let router = load_router(&manifest, config.as_deref())?;
            print!("{}", render_routes(&router, json)?);
            Ok(())
        }
        Commands::Resolve {
            manifest,
            config,
            method,
            host,
            path,
        } => {
            let router = load_router(&manifest, config.as_deref())?;
            let req = resolve_request(router, &method, &host, &path)?;
            print!("{}", render_outcome(&req));
            Ok(())
        }
    }
}

fn load_router(manifest: &Path, config: Option<&Path>) -> Result<Router> {
    let config = RouterConfig::load(config)?;
    let manifest = Manifest::from_yaml_file(manifest)?;
    info!(
        routes = manifest.routes.len(),
        cache_expire_ms = config.cache_expire_ms,
        "Building router from manifest"
    );
    manifest.build_router(config)
}
