mod action;
mod app;
mod assets;
mod cli;
mod components;
mod config;
mod errors;
mod logging;
mod tui;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use intake::{FormSession, FormStore, HttpDispatcher, render_visible};
use tracing::{info, warn};

use crate::app::App;
use crate::cli::{Cli, Cmd};
use crate::components::form_page::FormPage;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    errors::init()?;
    config::ensure_data_and_config_dirs_exist()?;
    let _log_guard = logging::init()?;

    let args = Cli::parse();
    let mut config = Config::new()?;

    match args.cmd.unwrap_or(Cmd::Run {
        schema: None,
        endpoint: None,
    }) {
        Cmd::Run { schema, endpoint } => {
            if let Some(schema) = schema {
                config.schema = Some(schema);
            }
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            let schema = assets::load_schema(config.schema.as_deref())?;
            let dispatcher = HttpDispatcher::with_timeout(
                config.endpoint.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?;
            info!(endpoint = %dispatcher.endpoint(), title = %schema.title, "starting form");

            let session = FormSession::mount(schema, Arc::new(dispatcher))?;
            for issue in session.issues() {
                warn!(%issue, "schema issue");
            }
            let mut app = App::new(config, FormPage::new(session));
            app.run().await?;
        }
        Cmd::Check { schema } => {
            let schema = assets::load_schema(schema.as_deref().or(config.schema.as_deref()))?;
            schema.check_ids()?;
            let issues = schema.lint();
            if issues.is_empty() {
                println!("{}: no issues", schema.title);
            } else {
                for issue in &issues {
                    println!("warning: {issue}");
                }
            }
            println!();
            let store = FormStore::new();
            for field in render_visible(&schema.fields, &store) {
                println!(
                    "{}{} ({}) [{}]",
                    "  ".repeat(field.depth),
                    field.node.label,
                    field.node.kind,
                    field.path
                );
            }
        }
    }
    Ok(())
}
