use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, ValueEnum};
use core_model::OutputMode;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::app::AppContext;
use crate::commands::CliCommand;
use crate::support::io::{stdin_is_terminal, stdout_is_terminal, Prompter, TerminalPrompter};
use crate::tail::{EventEmitter, TailLoop, TailOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// One JSON document per line
    Json,
    /// Timestamp and record, tab separated
    #[default]
    Table,
}

impl From<Format> for OutputMode {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputMode::Structured,
            Format::Table => OutputMode::HumanReadable,
        }
    }
}

#[derive(Args, Debug, Clone)]
#[command(about = "Livestream events of a dataset until interrupted")]
pub struct StreamCommand {
    /// Dataset to stream from; asked for when omitted on a terminal
    pub dataset: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Milliseconds between queries; overrides LOGLENS_TAIL_INTERVAL_MS
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,
}

#[async_trait]
impl CliCommand for StreamCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let config = ctx.config_or_login().await?;
        let client = ApiClient::new(config)?;
        debug!(url = client.base_url(), cloud = config.is_cloud(), "resolved deployment");
        let interval = self
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(config.tail_interval);

        let dataset = match &self.dataset {
            Some(dataset) => dataset.clone(),
            None => choose_dataset(&client).await?,
        };

        if stdout_is_terminal() {
            let mut stdout = io::stdout();
            writeln!(stdout, "Streaming events from dataset {dataset}:\n")
                .context("Failed to write to stdout")?;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received");
                let _ = cancel_tx.send(true);
            }
        });

        let emitter = EventEmitter::new(io::stdout(), self.format.into());
        let result = TailLoop::new(&client, emitter, TailOptions::new(dataset.clone(), interval))
            .run(cancel_rx)
            .await;
        interrupt.abort();

        let summary =
            result.with_context(|| format!("Failed to stream events from dataset {dataset}"))?;
        info!(
            queries = summary.queries,
            events = summary.events,
            "live tail stopped"
        );
        Ok(())
    }
}

async fn choose_dataset(client: &ApiClient) -> Result<String> {
    if !stdin_is_terminal() {
        anyhow::bail!("missing dataset");
    }
    let datasets = client
        .list_datasets()
        .await
        .context("Failed to list datasets")?;
    if datasets.is_empty() {
        anyhow::bail!("missing dataset: no datasets found");
    }
    let choice = TerminalPrompter::stdio().select("Which dataset to stream from?", &datasets, 0)?;
    Ok(datasets[choice].clone())
}
