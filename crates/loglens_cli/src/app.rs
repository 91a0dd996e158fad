use anyhow::Result;
use clap::Parser;
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;
use crate::config::{Config, ConfigOverrides};
use crate::login::{self, LoginOptions};
use crate::support::io::{stdin_is_terminal, TerminalPrompter};

/// State shared by every command. Configuration is resolved lazily so that
/// commands which do not talk to a deployment never require credentials.
#[derive(Default)]
pub struct AppContext {
    overrides: ConfigOverrides,
    config: OnceCell<Config>,
}

impl AppContext {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            config: OnceCell::new(),
        }
    }

    pub fn overrides(&self) -> &ConfigOverrides {
        &self.overrides
    }

    pub fn config(&self) -> Result<&Config> {
        self.config.get_or_try_init(|| Config::load(&self.overrides))
    }

    /// Like [`AppContext::config`], but offers to run `auth login` first when
    /// no credentials are configured and a terminal is attached.
    pub async fn config_or_login(&self) -> Result<&Config> {
        let missing = match self.config() {
            Ok(config) => return Ok(config),
            Err(err) => err,
        };
        let accepted =
            login::offer_login(&missing, stdin_is_terminal(), &mut TerminalPrompter::stdio())?;
        if !accepted {
            return Err(missing);
        }
        login::run_login(LoginOptions::default(), false, self.overrides.insecure).await?;
        self.config.get_or_try_init(|| Config::reload(&self.overrides))
    }
}

pub async fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let ctx = AppContext::new(cli.global.overrides());
    cli.execute(&ctx).await
}

// Diagnostics go to stderr; stdout carries only events and command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
