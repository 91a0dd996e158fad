pub mod auth;
pub mod completion;
pub mod stream;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};

use crate::app::AppContext;
use crate::config::ConfigOverrides;

pub use auth::AuthCommand;
pub use completion::CompletionCommand;
pub use stream::StreamCommand;

#[async_trait]
pub trait CliCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()>;
}

#[derive(Parser, Debug, Clone)]
#[command(name = "loglens", version, about = "Query and tail LogLens datasets")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: RootCommand,
}

/// Connection flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Url of the deployment; overrides LOGLENS_URL
    #[arg(long, global = true)]
    pub auth_url: Option<String>,

    /// Personal access token; overrides LOGLENS_TOKEN
    #[arg(long, global = true)]
    pub auth_token: Option<String>,

    /// Organization to act on; overrides LOGLENS_ORG_ID
    #[arg(long, global = true)]
    pub auth_org_id: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
}

impl GlobalArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            url: self.auth_url.clone(),
            token: self.auth_token.clone(),
            org_id: self.auth_org_id.clone(),
            insecure: self.insecure,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum RootCommand {
    Stream(StreamCommand),
    #[command(subcommand)]
    Auth(AuthCommand),
    Completion(CompletionCommand),
}

impl Cli {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        match self.command {
            RootCommand::Stream(cmd) => cmd.execute(ctx).await,
            RootCommand::Auth(cmd) => cmd.execute(ctx).await,
            RootCommand::Completion(cmd) => cmd.execute(ctx).await,
        }
    }
}
