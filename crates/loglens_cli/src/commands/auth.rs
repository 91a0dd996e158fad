use anyhow::Result;
use async_trait::async_trait;
use clap::Subcommand;

use crate::app::AppContext;
use crate::commands::CliCommand;
use crate::login::{self, DeploymentKind, LoginOptions};

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Log in and store credentials in ./.env
    ///
    /// Pipe a token on stdin to log in without prompts, e.g.
    /// `echo $TOKEN | loglens auth login --org-id my-org`.
    Login {
        /// Kind of deployment; implied to be selfhost when --url is given
        #[arg(long, value_enum)]
        kind: Option<DeploymentKind>,

        /// Url of a selfhosted deployment
        #[arg(long)]
        url: Option<String>,

        /// Organization to use on the cloud deployment
        #[arg(long)]
        org_id: Option<String>,

        /// Overwrite existing credentials without asking
        #[arg(short, long)]
        force: bool,
    },
}

impl AuthCommand {
    fn login_options(
        kind: Option<DeploymentKind>,
        url: &Option<String>,
        org_id: &Option<String>,
    ) -> LoginOptions {
        let kind = kind.or_else(|| url.as_ref().map(|_| DeploymentKind::Selfhost));
        LoginOptions {
            kind,
            url: url.clone(),
            token: None,
            org_id: org_id.clone(),
        }
    }
}

#[async_trait]
impl CliCommand for AuthCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            AuthCommand::Login {
                kind,
                url,
                org_id,
                force,
            } => {
                let options = Self::login_options(*kind, url, org_id);
                login::run_login(options, *force, ctx.overrides().insecure).await
            }
        }
    }
}
