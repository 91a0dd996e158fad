mod steps;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use crate::api::{ApiClient, Organization};
use crate::config::{ORG_ID_VAR, TOKEN_VAR, URL_VAR};
use crate::support::fs::{ensure_gitignored, env_file_value, upsert_env_file};
use crate::support::io::{read_secret_line, stdin_is_terminal, Prompter, TerminalPrompter};

pub use steps::{
    needs_organization, normalize_url, read_token, resolve_url, select_kind, select_organization,
};

const ENV_FILE: &str = ".env";
const GITIGNORE_FILE: &str = ".gitignore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeploymentKind {
    Cloud,
    Selfhost,
}

impl DeploymentKind {
    pub fn label(self) -> &'static str {
        match self {
            DeploymentKind::Cloud => "Cloud",
            DeploymentKind::Selfhost => "Selfhost",
        }
    }
}

/// Everything the login flow collects. Steps never mutate a record in place;
/// they return a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginOptions {
    pub kind: Option<DeploymentKind>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub org_id: Option<String>,
}

/// Answers nothing; used when stdin is not a terminal so that any step that
/// would need to ask fails with a hint instead of blocking.
struct NoTerminal;

impl Prompter for NoTerminal {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        anyhow::bail!("cannot ask `{message}` without a terminal; pass the value as a flag")
    }

    fn input(&mut self, message: &str, _default: Option<&str>) -> Result<String> {
        anyhow::bail!("cannot ask `{message}` without a terminal; pass the value as a flag")
    }

    fn select(&mut self, message: &str, _options: &[String], _default: usize) -> Result<usize> {
        anyhow::bail!("cannot ask `{message}` without a terminal; pass the value as a flag")
    }
}

pub async fn run_login(initial: LoginOptions, force: bool, insecure: bool) -> Result<()> {
    let interactive = stdin_is_terminal();
    let initial = if interactive {
        initial
    } else {
        let token = read_secret_line(io::stdin().lock())?;
        LoginOptions {
            kind: initial.kind.or(Some(DeploymentKind::Cloud)),
            token: Some(token),
            ..initial
        }
    };

    let opts = {
        let mut terminal;
        let mut no_terminal = NoTerminal;
        let prompter: &mut dyn Prompter = if interactive {
            terminal = TerminalPrompter::stdio();
            &mut terminal
        } else {
            &mut no_terminal
        };
        let opts = select_kind(initial, prompter)?;
        let opts = resolve_url(opts, prompter)?;
        read_token(opts, prompter, &mut |url: &str| open::that(url).is_ok())?
    };

    let url = opts.url.clone().context("deployment url was not resolved")?;
    let token = opts.token.clone().context("token was not provided")?;

    let organizations = if opts.kind == Some(DeploymentKind::Cloud) {
        ApiClient::with_credentials(&url, &token, None, insecure)?
            .list_organizations()
            .await
            .context("Failed to list organizations for this token")?
    } else {
        Vec::new()
    };
    let opts = if !needs_organization(&opts) {
        opts
    } else if interactive {
        select_organization(opts, &organizations, &mut TerminalPrompter::stdio())?
    } else {
        select_organization(opts, &organizations, &mut NoTerminal)?
    };

    let client = ApiClient::with_credentials(&url, &token, opts.org_id.as_deref(), insecure)?;
    let user = client
        .current_user()
        .await
        .context("Failed to verify the token")?;
    info!(url = %url, user = %user.name, "credentials verified");

    let env_path = Path::new(ENV_FILE);
    if !force && env_file_value(env_path, TOKEN_VAR)?.is_some() {
        if !interactive {
            anyhow::bail!("credentials already configured in {ENV_FILE}; overwrite with --force");
        }
        let overwrite = TerminalPrompter::stdio().confirm(
            &format!("Credentials already configured in {ENV_FILE}. Overwrite?"),
            false,
        )?;
        if !overwrite {
            eprintln!("Keeping existing credentials.");
            return Ok(());
        }
    }

    persist(env_path, &opts)?;
    ensure_gitignored(Path::new(GITIGNORE_FILE), ENV_FILE)?;

    match opts.org_id.as_deref() {
        Some(org_id) => eprintln!(
            "Logged in to organization {} as {}",
            organization_label(org_id, &organizations),
            user.name
        ),
        None => eprintln!("Logged in to {url} as {}", user.name),
    }
    Ok(())
}

/// Asks whether to log in now, after `missing` prevented loading credentials.
/// Never asks without a terminal.
pub fn offer_login(
    missing: &anyhow::Error,
    interactive: bool,
    prompter: &mut dyn Prompter,
) -> Result<bool> {
    if !interactive {
        return Ok(false);
    }
    eprintln!("{missing}");
    prompter.confirm("You are not logged in. Log in now?", true)
}

/// Display name of `org_id`, falling back to the id when the token cannot
/// see it.
fn organization_label<'a>(org_id: &'a str, organizations: &'a [Organization]) -> &'a str {
    organizations
        .iter()
        .find(|org| org.id == org_id)
        .map_or(org_id, |org| org.name.as_str())
}

fn persist(env_path: &Path, opts: &LoginOptions) -> Result<()> {
    upsert_env_file(
        env_path,
        &[
            (URL_VAR, opts.url.as_deref()),
            (TOKEN_VAR, opts.token.as_deref()),
            (ORG_ID_VAR, opts.org_id.as_deref()),
        ],
    )
    .with_context(|| format!("Failed to store credentials in {}", env_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_terminal_prompter_refuses_to_ask() {
        let opts = LoginOptions {
            kind: Some(DeploymentKind::Selfhost),
            ..Default::default()
        };
        let err = resolve_url(opts, &mut NoTerminal).unwrap_err();
        assert!(err.to_string().contains("without a terminal"));
    }

    #[test]
    fn piped_login_for_cloud_needs_no_prompts() {
        let opts = LoginOptions {
            kind: Some(DeploymentKind::Cloud),
            token: Some("tok".into()),
            org_id: Some("o-1".into()),
            ..Default::default()
        };
        let mut prompter = NoTerminal;
        let opts = select_kind(opts, &mut prompter).unwrap();
        let opts = resolve_url(opts, &mut prompter).unwrap();
        let opts = read_token(opts, &mut prompter, &mut |_: &str| false).unwrap();
        let opts = select_organization(opts, &[], &mut prompter).unwrap();
        assert_eq!(opts.url.as_deref(), Some(crate::config::DEFAULT_CLOUD_URL));
        assert_eq!(opts.token.as_deref(), Some("tok"));
    }

    struct Answer(bool);

    impl Prompter for Answer {
        fn confirm(&mut self, _message: &str, _default: bool) -> Result<bool> {
            Ok(self.0)
        }

        fn input(&mut self, _message: &str, _default: Option<&str>) -> Result<String> {
            anyhow::bail!("unexpected input")
        }

        fn select(&mut self, _msg: &str, _options: &[String], _default: usize) -> Result<usize> {
            anyhow::bail!("unexpected select")
        }
    }

    #[test]
    fn login_is_offered_only_on_a_terminal() {
        let missing = anyhow::anyhow!("LOGLENS_TOKEN not found");
        assert!(offer_login(&missing, true, &mut Answer(true)).unwrap());
        assert!(!offer_login(&missing, true, &mut Answer(false)).unwrap());
        assert!(!offer_login(&missing, false, &mut Answer(true)).unwrap());
        assert!(!offer_login(&missing, false, &mut NoTerminal).unwrap());
    }

    #[test]
    fn organization_label_prefers_the_name() {
        let organizations = vec![
            Organization {
                id: "o-1".into(),
                name: "Acme".into(),
            },
            Organization {
                id: "o-2".into(),
                name: "Globex".into(),
            },
        ];
        assert_eq!(organization_label("o-2", &organizations), "Globex");
        assert_eq!(organization_label("o-9", &organizations), "o-9");
        assert_eq!(organization_label("o-1", &[]), "o-1");
    }

    #[test]
    fn persist_writes_all_credentials() {
        let dir = std::env::temp_dir().join(format!("loglens-login-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let env_path = dir.join(".env");

        let opts = LoginOptions {
            kind: Some(DeploymentKind::Selfhost),
            url: Some("https://logs.internal".into()),
            token: Some("tok".into()),
            org_id: None,
        };
        persist(&env_path, &opts).unwrap();

        assert_eq!(
            std::fs::read_to_string(&env_path).unwrap(),
            "LOGLENS_URL=https://logs.internal\nLOGLENS_TOKEN=tok\n"
        );
        std::fs::remove_dir_all(dir).unwrap();
    }
}
