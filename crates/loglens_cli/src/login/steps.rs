//! Login steps. Each one takes the options gathered so far and returns a new
//! record with at most one more field filled in.

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

use super::{DeploymentKind, LoginOptions};
use crate::api::Organization;
use crate::config::DEFAULT_CLOUD_URL;
use crate::support::io::Prompter;

const KIND_CHOICES: [DeploymentKind; 2] = [DeploymentKind::Cloud, DeploymentKind::Selfhost];

pub fn select_kind(opts: LoginOptions, prompter: &mut dyn Prompter) -> Result<LoginOptions> {
    if opts.kind.is_some() {
        return Ok(opts);
    }
    let labels: Vec<String> = KIND_CHOICES.iter().map(|k| k.label().to_owned()).collect();
    let choice = prompter.select("Which kind of deployment are you using?", &labels, 0)?;
    Ok(LoginOptions {
        kind: Some(KIND_CHOICES[choice]),
        ..opts
    })
}

pub fn resolve_url(opts: LoginOptions, prompter: &mut dyn Prompter) -> Result<LoginOptions> {
    let raw = match (opts.kind, &opts.url) {
        (Some(DeploymentKind::Cloud) | None, _) => DEFAULT_CLOUD_URL.to_owned(),
        (Some(DeploymentKind::Selfhost), Some(url)) => url.clone(),
        (Some(DeploymentKind::Selfhost), None) => {
            prompter.input("What is the url of the deployment?", None)?
        }
    };
    let url = normalize_url(&raw)?;
    Ok(LoginOptions {
        url: Some(url),
        ..opts
    })
}

pub fn read_token(
    opts: LoginOptions,
    prompter: &mut dyn Prompter,
    open_browser: &mut dyn FnMut(&str) -> bool,
) -> Result<LoginOptions> {
    if opts.token.is_some() {
        return Ok(opts);
    }
    let url = opts
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("deployment url must be resolved before asking for a token"))?;
    let profile_url = profile_url(url)?;

    let mut message = "What is your personal access token?".to_owned();
    if prompter.confirm(
        "You need a personal access token from your profile page. Open that page in your browser?",
        true,
    )? {
        if !open_browser(&profile_url) {
            eprintln!("Could not open a browser. Please visit {profile_url} manually.");
        }
    } else {
        message = format!("What is your personal access token (create one at {profile_url})?");
    }

    let token = prompter.input(&message, None)?;
    if token.is_empty() {
        anyhow::bail!("Token cannot be empty");
    }
    Ok(LoginOptions {
        token: Some(token),
        ..opts
    })
}

/// Whether `select_organization` needs the organization list.
pub fn needs_organization(opts: &LoginOptions) -> bool {
    opts.kind == Some(DeploymentKind::Cloud) && opts.org_id.is_none()
}

pub fn select_organization(
    opts: LoginOptions,
    organizations: &[Organization],
    prompter: &mut dyn Prompter,
) -> Result<LoginOptions> {
    if !needs_organization(&opts) {
        return Ok(opts);
    }

    let org_id = match organizations {
        [] => anyhow::bail!("The token has no access to any organization"),
        [only] => only.id.clone(),
        many => {
            let mut sorted: Vec<&Organization> = many.iter().collect();
            sorted.sort_by(|a, b| a.name.cmp(&b.name));
            let names: Vec<String> = sorted.iter().map(|org| org.name.clone()).collect();
            let choice = prompter
                .select("Which organization to use?", &names, 0)
                .context("pass --org-id to choose an organization without a prompt")?;
            sorted[choice].id.clone()
        }
    };

    Ok(LoginOptions {
        org_id: Some(org_id),
        ..opts
    })
}

pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        anyhow::bail!("Deployment url cannot be empty");
    }
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&candidate).with_context(|| format!("`{raw}` is not a valid url"))?;
    if parsed.host_str().is_none() {
        anyhow::bail!("`{raw}` has no host");
    }
    Ok(candidate)
}

fn profile_url(url: &str) -> Result<String> {
    let mut parsed = Url::parse(url).with_context(|| format!("`{url}` is not a valid url"))?;
    parsed.set_path("/profile");
    Ok(parsed.to_string())
}
