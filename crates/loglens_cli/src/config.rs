use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const URL_VAR: &str = "LOGLENS_URL";
pub const TOKEN_VAR: &str = "LOGLENS_TOKEN";
pub const ORG_ID_VAR: &str = "LOGLENS_ORG_ID";
pub const INSECURE_VAR: &str = "LOGLENS_INSECURE";
pub const TAIL_INTERVAL_VAR: &str = "LOGLENS_TAIL_INTERVAL_MS";
pub const DEFAULT_CLOUD_URL: &str = "https://cloud.loglens.dev";
pub const DEFAULT_TAIL_INTERVAL_MS: u64 = 2_000;

/// Values passed on the command line that win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub org_id: Option<String>,
    pub insecure: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub token: String,
    pub org_id: Option<String>,
    pub insecure: bool,
    pub tail_interval: Duration,
}

impl Config {
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        dotenvy::dotenv().ok();
        from_lookup(overrides, |key| env::var(key).ok())
    }

    /// Loads again after `.env` was rewritten, letting its values replace
    /// those read earlier in this process.
    pub fn reload(overrides: &ConfigOverrides) -> Result<Self> {
        dotenvy::dotenv_override().ok();
        from_lookup(overrides, |key| env::var(key).ok())
    }

    pub fn is_cloud(&self) -> bool {
        self.url.trim_end_matches('/') == DEFAULT_CLOUD_URL
    }
}

pub(crate) fn from_lookup<F>(overrides: &ConfigOverrides, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| {
        lookup(key).and_then(|raw| {
            let trimmed = raw.trim().to_owned();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
    };

    let token = overrides
        .token
        .clone()
        .or_else(|| non_empty(TOKEN_VAR))
        .context(concat!(
            "LOGLENS_TOKEN not found. ",
            "Run 'loglens auth login' or pass --auth-token to configure access."
        ))?;

    let url = overrides
        .url
        .clone()
        .or_else(|| non_empty(URL_VAR))
        .unwrap_or_else(|| DEFAULT_CLOUD_URL.to_owned());

    let org_id = overrides.org_id.clone().or_else(|| non_empty(ORG_ID_VAR));

    let insecure = overrides.insecure
        || match non_empty(INSECURE_VAR) {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("LOGLENS_INSECURE `{raw}` is not a valid boolean"))?,
            None => false,
        };

    let tail_interval_ms = match non_empty(TAIL_INTERVAL_VAR) {
        Some(raw) => raw.parse::<u64>().with_context(|| {
            format!("LOGLENS_TAIL_INTERVAL_MS `{raw}` is not a valid number of milliseconds")
        })?,
        None => DEFAULT_TAIL_INTERVAL_MS,
    };
    if tail_interval_ms == 0 {
        anyhow::bail!("LOGLENS_TAIL_INTERVAL_MS must be greater than zero");
    }

    Ok(Config {
        url,
        token,
        org_id,
        insecure,
        tail_interval: Duration::from_millis(tail_interval_ms),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = from_lookup(&ConfigOverrides::default(), lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("LOGLENS_TOKEN"));
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let cfg = from_lookup(&ConfigOverrides::default(), lookup(&[(TOKEN_VAR, "tok")])).unwrap();
        assert_eq!(cfg.url, DEFAULT_CLOUD_URL);
        assert_eq!(cfg.token, "tok");
        assert_eq!(cfg.org_id, None);
        assert!(!cfg.insecure);
        assert_eq!(cfg.tail_interval, Duration::from_secs(2));
        assert!(cfg.is_cloud());
    }

    #[test]
    fn overrides_win_over_environment() {
        let overrides = ConfigOverrides {
            url: Some("https://logs.internal".into()),
            token: Some("flag-token".into()),
            org_id: Some("org-1".into()),
            insecure: true,
        };
        let cfg = from_lookup(
            &overrides,
            lookup(&[
                (TOKEN_VAR, "env-token"),
                (URL_VAR, "https://elsewhere"),
                (ORG_ID_VAR, "org-2"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.url, "https://logs.internal");
        assert_eq!(cfg.token, "flag-token");
        assert_eq!(cfg.org_id.as_deref(), Some("org-1"));
        assert!(cfg.insecure);
        assert!(!cfg.is_cloud());
    }

    #[test]
    fn blank_values_are_ignored() {
        let cfg = from_lookup(
            &ConfigOverrides::default(),
            lookup(&[(TOKEN_VAR, "tok"), (ORG_ID_VAR, "   ")]),
        )
        .unwrap();
        assert_eq!(cfg.org_id, None);
    }

    #[test]
    fn rejects_zero_and_garbage_intervals() {
        let zero = from_lookup(
            &ConfigOverrides::default(),
            lookup(&[(TOKEN_VAR, "tok"), (TAIL_INTERVAL_VAR, "0")]),
        );
        assert!(zero.is_err());

        let garbage = from_lookup(
            &ConfigOverrides::default(),
            lookup(&[(TOKEN_VAR, "tok"), (TAIL_INTERVAL_VAR, "soon")]),
        );
        assert!(garbage.is_err());
    }

    #[test]
    fn parses_insecure_flag_from_environment() {
        let cfg = from_lookup(
            &ConfigOverrides::default(),
            lookup(&[(TOKEN_VAR, "tok"), (INSECURE_VAR, "TRUE")]),
        )
        .unwrap();
        assert!(cfg.insecure);

        let bad = from_lookup(
            &ConfigOverrides::default(),
            lookup(&[(TOKEN_VAR, "tok"), (INSECURE_VAR, "maybe")]),
        );
        assert!(bad.is_err());
    }
}
