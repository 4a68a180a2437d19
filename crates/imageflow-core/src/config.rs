use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::reconcile::CheckOptions;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_WORKFLOW_FILENAME: &str = "build.yaml";
pub const DEFAULT_WORK_DIR: &str = "/tmp/actor-base";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_RETRY_SECONDS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
    #[error("No default branch: repository has neither 'master' nor 'main'")]
    NoDefaultBranch,
}

/// Connection and target settings for the GitHub provider.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API root, always ending in `/`
    pub base_url: Url,
    pub org: String,
    pub repo: String,
    pub branches: Vec<String>,
    pub tags: Vec<String>,
    pub token: Option<String>,
    pub workflow_file: String,
}

impl GithubConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = non_empty(&lookup, "GITHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

        Ok(Self {
            base_url: parse_base_url(&raw_url)?,
            org: required(&lookup, "GITHUB_ORG")?,
            repo: required(&lookup, "GITHUB_REPO")?,
            branches: split_list(lookup("TARGET_BRANCHES").as_deref()),
            tags: split_list(lookup("TARGET_TAGS").as_deref()),
            token: non_empty(&lookup, "GITHUB_TOKEN"),
            workflow_file: non_empty(&lookup, "GITHUB_WORKFLOW_FILENAME")
                .unwrap_or_else(|| DEFAULT_WORKFLOW_FILENAME.to_string()),
        })
    }
}

/// Settings for one run of the checker loop.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub image_name: String,
    pub image_namespace: String,
    /// Registry identifier every check request is joined with
    pub image_target: String,
    pub work_dir: PathBuf,
    pub retry_interval: Duration,
}

impl CheckConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let retry_seconds = match non_empty(&lookup, "CHECK_RETRY_SECONDS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidVar {
                name: "CHECK_RETRY_SECONDS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_RETRY_SECONDS,
        };

        Ok(Self {
            image_name: required(&lookup, "IMAGE_NAME")?,
            image_namespace: non_empty(&lookup, "IMAGE_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            image_target: required(&lookup, "IMAGE_TARGET")?,
            work_dir: non_empty(&lookup, "ACTOR_WORK_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_WORK_DIR), PathBuf::from),
            retry_interval: Duration::from_secs(retry_seconds),
        })
    }

    #[must_use]
    pub fn options(&self) -> CheckOptions {
        CheckOptions {
            namespace: self.image_namespace.clone(),
            name: self.image_name.clone(),
            registry: self.image_target.clone(),
            retry_interval: self.retry_interval,
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or(ConfigError::MissingVar(key))
}

/// Comma separated list; blank entries are dropped.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidVar {
        name: "GITHUB_API_URL",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn github_defaults() {
        let config =
            GithubConfig::from_lookup(lookup(&[("GITHUB_ORG", "acme"), ("GITHUB_REPO", "app")]))
                .unwrap();

        assert_eq!(config.base_url.as_str(), "https://api.github.com/");
        assert_eq!(config.workflow_file, "build.yaml");
        assert!(config.branches.is_empty());
        assert!(config.tags.is_empty());
        assert!(config.token.is_none());
    }

    #[test]
    fn github_requires_org_and_repo() {
        let err = GithubConfig::from_lookup(lookup(&[("GITHUB_REPO", "app")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GITHUB_ORG")));

        let err = GithubConfig::from_lookup(lookup(&[("GITHUB_ORG", "acme")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GITHUB_REPO")));
    }

    #[test]
    fn github_lists_and_enterprise_url() {
        let config = GithubConfig::from_lookup(lookup(&[
            ("GITHUB_ORG", "acme"),
            ("GITHUB_REPO", "app"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3"),
            ("TARGET_BRANCHES", "main, release/1.x,,"),
            ("TARGET_TAGS", "latest_tag_name"),
            ("GITHUB_TOKEN", "ghp_secret"),
        ]))
        .unwrap();

        assert_eq!(config.base_url.as_str(), "https://ghe.example.com/api/v3/");
        assert_eq!(config.branches, vec!["main", "release/1.x"]);
        assert_eq!(config.tags, vec!["latest_tag_name"]);
        assert_eq!(config.token.as_deref(), Some("ghp_secret"));
    }

    #[test]
    fn github_rejects_bad_url() {
        let err = GithubConfig::from_lookup(lookup(&[
            ("GITHUB_ORG", "acme"),
            ("GITHUB_REPO", "app"),
            ("GITHUB_API_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "GITHUB_API_URL", .. }));
    }

    #[test]
    fn check_defaults_and_options() {
        let config = CheckConfig::from_lookup(lookup(&[
            ("IMAGE_NAME", "app"),
            ("IMAGE_TARGET", "registry.example.com/app"),
        ]))
        .unwrap();

        assert_eq!(config.image_namespace, "default");
        assert_eq!(config.work_dir, PathBuf::from("/tmp/actor-base"));
        assert_eq!(config.retry_interval, Duration::from_secs(10));

        let options = config.options();
        assert_eq!(options.name, "app");
        assert_eq!(options.registry, "registry.example.com/app");
    }

    #[test]
    fn check_rejects_bad_retry() {
        let err = CheckConfig::from_lookup(lookup(&[
            ("IMAGE_NAME", "app"),
            ("IMAGE_TARGET", "r"),
            ("CHECK_RETRY_SECONDS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "CHECK_RETRY_SECONDS", .. }));
    }

    #[test]
    fn check_requires_target() {
        let err = CheckConfig::from_lookup(lookup(&[("IMAGE_NAME", "app")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("IMAGE_TARGET")));
    }

    #[test]
    fn split_list_handles_missing() {
        assert!(split_list(None).is_empty());
        assert!(split_list(Some("")).is_empty());
        assert_eq!(split_list(Some("a,b")), vec!["a", "b"]);
    }
}
