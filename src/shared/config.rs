//! Application configuration. Telegram account, GitHub watches, forward rules.
//!
//! Read from a JSON file (`TG_HERALD_CONFIG`, default `config.json`) and `TG_HERALD_*`
//! environment overrides, e.g. `TG_HERALD_MONITOR__INTERVAL_SECS=60`.

use crate::adapters::github::DEFAULT_API_URL;
use crate::domain::{
    DispatchTarget, DomainError, EventKind, EventTemplates, Filter, RepoWatch, RuleTemplate,
    SourceKey, WatchRule,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_FORWARD_PREFIX: &str = "[Forwarded from {sourceGroup}] ";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub account: AccountConfig,
    pub message: MessageConfig,
    pub monitor: MonitorConfig,
    pub github: GitHubConfig,
    pub forward: ForwardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// From https://my.telegram.org. Also read from TG_HERALD_API_ID.
    pub api_id: i32,
    /// Also read from TG_HERALD_API_HASH.
    pub api_hash: String,
    /// Prompted for at login when absent.
    pub phone: Option<String>,
    pub session_path: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            api_id: 0,
            api_hash: String::new(),
            phone: None,
            session_path: "./session.session".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// When false, repository notifications are loaded but disabled.
    pub enabled: bool,
    /// Minimum gap between the end of one send and the start of the next.
    pub send_interval_ms: u64,
    pub send_timeout_secs: u64,
    pub templates: TemplateConfig,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            send_interval_ms: 1000,
            send_timeout_secs: 30,
            templates: TemplateConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// `{repo}`, `{author}`, `{message}` (first line), `{url}`
    pub new_commit: String,
    /// `{repo}`, `{author}`, `{title}`, `{state}`, `{url}`
    pub new_issue: String,
    /// `{repo}`, `{author}`, `{version}`, `{title}`, `{url}`
    pub new_release: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            new_commit: "🔨 [{repo}] New commit by {author}\n{message}\n{url}".to_string(),
            new_issue: "🐛 [{repo}] New issue by {author}: {title}\n{url}".to_string(),
            new_release: "🚀 [{repo}] New release {version}: {title}\n{url}".to_string(),
        }
    }
}

impl From<&TemplateConfig> for EventTemplates {
    fn from(t: &TemplateConfig) -> Self {
        EventTemplates {
            new_commit: t.new_commit.clone(),
            new_issue: t.new_issue.clone(),
            new_release: t.new_release.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    /// Items fetched per event kind on each check.
    pub max_items_per_check: usize,
    /// Default log filter becomes `debug` (RUST_LOG still wins).
    pub verbose_logging: bool,
    pub send_startup_message: bool,
    pub startup_message: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            max_items_per_check: 5,
            verbose_logging: false,
            send_startup_message: false,
            startup_message: "🤖 tg-herald is online and watching GitHub".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Personal access token. Also read from GITHUB_TOKEN.
    pub token: Option<String>,
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub repositories: Vec<RepositoryConfig>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            repositories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    /// Label for `{repo}`; the repository name when empty.
    pub display_name: String,
    pub watch_events: Vec<EventKind>,
    pub target_groups: Vec<i64>,
    pub target_friends: Vec<i64>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            display_name: String::new(),
            watch_events: vec![EventKind::Commits, EventKind::Issues, EventKind::Releases],
            target_groups: Vec::new(),
            target_friends: Vec::new(),
        }
    }
}

impl RepositoryConfig {
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Groups first, then friends, in configuration order.
    pub fn destinations(&self) -> Vec<DispatchTarget> {
        self.target_groups
            .iter()
            .map(|&id| DispatchTarget::room(id))
            .chain(self.target_friends.iter().map(|&id| DispatchTarget::direct(id)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// When false, forward rules are loaded but disabled.
    pub enabled: bool,
    pub rules: Vec<ForwardRuleConfig>,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardRuleConfig {
    pub name: String,
    pub enabled: bool,
    pub source_groups: Vec<i64>,
    pub target_groups: Vec<i64>,
    pub message_prefixes: Vec<String>,
    pub keywords: Vec<String>,
    pub forward_full_message: bool,
    pub preserve_format: bool,
    /// `{sourceGroup}`, `{senderUin}`
    pub forward_prefix: String,
}

impl Default for ForwardRuleConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            source_groups: Vec::new(),
            target_groups: Vec::new(),
            message_prefixes: Vec::new(),
            keywords: Vec::new(),
            forward_full_message: true,
            preserve_format: true,
            forward_prefix: DEFAULT_FORWARD_PREFIX.to_string(),
        }
    }
}

impl AppConfig {
    /// Path of the configuration file: TG_HERALD_CONFIG or `config.json`.
    pub fn path() -> PathBuf {
        std::env::var("TG_HERALD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load file (optional) and environment. A missing file yields defaults.
    /// `.env` is read once by the binary before this is called.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = Self::path();
        let mut cfg: Self = config::Config::builder()
            .add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("TG_HERALD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        cfg.apply_env_fallbacks();
        Ok(cfg)
    }

    /// TG_HERALD_API_ID / TG_HERALD_API_HASH / GITHUB_TOKEN fill values left unset.
    fn apply_env_fallbacks(&mut self) {
        if self.account.api_id == 0 {
            if let Some(id) = std::env::var("TG_HERALD_API_ID")
                .ok()
                .and_then(|s| s.trim().parse().ok())
            {
                self.account.api_id = id;
            }
        }
        if self.account.api_hash.trim().is_empty() {
            if let Ok(hash) = std::env::var("TG_HERALD_API_HASH") {
                self.account.api_hash = hash;
            }
        }
        if self.github_token().is_none() {
            self.github.token = std::env::var("GITHUB_TOKEN").ok();
        }
    }

    pub fn has_account_identity(&self) -> bool {
        self.account.api_id != 0 && !self.account.api_hash.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for (i, repo) in self.github.repositories.iter().enumerate() {
            if repo.owner.trim().is_empty() || repo.name.trim().is_empty() {
                return Err(DomainError::Config(format!(
                    "github.repositories[{}]: owner and name are required",
                    i
                )));
            }
            if repo.watch_events.contains(&EventKind::Messages) {
                return Err(DomainError::Config(format!(
                    "github.repositories[{}]: \"messages\" is not a repository event",
                    i
                )));
            }
        }
        if self.monitor.interval_secs == 0 {
            return Err(DomainError::Config(
                "monitor.interval_secs must be greater than 0".into(),
            ));
        }
        if self.monitor.max_items_per_check == 0 {
            return Err(DomainError::Config(
                "monitor.max_items_per_check must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    pub fn default_log_filter(&self) -> &'static str {
        if self.monitor.verbose_logging {
            "debug"
        } else {
            "info"
        }
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.message.send_interval_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.message.send_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.github.request_timeout_secs)
    }

    pub fn repo_watches(&self) -> Vec<RepoWatch> {
        self.github
            .repositories
            .iter()
            .map(|r| RepoWatch {
                owner: r.owner.clone(),
                name: r.name.clone(),
                display_name: r.label().to_string(),
                events: r.watch_events.clone(),
            })
            .collect()
    }

    /// Every rule: one per watched repository, then one per forward rule.
    pub fn watch_rules(&self) -> Vec<WatchRule> {
        let templates = EventTemplates::from(&self.message.templates);
        let repo_rules = self.github.repositories.iter().map(|r| WatchRule {
            name: format!("github:{}/{}", r.owner, r.name),
            enabled: self.message.enabled,
            sources: BTreeSet::from([SourceKey::repo(&r.owner, &r.name)]),
            destinations: r.destinations(),
            filters: vec![Filter::EventKinds(r.watch_events.clone())],
            template: RuleTemplate::PerKind(templates.clone()),
            preserve_original_content: false,
        });

        let forward_rules = self.forward.rules.iter().enumerate().map(|(i, r)| {
            let mut filters = Vec::new();
            if !r.message_prefixes.is_empty() {
                filters.push(Filter::Prefixes(r.message_prefixes.clone()));
            }
            if !r.keywords.is_empty() {
                filters.push(Filter::Keywords(r.keywords.clone()));
            }
            WatchRule {
                name: if r.name.trim().is_empty() {
                    format!("forward #{}", i + 1)
                } else {
                    r.name.clone()
                },
                enabled: self.forward.enabled && r.enabled,
                sources: r.source_groups.iter().map(|&id| SourceKey::chat(id)).collect(),
                destinations: r
                    .target_groups
                    .iter()
                    .map(|&id| DispatchTarget::room(id))
                    .collect(),
                filters,
                template: RuleTemplate::Prefix(r.forward_prefix.clone()),
                preserve_original_content: r.preserve_format && r.forward_full_message,
            }
        });

        repo_rules.chain(forward_rules).collect()
    }

    /// Distinct repository destinations for the startup message: groups, then friends.
    pub fn startup_targets(&self) -> Vec<DispatchTarget> {
        let repos = &self.github.repositories;
        let groups = repos
            .iter()
            .flat_map(|r| r.target_groups.iter().map(|&id| DispatchTarget::room(id)));
        let friends = repos
            .iter()
            .flat_map(|r| r.target_friends.iter().map(|&id| DispatchTarget::direct(id)));
        let mut seen = BTreeSet::new();
        groups
            .chain(friends)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Configuration with one repository and one forward rule, as a starting point.
    pub fn example() -> Self {
        let mut cfg = Self::default();
        cfg.github.repositories.push(RepositoryConfig {
            owner: "octocat".into(),
            name: "Hello-World".into(),
            display_name: "Hello World".into(),
            target_groups: vec![-1001234567890],
            ..Default::default()
        });
        cfg.forward.rules.push(ForwardRuleConfig {
            name: "announcements".into(),
            source_groups: vec![-1001111111111],
            target_groups: vec![-1002222222222],
            message_prefixes: vec!["#announce".into()],
            keywords: vec!["urgent".into()],
            ..Default::default()
        });
        cfg
    }

    /// Write the example configuration to `path` unless a file already exists there.
    /// Returns whether a file was written.
    pub fn write_example(path: &Path) -> Result<bool, DomainError> {
        if path.exists() {
            return Ok(false);
        }
        let json = serde_json::to_string_pretty(&Self::example())
            .map_err(|e| DomainError::Config(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| DomainError::Config(format!("write {}: {}", path.display(), e)))?;
        Ok(true)
    }
}
