//! Admin-managed type whitelist, read from a TOML policy file.
//!
//! ```toml
//! [whitelist]
//! mode = "allowlist"
//! types = ["com.acme.Order", "com.acme.model.*"]
//! denied-types = ["com.acme.Secret"]
//!
//! [whitelist.groups.payments]
//! types = ["com.acme.payments.*"]
//! ```
//!
//! A trailing `*` matches every name with that prefix. Denied types win
//! over every allow rule. Loading never fails open: a missing, unreadable
//! or malformed file yields an allowlist that permits nothing.

use crate::error::{SandboxError, SandboxResult};
use crate::group::SandboxGroup;
use crate::whitelist::Whitelist;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How the `types` list is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitelistMode {
    /// Only listed types are permitted.
    #[default]
    Allowlist,
    /// Everything except `denied-types` is permitted.
    Denylist,
    /// No restrictions beyond `denied-types`.
    Unrestricted,
}

/// Extra admissions for one named sandbox group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub types: Vec<String>,
}

/// Whitelist configuration, the `[whitelist]` table of a policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WhitelistConfig {
    #[serde(default)]
    pub mode: WhitelistMode,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub denied_types: Vec<String>,
    #[serde(default)]
    pub groups: HashMap<String, GroupConfig>,
}

/// A type name or a `prefix*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePattern {
    Exact(String),
    Prefix(String),
}

impl TypePattern {
    pub fn parse(pattern: &str) -> SandboxResult<Self> {
        let pattern = pattern.trim();
        match pattern.strip_suffix('*') {
            Some(prefix) if prefix.contains('*') => Err(SandboxError::InvalidPattern(pattern.to_string())),
            Some(prefix) => Ok(Self::Prefix(prefix.to_string())),
            None if pattern.is_empty() || pattern.contains('*') => {
                Err(SandboxError::InvalidPattern(pattern.to_string()))
            }
            None => Ok(Self::Exact(pattern.to_string())),
        }
    }

    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            Self::Exact(name) => name == type_name,
            Self::Prefix(prefix) => type_name.starts_with(prefix.as_str()),
        }
    }
}

/// Compiled whitelist policy.
#[derive(Debug, Clone)]
pub struct WhitelistPolicy {
    mode: WhitelistMode,
    allowed: Vec<TypePattern>,
    denied: Vec<TypePattern>,
    groups: HashMap<String, Vec<TypePattern>>,
    policy_path: Option<PathBuf>,
}

impl WhitelistPolicy {
    /// Loads a policy file. Any failure results in a policy that permits
    /// nothing.
    pub fn load_from(policy_path: impl AsRef<Path>) -> Self {
        let policy_path = policy_path.as_ref().to_path_buf();
        if !policy_path.exists() {
            info!(path = ?policy_path, "No whitelist policy file found, permitting nothing");
            return Self::deny_all();
        }

        match std::fs::read_to_string(&policy_path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(mut policy) => {
                    info!(
                        path = ?policy_path,
                        mode = ?policy.mode,
                        types = policy.allowed.len(),
                        denied = policy.denied.len(),
                        "Loaded whitelist policy"
                    );
                    policy.policy_path = Some(policy_path);
                    policy
                }
                Err(e) => {
                    warn!(path = ?policy_path, error = %e, "Failed to parse whitelist policy, permitting nothing");
                    Self {
                        policy_path: Some(policy_path),
                        ..Self::deny_all()
                    }
                }
            },
            Err(e) => {
                warn!(path = ?policy_path, error = %e, "Failed to read whitelist policy, permitting nothing");
                Self {
                    policy_path: Some(policy_path),
                    ..Self::deny_all()
                }
            }
        }
    }

    /// Parses the contents of a policy file.
    pub fn from_toml_str(contents: &str) -> SandboxResult<Self> {
        let file: PolicyFile = toml::from_str(contents)?;
        Self::with_config(file.whitelist)
    }

    /// Compiles an explicit configuration.
    pub fn with_config(config: WhitelistConfig) -> SandboxResult<Self> {
        let groups = config
            .groups
            .into_iter()
            .map(|(name, group)| Ok((name, compile(&group.types)?)))
            .collect::<SandboxResult<HashMap<_, _>>>()?;
        Ok(Self {
            mode: config.mode,
            allowed: compile(&config.types)?,
            denied: compile(&config.denied_types)?,
            groups,
            policy_path: None,
        })
    }

    /// An allowlist with no entries.
    pub fn deny_all() -> Self {
        Self {
            mode: WhitelistMode::Allowlist,
            allowed: Vec::new(),
            denied: Vec::new(),
            groups: HashMap::new(),
            policy_path: None,
        }
    }

    pub fn mode(&self) -> WhitelistMode {
        self.mode
    }

    /// Whether the policy was read from a file.
    pub fn has_policy_file(&self) -> bool {
        self.policy_path.is_some()
    }

    pub fn policy_path(&self) -> Option<&Path> {
        self.policy_path.as_deref()
    }

    fn is_denied(&self, type_name: &str) -> bool {
        self.denied.iter().any(|p| p.matches(type_name))
    }

    fn is_allowed(&self, group: &SandboxGroup, type_name: &str) -> bool {
        self.allowed.iter().any(|p| p.matches(type_name))
            || self
                .groups
                .get(group.name())
                .is_some_and(|patterns| patterns.iter().any(|p| p.matches(type_name)))
    }
}

impl Whitelist for WhitelistPolicy {
    fn is_permitted(&self, group: &SandboxGroup, type_name: &str) -> bool {
        if self.is_denied(type_name) {
            return false;
        }
        match self.mode {
            WhitelistMode::Allowlist => self.is_allowed(group, type_name),
            WhitelistMode::Denylist | WhitelistMode::Unrestricted => true,
        }
    }
}

fn compile(patterns: &[String]) -> SandboxResult<Vec<TypePattern>> {
    patterns.iter().map(|p| TypePattern::parse(p)).collect()
}

/// Raw TOML structure of a policy file.
#[derive(Deserialize)]
struct PolicyFile {
    #[serde(default)]
    whitelist: WhitelistConfig,
}
