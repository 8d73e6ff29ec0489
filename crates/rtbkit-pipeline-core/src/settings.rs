//! Pipeline settings
//!
//! The build stack reads five settings. Four live in the `shared` scope and
//! the source branch lives in the stage's scope. Only the root stack name is
//! mandatory; everything else falls back to the upstream guidance repository.

use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::overrides::OverrideSource;
use crate::resolver::{ConfigResolver, ResolvedValue};
use crate::scope::{ConfigScope, Context};

/// Stage used when the caller doesn't name one
pub const DEFAULT_STAGE: &str = "dev";

/// Deployment account, read from the override tier only
pub const ACCOUNT_KEY: &str = "CDK_DEFAULT_ACCOUNT";
/// Deployment region, read from the override tier only
pub const REGION_KEY: &str = "CDK_DEFAULT_REGION";

/// Which context scope a setting is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTier {
    /// The `shared` scope
    Shared,
    /// The scope named after the deployment stage
    Stage,
}

impl FromStr for ScopeTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shared" => Ok(ScopeTier::Shared),
            "stage" => Ok(ScopeTier::Stage),
            other => Err(Error::parse(format!("unknown scope tier '{}'", other))
                .with_help("Use 'shared' or 'stage'")),
        }
    }
}

/// A recognized pipeline setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    RepoOwner,
    RepoName,
    RootStackName,
    StackVariant,
    RepoBranch,
}

impl Setting {
    /// Every recognized setting, in resolution order
    pub const ALL: [Setting; 5] = [
        Setting::RepoOwner,
        Setting::RepoName,
        Setting::RootStackName,
        Setting::StackVariant,
        Setting::RepoBranch,
    ];

    /// The configuration key, as used in the environment and the context
    pub fn key(self) -> &'static str {
        match self {
            Setting::RepoOwner => "REPO_OWNER",
            Setting::RepoName => "REPO_NAME",
            Setting::RootStackName => "ROOT_STACK_NAME",
            Setting::StackVariant => "STACK_VARIANT",
            Setting::RepoBranch => "REPO_BRANCH",
        }
    }

    /// Look up a setting by key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    pub fn scope_tier(self) -> ScopeTier {
        match self {
            Setting::RepoBranch => ScopeTier::Stage,
            _ => ScopeTier::Shared,
        }
    }

    /// Fallback value, `None` when the setting must be configured
    pub fn default_value(self) -> Option<&'static str> {
        match self {
            Setting::RepoOwner => Some("aws-solutions-library-samples"),
            Setting::RepoName => {
                Some("guidance-for-building-a-real-time-bidder-for-advertising-on-aws")
            }
            Setting::RootStackName => None,
            Setting::StackVariant => Some("DynamoDBBasic"),
            Setting::RepoBranch => Some("main"),
        }
    }

    pub fn is_required(self) -> bool {
        self.default_value().is_none()
    }

    /// Whether the value names other resources and must be normalized
    pub fn is_identifier(self) -> bool {
        matches!(self, Setting::RootStackName)
    }
}

/// Resolve one setting against a context
///
/// Required settings fail with a missing-required error; identifier settings
/// come back normalized.
pub fn resolve_setting(
    resolver: &ConfigResolver<'_>,
    setting: Setting,
    scope: Option<&ConfigScope>,
) -> Result<ResolvedValue> {
    let resolved = resolver.require(setting.key(), scope, setting.default_value())?;

    if setting.is_identifier() {
        Ok(resolved.normalized())
    } else {
        Ok(resolved)
    }
}

/// Fully resolved settings for one deployment stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSettings {
    /// Stage whose scope supplied stage-tier settings
    pub stage: String,
    pub repo_owner: ResolvedValue,
    pub repo_name: ResolvedValue,
    /// Normalized: lower case, no underscores
    pub root_stack_name: ResolvedValue,
    pub stack_variant: ResolvedValue,
    pub repo_branch: ResolvedValue,
    /// Deployment account, if the environment names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Deployment region, if the environment names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl PipelineSettings {
    /// Resolve every setting for `stage`
    ///
    /// Missing scopes are misses, not errors. The only failure is an
    /// unresolvable root stack name.
    pub fn resolve(
        overrides: &dyn OverrideSource,
        context: &Context,
        stage: &str,
    ) -> Result<Self> {
        let resolver = ConfigResolver::new(overrides);
        let shared = context.shared();
        let stage_scope = context.scope(stage);

        if stage_scope.is_none() {
            log::warn!("Context has no '{}' scope, stage settings use defaults", stage);
        }

        let scope_for = |setting: Setting| match setting.scope_tier() {
            ScopeTier::Shared => shared,
            ScopeTier::Stage => stage_scope,
        };
        let resolve = |setting: Setting| resolve_setting(&resolver, setting, scope_for(setting));

        let settings = Self {
            stage: stage.to_string(),
            repo_owner: resolve(Setting::RepoOwner)?,
            repo_name: resolve(Setting::RepoName)?,
            root_stack_name: resolve(Setting::RootStackName)?,
            stack_variant: resolve(Setting::StackVariant)?,
            repo_branch: resolve(Setting::RepoBranch)?,
            account: resolver
                .resolve(ACCOUNT_KEY, None, None)
                .map(|r| r.value),
            region: resolver.resolve(REGION_KEY, None, None).map(|r| r.value),
        };

        log::debug!(
            "Resolved pipeline settings for stage '{}': root stack '{}', variant '{}'",
            settings.stage,
            settings.root_stack_name,
            settings.stack_variant
        );

        Ok(settings)
    }

    /// The resolved value of a recognized setting
    pub fn get(&self, setting: Setting) -> &ResolvedValue {
        match setting {
            Setting::RepoOwner => &self.repo_owner,
            Setting::RepoName => &self.repo_name,
            Setting::RootStackName => &self.root_stack_name,
            Setting::StackVariant => &self.stack_variant,
            Setting::RepoBranch => &self.repo_branch,
        }
    }

    /// Settings paired with their resolved values, in resolution order
    pub fn entries(&self) -> impl Iterator<Item = (Setting, &ResolvedValue)> {
        Setting::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}
