//! Build stack plan
//!
//! Describes what the pipeline stack provisions: a GitHub source, the
//! CodeBuild service role with its managed policies, the ARM build project
//! and a one-shot build trigger. The plan is plain data; turning it into
//! cloud resources is the provisioning toolkit's job.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::settings::PipelineSettings;

/// Service role id and name
pub const ROLE_NAME: &str = "rtbkit_codebuild_role";
/// IAM path for the service role
pub const ROLE_PATH: &str = "/rtbkit/";
/// Construct id of the build project
pub const PROJECT_ID: &str = "RTBPipelineProject";
/// Construct id of the deploy-time build trigger
pub const START_BUILD_ID: &str = "RTBBuild";
/// Amazon Linux 2 ARM standard image, version 3.0
pub const BUILD_IMAGE: &str = "aws/codebuild/amazonlinux2-aarch64-standard:3.0";
/// Build environment type for the project
pub const ENVIRONMENT_TYPE: &str = "ARM_CONTAINER";

const POLICY_ID_PREFIX: &str = "rtbkit_admin_policy_";
const AWS_MANAGED_POLICY_PREFIX: &str = "arn:aws:iam::aws:policy/";

/// Principals allowed to assume the service role
const SERVICE_PRINCIPALS: [&str; 2] = ["codebuild.amazonaws.com", "codepipeline.amazonaws.com"];

/// AWS managed policies attached to the service role
///
/// The build deploys CloudFormation stacks that create EKS, VPC, DynamoDB,
/// Kinesis and S3 resources, so the role is intentionally broad.
const MANAGED_POLICIES: [&str; 8] = [
    "AdministratorAccess",
    "AmazonEKSClusterPolicy",
    "AmazonS3FullAccess",
    "AmazonKinesisFullAccess",
    "AmazonDynamoDBFullAccess",
    "AmazonVPCFullAccess",
    "AWSCodeBuildAdminAccess",
    "AWSCloudFormationFullAccess",
];

/// Build environment variable names
pub const ENV_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
pub const ENV_ROOT_STACK_NAME: &str = "RTBKIT_ROOT_STACK_NAME";
pub const ENV_VARIANT: &str = "RTBKIT_VARIANT";

/// GitHub source for the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitHubSource {
    pub owner: String,
    pub repo: String,
    pub branch_or_ref: String,
    /// Builds are started on deploy, not on push
    pub webhook: bool,
}

/// A managed policy attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyAttachment {
    /// Construct id, unique within the stack
    pub id: String,
    pub arn: String,
}

/// The CodeBuild/CodePipeline service role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRole {
    pub id: String,
    pub role_name: String,
    pub path: String,
    pub assumed_by: Vec<String>,
    pub managed_policies: Vec<PolicyAttachment>,
}

impl ServiceRole {
    fn rtbkit() -> Self {
        Self {
            id: ROLE_NAME.to_string(),
            role_name: ROLE_NAME.to_string(),
            path: ROLE_PATH.to_string(),
            assumed_by: SERVICE_PRINCIPALS.iter().map(|p| p.to_string()).collect(),
            managed_policies: Vec::new(),
        }
        .with_managed_policies(MANAGED_POLICIES.iter().map(|name| managed_policy_arn(name)))
    }

    /// Attach managed policies by ARN
    ///
    /// Duplicate ARNs are attached once. Each attachment's id carries its
    /// position in the role's policy list.
    pub fn with_managed_policies(mut self, arns: impl IntoIterator<Item = String>) -> Self {
        for arn in arns {
            if self.managed_policies.iter().any(|p| p.arn == arn) {
                continue;
            }
            let id = format!("{}{}", POLICY_ID_PREFIX, self.managed_policies.len());
            self.managed_policies.push(PolicyAttachment { id, arn });
        }
        self
    }
}

/// The CodeBuild project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildProject {
    pub id: String,
    pub build_image: String,
    pub environment_type: String,
    /// Docker-in-docker is needed to build the bidder images
    pub privileged: bool,
    pub environment_variables: IndexMap<String, String>,
    pub role: String,
}

/// Deploy-time trigger that runs the project once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartBuild {
    pub id: String,
    pub project: String,
}

/// Everything the pipeline stack declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStackPlan {
    pub stage: String,
    pub source: GitHubSource,
    pub role: ServiceRole,
    pub project: BuildProject,
    pub start_build: StartBuild,
}

/// ARN of an AWS managed policy
pub fn managed_policy_arn(name: &str) -> String {
    format!("{}{}", AWS_MANAGED_POLICY_PREFIX, name)
}

impl BuildStackPlan {
    /// Assemble the plan from resolved settings
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        let source = GitHubSource {
            owner: settings.repo_owner.value.clone(),
            repo: settings.repo_name.value.clone(),
            branch_or_ref: settings.repo_branch.value.clone(),
            webhook: false,
        };

        let role = ServiceRole::rtbkit();

        let mut environment_variables = IndexMap::new();
        if let Some(account) = &settings.account {
            environment_variables.insert(ENV_ACCOUNT_ID.to_string(), account.clone());
        }
        environment_variables.insert(
            ENV_ROOT_STACK_NAME.to_string(),
            settings.root_stack_name.value.clone(),
        );
        environment_variables.insert(ENV_VARIANT.to_string(), settings.stack_variant.value.clone());

        let project = BuildProject {
            id: PROJECT_ID.to_string(),
            build_image: BUILD_IMAGE.to_string(),
            environment_type: ENVIRONMENT_TYPE.to_string(),
            privileged: true,
            environment_variables,
            role: role.id.clone(),
        };

        let start_build = StartBuild {
            id: START_BUILD_ID.to_string(),
            project: project.id.clone(),
        };

        log::debug!(
            "Planned {} from {}/{}@{} with {} managed policies",
            project.id,
            source.owner,
            source.repo,
            source.branch_or_ref,
            role.managed_policies.len()
        );

        Self {
            stage: settings.stage.clone(),
            source,
            role,
            project,
            start_build,
        }
    }

    /// Render the plan as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::render("yaml", e))
    }

    /// Render the plan as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::render("json", e))
    }
}
