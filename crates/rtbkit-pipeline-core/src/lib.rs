//! rtbkit-pipeline-core: configuration for the real-time bidder build pipeline
//!
//! This crate resolves the settings the pipeline stack needs (repository,
//! branch, root stack name, stack variant) through an override → context
//! scope → default chain, and turns them into a declarative build stack plan.
//!
//! # Example
//!
//! ```rust
//! use rtbkit_pipeline_core::{Context, MapOverrides, PipelineSettings};
//!
//! let context = Context::from_yaml(r#"
//! shared:
//!   ROOT_STACK_NAME: My_Stack
//! dev:
//!   REPO_BRANCH: develop
//! "#).unwrap();
//!
//! let overrides = MapOverrides::new().with("STACK_VARIANT", "Aerospike");
//! let settings = PipelineSettings::resolve(&overrides, &context, "dev").unwrap();
//!
//! assert_eq!(settings.root_stack_name.as_str(), "my-stack");
//! assert_eq!(settings.stack_variant.as_str(), "Aerospike");
//! assert_eq!(settings.repo_branch.as_str(), "develop");
//! ```

pub mod error;
pub mod overrides;
pub mod plan;
pub mod resolver;
pub mod scope;
pub mod settings;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use overrides::{EnvOverrides, MapOverrides, NoOverrides, OverrideSource};
pub use plan::BuildStackPlan;
pub use resolver::{normalize_identifier, ConfigResolver, ResolvedValue, Tier};
pub use scope::{ConfigScope, Context, FileSpec};
pub use settings::{PipelineSettings, ScopeTier, Setting};
pub use value::Value;
