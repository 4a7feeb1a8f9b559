//! Configuration, CloudFormation template and plan types.
//!
//! Config types derive `JsonSchema` so `tablestack schema` can publish the
//! YAML schema. Template types mirror the CloudFormation JSON shape.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Config schema version accepted by the parser.
pub const CONFIG_VERSION: &str = "1.0";

/// CloudFormation template format version.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Cloud assembly manifest schema version.
pub const MANIFEST_VERSION: &str = "36.0.0";

// ============================================================================
// Top-level tablestack.yaml
// ============================================================================

/// Root configuration: the stacks an application declares.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Application name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Parameters referenced as `{{params.key}}`
    #[serde(default)]
    #[schemars(with = "HashMap<String, serde_json::Value>")]
    pub params: HashMap<String, serde_yaml_ng::Value>,

    /// Users-table stacks keyed by construct id (order-preserving)
    pub stacks: IndexMap<String, StackConfig>,
}

/// Per-stack settings. Everything is optional; the table schema is fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StackConfig {
    /// Deployed stack name (defaults to the stack id)
    #[serde(default)]
    pub stack_name: Option<String>,

    /// Target account/region, passed through unmodified
    #[serde(default)]
    pub env: Option<Environment>,

    /// Template description
    #[serde(default)]
    pub description: Option<String>,

    /// Stack-level tags
    #[serde(default)]
    pub tags: IndexMap<String, String>,

    /// Refuse stack deletion at the provider
    #[serde(default)]
    pub termination_protection: bool,

    /// Export the table name and ARN for cross-stack imports
    #[serde(default)]
    pub export_outputs: bool,
}

/// Deployment target. Missing fields make the stack environment-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Environment {
    #[serde(default)]
    pub account: Option<String>,

    #[serde(default)]
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            region: Some(region.into()),
        }
    }

    /// True when neither account nor region is pinned.
    pub fn is_agnostic(&self) -> bool {
        self.account.is_none() && self.region.is_none()
    }

    /// Environment URI as recorded in the assembly manifest.
    pub fn to_uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_agnostic() {
            write!(f, "env-agnostic")
        } else {
            write!(f, "{}", self.to_uri())
        }
    }
}

// ============================================================================
// CloudFormation template
// ============================================================================

/// A synthesized CloudFormation template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Resources", default)]
    pub resources: IndexMap<String, CfnResource>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, CfnOutput>,
}

/// A single resource entry in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(default)]
    pub properties: IndexMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, serde_json::Value>,
}

/// What the provider does with a resource when it leaves the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "Delete"),
            Self::Retain => write!(f, "Retain"),
            Self::Snapshot => write!(f, "Snapshot"),
        }
    }
}

/// A template output, optionally exported for cross-stack import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnOutput {
    pub value: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<CfnExport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfnExport {
    #[serde(rename = "Name")]
    pub name: String,
}

// ============================================================================
// Cloud assembly manifest
// ============================================================================

/// `manifest.json` of a synthesized cloud assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: IndexMap<String, ArtifactManifest>,
}

/// One deployable artifact (a stack template).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: StackArtifactProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifactProperties {
    pub template_file: String,
    pub stack_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, String>,
    #[serde(default)]
    pub termination_protection: bool,
}

// ============================================================================
// Plan
// ============================================================================

/// Action the provider would take on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    Replace,
    Destroy,
    NoOp,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Replace => write!(f, "REPLACE"),
            Self::Destroy => write!(f, "DESTROY"),
            Self::NoOp => write!(f, "NO-OP"),
        }
    }
}

/// A single planned change.
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// Deployed stack name
    pub stack: String,

    /// Environment URI of the stack
    pub environment: String,

    /// Resource logical id
    pub logical_id: String,

    /// CloudFormation resource type
    pub resource_type: String,

    pub action: PlanAction,

    /// Human-readable description
    pub description: String,
}

/// Diff between a fresh synthesis and the previous assembly.
#[derive(Debug, Clone, Default)]
pub struct DiffPlan {
    pub changes: Vec<PlannedChange>,
    pub to_create: u32,
    pub to_update: u32,
    pub to_replace: u32,
    pub to_destroy: u32,
    pub unchanged: u32,
}

impl DiffPlan {
    pub fn has_changes(&self) -> bool {
        self.to_create + self.to_update + self.to_replace + self.to_destroy > 0
    }
}

// ============================================================================
// Template helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for template resolution.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}
