//! Stacks: the deployable unit that owns resources and outputs.

use super::construct::{Construct, Node};
use super::hasher;
use super::types::{CfnExport, CfnOutput, CfnResource, Environment};
use indexmap::IndexMap;

/// Optional stack-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackProps {
    /// Target environment, passed through unmodified
    pub env: Option<Environment>,

    /// Deployed stack name (defaults to the construct id)
    pub stack_name: Option<String>,

    pub description: Option<String>,

    pub tags: IndexMap<String, String>,

    pub termination_protection: bool,

    /// Export well-known attributes for cross-stack import
    pub export_outputs: bool,
}

/// A deployable unit: one CloudFormation template.
#[derive(Debug, Clone)]
pub struct Stack {
    node: Node,
    stack_name: String,
    env: Environment,
    description: Option<String>,
    tags: IndexMap<String, String>,
    termination_protection: bool,
    export_outputs: bool,
    resources: IndexMap<String, CfnResource>,
    outputs: IndexMap<String, CfnOutput>,
}

impl Stack {
    /// Declare a stack under `scope`. Pure construction; never fails.
    pub fn new<S: Construct + ?Sized>(scope: &S, id: &str, props: StackProps) -> Self {
        let node = scope.node().child(id);
        let stack_name = props.stack_name.unwrap_or_else(|| id.to_string());
        Self {
            node,
            stack_name,
            env: props.env.unwrap_or_default(),
            description: props.description,
            tags: props.tags,
            termination_protection: props.termination_protection,
            export_outputs: props.export_outputs,
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.tags
    }

    pub fn termination_protection(&self) -> bool {
        self.termination_protection
    }

    pub fn export_outputs(&self) -> bool {
        self.export_outputs
    }

    /// Artifact id in the cloud assembly (the construct path).
    pub fn artifact_id(&self) -> String {
        self.node.path().replace(super::construct::PATH_SEP, "-")
    }

    pub fn resources(&self) -> &IndexMap<String, CfnResource> {
        &self.resources
    }

    pub fn outputs(&self) -> &IndexMap<String, CfnOutput> {
        &self.outputs
    }

    /// Deterministic logical id for a construct inside this stack.
    ///
    /// Alphanumeric characters of the stack-relative path, followed by an
    /// 8-character digest of the full relative path so that ids stay unique
    /// even when sanitizing collapses two paths.
    pub fn allocate_logical_id(&self, node: &Node) -> String {
        let stack_depth = self.node.components().len();
        let relative: Vec<&str> = node
            .components()
            .into_iter()
            .skip(stack_depth)
            .collect();
        let human: String = relative
            .iter()
            .flat_map(|c| c.chars())
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        format!("{}{}", human, hasher::path_digest(&relative))
    }

    /// Add a rendered resource. A later resource with the same logical id
    /// replaces the earlier one.
    pub fn add_resource(&mut self, logical_id: String, resource: CfnResource) {
        tracing::debug!(
            stack = %self.stack_name,
            logical_id = %logical_id,
            resource_type = %resource.resource_type,
            "added resource"
        );
        self.resources.insert(logical_id, resource);
    }

    pub fn add_output(&mut self, output_id: &str, output: CfnOutput) {
        self.outputs.insert(output_id.to_string(), output);
    }

    /// Export `value` as `<stack-name>:<output_id>` and return the token a
    /// consuming stack uses to import it.
    pub fn export_value(
        &mut self,
        output_id: &str,
        value: serde_json::Value,
        description: Option<&str>,
    ) -> serde_json::Value {
        let export_name = format!("{}:{}", self.stack_name, output_id);
        self.add_output(
            output_id,
            CfnOutput {
                value,
                description: description.map(str::to_string),
                export: Some(CfnExport {
                    name: export_name.clone(),
                }),
            },
        );
        serde_json::json!({ "Fn::ImportValue": export_name })
    }
}

impl Construct for Stack {
    fn node(&self) -> &Node {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::construct::App;

    #[test]
    fn test_stack_name_defaults_to_id() {
        let app = App::new();
        let stack = Stack::new(&app, "Dev", StackProps::default());
        assert_eq!(stack.stack_name(), "Dev");
        assert_eq!(stack.node().path(), "Dev");
        assert!(stack.env().is_agnostic());
    }

    #[test]
    fn test_explicit_stack_name() {
        let app = App::new();
        let props = StackProps {
            stack_name: Some("users-dev".to_string()),
            ..Default::default()
        };
        let stack = Stack::new(&app, "Dev", props);
        assert_eq!(stack.stack_name(), "users-dev");
        assert_eq!(stack.artifact_id(), "Dev");
    }

    #[test]
    fn test_env_passed_through_unmodified() {
        let app = App::new();
        let env = Environment {
            account: None,
            region: Some("ap-south-1".to_string()),
        };
        let props = StackProps {
            env: Some(env.clone()),
            ..Default::default()
        };
        let stack = Stack::new(&app, "Dev", props);
        assert_eq!(stack.env(), &env);
    }

    #[test]
    fn test_logical_id_is_stable_and_relative() {
        let app = App::new();
        let dev = Stack::new(&app, "Dev", StackProps::default());
        let prod = Stack::new(&app, "Prod", StackProps::default());
        let dev_id = dev.allocate_logical_id(&dev.node().child("UsersTable"));
        let prod_id = prod.allocate_logical_id(&prod.node().child("UsersTable"));
        assert!(dev_id.starts_with("UsersTable"));
        assert_eq!(dev_id.len(), "UsersTable".len() + 8);
        // Same relative path in different stacks yields the same id.
        assert_eq!(dev_id, prod_id);
    }

    #[test]
    fn test_logical_id_strips_non_alphanumeric() {
        let app = App::new();
        let stack = Stack::new(&app, "Dev", StackProps::default());
        let id = stack.allocate_logical_id(&stack.node().child("users-table_v2"));
        assert!(id.starts_with("userstablev2"));
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_export_value() {
        let app = App::new();
        let mut stack = Stack::new(&app, "Dev", StackProps::default());
        let token = stack.export_value("TableName", serde_json::json!("t"), None);
        assert_eq!(token, serde_json::json!({"Fn::ImportValue": "Dev:TableName"}));
        let out = &stack.outputs()["TableName"];
        assert_eq!(out.export.as_ref().unwrap().name, "Dev:TableName");
    }
}
