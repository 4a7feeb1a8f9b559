//! DynamoDB table resource: descriptor, CloudFormation rendering, and the
//! handle other stacks consume.

use super::grant::{PolicyStatement, TABLE_READ_ACTIONS, TABLE_WRITE_ACTIONS};
use crate::core::construct::{Construct, Node};
use crate::core::stack::Stack;
use crate::core::types::{CfnResource, DeletionPolicy};
use crate::error::ValidationError;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::json;
use std::fmt;
use std::sync::LazyLock;

pub const TABLE_RESOURCE_TYPE: &str = "AWS::DynamoDB::Table";

/// Read/write capacity used when a table is provisioned without explicit units.
pub const DEFAULT_CAPACITY: u32 = 5;

/// Metadata key recording the construct path of a rendered resource.
pub const PATH_METADATA_KEY: &str = "aws:cdk:path";

static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,255}$").expect("static regex"));

/// Scalar types allowed for key attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl Attribute {
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: AttributeType::String,
        }
    }

    pub fn number(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: AttributeType::Number,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.attribute_type)
    }
}

/// Capacity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    /// On-demand: billed per request, no throughput to manage
    PayPerRequest,
    Provisioned {
        read_capacity: u32,
        write_capacity: u32,
    },
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PayPerRequest => "PAY_PER_REQUEST",
            Self::Provisioned { .. } => "PROVISIONED",
        }
    }

    pub fn is_on_demand(&self) -> bool {
        matches!(self, Self::PayPerRequest)
    }
}

/// What happens to the table when it is removed from its stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Delete the table and its data
    Destroy,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    pub fn deletion_policy(&self) -> DeletionPolicy {
        match self {
            Self::Destroy => DeletionPolicy::Delete,
            Self::Retain => DeletionPolicy::Retain,
            Self::Snapshot => DeletionPolicy::Snapshot,
        }
    }
}

/// Fully-resolved table declaration. Nothing in it depends on runtime data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table_name: Option<String>,
    pub partition_key: Attribute,
    pub sort_key: Option<Attribute>,
    pub billing_mode: BillingMode,
    pub removal_policy: RemovalPolicy,
}

impl TableDescriptor {
    /// Provider defaults: provisioned 5/5, retained on removal, generated name.
    pub fn new(partition_key: Attribute) -> Self {
        Self {
            table_name: None,
            partition_key,
            sort_key: None,
            billing_mode: BillingMode::Provisioned {
                read_capacity: DEFAULT_CAPACITY,
                write_capacity: DEFAULT_CAPACITY,
            },
            removal_policy: RemovalPolicy::Retain,
        }
    }

    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table_name = Some(name.to_string());
        self
    }

    pub fn with_sort_key(mut self, key: Attribute) -> Self {
        self.sort_key = Some(key);
        self
    }

    pub fn with_billing_mode(mut self, mode: BillingMode) -> Self {
        self.billing_mode = mode;
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    /// Render as a CloudFormation resource.
    pub fn to_cfn(&self, construct_path: &str) -> CfnResource {
        let mut key_schema = vec![json!({
            "AttributeName": self.partition_key.name,
            "KeyType": "HASH",
        })];
        let mut attribute_definitions = vec![json!({
            "AttributeName": self.partition_key.name,
            "AttributeType": self.partition_key.attribute_type.as_str(),
        })];
        if let Some(ref sk) = self.sort_key {
            key_schema.push(json!({ "AttributeName": sk.name, "KeyType": "RANGE" }));
            attribute_definitions.push(json!({
                "AttributeName": sk.name,
                "AttributeType": sk.attribute_type.as_str(),
            }));
        }

        let mut properties = IndexMap::new();
        properties.insert("KeySchema".to_string(), json!(key_schema));
        properties.insert(
            "AttributeDefinitions".to_string(),
            json!(attribute_definitions),
        );
        properties.insert(
            "BillingMode".to_string(),
            json!(self.billing_mode.as_str()),
        );
        if let BillingMode::Provisioned {
            read_capacity,
            write_capacity,
        } = self.billing_mode
        {
            properties.insert(
                "ProvisionedThroughput".to_string(),
                json!({
                    "ReadCapacityUnits": read_capacity,
                    "WriteCapacityUnits": write_capacity,
                }),
            );
        }
        if let Some(ref name) = self.table_name {
            properties.insert("TableName".to_string(), json!(name));
        }

        let mut metadata = IndexMap::new();
        metadata.insert(
            PATH_METADATA_KEY.to_string(),
            json!(format!("{}/Resource", construct_path)),
        );

        let policy = self.removal_policy.deletion_policy();
        CfnResource {
            resource_type: TABLE_RESOURCE_TYPE.to_string(),
            properties,
            update_replace_policy: Some(policy),
            deletion_policy: Some(policy),
            metadata,
        }
    }
}

/// Declare a table inside `stack` and return its handle.
pub fn define(stack: &mut Stack, id: &str, descriptor: TableDescriptor) -> TableHandle {
    let node = stack.node().child(id);
    let logical_id = stack.allocate_logical_id(&node);
    stack.add_resource(logical_id.clone(), descriptor.to_cfn(node.path()));
    TableHandle {
        node,
        logical_id,
        stack_name: stack.stack_name().to_string(),
        descriptor,
    }
}

/// Check a rendered table resource for problems the provider would reject.
pub fn validate_rendered(logical_id: &str, resource: &CfnResource) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(name) = resource.properties.get("TableName") {
        match name.as_str() {
            Some(n) if TABLE_NAME_RE.is_match(n) => {}
            Some(n) => errors.push(ValidationError::new(format!(
                "table '{}' has invalid name '{}' (3-255 chars of A-Z a-z 0-9 _ . -)",
                logical_id, n
            ))),
            None => errors.push(ValidationError::new(format!(
                "table '{}' has a non-string TableName",
                logical_id
            ))),
        }
    }

    let key_names: Vec<&str> = resource
        .properties
        .get("KeySchema")
        .and_then(|v| v.as_array())
        .map(|keys| {
            keys.iter()
                .filter_map(|k| k.get("AttributeName").and_then(|n| n.as_str()))
                .collect()
        })
        .unwrap_or_default();
    if key_names.is_empty() {
        errors.push(ValidationError::new(format!(
            "table '{}' has no partition key",
            logical_id
        )));
    }
    if key_names.len() == 2 && key_names[0] == key_names[1] {
        errors.push(ValidationError::new(format!(
            "table '{}' uses '{}' as both partition and sort key",
            logical_id, key_names[0]
        )));
    }
    if key_names.iter().any(|n| n.is_empty()) {
        errors.push(ValidationError::new(format!(
            "table '{}' has an empty key attribute name",
            logical_id
        )));
    }

    if let Some(throughput) = resource.properties.get("ProvisionedThroughput") {
        for field in ["ReadCapacityUnits", "WriteCapacityUnits"] {
            if throughput.get(field).and_then(|v| v.as_u64()) == Some(0) {
                errors.push(ValidationError::new(format!(
                    "table '{}' has zero {}",
                    logical_id, field
                )));
            }
        }
    }

    errors
}

/// Reference to a declared table, for consumers in the same deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    node: Node,
    logical_id: String,
    stack_name: String,
    descriptor: TableDescriptor,
}

impl TableHandle {
    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Physical table name, when one was declared.
    pub fn table_name(&self) -> Option<&str> {
        self.descriptor.table_name.as_deref()
    }

    /// The literal name when known, otherwise a `Ref` to the resource.
    pub fn table_name_token(&self) -> serde_json::Value {
        match self.table_name() {
            Some(name) => json!(name),
            None => json!({ "Ref": self.logical_id }),
        }
    }

    pub fn table_arn_token(&self) -> serde_json::Value {
        json!({ "Fn::GetAtt": [self.logical_id, "Arn"] })
    }

    pub fn grant_read_data(&self) -> PolicyStatement {
        PolicyStatement::allow(&[TABLE_READ_ACTIONS], vec![self.table_arn_token()])
    }

    pub fn grant_read_write_data(&self) -> PolicyStatement {
        PolicyStatement::allow(
            &[TABLE_READ_ACTIONS, TABLE_WRITE_ACTIONS],
            vec![self.table_arn_token()],
        )
    }
}

impl Construct for TableHandle {
    fn node(&self) -> &Node {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::construct::App;
    use crate::core::stack::StackProps;

    fn make_stack() -> Stack {
        Stack::new(&App::new(), "Dev", StackProps::default())
    }

    #[test]
    fn test_descriptor_defaults() {
        let d = TableDescriptor::new(Attribute::string("pk"));
        assert_eq!(
            d.billing_mode,
            BillingMode::Provisioned {
                read_capacity: 5,
                write_capacity: 5
            }
        );
        assert_eq!(d.removal_policy, RemovalPolicy::Retain);
        assert!(d.table_name.is_none());
        assert!(d.sort_key.is_none());
    }

    #[test]
    fn test_render_on_demand() {
        let d = TableDescriptor::new(Attribute::string("id"))
            .with_table_name("t-1")
            .with_billing_mode(BillingMode::PayPerRequest)
            .with_removal_policy(RemovalPolicy::Destroy);
        let r = d.to_cfn("Dev/Table");
        assert_eq!(r.resource_type, TABLE_RESOURCE_TYPE);
        assert_eq!(r.properties["BillingMode"], "PAY_PER_REQUEST");
        assert!(!r.properties.contains_key("ProvisionedThroughput"));
        assert_eq!(r.properties["TableName"], "t-1");
        assert_eq!(
            r.properties["KeySchema"],
            json!([{"AttributeName": "id", "KeyType": "HASH"}])
        );
        assert_eq!(
            r.properties["AttributeDefinitions"],
            json!([{"AttributeName": "id", "AttributeType": "S"}])
        );
        assert_eq!(r.deletion_policy, Some(DeletionPolicy::Delete));
        assert_eq!(r.update_replace_policy, Some(DeletionPolicy::Delete));
        assert_eq!(r.metadata[PATH_METADATA_KEY], "Dev/Table/Resource");
    }

    #[test]
    fn test_render_provisioned_with_sort_key() {
        let d = TableDescriptor::new(Attribute::string("pk")).with_sort_key(Attribute::number("ts"));
        let r = d.to_cfn("Dev/Events");
        assert_eq!(r.properties["BillingMode"], "PROVISIONED");
        assert_eq!(
            r.properties["ProvisionedThroughput"]["ReadCapacityUnits"],
            5
        );
        let keys = r.properties["KeySchema"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1]["KeyType"], "RANGE");
        assert_eq!(r.properties["AttributeDefinitions"][1]["AttributeType"], "N");
        assert!(!r.properties.contains_key("TableName"));
        assert_eq!(r.deletion_policy, Some(DeletionPolicy::Retain));
    }

    #[test]
    fn test_define_registers_one_resource() {
        let mut stack = make_stack();
        let handle = define(
            &mut stack,
            "Table",
            TableDescriptor::new(Attribute::string("id")),
        );
        assert_eq!(stack.resources().len(), 1);
        assert!(stack.resources().contains_key(handle.logical_id()));
        assert_eq!(handle.stack_name(), "Dev");
        assert_eq!(handle.node().path(), "Dev/Table");
    }

    #[test]
    fn test_name_token_falls_back_to_ref() {
        let mut stack = make_stack();
        let handle = define(
            &mut stack,
            "Table",
            TableDescriptor::new(Attribute::string("id")),
        );
        assert_eq!(
            handle.table_name_token(),
            json!({"Ref": handle.logical_id()})
        );
        let named = define(
            &mut stack,
            "Named",
            TableDescriptor::new(Attribute::string("id")).with_table_name("named"),
        );
        assert_eq!(named.table_name_token(), json!("named"));
    }

    #[test]
    fn test_grants_target_table_arn() {
        let mut stack = make_stack();
        let handle = define(
            &mut stack,
            "Table",
            TableDescriptor::new(Attribute::string("id")),
        );
        let read = handle.grant_read_data();
        assert!(read.actions.iter().all(|a| a != "dynamodb:PutItem"));
        assert_eq!(read.resources, vec![handle.table_arn_token()]);
        let rw = handle.grant_read_write_data();
        assert!(rw.actions.iter().any(|a| a == "dynamodb:PutItem"));
        assert!(rw.actions.iter().any(|a| a == "dynamodb:Query"));
    }

    #[test]
    fn test_validate_rendered_ok() {
        let r = TableDescriptor::new(Attribute::string("id"))
            .with_table_name("Dev-users-table")
            .to_cfn("Dev/T");
        assert!(validate_rendered("T", &r).is_empty());
    }

    #[test]
    fn test_validate_rendered_bad_name() {
        let r = TableDescriptor::new(Attribute::string("id"))
            .with_table_name("a b")
            .to_cfn("Dev/T");
        let errors = validate_rendered("T", &r);
        assert!(errors.iter().any(|e| e.message.contains("invalid name")));
    }

    #[test]
    fn test_validate_rendered_short_name() {
        let r = TableDescriptor::new(Attribute::string("id"))
            .with_table_name("ab")
            .to_cfn("Dev/T");
        assert_eq!(validate_rendered("T", &r).len(), 1);
    }

    #[test]
    fn test_validate_rendered_same_key_twice() {
        let r = TableDescriptor::new(Attribute::string("id"))
            .with_sort_key(Attribute::string("id"))
            .to_cfn("Dev/T");
        let errors = validate_rendered("T", &r);
        assert!(errors.iter().any(|e| e.message.contains("both partition and sort")));
    }

    #[test]
    fn test_validate_rendered_zero_capacity() {
        let r = TableDescriptor::new(Attribute::string("id"))
            .with_billing_mode(BillingMode::Provisioned {
                read_capacity: 0,
                write_capacity: 1,
            })
            .to_cfn("Dev/T");
        let errors = validate_rendered("T", &r);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("ReadCapacityUnits"));
    }

    #[test]
    fn test_attribute_display() {
        assert_eq!(Attribute::string("id").to_string(), "id: string");
    }
}
