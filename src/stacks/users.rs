//! The users-table stack: one on-demand table keyed by `id`, deleted with
//! its stack.

use crate::core::construct::{Construct, Node};
use crate::core::stack::{Stack, StackProps};
use crate::resources::table::{
    self, Attribute, BillingMode, RemovalPolicy, TableDescriptor, TableHandle,
};

/// Construct id of the table inside the stack.
pub const USERS_TABLE_ID: &str = "UsersTable";

/// Suffix appended to the stack name to form the table name.
pub const USERS_TABLE_SUFFIX: &str = "-users-table";

/// Partition key attribute of the users table.
pub const PARTITION_KEY: &str = "id";

/// Physical table name for a stack.
pub fn users_table_name(stack_name: &str) -> String {
    format!("{}{}", stack_name, USERS_TABLE_SUFFIX)
}

/// The fixed descriptor of the users table.
pub fn users_table_descriptor(stack_name: &str) -> TableDescriptor {
    TableDescriptor::new(Attribute::string(PARTITION_KEY))
        .with_table_name(&users_table_name(stack_name))
        .with_billing_mode(BillingMode::PayPerRequest)
        .with_removal_policy(RemovalPolicy::Destroy)
}

/// A stack declaring exactly one users table.
#[derive(Debug, Clone)]
pub struct UsersTableStack {
    stack: Stack,

    /// Handle for consumers that need the table's identity.
    pub users_table: TableHandle,
}

impl UsersTableStack {
    /// Declare the stack under `scope`. Pure construction; never fails.
    pub fn new<S: Construct + ?Sized>(scope: &S, id: &str, props: StackProps) -> Self {
        let mut stack = Stack::new(scope, id, props);
        let descriptor = users_table_descriptor(stack.stack_name());
        let users_table = table::define(&mut stack, USERS_TABLE_ID, descriptor);

        if stack.export_outputs() {
            stack.export_value(
                "UsersTableName",
                users_table.table_name_token(),
                Some("Name of the users table"),
            );
            stack.export_value(
                "UsersTableArn",
                users_table.table_arn_token(),
                Some("ARN of the users table"),
            );
        }

        Self { stack, users_table }
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }
}

impl Construct for UsersTableStack {
    fn node(&self) -> &Node {
        self.stack.node()
    }
}

impl From<UsersTableStack> for Stack {
    fn from(s: UsersTableStack) -> Self {
        s.stack
    }
}
