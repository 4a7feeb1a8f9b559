//! IAM policy statements handed out by resource grants.

use serde::{Deserialize, Serialize};

/// Actions needed to read items from a table.
pub const TABLE_READ_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
];

/// Actions needed to write items to a table.
pub const TABLE_WRITE_ACTIONS: &[&str] = &[
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// One IAM statement in policy-document JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    #[serde(rename = "Resource")]
    pub resources: Vec<serde_json::Value>,
}

impl PolicyStatement {
    /// Allow `actions` (deduplicated, order kept) on `resources`.
    pub fn allow(actions: &[&[&str]], resources: Vec<serde_json::Value>) -> Self {
        let mut merged: Vec<String> = Vec::new();
        for action in actions.iter().flat_map(|set| set.iter()) {
            if !merged.iter().any(|a| a == action) {
                merged.push((*action).to_string());
            }
        }
        Self {
            effect: Effect::Allow,
            actions: merged,
            resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_deduplicates_actions() {
        let stmt = PolicyStatement::allow(
            &[TABLE_READ_ACTIONS, TABLE_WRITE_ACTIONS],
            vec![serde_json::json!("arn:aws:dynamodb:::table/t")],
        );
        let describe = stmt
            .actions
            .iter()
            .filter(|a| *a == "dynamodb:DescribeTable")
            .count();
        assert_eq!(describe, 1);
        assert_eq!(stmt.actions[0], "dynamodb:BatchGetItem");
        assert!(stmt.actions.iter().any(|a| a == "dynamodb:PutItem"));
    }

    #[test]
    fn test_statement_json_shape() {
        let stmt = PolicyStatement::allow(&[TABLE_READ_ACTIONS], vec![serde_json::json!("*")]);
        let json = serde_json::to_value(&stmt).unwrap();
        assert_eq!(json["Effect"], "Allow");
        assert!(json["Action"].is_array());
        assert_eq!(json["Resource"][0], "*");
    }
}
