//! Plan generation: diff a fresh synthesis against the previous assembly.

use super::hasher;
use super::synth::CloudAssembly;
use super::types::*;
use crate::error::Result;
use crate::resources::table::TABLE_RESOURCE_TYPE;
use std::collections::{HashMap, HashSet};

/// Properties whose change forces the provider to replace the resource.
fn replacement_properties(resource_type: &str) -> &'static [&'static str] {
    match resource_type {
        TABLE_RESOURCE_TYPE => &["TableName", "KeySchema"],
        _ => &[],
    }
}

/// Deployed identity of a stack: environment URI and stack name.
type StackKey<'a> = (&'a str, &'a str);

fn stack_key<'a>(assembly: &'a CloudAssembly, artifact_id: &str) -> Option<StackKey<'a>> {
    assembly
        .manifest
        .artifacts
        .get(artifact_id)
        .map(|a| (a.environment.as_str(), a.properties.stack_name.as_str()))
}

/// Generate a plan by comparing each synthesized template to the previous
/// template deployed under the same environment and stack name.
///
/// A renamed stack is a new deployment: its resources are created and the
/// stack it used to be is destroyed.
pub fn plan(assembly: &CloudAssembly, previous: Option<&CloudAssembly>) -> Result<DiffPlan> {
    let mut diff = DiffPlan::default();

    let mut deployed: HashMap<StackKey<'_>, &Template> = HashMap::new();
    if let Some(prev) = previous {
        for (artifact_id, template) in &prev.templates {
            if let Some(key) = stack_key(prev, artifact_id) {
                deployed.insert(key, template);
            }
        }
    }

    let mut matched: HashSet<StackKey<'_>> = HashSet::new();
    for (artifact_id, template) in &assembly.templates {
        let Some(key) = stack_key(assembly, artifact_id) else {
            continue;
        };
        let old = deployed.get(&key).copied();
        if old.is_some() {
            matched.insert(key);
        }

        for (logical_id, resource) in &template.resources {
            let action = match old.and_then(|t| t.resources.get(logical_id)) {
                None => PlanAction::Create,
                Some(old_resource) => determine_action(old_resource, resource)?,
            };
            record(&mut diff, key, logical_id, resource, action);
        }

        if let Some(old) = old {
            for (logical_id, old_resource) in &old.resources {
                if !template.resources.contains_key(logical_id) {
                    record(&mut diff, key, logical_id, old_resource, PlanAction::Destroy);
                }
            }
        }
    }

    // Deployed stacks with no counterpart, in previous manifest order
    if let Some(prev) = previous {
        for artifact_id in prev.templates.keys() {
            let Some(key) = stack_key(prev, artifact_id) else {
                continue;
            };
            if matched.contains(&key) {
                continue;
            }
            for (logical_id, old_resource) in &deployed[&key].resources {
                record(&mut diff, key, logical_id, old_resource, PlanAction::Destroy);
            }
            matched.insert(key);
        }
    }

    tracing::debug!(
        create = diff.to_create,
        update = diff.to_update,
        replace = diff.to_replace,
        destroy = diff.to_destroy,
        unchanged = diff.unchanged,
        "computed plan"
    );
    Ok(diff)
}

fn record(
    diff: &mut DiffPlan,
    (environment, stack): StackKey<'_>,
    logical_id: &str,
    resource: &CfnResource,
    action: PlanAction,
) {
    match action {
        PlanAction::Create => diff.to_create += 1,
        PlanAction::Update => diff.to_update += 1,
        PlanAction::Replace => diff.to_replace += 1,
        PlanAction::Destroy => diff.to_destroy += 1,
        PlanAction::NoOp => diff.unchanged += 1,
    }
    diff.changes.push(PlannedChange {
        stack: stack.to_string(),
        environment: environment.to_string(),
        logical_id: logical_id.to_string(),
        resource_type: resource.resource_type.clone(),
        action,
        description: describe_action(logical_id, resource, action),
    });
}

/// Decide what the provider does to move `old` to `new`.
fn determine_action(old: &CfnResource, new: &CfnResource) -> Result<PlanAction> {
    if hasher::hash_json(old)? == hasher::hash_json(new)? {
        return Ok(PlanAction::NoOp);
    }
    if old.resource_type != new.resource_type {
        return Ok(PlanAction::Replace);
    }
    for prop in replacement_properties(&new.resource_type) {
        if old.properties.get(*prop) != new.properties.get(*prop) {
            return Ok(PlanAction::Replace);
        }
    }
    Ok(PlanAction::Update)
}

/// Generate a human-readable description of a planned action.
fn describe_action(logical_id: &str, resource: &CfnResource, action: PlanAction) -> String {
    let label = resource
        .properties
        .get("TableName")
        .and_then(|v| v.as_str())
        .map(|name| format!("{} ({})", logical_id, name))
        .unwrap_or_else(|| logical_id.to_string());

    match action {
        PlanAction::Create => format!("{}: create {}", label, resource.resource_type),
        PlanAction::Update => format!("{}: update in place", label),
        PlanAction::Replace => format!("{}: replace (new physical resource)", label),
        PlanAction::Destroy => match resource.deletion_policy {
            Some(DeletionPolicy::Retain) => format!("{}: remove from stack (retained)", label),
            Some(DeletionPolicy::Snapshot) => {
                format!("{}: destroy (snapshot taken first)", label)
            }
            _ => format!("{}: destroy (ALL DATA WILL BE LOST)", label),
        },
        PlanAction::NoOp => format!("{}: no changes", label),
    }
}
