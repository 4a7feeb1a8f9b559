//! Synthesis: validate the construct tree, render templates, and read or
//! write the cloud assembly directory.
//!
//! Layout of an assembly directory:
//! - `manifest.json`: one `aws:cloudformation:stack` artifact per stack
//! - `<artifact>.template.json`: the stack's CloudFormation template
//!
//! Files are written atomically (temp file + rename).

use super::construct::{App, Construct};
use super::stack::Stack;
use super::types::*;
use crate::error::{Error, Result, ValidationError};
use crate::resources::table;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const MANIFEST_FILE: &str = "manifest.json";

pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Maximum CloudFormation stack name length.
pub const MAX_STACK_NAME_LEN: usize = 128;

static STACK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("static regex"));

/// In-memory result of synthesizing an app.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    pub manifest: Manifest,
    /// Templates keyed by artifact id, in declaration order
    pub templates: IndexMap<String, Template>,
}

impl CloudAssembly {
    pub fn template(&self, artifact_id: &str) -> Option<&Template> {
        self.templates.get(artifact_id)
    }
}

/// Template file name for an artifact.
pub fn template_file_name(artifact_id: &str) -> String {
    format!("{}.template.json", artifact_id)
}

/// Render one stack as a CloudFormation template.
pub fn synth_stack(stack: &Stack) -> Template {
    Template {
        format_version: TEMPLATE_FORMAT_VERSION.to_string(),
        description: stack.description().map(str::to_string),
        resources: stack.resources().clone(),
        outputs: stack.outputs().clone(),
    }
}

/// Check the construct tree for problems the provider would reject.
pub fn validate_app(app: &App) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if app.stacks().is_empty() {
        errors.push(ValidationError::new("app declares no stacks"));
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut seen_artifacts: HashMap<String, &str> = HashMap::new();
    let mut seen_stack_names: HashMap<(&Environment, &str), &str> = HashMap::new();
    let mut seen_tables: HashMap<(&Environment, String), &str> = HashMap::new();

    for stack in app.stacks() {
        let id = stack.node().id();
        if !seen_ids.insert(id) {
            errors.push(ValidationError::new(format!(
                "duplicate stack id '{}' in app",
                id
            )));
        }

        if let Some(other) = seen_artifacts.insert(stack.artifact_id(), id) {
            if other != id {
                errors.push(ValidationError::new(format!(
                    "stacks '{}' and '{}' both synthesize to artifact '{}'",
                    other,
                    id,
                    stack.artifact_id()
                )));
            }
        }

        let name = stack.stack_name();
        if name.len() > MAX_STACK_NAME_LEN || !STACK_NAME_RE.is_match(name) {
            errors.push(ValidationError::new(format!(
                "stack '{}' has invalid name '{}' (letters, digits and '-', starting with a letter, at most {} chars)",
                id, name, MAX_STACK_NAME_LEN
            )));
        }
        if let Some(other) = seen_stack_names.insert((stack.env(), name), id) {
            errors.push(ValidationError::new(format!(
                "stacks '{}' and '{}' both deploy as '{}' in {}",
                other,
                id,
                name,
                stack.env()
            )));
        }

        for (logical_id, resource) in stack.resources() {
            if resource.resource_type != table::TABLE_RESOURCE_TYPE {
                continue;
            }
            errors.extend(table::validate_rendered(logical_id, resource));
            if let Some(table_name) = resource
                .properties
                .get("TableName")
                .and_then(|v| v.as_str())
            {
                let key = (stack.env(), table_name.to_string());
                if let Some(other) = seen_tables.insert(key, id) {
                    errors.push(ValidationError::new(format!(
                        "table '{}' is declared by both '{}' and '{}' in {}",
                        table_name,
                        other,
                        id,
                        stack.env()
                    )));
                }
            }
        }
    }

    errors
}

/// Validate and render every stack in the app.
pub fn synthesize(app: &App) -> Result<CloudAssembly> {
    let errors = validate_app(app);
    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let mut artifacts = IndexMap::new();
    let mut templates = IndexMap::new();
    for stack in app.stacks() {
        let artifact_id = stack.artifact_id();
        artifacts.insert(
            artifact_id.clone(),
            ArtifactManifest {
                artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                environment: stack.env().to_uri(),
                properties: StackArtifactProperties {
                    template_file: template_file_name(&artifact_id),
                    stack_name: stack.stack_name().to_string(),
                    tags: stack.tags().clone(),
                    termination_protection: stack.termination_protection(),
                },
            },
        );
        templates.insert(artifact_id.clone(), synth_stack(stack));
        tracing::debug!(
            artifact = %artifact_id,
            resources = stack.resources().len(),
            "synthesized stack"
        );
    }

    tracing::info!(stacks = templates.len(), "synthesis complete");
    Ok(CloudAssembly {
        manifest: Manifest {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        },
        templates,
    })
}

/// Pretty JSON rendering of a template.
pub fn to_json(template: &Template) -> Result<String> {
    Ok(serde_json::to_string_pretty(template)?)
}

/// YAML rendering of a template.
pub fn to_yaml(template: &Template) -> Result<String> {
    Ok(serde_yaml_ng::to_string(template)?)
}

/// Write the assembly to `outdir`, removing templates of stacks that are
/// no longer declared.
pub fn write_assembly(outdir: &Path, assembly: &CloudAssembly) -> Result<()> {
    std::fs::create_dir_all(outdir).map_err(|source| Error::Write {
        path: outdir.to_path_buf(),
        source,
    })?;

    for (artifact_id, template) in &assembly.templates {
        let path = outdir.join(template_file_name(artifact_id));
        write_atomic(&path, &to_json(template)?)?;
        tracing::debug!(path = %path.display(), "wrote template");
    }

    let manifest = serde_json::to_string_pretty(&assembly.manifest)?;
    write_atomic(&outdir.join(MANIFEST_FILE), &manifest)?;

    // Only once the new manifest is in place, so it never lists a missing file
    let keep: HashSet<String> = assembly
        .templates
        .keys()
        .map(|id| template_file_name(id))
        .collect();
    remove_stale_templates(outdir, &keep)?;
    tracing::info!(outdir = %outdir.display(), "wrote cloud assembly");
    Ok(())
}

fn remove_stale_templates(outdir: &Path, keep: &HashSet<String>) -> Result<()> {
    let entries = std::fs::read_dir(outdir).map_err(|source| Error::Read {
        path: outdir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| Error::Read {
            path: outdir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".template.json") && !keep.contains(&name) {
            let path = entry.path();
            std::fs::remove_file(&path).map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), "removed stale template");
        }
    }
    Ok(())
}

/// Atomic write: temp file + rename.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, contents).map_err(|source| Error::Write {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load the manifest of a previous synthesis. Returns None if absent.
pub fn load_manifest(outdir: &Path) -> Result<Option<Manifest>> {
    let path = outdir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|source| Error::Read {
        path: path.clone(),
        source,
    })?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Load one stack template. Returns None if absent.
pub fn load_template(outdir: &Path, artifact_id: &str) -> Result<Option<Template>> {
    let path = outdir.join(template_file_name(artifact_id));
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|source| Error::Read {
        path: path.clone(),
        source,
    })?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Load the previous assembly: the manifest and every template it lists.
/// Returns None if no manifest exists.
pub fn load_previous(outdir: &Path) -> Result<Option<CloudAssembly>> {
    let Some(manifest) = load_manifest(outdir)? else {
        return Ok(None);
    };
    let mut templates = IndexMap::new();
    for artifact_id in manifest.artifacts.keys() {
        if let Some(template) = load_template(outdir, artifact_id)? {
            templates.insert(artifact_id.clone(), template);
        }
    }
    tracing::debug!(templates = templates.len(), "loaded previous assembly");
    Ok(Some(CloudAssembly {
        manifest,
        templates,
    }))
}
