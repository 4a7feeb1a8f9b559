//! Template resolution for config values.
//!
//! Resolves `{{params.key}}` from the config's params and `{{env.NAME}}`
//! from the process environment.

use super::types::*;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Source of environment variables. Tests swap in a fixed map.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the real process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Resolve all template variables in a string.
pub fn resolve_template(
    template: &str,
    params: &HashMap<String, serde_yaml_ng::Value>,
    env: &dyn EnvSource,
) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..]
            .find("}}")
            .ok_or_else(|| Error::Template(format!("unclosed template at position {}", open)))?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim();

        let value = if let Some(param_key) = key.strip_prefix("params.") {
            params
                .get(param_key)
                .map(yaml_value_to_string)
                .ok_or_else(|| Error::Template(format!("unknown param: {}", param_key)))?
        } else if let Some(var) = key.strip_prefix("env.") {
            env.var(var)
                .ok_or_else(|| Error::Template(format!("environment variable {} is not set", var)))?
        } else {
            return Err(Error::Template(format!("unknown template variable: {}", key)));
        };

        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(result)
}

/// Resolve an optional field; an empty result counts as unset.
fn resolve_optional(
    value: &Option<String>,
    params: &HashMap<String, serde_yaml_ng::Value>,
    env: &dyn EnvSource,
) -> Result<Option<String>> {
    match value {
        Some(v) => {
            let resolved = resolve_template(v, params, env)?;
            Ok(if resolved.is_empty() { None } else { Some(resolved) })
        }
        None => Ok(None),
    }
}

/// Resolve all templates in a stack's string fields.
pub fn resolve_stack_templates(
    stack: &StackConfig,
    params: &HashMap<String, serde_yaml_ng::Value>,
    env: &dyn EnvSource,
) -> Result<StackConfig> {
    let mut resolved = stack.clone();

    resolved.stack_name = resolve_optional(&stack.stack_name, params, env)?;
    resolved.description = resolve_optional(&stack.description, params, env)?;
    if let Some(ref target) = stack.env {
        resolved.env = Some(Environment {
            account: resolve_optional(&target.account, params, env)?,
            region: resolve_optional(&target.region, params, env)?,
        });
    }
    for (key, value) in resolved.tags.iter_mut() {
        *value = resolve_template(value, params, env).map_err(|e| match e {
            Error::Template(msg) => Error::Template(format!("tag '{}': {}", key, msg)),
            other => other,
        })?;
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> HashMap<String, serde_yaml_ng::Value> {
        let mut p = HashMap::new();
        p.insert(
            "region".to_string(),
            serde_yaml_ng::Value::String("eu-west-1".to_string()),
        );
        p.insert(
            "shard".to_string(),
            serde_yaml_ng::Value::Number(serde_yaml_ng::Number::from(3)),
        );
        p
    }

    fn env() -> HashMap<String, String> {
        let mut e = HashMap::new();
        e.insert("CDK_DEFAULT_ACCOUNT".to_string(), "123456789012".to_string());
        e.insert("EMPTY".to_string(), String::new());
        e
    }

    #[test]
    fn test_resolve_params() {
        let out = resolve_template("{{params.region}}-{{ params.shard }}", &params(), &env()).unwrap();
        assert_eq!(out, "eu-west-1-3");
    }

    #[test]
    fn test_resolve_env() {
        let out = resolve_template("acct {{env.CDK_DEFAULT_ACCOUNT}}", &params(), &env()).unwrap();
        assert_eq!(out, "acct 123456789012");
    }

    #[test]
    fn test_no_templates() {
        assert_eq!(resolve_template("plain", &params(), &env()).unwrap(), "plain");
    }

    #[test]
    fn test_unknown_param() {
        let err = resolve_template("{{params.nope}}", &params(), &env()).unwrap_err();
        assert!(err.to_string().contains("unknown param"));
    }

    #[test]
    fn test_missing_env_var() {
        let err = resolve_template("{{env.NOT_SET_ANYWHERE}}", &params(), &env()).unwrap_err();
        assert!(err.to_string().contains("NOT_SET_ANYWHERE"));
    }

    #[test]
    fn test_unclosed_template() {
        assert!(resolve_template("{{params.region", &params(), &env()).is_err());
    }

    #[test]
    fn test_unknown_namespace() {
        let err = resolve_template("{{machine.x}}", &params(), &env()).unwrap_err();
        assert!(err.to_string().contains("unknown template variable"));
    }

    #[test]
    fn test_resolve_stack_env() {
        let stack = StackConfig {
            env: Some(Environment {
                account: Some("{{env.CDK_DEFAULT_ACCOUNT}}".to_string()),
                region: Some("{{params.region}}".to_string()),
            }),
            ..Default::default()
        };
        let resolved = resolve_stack_templates(&stack, &params(), &env()).unwrap();
        assert_eq!(
            resolved.env,
            Some(Environment::new("123456789012", "eu-west-1"))
        );
    }

    #[test]
    fn test_empty_resolution_is_unset() {
        let stack = StackConfig {
            env: Some(Environment {
                account: Some("{{env.EMPTY}}".to_string()),
                region: None,
            }),
            ..Default::default()
        };
        let resolved = resolve_stack_templates(&stack, &params(), &env()).unwrap();
        assert!(resolved.env.unwrap().is_agnostic());
    }

    #[test]
    fn test_resolve_tags() {
        let mut stack = StackConfig::default();
        stack
            .tags
            .insert("region".to_string(), "{{params.region}}".to_string());
        let resolved = resolve_stack_templates(&stack, &params(), &env()).unwrap();
        assert_eq!(resolved.tags["region"], "eu-west-1");
    }

    #[test]
    fn test_tag_error_names_tag_once() {
        let mut stack = StackConfig::default();
        stack
            .tags
            .insert("owner".to_string(), "{{params.nope}}".to_string());
        let err = resolve_stack_templates(&stack, &params(), &env()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "template error: tag 'owner': unknown param: nope"
        );
    }
}
