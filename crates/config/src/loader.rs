use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;
use serde_dynamic_string::DynamicString;
use toml::Value;

use crate::{ConfigError, GatewayConfig};

pub fn load<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, ConfigError> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    load_str(&content)
}

pub fn load_str(content: &str) -> Result<GatewayConfig, ConfigError> {
    let mut raw: Value = toml::from_str(content)?;
    expand_dynamic_strings(&mut Vec::new(), &mut raw)?;

    let config = GatewayConfig::deserialize(raw).map_err(ConfigError::Parse)?;
    validate(&config)?;

    Ok(config)
}

fn expand_dynamic_strings<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> Result<(), ConfigError> {
    match value {
        Value::String(s) => {
            *s = DynamicString::expand_with(s, |var| std::env::var(var).ok()).map_err(|source| ConfigError::DynamicString {
                path: render_path(path),
                source,
            })?;
        }
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

fn render_path(path: &[Result<&str, usize>]) -> String {
    let mut out = String::new();

    for segment in path {
        match segment {
            Ok(s) => {
                out.push_str(s);
                out.push('.');
            }
            Err(i) => {
                let _ = write!(out, "[{i}]");
            }
        }
    }

    if out.ends_with('.') {
        out.pop();
    }

    out
}

fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.adapters.is_empty() {
        return Err(ConfigError::Invalid(
            "no adapters configured; the gateway requires at least one [adapters.<name>] entry".to_string(),
        ));
    }

    for name in config.routes.routes.values().flatten().chain(config.routes.default.iter()) {
        if !config.adapters.contains_key(name) {
            return Err(ConfigError::Invalid(format!(
                "route references unknown adapter '{name}'"
            )));
        }
    }

    if let Some(name) = &config.router.judge.adapter
        && !config.adapters.contains_key(name)
    {
        return Err(ConfigError::Invalid(format!("judge adapter '{name}' is not configured")));
    }

    if config.router.parallel_candidates == 0 {
        return Err(ConfigError::Invalid("router.parallel_candidates must be at least 1".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_env_vars_in_adapter_config() {
        temp_env::with_var("TEST_OPENAI_KEY", Some("sk-test-123"), || {
            let config = load_str(indoc::indoc! {r#"
                [adapters.openai]
                type = "openai"
                api_key = "{{ env.TEST_OPENAI_KEY }}"

                [routes]
                default = ["openai"]
            "#})
            .unwrap();

            assert_eq!(config.adapters.len(), 1);
        });
    }

    #[test]
    fn rejects_empty_adapter_set() {
        let err = load_str("").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_route_to_unknown_adapter() {
        let err = load_str(indoc::indoc! {r#"
            [adapters.openai]
            type = "openai"

            [routes.routes]
            "gpt-4*" = ["missing-adapter"]
        "#})
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_env_var_is_reported_with_path() {
        let err = load_str(indoc::indoc! {r#"
            [adapters.openai]
            type = "openai"
            api_key = "{{ env.DEFINITELY_NOT_SET_XYZ }}"
        "#})
        .unwrap_err();

        assert!(matches!(err, ConfigError::DynamicString { .. }));
    }
}
