// ABOUTME: Environment variable value types with interpolation support.
// ABOUTME: Expands ${VAR} references and fails fast on unresolved placeholders.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// Resolve this value against the process environment.
    ///
    /// Literals are expanded (`${VAR}`, `$VAR`, leading `~`); a literal that
    /// still has the `${...}` shape after expansion is a hard error so the
    /// problem surfaces before any remote command runs.
    pub fn resolve(&self, key: &str) -> Result<String> {
        match self {
            EnvValue::Literal(s) => {
                let expanded = expand(s);
                if is_unresolved(&expanded) {
                    return Err(Error::UnresolvedEnvVar {
                        key: key.to_string(),
                        value: s.clone(),
                    });
                }
                Ok(expanded)
            }
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

/// Resolve a whole env map, failing on the first unresolvable value.
pub fn resolve_env_map(map: &BTreeMap<String, EnvValue>) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve(k).map(|resolved| (k.clone(), resolved)))
        .collect()
}

/// Expand `${VAR}`, `$VAR` and a leading `~` against the process environment.
/// Unknown variables are left in place.
pub fn expand(value: &str) -> String {
    let value = expand_tilde(value);

    let mut out = String::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < value.len() {
        if bytes[i] == b'$' && i + 1 < value.len() {
            if bytes[i + 1] == b'{' {
                if let Some(end) = value[i + 2..].find('}') {
                    let name = &value[i + 2..i + 2 + end];
                    match std::env::var(name) {
                        Ok(v) => out.push_str(&v),
                        Err(_) => out.push_str(&value[i..i + 3 + end]),
                    }
                    i += 3 + end;
                    continue;
                }
            } else {
                let rest = &value[i + 1..];
                let name_len = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .count();
                if name_len > 0 {
                    let name = &rest[..name_len];
                    match std::env::var(name) {
                        Ok(v) => out.push_str(&v),
                        Err(_) => {
                            out.push('$');
                            out.push_str(name);
                        }
                    }
                    i += 1 + name_len;
                    continue;
                }
            }
        }
        let c = value[i..].chars().next().unwrap_or('\0');
        out.push(c);
        i += c.len_utf8();
    }
    out
}

fn expand_tilde(value: &str) -> String {
    if let Some(rest) = value.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Ok(home) = std::env::var("HOME") {
                return format!("{home}{rest}");
            }
        }
    }
    value.to_string()
}

/// Whether an expanded value still has the unresolved-placeholder shape.
pub fn is_unresolved(value: &str) -> bool {
    value.starts_with("${") && value.ends_with('}')
}
