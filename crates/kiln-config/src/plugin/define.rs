use serde_json::Value;

use super::{Hook, Plugin, PluginError};
use crate::error::{ConfigError, Result};

const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "tsx"];

/// Replaces global identifiers with constant expressions in script modules.
///
/// Options map identifiers (dotted paths allowed, e.g. `import.meta.env.MODE`)
/// to replacements. String values are inserted verbatim; any other JSON
/// value is inserted as its JSON text.
#[derive(Debug, Clone, Default)]
pub struct DefinePlugin {
    replacements: Vec<(String, String)>,
}

impl DefinePlugin {
    pub fn new(replacements: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut replacements: Vec<_> = replacements.into_iter().collect();
        // Longest identifiers first so `a.b` is not shadowed by `a`.
        replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { replacements }
    }

    pub fn from_options(options: &Value) -> Result<Self> {
        let map = match options {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::InvalidPlugin {
                    name: "define".to_string(),
                    reason: format!("options must be a table, got {other}"),
                });
            }
        };

        let mut replacements = Vec::with_capacity(map.len());
        for (key, value) in map {
            if key.is_empty() || !key.split('.').all(is_identifier) {
                return Err(ConfigError::InvalidPlugin {
                    name: "define".to_string(),
                    reason: format!("'{key}' is not an identifier or dotted identifier path"),
                });
            }
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            replacements.push((key.clone(), replacement));
        }

        Ok(Self::new(replacements))
    }
}

impl Plugin for DefinePlugin {
    fn name(&self) -> &str {
        "define"
    }

    fn hooks(&self) -> &[Hook] {
        &[Hook::Transform]
    }

    fn transform(&self, code: &str, id: &str) -> std::result::Result<Option<String>, PluginError> {
        if self.replacements.is_empty() || !is_script(id) {
            return Ok(None);
        }

        Ok(replace_identifiers(code, &self.replacements))
    }
}

fn is_script(id: &str) -> bool {
    let path = id.split(['?', '#']).next().unwrap_or(id);
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(is_ident_char)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Replace whole-identifier occurrences in one left-to-right scan.
///
/// `replacements` must be sorted longest first so the longest identifier
/// wins at each position. Inserted text is never scanned again. Returns
/// `None` if nothing matched.
fn replace_identifiers(code: &str, replacements: &[(String, String)]) -> Option<String> {
    let mut out = String::with_capacity(code.len());
    let mut changed = false;
    let mut prev: Option<char> = None;
    let mut rest = code;

    while let Some(c) = rest.chars().next() {
        if !prev.is_some_and(|p| is_ident_char(p) || p == '.') {
            let hit = replacements.iter().find(|(ident, _)| {
                !ident.is_empty()
                    && rest.starts_with(ident.as_str())
                    && !rest[ident.len()..].chars().next().is_some_and(is_ident_char)
            });

            if let Some((ident, replacement)) = hit {
                out.push_str(replacement);
                changed = true;
                prev = ident.chars().next_back();
                rest = &rest[ident.len()..];
                continue;
            }
        }

        out.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }

    changed.then_some(out)
}
