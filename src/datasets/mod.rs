//! Mission scene-identifier grammars
//!
//! Each mission module provides a regex grammar for its scene identifiers,
//! the archive folder layout derived from the identifier, the collection-name
//! mapping, and (where the inventory renames provider assets) the asset-key
//! rename table.

pub mod landsat;
pub mod modis;
pub mod sentinel;
pub mod viirs;

use crate::domain::{MeridianError, Result};
use std::collections::BTreeMap;

/// Render a `{key}` folder template from grammar capture variables
///
/// # Errors
///
/// Returns an error if the template references a variable the grammar did
/// not produce.
pub(crate) fn render_template(template: &str, variables: &BTreeMap<String, String>) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            MeridianError::SceneId(format!("Unclosed placeholder in template: {template}"))
        })?;
        let key = &after[..end];
        let value = variables.get(key).ok_or_else(|| {
            MeridianError::SceneId(format!("Template variable not available: {key}"))
        })?;
        result.push_str(value);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

/// Capture all named groups of a regex match into a map
pub(crate) fn named_captures(
    re: &regex::Regex,
    input: &str,
) -> Option<BTreeMap<String, String>> {
    let captures = re.captures(input)?;
    let mut variables = BTreeMap::new();
    for name in re.capture_names().flatten() {
        if let Some(value) = captures.name(name) {
            variables.insert(name.to_string(), value.as_str().to_string());
        }
    }
    Some(variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let mut vars = BTreeMap::new();
        vars.insert("year".to_string(), "2024".to_string());
        vars.insert("month".to_string(), "07".to_string());
        assert_eq!(
            render_template("{year}/{month}/x", &vars).unwrap(),
            "2024/07/x"
        );
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = BTreeMap::new();
        assert!(render_template("{year}", &vars).is_err());
    }

    #[test]
    fn test_render_template_unclosed() {
        let vars = BTreeMap::new();
        assert!(render_template("{year", &vars).is_err());
    }
}
