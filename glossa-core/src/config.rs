use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An editor field descriptor, e.g. `{ "name": "COMMENT" }` or
/// `{ "name": "TAG", "vocabulary": ["person", "place"] }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Widget {
    pub name: String,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl Widget {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: serde_json::Map::new(),
        }
    }
}

/// Controller configuration, read at initialization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub read_only: bool,
    pub widgets: Vec<Widget>,
    /// Headless operation: no popups, selections are confirmed implicitly
    pub disable_editor: bool,
    pub disable_select: bool,
    /// Passed through to the annotation editor popup
    pub allow_empty: bool,
    pub editor_auto_position: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_only: false,
            widgets: vec![Widget::named("COMMENT"), Widget::named("TAG")],
            disable_editor: false,
            disable_select: false,
            allow_empty: false,
            editor_auto_position: true,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_json(r#"{ "readOnly": true }"#).unwrap();
        assert!(config.read_only);
        assert!(config.editor_auto_position);
        assert_eq!(config.widgets.len(), 2);
    }

    #[test]
    fn widget_options_are_flattened() {
        let config = Config::from_json(
            r#"{ "widgets": [{ "name": "TAG", "vocabulary": ["person", "place"] }] }"#,
        )
        .unwrap();
        let tag = &config.widgets[0];
        assert_eq!(tag.name, "TAG");
        assert_eq!(tag.options["vocabulary"][1], "place");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = Config::from_json("{ readOnly").unwrap_err();
        assert!(err.to_string().starts_with("Invalid configuration"));
    }
}
