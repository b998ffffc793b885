use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single value attached to an annotation (comment, tag, relation label...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[serde(rename = "type", default = "Body::default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Not yet confirmed to the host
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub draft: bool,
}

impl Body {
    fn default_kind() -> String {
        "TextualBody".to_string()
    }

    pub fn text(purpose: &str, value: &str) -> Self {
        Self {
            kind: Self::default_kind(),
            purpose: Some(purpose.to_string()),
            value: serde_json::Value::String(value.to_string()),
            draft: false,
        }
    }

    pub fn into_draft(mut self) -> Self {
        self.draft = true;
        self
    }
}

/// Where an annotation is anchored.
///
/// Text annotations carry an opaque selector owned by the highlight engine.
/// Relations link two annotations by id; the link shape is what tells a host
/// that an entry of `get_annotations()` is a relation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    Selector(serde_json::Value),
    Link([String; 2]),
}

/// An annotation as the controller sees it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    #[serde(default)]
    pub bodies: Vec<Body>,
    pub target: Target,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl Annotation {
    pub fn new(id: impl Into<String>, target: Target, bodies: Vec<Body>) -> Self {
        Self {
            id: id.into(),
            bodies,
            target,
            read_only: false,
        }
    }

    /// A fresh annotation with a locally generated id
    pub fn draft(target: Target) -> Self {
        Self::new(local_id(), target, Vec::new())
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.target, Target::Link(_))
    }

    pub fn has_drafts(&self) -> bool {
        self.bodies.iter().any(|b| b.draft)
    }

    /// Clear every draft marker, keeping the bodies themselves
    pub fn strip_drafts(mut self) -> Self {
        for body in &mut self.bodies {
            body.draft = false;
        }
        self
    }
}

/// Local identifiers are prefixed so they never collide with host-issued ones
pub fn local_id() -> String {
    format!("#{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> Target {
        Target::Selector(serde_json::json!({ "type": "TextQuoteSelector", "exact": "hello" }))
    }

    #[test]
    fn draft_gets_local_id() {
        let a = Annotation::draft(quote());
        let b = Annotation::draft(quote());
        assert!(a.id.starts_with('#'));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn strip_drafts_keeps_bodies() {
        let mut a = Annotation::draft(quote());
        a.bodies.push(Body::text("commenting", "first").into_draft());
        a.bodies.push(Body::text("tagging", "second"));

        let stripped = a.strip_drafts();
        assert_eq!(stripped.bodies.len(), 2);
        assert!(!stripped.has_drafts());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let mut a = Annotation::new("a-1", quote(), vec![Body::text("commenting", "hi").into_draft()]);
        a.read_only = true;
        let json = serde_json::to_string(&a).unwrap();

        assert!(json.contains("\"readOnly\":true"));
        assert!(json.contains("\"type\":\"TextualBody\""));
        assert!(json.contains("\"draft\":true"));
        assert!(json.contains("\"selector\""));
    }

    #[test]
    fn confirmed_body_omits_draft_flag() {
        let a = Annotation::new("a-1", quote(), vec![Body::text("commenting", "hi")]);
        let json = serde_json::to_string(&a).unwrap();
        assert!(!json.contains("draft"));
        assert!(!json.contains("readOnly"));
    }

    #[test]
    fn link_target_marks_relation() {
        let r = Annotation::new("r-1", Target::Link(["a".into(), "b".into()]), Vec::new());
        assert!(r.is_relation());
        assert!(!Annotation::draft(quote()).is_relation());
    }
}
