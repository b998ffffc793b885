use serde::{Deserialize, Serialize};

use super::{Annotation, Body, Target};
use crate::error::{Error, Result};

/// A connector between two annotations.
///
/// The relation's id and endpoints are read from its wrapped annotation, so
/// rewriting an endpoint can never leave a second copy behind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Annotation", into = "Annotation")]
pub struct Relation {
    annotation: Annotation,
}

impl Relation {
    /// A new, still empty connector between `from` and `to`
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            annotation: Annotation::draft(Target::Link([from.into(), to.into()])),
        }
    }

    pub fn from_annotation(annotation: Annotation) -> Result<Self> {
        if annotation.is_relation() {
            Ok(Self { annotation })
        } else {
            Err(Error::NotARelation(annotation.id))
        }
    }

    pub fn id(&self) -> &str {
        &self.annotation.id
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// Bodies are the only editable part; the link target stays intact
    pub fn bodies_mut(&mut self) -> &mut Vec<Body> {
        &mut self.annotation.bodies
    }

    pub fn into_annotation(self) -> Annotation {
        self.annotation
    }

    /// Ordered (from, to) endpoint ids
    pub fn endpoints(&self) -> (&str, &str) {
        match &self.annotation.target {
            Target::Link([from, to]) => (from, to),
            Target::Selector(_) => unreachable!("relation constructed from a non-link target"),
        }
    }

    pub fn references(&self, annotation_id: &str) -> bool {
        let (from, to) = self.endpoints();
        from == annotation_id || to == annotation_id
    }

    /// Rewrite every endpoint equal to `from` so it points at `to`
    pub fn retarget(mut self, from: &str, to: &str) -> Self {
        if let Target::Link(ends) = &mut self.annotation.target {
            for end in ends.iter_mut() {
                if end == from {
                    *end = to.to_string();
                }
            }
        }
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.annotation.id = id.into();
        self
    }
}

impl TryFrom<Annotation> for Relation {
    type Error = Error;

    fn try_from(annotation: Annotation) -> Result<Self> {
        Self::from_annotation(annotation)
    }
}

impl From<Relation> for Annotation {
    fn from(relation: Relation) -> Self {
        relation.annotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_relation_is_empty() {
        let r = Relation::between("a", "b");
        assert_eq!(r.endpoints(), ("a", "b"));
        assert!(r.annotation().bodies.is_empty());
    }

    #[test]
    fn retarget_rewrites_matching_ends_only() {
        let r = Relation::between("a", "b").retarget("a", "srv-1");
        assert_eq!(r.endpoints(), ("srv-1", "b"));
        assert!(!r.references("a"));

        let self_loop = Relation::between("a", "a").retarget("a", "z");
        assert_eq!(self_loop.endpoints(), ("z", "z"));
    }

    #[test]
    fn rejects_text_annotation() {
        let a = Annotation::draft(Target::Selector(serde_json::Value::Null));
        let err = Relation::from_annotation(a.clone()).unwrap_err();
        assert!(matches!(err, Error::NotARelation(id) if id == a.id));
    }

    #[test]
    fn serializes_as_annotation() {
        let mut r = Relation::between("a", "b").with_id("r-1");
        r.bodies_mut().push(Body::text("tagging", "cites"));

        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"link\":[\"a\",\"b\"]"));

        let back: Relation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn editing_bodies_keeps_endpoints() {
        let mut r = Relation::between("a", "b");
        r.bodies_mut().push(Body::text("tagging", "cites"));
        r.bodies_mut().clear();
        assert!(r.annotation().is_relation());
        assert_eq!(r.endpoints(), ("a", "b"));
    }
}
