//! Swapping local identifiers for host-issued ones
//!
//! The host receives an [`IdOverride`] with every `on_annotation_created`
//! callback and may apply it at any later time, any number of times.

use crate::controller::Controller;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideTarget {
    /// A text annotation; relations may point at it
    Annotation(String),
    /// A relation's own annotation; nothing points at it
    Relation(String),
}

/// Bind now, resolve later: names the entity whose id the host will replace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdOverride {
    target: OverrideTarget,
}

impl IdOverride {
    pub fn annotation(id: impl Into<String>) -> Self {
        Self {
            target: OverrideTarget::Annotation(id.into()),
        }
    }

    pub fn relation(id: impl Into<String>) -> Self {
        Self {
            target: OverrideTarget::Relation(id.into()),
        }
    }

    pub fn target(&self) -> &OverrideTarget {
        &self.target
    }

    /// The local id this request was issued for
    pub fn original_id(&self) -> &str {
        match &self.target {
            OverrideTarget::Annotation(id) | OverrideTarget::Relation(id) => id,
        }
    }

    pub fn apply(&self, controller: &mut Controller, forced_id: &str) {
        match &self.target {
            OverrideTarget::Annotation(id) => controller.override_annotation_id(id, forced_id),
            OverrideTarget::Relation(id) => controller.override_relation_id(id, forced_id),
        }
    }
}

/// Dependent work held back until the highlight engine has committed
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Deferred {
    PropagateId { from: String, to: String },
    InitRelations(Vec<crate::model::Relation>),
}
