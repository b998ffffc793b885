use serde::{Deserialize, Serialize};

use super::Annotation;

/// Opaque handle to a rendered span, issued by the highlight engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

/// What the selection detector reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "annotation", rename_all = "camelCase")]
pub enum Selection {
    /// An annotation the highlight engine already knows
    Existing(Annotation),
    /// A new, unconfirmed span carrying draft bodies
    Fresh(Annotation),
}

impl Selection {
    pub fn annotation(&self) -> &Annotation {
        match self {
            Selection::Existing(a) | Selection::Fresh(a) => a,
        }
    }

    pub fn into_annotation(self) -> Annotation {
        match self {
            Selection::Existing(a) | Selection::Fresh(a) => a,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Selection::Fresh(_))
    }
}

/// `select` event from the selection detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SelectEvent {
    Cleared,
    Selected {
        selection: Selection,
        element: ElementHandle,
    },
}

/// Events from the relation layer's drawing mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "relation", rename_all = "camelCase")]
pub enum RelationEvent {
    /// A connector was just drawn; its annotation has no bodies yet
    CreateRelation(super::Relation),
    SelectRelation(super::Relation),
    CancelDrawing,
}
