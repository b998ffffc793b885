//! Interfaces of the subsystems the controller coordinates
//!
//! Each collaborator is mutated only by the controller. None of them is
//! expected to call back into the controller synchronously; they report
//! through the controller's event methods instead.

use crate::model::{Annotation, ElementHandle, Relation};
use crate::reconcile::IdOverride;
use crate::state::EditorState;

/// Owns annotation identity and the rendered spans for each annotation
pub trait HighlightEngine {
    /// Replace everything with `annotations`. Rendering may complete later,
    /// signalled through `Controller::highlights_committed`.
    fn init(&mut self, annotations: Vec<Annotation>);

    /// Add `annotation`, or replace `previous` in place when given
    fn add_or_update(&mut self, annotation: Annotation, previous: Option<&Annotation>);

    fn remove(&mut self, annotation: &Annotation);

    /// Swap an id, returning the stored annotation now carrying `to`.
    /// `None` when nothing with id `from` is known.
    fn override_id(&mut self, from: &str, to: &str) -> Option<Annotation>;

    fn find_spans(&self, id: &str) -> Vec<ElementHandle>;

    fn list(&self) -> Vec<Annotation>;

    fn clear(&mut self);

    fn get(&self, id: &str) -> Option<Annotation> {
        self.list().into_iter().find(|a| a.id == id)
    }

    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

/// Owns relation identity and the connectors drawn between spans
pub trait RelationLayer {
    fn init(&mut self, relations: Vec<Relation>);

    fn add_or_update(&mut self, relation: Relation, previous: Option<&Relation>);

    fn remove(&mut self, relation: &Relation);

    fn override_id(&mut self, from: &str, to: &str) -> Option<Relation>;

    fn list(&self) -> Vec<Relation>;

    fn clear(&mut self);

    fn set_read_only(&mut self, read_only: bool);

    fn start_drawing(&mut self);

    fn stop_drawing(&mut self);

    /// Drop the connector currently being drawn, if any
    fn reset_drawing(&mut self);
}

pub trait SelectionDetector {
    fn set_enabled(&mut self, enabled: bool);

    /// Forget any pending raw selection
    fn clear_selection(&mut self);
}

/// Where the two editor popups live.
///
/// Receives every committed state; a popup is mounted while the state holds
/// its target and unmounted otherwise.
pub trait EditorSurface {
    fn render(&mut self, state: &EditorState);

    fn set_root_class(&mut self, class: &str, present: bool);
}

/// Callbacks into the embedding application. Every payload is a detached copy.
pub trait AnnotatorHost {
    fn on_annotation_selected(&mut self, annotation: Annotation, element: ElementHandle);

    fn on_annotation_created(&mut self, annotation: Annotation, id_override: IdOverride);

    fn on_annotation_updated(&mut self, annotation: Annotation, previous: Option<Annotation>);

    fn on_annotation_deleted(&mut self, annotation: Annotation);

    fn on_cancel_selected(&mut self, annotation: Option<Annotation>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(pub u64);

/// Source of the global cancel key
pub trait Keyboard {
    fn listen(&mut self) -> ListenerId;

    fn release(&mut self, id: ListenerId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}
