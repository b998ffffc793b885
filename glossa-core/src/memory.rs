//! In-memory collaborators
//!
//! Each is a cheap handle over shared state, so a caller can keep a clone
//! for inspection after handing one to the controller.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::model::{Annotation, ElementHandle, Relation};
use crate::reconcile::IdOverride;
use crate::state::{EditorState, OpenEditor};
use crate::traits::{
    AnnotatorHost, EditorSurface, HighlightEngine, Keyboard, ListenerId, RelationLayer,
    SelectionDetector,
};

fn replace_or_push<T>(items: &mut Vec<T>, item: T, slot: Option<usize>) {
    match slot {
        Some(i) => items[i] = item,
        None => items.push(item),
    }
}

#[derive(Debug, Default)]
struct HighlightStore {
    annotations: Vec<Annotation>,
    /// A change has not been rendered yet
    dirty: bool,
}

/// One span per annotation, rendered on the next frame
#[derive(Debug, Clone, Default)]
pub struct MemoryHighlights(Rc<RefCell<HighlightStore>>);

impl MemoryHighlights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn span_for(id: &str) -> ElementHandle {
        ElementHandle(format!("span:{}", id))
    }

    /// Returns true if a frame was pending, marking it rendered
    pub fn take_frame(&self) -> bool {
        std::mem::take(&mut self.0.borrow_mut().dirty)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HighlightEngine for MemoryHighlights {
    fn init(&mut self, annotations: Vec<Annotation>) {
        let mut store = self.0.borrow_mut();
        store.annotations = annotations;
        store.dirty = true;
    }

    fn add_or_update(&mut self, annotation: Annotation, previous: Option<&Annotation>) {
        let mut store = self.0.borrow_mut();
        let key = previous.map_or(annotation.id.as_str(), |p| p.id.as_str());
        let slot = store.annotations.iter().position(|a| a.id == key);
        let slot = slot.or_else(|| store.annotations.iter().position(|a| a.id == annotation.id));
        replace_or_push(&mut store.annotations, annotation, slot);
        store.dirty = true;
    }

    fn remove(&mut self, annotation: &Annotation) {
        let mut store = self.0.borrow_mut();
        store.annotations.retain(|a| a.id != annotation.id);
        store.dirty = true;
    }

    fn override_id(&mut self, from: &str, to: &str) -> Option<Annotation> {
        let mut store = self.0.borrow_mut();
        let annotation = store.annotations.iter_mut().find(|a| a.id == from)?;
        annotation.id = to.to_string();
        let updated = annotation.clone();
        store.dirty = true;
        Some(updated)
    }

    fn find_spans(&self, id: &str) -> Vec<ElementHandle> {
        let store = self.0.borrow();
        if store.annotations.iter().any(|a| a.id == id) {
            vec![Self::span_for(id)]
        } else {
            Vec::new()
        }
    }

    fn list(&self) -> Vec<Annotation> {
        self.0.borrow().annotations.clone()
    }

    fn clear(&mut self) {
        let mut store = self.0.borrow_mut();
        store.annotations.clear();
        store.dirty = true;
    }
}

#[derive(Debug)]
struct RelationStore {
    relations: Vec<Relation>,
    read_only: bool,
    drawing: bool,
    resets: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryRelations(Rc<RefCell<RelationStore>>);

impl MemoryRelations {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(RelationStore {
            relations: Vec::new(),
            read_only: true,
            drawing: false,
            resets: 0,
        })))
    }

    pub fn is_read_only(&self) -> bool {
        self.0.borrow().read_only
    }

    pub fn is_drawing(&self) -> bool {
        self.0.borrow().drawing
    }

    /// How many times the in-progress connector was reset
    pub fn resets(&self) -> usize {
        self.0.borrow().resets
    }
}

impl Default for MemoryRelations {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationLayer for MemoryRelations {
    fn init(&mut self, relations: Vec<Relation>) {
        self.0.borrow_mut().relations = relations;
    }

    fn add_or_update(&mut self, relation: Relation, previous: Option<&Relation>) {
        let mut store = self.0.borrow_mut();
        let key = previous.map_or(relation.id(), |p| p.id()).to_string();
        let slot = store.relations.iter().position(|r| r.id() == key);
        let slot = slot.or_else(|| store.relations.iter().position(|r| r.id() == relation.id()));
        replace_or_push(&mut store.relations, relation, slot);
    }

    fn remove(&mut self, relation: &Relation) {
        self.0
            .borrow_mut()
            .relations
            .retain(|r| r.id() != relation.id());
    }

    fn override_id(&mut self, from: &str, to: &str) -> Option<Relation> {
        let mut store = self.0.borrow_mut();
        let slot = store.relations.iter().position(|r| r.id() == from)?;
        let updated = store.relations[slot].clone().with_id(to);
        store.relations[slot] = updated.clone();
        Some(updated)
    }

    fn list(&self) -> Vec<Relation> {
        self.0.borrow().relations.clone()
    }

    fn clear(&mut self) {
        self.0.borrow_mut().relations.clear();
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.0.borrow_mut().read_only = read_only;
    }

    fn start_drawing(&mut self) {
        self.0.borrow_mut().drawing = true;
    }

    fn stop_drawing(&mut self) {
        self.0.borrow_mut().drawing = false;
    }

    fn reset_drawing(&mut self) {
        self.0.borrow_mut().resets += 1;
    }
}

#[derive(Debug, Default)]
struct SelectorStore {
    enabled: bool,
    clears: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySelector(Rc<RefCell<SelectorStore>>);

impl MemorySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }

    pub fn clears(&self) -> usize {
        self.0.borrow().clears
    }
}

impl SelectionDetector for MemorySelector {
    fn set_enabled(&mut self, enabled: bool) {
        self.0.borrow_mut().enabled = enabled;
    }

    fn clear_selection(&mut self) {
        self.0.borrow_mut().clears += 1;
    }
}

#[derive(Debug, Default)]
struct KeyboardStore {
    next: u64,
    listening: Vec<ListenerId>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKeyboard(Rc<RefCell<KeyboardStore>>);

impl MemoryKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listeners(&self) -> usize {
        self.0.borrow().listening.len()
    }
}

impl Keyboard for MemoryKeyboard {
    fn listen(&mut self) -> ListenerId {
        let mut store = self.0.borrow_mut();
        store.next += 1;
        let id = ListenerId(store.next);
        store.listening.push(id);
        id
    }

    fn release(&mut self, id: ListenerId) {
        self.0.borrow_mut().listening.retain(|l| *l != id);
    }
}

/// What the popups show after a committed state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "popup", content = "id", rename_all = "camelCase")]
pub enum PopupView {
    Closed,
    Annotation(String),
    Relation(String),
}

impl From<&EditorState> for PopupView {
    fn from(state: &EditorState) -> Self {
        match &state.open {
            OpenEditor::None => PopupView::Closed,
            OpenEditor::Annotation { annotation, .. } => PopupView::Annotation(annotation.id.clone()),
            OpenEditor::Relation(relation) => PopupView::Relation(relation.id().to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct SurfaceStore {
    renders: Vec<EditorState>,
    root_classes: Vec<String>,
}

/// Keeps every committed state it was asked to render
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface(Rc<RefCell<SurfaceStore>>);

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn renders(&self) -> Vec<EditorState> {
        self.0.borrow().renders.clone()
    }

    pub fn popups(&self) -> Vec<PopupView> {
        self.0.borrow().renders.iter().map(PopupView::from).collect()
    }

    pub fn has_root_class(&self, class: &str) -> bool {
        self.0.borrow().root_classes.iter().any(|c| c == class)
    }
}

impl EditorSurface for RecordingSurface {
    fn render(&mut self, state: &EditorState) {
        self.0.borrow_mut().renders.push(state.clone());
    }

    fn set_root_class(&mut self, class: &str, present: bool) {
        let mut store = self.0.borrow_mut();
        store.root_classes.retain(|c| c != class);
        if present {
            store.root_classes.push(class.to_string());
        }
    }
}

/// A host notification, as recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "callback", rename_all = "camelCase")]
pub enum HostEvent {
    #[serde(rename = "onAnnotationSelected")]
    Selected {
        annotation: Annotation,
        element: ElementHandle,
    },
    #[serde(rename = "onAnnotationCreated")]
    Created { annotation: Annotation },
    #[serde(rename = "onAnnotationUpdated")]
    Updated {
        annotation: Annotation,
        previous: Option<Annotation>,
    },
    #[serde(rename = "onAnnotationDeleted")]
    Deleted { annotation: Annotation },
    #[serde(rename = "onCancelSelected")]
    Cancelled { annotation: Option<Annotation> },
}

#[derive(Debug, Default)]
struct HostStore {
    events: Vec<HostEvent>,
    overrides: Vec<IdOverride>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHost(Rc<RefCell<HostStore>>);

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.0.borrow().events.clone()
    }

    /// Remove and return the events recorded so far
    pub fn drain(&self) -> Vec<HostEvent> {
        std::mem::take(&mut self.0.borrow_mut().events)
    }

    /// The override request issued for a created entity's original id
    pub fn id_override(&self, original_id: &str) -> Option<IdOverride> {
        self.0
            .borrow()
            .overrides
            .iter()
            .rev()
            .find(|o| o.original_id() == original_id)
            .cloned()
    }

    fn record(&self, event: HostEvent) {
        self.0.borrow_mut().events.push(event);
    }
}

impl AnnotatorHost for RecordingHost {
    fn on_annotation_selected(&mut self, annotation: Annotation, element: ElementHandle) {
        self.record(HostEvent::Selected {
            annotation,
            element,
        });
    }

    fn on_annotation_created(&mut self, annotation: Annotation, id_override: IdOverride) {
        self.0.borrow_mut().overrides.push(id_override);
        self.record(HostEvent::Created { annotation });
    }

    fn on_annotation_updated(&mut self, annotation: Annotation, previous: Option<Annotation>) {
        self.record(HostEvent::Updated {
            annotation,
            previous,
        });
    }

    fn on_annotation_deleted(&mut self, annotation: Annotation) {
        self.record(HostEvent::Deleted { annotation });
    }

    fn on_cancel_selected(&mut self, annotation: Option<Annotation>) {
        self.record(HostEvent::Cancelled { annotation });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Target;

    fn text(id: &str) -> Annotation {
        Annotation::new(id, Target::Selector(serde_json::Value::Null), Vec::new())
    }

    #[test]
    fn update_replaces_previous_in_place() {
        let mut highlights = MemoryHighlights::new();
        highlights.add_or_update(text("a"), None);
        highlights.add_or_update(text("b"), None);
        highlights.add_or_update(text("a2"), Some(&text("a")));

        let ids: Vec<_> = highlights.list().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a2", "b"]);
    }

    #[test]
    fn override_marks_frame_pending() {
        let mut highlights = MemoryHighlights::new();
        highlights.add_or_update(text("a"), None);
        assert!(highlights.take_frame());
        assert!(!highlights.take_frame());

        assert_eq!(highlights.override_id("a", "srv-1").map(|a| a.id), Some("srv-1".into()));
        assert!(highlights.take_frame());
        assert!(highlights.override_id("a", "srv-2").is_none());
        assert_eq!(highlights.find_spans("srv-1"), vec![MemoryHighlights::span_for("srv-1")]);
    }

    #[test]
    fn relation_update_falls_back_to_own_id() {
        let mut relations = MemoryRelations::new();
        let r = Relation::between("a", "b").with_id("r");
        relations.add_or_update(r.clone(), Some(&Relation::between("x", "y")));
        relations.add_or_update(r.clone().retarget("a", "c"), None);

        let stored = relations.list();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].endpoints(), ("c", "b"));
    }

    #[test]
    fn keyboard_release_removes_listener() {
        let mut keyboard = MemoryKeyboard::new();
        let a = keyboard.listen();
        let b = keyboard.listen();
        assert_ne!(a, b);
        keyboard.release(a);
        assert_eq!(keyboard.listeners(), 1);
    }

    #[test]
    fn host_event_names_match_callbacks() {
        let event = HostEvent::Cancelled { annotation: None };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"callback":"onCancelSelected","annotation":null}"#);
    }
}
