//! The annotation/relation lifecycle controller
//!
//! Owns the editing state, translates selection and relation-layer events
//! into create/update/delete operations, and reconciles local ids with the
//! ids the host issues later.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::config::{Config, Widget};
use crate::model::{Annotation, Relation, RelationEvent, SelectEvent, Selection};
use crate::reconcile::{Deferred, IdOverride};
use crate::state::{Action, EditorState, Mode, OpenEditor};
use crate::traits::{
    AnnotatorHost, EditorSurface, HighlightEngine, Key, Keyboard, ListenerId, RelationLayer,
    SelectionDetector,
};

/// Class set on the content root while selection is disabled
pub const NOSELECT_CLASS: &str = "glossa-noselect";

/// The subsystems a controller drives
pub struct Collaborators {
    pub highlights: Box<dyn HighlightEngine>,
    pub relations: Box<dyn RelationLayer>,
    pub selector: Box<dyn SelectionDetector>,
    pub surface: Box<dyn EditorSurface>,
    pub host: Box<dyn AnnotatorHost>,
    pub keyboard: Box<dyn Keyboard>,
}

/// Which host callback a write reports through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostCallback {
    Created,
    Updated,
}

pub struct Controller {
    highlights: Box<dyn HighlightEngine>,
    relations: Box<dyn RelationLayer>,
    selector: Box<dyn SelectionDetector>,
    surface: Box<dyn EditorSurface>,
    host: Box<dyn AnnotatorHost>,
    keyboard: Box<dyn Keyboard>,

    state: EditorState,
    deferred: VecDeque<Deferred>,
    listener: Option<ListenerId>,
}

impl Controller {
    /// Build a controller and activate its cancel-key listener
    pub fn new(collaborators: Collaborators, config: &Config) -> Self {
        let Collaborators {
            highlights,
            relations,
            selector,
            surface,
            host,
            keyboard,
        } = collaborators;

        let mut controller = Self {
            highlights,
            relations,
            selector,
            surface,
            host,
            keyboard,
            state: EditorState::from_config(config),
            deferred: VecDeque::new(),
            listener: None,
        };

        controller.relations.set_read_only(true);
        controller
            .selector
            .set_enabled(controller.state.selection_enabled());
        if controller.state.select_disabled {
            controller.surface.set_root_class(NOSELECT_CLASS, true);
        }
        controller.surface.render(&controller.state);
        controller.activate();
        controller
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn config(&self) -> Config {
        self.state.config()
    }

    pub fn highlights(&self) -> &dyn HighlightEngine {
        self.highlights.as_ref()
    }

    pub fn relations(&self) -> &dyn RelationLayer {
        self.relations.as_ref()
    }

    /// No dependent work is waiting for a visual commit
    pub fn is_settled(&self) -> bool {
        self.deferred.is_empty()
    }

    fn commit(&mut self, action: Action) {
        trace!(?action, "transition");
        let before = self.state.clone();
        self.state = before.clone().reduce(action);
        if self.state != before {
            self.surface.render(&self.state);
        }
    }

    // --- selection -------------------------------------------------------

    pub fn handle_select(&mut self, event: SelectEvent) {
        let (selection, element) = match event {
            SelectEvent::Cleared => {
                self.commit(Action::Deselect);
                self.selector.set_enabled(self.state.selection_enabled());
                return;
            }
            SelectEvent::Selected { selection, element } => (selection, element),
        };

        if self.state.mode == Mode::Relations {
            debug!(id = %selection.annotation().id, "selection ignored while drawing relations");
            return;
        }

        if self.state.editor_disabled {
            match selection {
                Selection::Existing(annotation) => {
                    self.host.on_annotation_selected(annotation, element);
                }
                Selection::Fresh(annotation) => {
                    self.write_annotation(HostCallback::Created, annotation.strip_drafts(), None);
                }
            }
            return;
        }

        let fresh = selection.is_fresh();
        let annotation = selection.into_annotation();

        // Two commits so the popup is unmounted before it is mounted again
        self.commit(Action::Deselect);
        self.commit(Action::SelectAnnotation {
            annotation: annotation.clone(),
            element: element.clone(),
            fresh,
        });

        if !fresh {
            self.host.on_annotation_selected(annotation, element);
        }
    }

    // --- annotation editor outcomes --------------------------------------

    pub fn annotation_created(&mut self, annotation: Annotation) {
        self.write_annotation(HostCallback::Created, annotation, None);
    }

    pub fn annotation_updated(&mut self, annotation: Annotation, previous: Annotation) {
        self.write_annotation(HostCallback::Updated, annotation, Some(previous));
    }

    fn write_annotation(
        &mut self,
        callback: HostCallback,
        annotation: Annotation,
        previous: Option<Annotation>,
    ) {
        debug!(id = %annotation.id, ?callback, "writing annotation");
        self.highlights
            .add_or_update(annotation.clone(), previous.as_ref());

        match callback {
            HostCallback::Created => {
                let id_override = IdOverride::annotation(annotation.id.clone());
                self.host.on_annotation_created(annotation.clone(), id_override);
            }
            HostCallback::Updated => {
                self.host.on_annotation_updated(annotation.clone(), previous);
            }
        }

        if self.state.editor_disabled {
            return;
        }

        match self.highlights.find_spans(&annotation.id).into_iter().next() {
            Some(element) => self.commit(Action::SelectAnnotation {
                annotation,
                element,
                fresh: false,
            }),
            None => self.commit(Action::Deselect),
        }
    }

    pub fn annotation_deleted(&mut self, annotation: Annotation) {
        debug!(id = %annotation.id, "deleting annotation");
        self.remove_relations_of(&annotation.id);
        self.commit(Action::CloseEditors);
        self.selector.clear_selection();
        self.highlights.remove(&annotation);
        self.host.on_annotation_deleted(annotation);
    }

    pub fn annotation_cancelled(&mut self) {
        let cancelled = match &self.state.open {
            OpenEditor::Annotation {
                annotation,
                fresh: false,
                ..
            } => Some(annotation.clone()),
            _ => None,
        };

        self.commit(Action::Deselect);
        self.selector.clear_selection();
        self.host.on_cancel_selected(cancelled);
    }

    /// `annotation_id` plus every older id still waiting to be propagated
    /// to it. Relations keep the old ids until the next visual commit.
    fn aliases_of(&self, annotation_id: &str) -> Vec<String> {
        let mut ids = vec![annotation_id.to_string()];
        let mut grown = true;
        while grown {
            grown = false;
            for task in &self.deferred {
                if let Deferred::PropagateId { from, to } = task {
                    if ids.contains(to) && !ids.contains(from) {
                        ids.push(from.clone());
                        grown = true;
                    }
                }
            }
        }
        ids
    }

    fn references_any(relation: &Relation, ids: &[String]) -> bool {
        ids.iter().any(|id| relation.references(id))
    }

    /// Destroy every relation that has `annotation_id`, under any of its
    /// ids, as an endpoint
    fn remove_relations_of(&mut self, annotation_id: &str) {
        let ids = self.aliases_of(annotation_id);
        for relation in self.relations.list() {
            if Self::references_any(&relation, &ids) {
                debug!(relation = %relation.id(), annotation = %annotation_id, "cascading delete");
                self.relations.remove(&relation);
            }
        }
    }

    // --- relations -------------------------------------------------------

    pub fn handle_relation_event(&mut self, event: RelationEvent) {
        match event {
            RelationEvent::CreateRelation(relation) | RelationEvent::SelectRelation(relation) => {
                self.commit(Action::EditRelation(relation));
            }
            RelationEvent::CancelDrawing => self.relation_cancelled(),
        }
    }

    /// The relation popup always reports a previous value. An empty one
    /// means the connector was just drawn.
    pub fn relation_created_or_updated(&mut self, relation: Relation, previous: Relation) {
        self.relations
            .add_or_update(relation.clone(), Some(&previous));
        self.commit(Action::CloseRelationEditor);
        self.relations.reset_drawing();

        // TODO: a relation whose bodies were all removed reads as new on its
        // next edit; needs an explicit "persisted" marker from the layer.
        if previous.annotation().bodies.is_empty() {
            let id_override = IdOverride::relation(relation.id());
            self.host
                .on_annotation_created(relation.into_annotation(), id_override);
        } else {
            self.host.on_annotation_updated(
                relation.into_annotation(),
                Some(previous.into_annotation()),
            );
        }
    }

    pub fn relation_deleted(&mut self, relation: Relation) {
        debug!(id = %relation.id(), "deleting relation");
        self.relations.remove(&relation);
        self.commit(Action::CloseRelationEditor);
        self.host.on_annotation_deleted(relation.into_annotation());
    }

    pub fn relation_cancelled(&mut self) {
        self.relations.reset_drawing();
        self.commit(Action::CloseRelationEditor);
    }

    // --- identity reconciliation -----------------------------------------

    /// Swap `id` for `forced_id` in the highlight engine, then rewrite the
    /// relations that reference it once the swap has been rendered.
    pub fn override_annotation_id(&mut self, id: &str, forced_id: &str) {
        if self.state.has_open_editor() {
            self.relations.reset_drawing();
            self.commit(Action::CloseEditors);
        }

        match self.highlights.override_id(id, forced_id) {
            Some(updated) => debug!(from = %id, to = %updated.id, "annotation id overridden"),
            None => debug!(from = %id, to = %forced_id, "annotation gone, id override skipped"),
        }

        self.deferred.push_back(Deferred::PropagateId {
            from: id.to_string(),
            to: forced_id.to_string(),
        });
    }

    pub fn override_relation_id(&mut self, id: &str, forced_id: &str) {
        if self.state.selected_relation().is_some_and(|r| r.id() == id) {
            self.relations.reset_drawing();
            self.commit(Action::CloseRelationEditor);
        }

        match self.relations.override_id(id, forced_id) {
            Some(_) => debug!(from = %id, to = %forced_id, "relation id overridden"),
            None => debug!(from = %id, to = %forced_id, "relation gone, id override skipped"),
        }
    }

    /// Visual-commit signal from the highlight engine. Runs the dependent
    /// work queued before it, in order.
    pub fn highlights_committed(&mut self) {
        let pending = std::mem::take(&mut self.deferred);
        for task in pending {
            match task {
                Deferred::PropagateId { from, to } => self.propagate_id(&from, &to),
                Deferred::InitRelations(relations) => self.init_relations(relations),
            }
        }
    }

    fn propagate_id(&mut self, from: &str, to: &str) {
        for relation in self.relations.list() {
            if relation.references(from) {
                let updated = relation.clone().retarget(from, to);
                debug!(relation = %relation.id(), %from, %to, "retargeting relation");
                self.relations.add_or_update(updated, Some(&relation));
            }
        }

        if self
            .state
            .selected_relation()
            .is_some_and(|r| r.references(from))
        {
            self.commit(Action::CloseRelationEditor);
        }
    }

    /// Relations added since `set_annotations` stay, and win on an id clash
    fn init_relations(&mut self, relations: Vec<Relation>) {
        let current = self.relations.list();
        let (kept, dropped): (Vec<_>, Vec<_>) = relations.into_iter().partition(|r| {
            let (from, to) = r.endpoints();
            self.highlights.contains(from) && self.highlights.contains(to)
        });
        for relation in &dropped {
            let (from, to) = relation.endpoints();
            warn!(relation = %relation.id(), %from, %to, "dropping relation with missing endpoint");
        }

        let mut merged: Vec<Relation> = kept
            .into_iter()
            .filter(|r| !current.iter().any(|c| c.id() == r.id()))
            .collect();
        merged.extend(current);
        self.relations.init(merged);
    }

    // --- modes -----------------------------------------------------------

    pub fn set_mode(&mut self, mode: Mode) {
        let from = self.state.mode;
        if from == mode {
            return;
        }
        debug!(%from, to = %mode, "mode change");

        match mode {
            Mode::Relations => {
                self.commit(Action::EnterMode(Mode::Relations));
                self.selector.clear_selection();
                self.selector.set_enabled(false);
                self.relations.set_read_only(false);
                self.relations.start_drawing();
            }
            Mode::Normal | Mode::Headless => {
                if from == Mode::Relations {
                    self.relations.reset_drawing();
                    self.relations.stop_drawing();
                    self.relations.set_read_only(true);
                }
                self.commit(Action::EnterMode(mode));
                self.selector.set_enabled(self.state.selection_enabled());
            }
        }
    }

    // --- keyboard --------------------------------------------------------

    pub fn activate(&mut self) {
        if self.listener.is_none() {
            self.listener = Some(self.keyboard.listen());
        }
    }

    pub fn deactivate(&mut self) {
        if let Some(id) = self.listener.take() {
            self.keyboard.release(id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    /// Escape cancels an open annotation editor and nothing else
    pub fn on_key(&mut self, key: Key) {
        if key == Key::Escape
            && self.listener.is_some()
            && self.state.selected_annotation().is_some()
        {
            self.annotation_cancelled();
        }
    }

    // --- external API ----------------------------------------------------

    /// Inject an annotation without opening an editor
    pub fn add_annotation(&mut self, annotation: Annotation) {
        if !annotation.is_relation() {
            self.highlights.add_or_update(annotation, None);
            return;
        }

        match Relation::from_annotation(annotation) {
            Ok(relation) => {
                let (from, to) = relation.endpoints();
                if self.highlights.contains(from) && self.highlights.contains(to) {
                    self.relations.add_or_update(relation, None);
                } else {
                    warn!(relation = %relation.id(), %from, %to, "relation endpoint not found");
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    /// Every annotation followed by every relation, as detached copies
    pub fn get_annotations(&self) -> Vec<Annotation> {
        let mut all = self.highlights.list();
        all.extend(self.relations.list().into_iter().map(Relation::into_annotation));
        all
    }

    pub fn remove_annotation(&mut self, annotation: &Annotation) {
        if annotation.is_relation() {
            if let Some(relation) = self
                .relations
                .list()
                .into_iter()
                .find(|r| r.id() == annotation.id)
            {
                self.relations.remove(&relation);
            }
            if self
                .state
                .selected_relation()
                .is_some_and(|r| r.id() == annotation.id)
            {
                self.commit(Action::CloseRelationEditor);
            }
            return;
        }

        let ids = self.aliases_of(&annotation.id);
        if self
            .state
            .selected_relation()
            .is_some_and(|r| Self::references_any(r, &ids))
        {
            self.relations.reset_drawing();
            self.commit(Action::CloseRelationEditor);
        }

        self.remove_relations_of(&annotation.id);
        self.highlights.remove(annotation);
        if self
            .state
            .selected_annotation()
            .is_some_and(|a| a.id == annotation.id)
        {
            self.commit(Action::Deselect);
        }
    }

    /// Deselect, then select the first rendered span of `id` if there is one
    pub fn select_annotation(&mut self, id: Option<&str>) -> Option<Annotation> {
        self.commit(Action::Deselect);

        let id = id?;
        let element = self.highlights.find_spans(id).into_iter().next()?;
        let annotation = self.highlights.get(id)?;

        self.commit(Action::SelectAnnotation {
            annotation: annotation.clone(),
            element,
            fresh: false,
        });
        Some(annotation)
    }

    /// Replace everything. Relations are initialised on the next visual
    /// commit, once their endpoints have been rendered.
    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.relations.reset_drawing();
        self.commit(Action::CloseEditors);
        self.highlights.clear();
        self.relations.clear();

        let mut texts = Vec::new();
        let mut relations = Vec::new();
        for annotation in annotations {
            if annotation.is_relation() {
                match Relation::from_annotation(annotation) {
                    Ok(relation) => relations.push(relation),
                    Err(e) => warn!("{}", e),
                }
            } else {
                texts.push(annotation);
            }
        }

        debug!(
            annotations = texts.len(),
            relations = relations.len(),
            "initialising"
        );
        self.highlights.init(texts);
        self.deferred.push_back(Deferred::InitRelations(relations));
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.commit(Action::SetReadOnly(read_only));
    }

    pub fn set_widgets(&mut self, widgets: Vec<Widget>) {
        self.commit(Action::SetWidgets(widgets));
    }

    pub fn set_disable_editor(&mut self, disabled: bool) {
        self.commit(Action::SetEditorDisabled(disabled));
    }

    pub fn set_disable_select(&mut self, disabled: bool) {
        self.commit(Action::SetSelectDisabled(disabled));
        self.selector.set_enabled(self.state.selection_enabled());
        self.surface.set_root_class(NOSELECT_CLASS, disabled);
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.deactivate();
    }
}
