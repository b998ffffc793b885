//! Scripted sessions against in-memory collaborators

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use glossa_core::memory::{
    HostEvent, MemoryHighlights, MemoryKeyboard, MemoryRelations, MemorySelector, PopupView,
    RecordingHost,
};
use glossa_core::{
    Annotation, Collaborators, Config, Controller, EditorState, EditorSurface, ElementHandle, Key,
    Mode, Relation, RelationEvent, SelectEvent, Selection,
};

/// One scripted user or host action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Select {
        selection: Selection,
        element: ElementHandle,
    },
    ClearSelection,
    CreateRelation {
        relation: Relation,
    },
    SelectRelation {
        relation: Relation,
    },
    CancelDrawing,
    /// Annotation editor outcomes
    Created {
        annotation: Annotation,
    },
    Updated {
        annotation: Annotation,
        previous: Annotation,
    },
    Deleted {
        annotation: Annotation,
    },
    Cancel,
    /// Relation editor outcomes
    RelationSaved {
        relation: Relation,
        previous: Relation,
    },
    RelationDeleted {
        relation: Relation,
    },
    Key {
        key: String,
    },
    SetMode {
        mode: String,
    },
    /// The host supplies a permanent id for a created entity
    AssignId {
        original: String,
        id: String,
    },
    Commit,
    SetAnnotations {
        annotations: Vec<Annotation>,
    },
    AddAnnotation {
        annotation: Annotation,
    },
    RemoveAnnotation {
        annotation: Annotation,
    },
    SelectAnnotation {
        #[serde(default)]
        id: Option<String>,
    },
    SetReadOnly {
        value: bool,
    },
    SetDisableSelect {
        value: bool,
    },
    SetDisableEditor {
        value: bool,
    },
}

pub fn parse_script(json: &str) -> Result<Vec<Step>> {
    serde_json::from_str(json).context("Failed to parse session script")
}

/// Logs popup changes instead of drawing them
#[derive(Debug, Default)]
struct TraceSurface {
    last: Option<PopupView>,
}

impl EditorSurface for TraceSurface {
    fn render(&mut self, state: &EditorState) {
        let popup = PopupView::from(state);
        if self.last.as_ref() != Some(&popup) {
            info!(?popup, mode = %state.mode, "editor surface");
            self.last = Some(popup);
        }
    }

    fn set_root_class(&mut self, class: &str, present: bool) {
        info!(class, present, "content root class");
    }
}

pub struct Session {
    controller: Controller,
    highlights: MemoryHighlights,
    host: RecordingHost,
    manual_frames: bool,
}

impl Session {
    /// With `manual_frames`, highlight rendering only commits on `commit` steps
    pub fn new(config: &Config, manual_frames: bool) -> Self {
        let highlights = MemoryHighlights::new();
        let host = RecordingHost::new();
        let controller = Controller::new(
            Collaborators {
                highlights: Box::new(highlights.clone()),
                relations: Box::new(MemoryRelations::new()),
                selector: Box::new(MemorySelector::new()),
                surface: Box::new(TraceSurface::default()),
                host: Box::new(host.clone()),
                keyboard: Box::new(MemoryKeyboard::new()),
            },
            config,
        );

        Self {
            controller,
            highlights,
            host,
            manual_frames,
        }
    }

    /// Apply one step, returning the host notifications it produced
    pub fn apply(&mut self, step: Step) -> Result<Vec<HostEvent>> {
        let c = &mut self.controller;
        match step {
            Step::Select { selection, element } => {
                c.handle_select(SelectEvent::Selected { selection, element })
            }
            Step::ClearSelection => c.handle_select(SelectEvent::Cleared),
            Step::CreateRelation { relation } => {
                c.handle_relation_event(RelationEvent::CreateRelation(relation))
            }
            Step::SelectRelation { relation } => {
                c.handle_relation_event(RelationEvent::SelectRelation(relation))
            }
            Step::CancelDrawing => c.handle_relation_event(RelationEvent::CancelDrawing),
            Step::Created { annotation } => c.annotation_created(annotation),
            Step::Updated {
                annotation,
                previous,
            } => c.annotation_updated(annotation, previous),
            Step::Deleted { annotation } => c.annotation_deleted(annotation),
            Step::Cancel => c.annotation_cancelled(),
            Step::RelationSaved { relation, previous } => {
                c.relation_created_or_updated(relation, previous)
            }
            Step::RelationDeleted { relation } => c.relation_deleted(relation),
            Step::Key { key } => match key.as_str() {
                "Escape" | "Esc" => c.on_key(Key::Escape),
                _ => c.on_key(Key::Other),
            },
            Step::SetMode { mode } => {
                let mode: Mode = mode.parse()?;
                c.set_mode(mode);
            }
            Step::AssignId { original, id } => match self.host.id_override(&original) {
                Some(id_override) => id_override.apply(c, &id),
                None => warn!(%original, "no id override was issued for this id"),
            },
            Step::Commit => {
                self.highlights.take_frame();
                c.highlights_committed();
            }
            Step::SetAnnotations { annotations } => c.set_annotations(annotations),
            Step::AddAnnotation { annotation } => c.add_annotation(annotation),
            Step::RemoveAnnotation { annotation } => c.remove_annotation(&annotation),
            Step::SelectAnnotation { id } => {
                c.select_annotation(id.as_deref());
            }
            Step::SetReadOnly { value } => c.set_read_only(value),
            Step::SetDisableSelect { value } => c.set_disable_select(value),
            Step::SetDisableEditor { value } => c.set_disable_editor(value),
        }

        if !self.manual_frames && self.highlights.take_frame() {
            self.controller.highlights_committed();
        }

        Ok(self.host.drain())
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.controller.get_annotations()
    }

    pub fn mode(&self) -> Mode {
        self.controller.state().mode
    }

    pub fn is_settled(&self) -> bool {
        self.controller.is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r##"[
        { "op": "setAnnotations", "annotations": [
            { "id": "b", "target": { "selector": { "exact": "world" } },
              "bodies": [{ "purpose": "commenting", "value": "noun" }] }
        ]},
        { "op": "select", "element": "pending",
          "selection": { "kind": "fresh", "annotation": {
              "id": "#local-1", "target": { "selector": { "exact": "hello" } },
              "bodies": [{ "purpose": "commenting", "value": "", "draft": true }] } } },
        { "op": "created", "annotation": {
            "id": "#local-1", "target": { "selector": { "exact": "hello" } },
            "bodies": [{ "purpose": "commenting", "value": "greeting" }] } },
        { "op": "setMode", "mode": "RELATIONS" },
        { "op": "relationSaved",
          "previous": { "id": "#rel-1", "target": { "link": ["#local-1", "b"] } },
          "relation": { "id": "#rel-1", "target": { "link": ["#local-1", "b"] },
                        "bodies": [{ "purpose": "tagging", "value": "greets" }] } },
        { "op": "assignId", "original": "#local-1", "id": "srv-9" }
    ]"##;

    #[test]
    fn replays_create_relate_and_reconcile() {
        let steps = parse_script(SCRIPT).unwrap();
        let mut session = Session::new(&Config::default(), false);

        let mut events = Vec::new();
        for step in steps {
            events.extend(session.apply(step).unwrap());
        }

        let created = events
            .iter()
            .filter(|e| matches!(e, HostEvent::Created { .. }))
            .count();
        assert_eq!(created, 2);
        assert_eq!(session.mode(), Mode::Relations);
        assert!(session.is_settled());

        let all = session.annotations();
        assert!(all.iter().any(|a| a.id == "srv-9"));
        let relation = Relation::from_annotation(all[2].clone()).unwrap();
        assert_eq!(relation.endpoints(), ("srv-9", "b"));
    }

    #[test]
    fn manual_frames_hold_back_propagation() {
        let steps = parse_script(SCRIPT).unwrap();
        let mut session = Session::new(&Config::default(), true);
        for step in steps {
            session.apply(step).unwrap();
        }
        // relations were never initialised, and the id swap is still pending
        assert!(!session.is_settled());

        session.apply(Step::Commit).unwrap();
        assert!(session.is_settled());
    }

    #[test]
    fn unknown_mode_is_an_error() {
        let mut session = Session::new(&Config::default(), false);
        let err = session
            .apply(Step::SetMode {
                mode: "SKETCH".into(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("SKETCH"));
    }

    #[test]
    fn malformed_script_reports_context() {
        let err = parse_script(r#"[{ "op": "teleport" }]"#).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse session script");
    }
}
