//! Controller state and its transition table
//!
//! `EditorState::reduce` is pure: collaborators are driven by the controller
//! after each committed transition.

use std::fmt;
use std::str::FromStr;

use crate::config::{Config, Widget};
use crate::error::Error;
use crate::model::{Annotation, ElementHandle, Relation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Selection on, annotation editing, no relation drawing
    #[default]
    Normal,
    /// Selection on, no popups ever shown
    Headless,
    /// Selection off, relation drawing on
    Relations,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Headless => "HEADLESS",
            Mode::Relations => "RELATIONS",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NORMAL" | "ANNOTATION" => Ok(Mode::Normal),
            "HEADLESS" => Ok(Mode::Headless),
            "RELATIONS" => Ok(Mode::Relations),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

/// Which editor popup is open. At most one can be.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OpenEditor {
    #[default]
    None,
    Annotation {
        annotation: Annotation,
        element: ElementHandle,
        /// Came from a fresh selection, never confirmed to the host
        fresh: bool,
    },
    Relation(Relation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub open: OpenEditor,
    pub mode: Mode,
    pub read_only: bool,
    pub editor_disabled: bool,
    pub select_disabled: bool,
    pub widgets: Vec<Widget>,
    pub allow_empty: bool,
    pub editor_auto_position: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Deselect,
    SelectAnnotation {
        annotation: Annotation,
        element: ElementHandle,
        fresh: bool,
    },
    EditRelation(Relation),
    CloseRelationEditor,
    CloseEditors,
    EnterMode(Mode),
    SetReadOnly(bool),
    SetWidgets(Vec<Widget>),
    SetEditorDisabled(bool),
    SetSelectDisabled(bool),
}

impl EditorState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            open: OpenEditor::None,
            mode: if config.disable_editor {
                Mode::Headless
            } else {
                Mode::Normal
            },
            read_only: config.read_only,
            editor_disabled: config.disable_editor,
            select_disabled: config.disable_select,
            widgets: config.widgets.clone(),
            allow_empty: config.allow_empty,
            editor_auto_position: config.editor_auto_position,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            read_only: self.read_only,
            widgets: self.widgets.clone(),
            disable_editor: self.editor_disabled,
            disable_select: self.select_disabled,
            allow_empty: self.allow_empty,
            editor_auto_position: self.editor_auto_position,
        }
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        match &self.open {
            OpenEditor::Annotation { annotation, .. } => Some(annotation),
            _ => None,
        }
    }

    pub fn selected_element(&self) -> Option<&ElementHandle> {
        match &self.open {
            OpenEditor::Annotation { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn selected_relation(&self) -> Option<&Relation> {
        match &self.open {
            OpenEditor::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    pub fn has_open_editor(&self) -> bool {
        !matches!(self.open, OpenEditor::None)
    }

    /// Whether the selection detector should currently be listening
    pub fn selection_enabled(&self) -> bool {
        self.mode != Mode::Relations && !self.select_disabled
    }

    pub fn reduce(self, action: Action) -> Self {
        match action {
            Action::Deselect => match self.open {
                OpenEditor::Annotation { .. } => Self {
                    open: OpenEditor::None,
                    ..self
                },
                _ => self,
            },
            Action::SelectAnnotation {
                annotation,
                element,
                fresh,
            } => Self {
                open: OpenEditor::Annotation {
                    annotation,
                    element,
                    fresh,
                },
                ..self
            },
            Action::EditRelation(relation) => Self {
                open: OpenEditor::Relation(relation),
                ..self
            },
            Action::CloseRelationEditor => match self.open {
                OpenEditor::Relation(_) => Self {
                    open: OpenEditor::None,
                    ..self
                },
                _ => self,
            },
            Action::CloseEditors => Self {
                open: OpenEditor::None,
                ..self
            },
            Action::EnterMode(mode) if mode == self.mode => self,
            Action::EnterMode(mode) => {
                let editor_disabled = match mode {
                    Mode::Normal => false,
                    Mode::Headless => true,
                    Mode::Relations => self.editor_disabled,
                };
                Self {
                    open: OpenEditor::None,
                    mode,
                    editor_disabled,
                    ..self
                }
            }
            Action::SetReadOnly(read_only) => Self { read_only, ..self },
            Action::SetWidgets(widgets) => Self { widgets, ..self },
            Action::SetEditorDisabled(editor_disabled) => {
                let mode = match (self.mode, editor_disabled) {
                    (Mode::Normal, true) => Mode::Headless,
                    (Mode::Headless, false) => Mode::Normal,
                    (mode, _) => mode,
                };
                let open = if editor_disabled {
                    OpenEditor::None
                } else {
                    self.open
                };
                Self {
                    open,
                    mode,
                    editor_disabled,
                    ..self
                }
            }
            Action::SetSelectDisabled(select_disabled) => Self {
                select_disabled,
                ..self
            },
        }
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Target;

    fn annotation() -> Annotation {
        Annotation::new("a-1", Target::Selector(serde_json::Value::Null), Vec::new())
    }

    fn select(state: EditorState) -> EditorState {
        state.reduce(Action::SelectAnnotation {
            annotation: annotation(),
            element: ElementHandle::new("span-1"),
            fresh: false,
        })
    }

    #[test]
    fn mode_names_round_trip() {
        for mode in [Mode::Normal, Mode::Headless, Mode::Relations] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert_eq!("relations".parse::<Mode>().unwrap(), Mode::Relations);
        assert!(matches!("DRAW".parse::<Mode>(), Err(Error::UnknownMode(_))));
    }

    #[test]
    fn editing_relation_closes_annotation_editor() {
        let state = select(EditorState::default())
            .reduce(Action::EditRelation(Relation::between("a", "b")));
        assert!(state.selected_annotation().is_none());
        assert!(state.selected_element().is_none());
        assert!(state.selected_relation().is_some());
    }

    #[test]
    fn selecting_annotation_closes_relation_editor() {
        let state = EditorState::default().reduce(Action::EditRelation(Relation::between("a", "b")));
        let state = select(state);
        assert!(state.selected_relation().is_none());
        assert_eq!(state.selected_element(), Some(&ElementHandle::new("span-1")));
    }

    #[test]
    fn deselect_leaves_relation_editor_alone() {
        let state = EditorState::default()
            .reduce(Action::EditRelation(Relation::between("a", "b")))
            .reduce(Action::Deselect);
        assert!(state.selected_relation().is_some());
    }

    #[test]
    fn entering_relations_keeps_headless_flag() {
        let state = EditorState::default()
            .reduce(Action::EnterMode(Mode::Headless))
            .reduce(Action::EnterMode(Mode::Relations));
        assert!(state.editor_disabled);
        assert!(!state.selection_enabled());

        let state = state.reduce(Action::EnterMode(Mode::Normal));
        assert!(!state.editor_disabled);
        assert!(state.selection_enabled());
    }

    #[test]
    fn reentering_current_mode_keeps_editor() {
        let state = select(EditorState::default()).reduce(Action::EnterMode(Mode::Normal));
        assert_eq!(state.selected_annotation(), Some(&annotation()));

        let state = state.reduce(Action::EnterMode(Mode::Headless));
        assert!(!state.has_open_editor());
    }

    #[test]
    fn disabling_editor_switches_to_headless() {
        let state = select(EditorState::default()).reduce(Action::SetEditorDisabled(true));
        assert_eq!(state.mode, Mode::Headless);
        assert!(!state.has_open_editor());

        let state = state.reduce(Action::SetEditorDisabled(false));
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn select_disabled_turns_selection_off() {
        let state = EditorState::default().reduce(Action::SetSelectDisabled(true));
        assert!(!state.selection_enabled());
        assert!(state.config().disable_select);
    }
}
