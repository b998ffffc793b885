//! Glossa Core - annotation authoring lifecycle controller
//!
//! This crate decides which editor popup is open, turns selection and
//! relation-drawing events into create/update/delete operations, and swaps
//! locally generated ids for host-issued ones without stranding relations
//! or in-flight edits. Rendering, hit-testing and the popups themselves are
//! collaborators described by the traits in [`traits`].

pub mod config;
pub mod controller;
pub mod error;
pub mod memory;
pub mod model;
pub mod reconcile;
pub mod state;
pub mod traits;

pub use config::{Config, Widget};
pub use controller::{Collaborators, Controller, NOSELECT_CLASS};
pub use error::{Error, Result};
pub use model::{
    Annotation, Body, ElementHandle, Relation, RelationEvent, SelectEvent, Selection, Target,
};
pub use reconcile::{IdOverride, OverrideTarget};
pub use state::{Action, EditorState, Mode, OpenEditor};
pub use traits::{
    AnnotatorHost, EditorSurface, HighlightEngine, Key, Keyboard, ListenerId, RelationLayer,
    SelectionDetector,
};
