//! JavaScript-backed collaborators
//!
//! Payloads cross the boundary as JSON. A collaborator that throws, or
//! lacks a method, is logged and treated as a no-op.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function, Reflect, JSON};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use glossa_core::memory::PopupView;
use glossa_core::{
    Annotation, AnnotatorHost, Controller, EditorState, EditorSurface, ElementHandle,
    HighlightEngine, IdOverride, Key, Keyboard, ListenerId, Relation, RelationLayer,
    SelectionDetector, Widget,
};

pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    JSON::parse(&json)
}

pub fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, JsValue> {
    let json: String = JSON::stringify(value)?.into();
    serde_json::from_str(&json).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

/// A JS object whose methods are called by name
#[derive(Debug, Clone)]
pub struct JsObject(JsValue);

impl JsObject {
    pub fn new(value: JsValue) -> Self {
        Self(value)
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Option<JsValue> {
        let function = match Reflect::get(&self.0, &JsValue::from_str(method)) {
            Ok(f) => f.dyn_into::<Function>().ok(),
            Err(_) => None,
        };
        let Some(function) = function else {
            warn(&format!("glossa: collaborator has no method {}", method));
            return None;
        };

        let args: Array = args.iter().collect();
        match function.apply(&self.0, &args) {
            Ok(result) => Some(result),
            Err(e) => {
                web_sys::console::error_2(&JsValue::from_str(&format!("glossa: {} threw", method)), &e);
                None
            }
        }
    }

    fn send<T: Serialize>(&self, method: &str, value: &T) {
        match to_js(value) {
            Ok(arg) => {
                self.call(method, &[arg]);
            }
            Err(e) => web_sys::console::error_1(&e),
        }
    }

    fn fetch<T: DeserializeOwned>(&self, method: &str, args: &[JsValue]) -> Option<T> {
        let result = self.call(method, args)?;
        if result.is_undefined() || result.is_null() {
            return None;
        }
        match from_js(&result) {
            Ok(value) => Some(value),
            Err(e) => {
                web_sys::console::error_1(&e);
                None
            }
        }
    }
}

fn optional<T: Serialize>(value: Option<&T>) -> JsValue {
    value
        .and_then(|v| to_js(v).ok())
        .unwrap_or(JsValue::NULL)
}

pub struct JsHighlights(pub JsObject);

impl HighlightEngine for JsHighlights {
    fn init(&mut self, annotations: Vec<Annotation>) {
        self.0.send("init", &annotations);
    }

    fn add_or_update(&mut self, annotation: Annotation, previous: Option<&Annotation>) {
        if let Ok(arg) = to_js(&annotation) {
            self.0.call("addOrUpdateAnnotation", &[arg, optional(previous)]);
        }
    }

    fn remove(&mut self, annotation: &Annotation) {
        self.0.send("removeAnnotation", annotation);
    }

    fn override_id(&mut self, from: &str, to: &str) -> Option<Annotation> {
        self.0
            .fetch("overrideId", &[JsValue::from_str(from), JsValue::from_str(to)])
    }

    fn find_spans(&self, id: &str) -> Vec<ElementHandle> {
        self.0
            .fetch("findAnnotationSpans", &[JsValue::from_str(id)])
            .unwrap_or_default()
    }

    fn list(&self) -> Vec<Annotation> {
        self.0.fetch("getAllAnnotations", &[]).unwrap_or_default()
    }

    fn clear(&mut self) {
        self.0.call("clear", &[]);
    }
}

pub struct JsRelations(pub JsObject);

impl RelationLayer for JsRelations {
    fn init(&mut self, relations: Vec<Relation>) {
        self.0.send("init", &relations);
    }

    fn add_or_update(&mut self, relation: Relation, previous: Option<&Relation>) {
        if let Ok(arg) = to_js(&relation) {
            self.0.call("addOrUpdateRelation", &[arg, optional(previous)]);
        }
    }

    fn remove(&mut self, relation: &Relation) {
        self.0.send("removeRelation", relation);
    }

    fn override_id(&mut self, from: &str, to: &str) -> Option<Relation> {
        self.0.fetch(
            "overrideRelationId",
            &[JsValue::from_str(from), JsValue::from_str(to)],
        )
    }

    fn list(&self) -> Vec<Relation> {
        self.0.fetch("getAllRelations", &[]).unwrap_or_default()
    }

    fn clear(&mut self) {
        self.0.call("clear", &[]);
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.0.call("setReadOnly", &[JsValue::from_bool(read_only)]);
    }

    fn start_drawing(&mut self) {
        self.0.call("startDrawing", &[]);
    }

    fn stop_drawing(&mut self) {
        self.0.call("stopDrawing", &[]);
    }

    fn reset_drawing(&mut self) {
        self.0.call("resetDrawing", &[]);
    }
}

pub struct JsSelector(pub JsObject);

impl SelectionDetector for JsSelector {
    fn set_enabled(&mut self, enabled: bool) {
        self.0.call("setEnabled", &[JsValue::from_bool(enabled)]);
    }

    fn clear_selection(&mut self) {
        self.0.call("clearSelection", &[]);
    }
}

/// What the JS popups receive on every committed state
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SurfaceView<'a> {
    popup: PopupView,
    annotation: Option<&'a Annotation>,
    element: Option<&'a ElementHandle>,
    relation: Option<&'a Relation>,
    mode: String,
    read_only: bool,
    widgets: &'a [Widget],
    allow_empty: bool,
    editor_auto_position: bool,
}

impl<'a> From<&'a EditorState> for SurfaceView<'a> {
    fn from(state: &'a EditorState) -> Self {
        Self {
            popup: PopupView::from(state),
            annotation: state.selected_annotation(),
            element: state.selected_element(),
            relation: state.selected_relation(),
            mode: state.mode.to_string(),
            read_only: state.read_only,
            widgets: &state.widgets,
            allow_empty: state.allow_empty,
            editor_auto_position: state.editor_auto_position,
        }
    }
}

pub struct JsSurface(pub JsObject);

impl EditorSurface for JsSurface {
    fn render(&mut self, state: &EditorState) {
        self.0.send("render", &SurfaceView::from(state));
    }

    fn set_root_class(&mut self, class: &str, present: bool) {
        self.0.call(
            "setRootClass",
            &[JsValue::from_str(class), JsValue::from_bool(present)],
        );
    }
}

/// Lets JS-held callbacks reach the controller after construction
#[derive(Clone, Default)]
pub struct Link {
    controller: Rc<RefCell<Weak<RefCell<Controller>>>>,
    mailbox: Rc<RefCell<Vec<(IdOverride, String)>>>,
}

impl Link {
    pub fn bind(&self, controller: &Rc<RefCell<Controller>>) {
        *self.controller.borrow_mut() = Rc::downgrade(controller);
    }

    /// Id overrides arriving while the controller is busy wait in the mailbox
    fn apply_override(&self, id_override: IdOverride, forced_id: String) {
        let Some(controller) = self.controller.borrow().upgrade() else {
            return;
        };
        let result = controller.try_borrow_mut();
        match result {
            Ok(mut c) => id_override.apply(&mut c, &forced_id),
            Err(_) => self.mailbox.borrow_mut().push((id_override, forced_id)),
        }
    }

    pub fn take_mail(&self) -> Vec<(IdOverride, String)> {
        std::mem::take(&mut self.mailbox.borrow_mut())
    }

    fn with_controller(&self, f: impl FnOnce(&mut Controller)) {
        let Some(controller) = self.controller.borrow().upgrade() else {
            return;
        };
        let result = controller.try_borrow_mut();
        if let Ok(mut c) = result {
            f(&mut c);
        }
    }
}

pub struct JsHost {
    callbacks: JsObject,
    link: Link,
}

impl JsHost {
    pub fn new(callbacks: JsValue, link: Link) -> Self {
        Self {
            callbacks: JsObject::new(callbacks),
            link,
        }
    }

    fn notify(&self, callback: &str, args: &[JsValue]) {
        self.callbacks.call(callback, args);
    }
}

impl AnnotatorHost for JsHost {
    fn on_annotation_selected(&mut self, annotation: Annotation, element: ElementHandle) {
        self.notify(
            "onAnnotationSelected",
            &[optional(Some(&annotation)), JsValue::from_str(&element.0)],
        );
    }

    fn on_annotation_created(&mut self, annotation: Annotation, id_override: IdOverride) {
        let link = self.link.clone();
        let apply = Closure::<dyn Fn(String)>::new(move |forced_id: String| {
            link.apply_override(id_override.clone(), forced_id);
        });
        self.notify(
            "onAnnotationCreated",
            &[optional(Some(&annotation)), apply.into_js_value()],
        );
    }

    fn on_annotation_updated(&mut self, annotation: Annotation, previous: Option<Annotation>) {
        self.notify(
            "onAnnotationUpdated",
            &[optional(Some(&annotation)), optional(previous.as_ref())],
        );
    }

    fn on_annotation_deleted(&mut self, annotation: Annotation) {
        self.notify("onAnnotationDeleted", &[optional(Some(&annotation))]);
    }

    fn on_cancel_selected(&mut self, annotation: Option<Annotation>) {
        self.notify("onCancelSelected", &[optional(annotation.as_ref())]);
    }
}

/// Window keydown listener, held only while the controller is active
pub struct WindowKeyboard {
    link: Link,
    listener: Option<(ListenerId, Closure<dyn Fn(web_sys::KeyboardEvent)>)>,
    next: u64,
}

impl WindowKeyboard {
    pub fn new(link: Link) -> Self {
        Self {
            link,
            listener: None,
            next: 0,
        }
    }
}

impl Keyboard for WindowKeyboard {
    fn listen(&mut self) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);

        let link = self.link.clone();
        let closure = Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(
            move |event: web_sys::KeyboardEvent| {
                let key = if event.key() == "Escape" {
                    Key::Escape
                } else {
                    Key::Other
                };
                link.with_controller(|c| c.on_key(key));
            },
        );

        if let Some(window) = web_sys::window() {
            if let Err(e) = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())
            {
                web_sys::console::error_1(&e);
            }
        }
        self.listener = Some((id, closure));
        id
    }

    fn release(&mut self, id: ListenerId) {
        let Some((held, closure)) = self.listener.take() else {
            return;
        };
        if held != id {
            self.listener = Some((held, closure));
            return;
        }
        if let Some(window) = web_sys::window() {
            let _ = window
                .remove_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        }
    }
}
