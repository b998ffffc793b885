//! Glossa Web - WebAssembly binding of the annotation controller
//!
//! The host constructs an `Annotator` from five JS objects (highlighter,
//! relations layer, selection handler, editor surface, callbacks) and a
//! configuration object, then forwards their events to it.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;

use glossa_core::{
    Annotation, Collaborators, Config, Controller, Mode, Relation, RelationEvent, SelectEvent,
    Widget,
};

pub mod bridge;

use bridge::{
    from_js, to_js, JsHighlights, JsHost, JsObject, JsRelations, JsSelector, JsSurface, Link,
    WindowKeyboard,
};

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"Glossa WASM initialized".into());
    Ok(())
}

/// Setters cannot throw; failures go to the console
fn report(result: Result<(), JsValue>) {
    if let Err(e) = result {
        web_sys::console::error_1(&e);
    }
}

#[wasm_bindgen]
pub struct Annotator {
    controller: Rc<RefCell<Controller>>,
    link: Link,
    /// Resolvers for `setAnnotations` promises still waiting for a commit
    settling: Rc<RefCell<Vec<Function>>>,
}

#[wasm_bindgen]
impl Annotator {
    #[wasm_bindgen(constructor)]
    pub fn new(
        highlights: JsValue,
        relations: JsValue,
        selector: JsValue,
        surface: JsValue,
        callbacks: JsValue,
        config: JsValue,
    ) -> Result<Annotator, JsValue> {
        let config: Config = if config.is_undefined() || config.is_null() {
            Config::default()
        } else {
            from_js(&config)?
        };

        let link = Link::default();
        let controller = Controller::new(
            Collaborators {
                highlights: Box::new(JsHighlights(JsObject::new(highlights))),
                relations: Box::new(JsRelations(JsObject::new(relations))),
                selector: Box::new(JsSelector(JsObject::new(selector))),
                surface: Box::new(JsSurface(JsObject::new(surface))),
                host: Box::new(JsHost::new(callbacks, link.clone())),
                keyboard: Box::new(WindowKeyboard::new(link.clone())),
            },
            &config,
        );
        let controller = Rc::new(RefCell::new(controller));
        link.bind(&controller);

        Ok(Annotator {
            controller,
            link,
            settling: Rc::new(RefCell::new(Vec::new())),
        })
    }

    /// Run `f` on the controller, then apply any id overrides the host
    /// issued while it was busy
    fn run<R>(&self, f: impl FnOnce(&mut Controller) -> R) -> Result<R, JsValue> {
        let result = {
            let mut controller = self
                .controller
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("glossa: re-entrant call from a collaborator"))?;
            f(&mut controller)
        };

        loop {
            let mail = self.link.take_mail();
            if mail.is_empty() {
                break;
            }
            let mut controller = self.controller.borrow_mut();
            for (id_override, forced_id) in mail {
                id_override.apply(&mut controller, &forced_id);
            }
        }
        Ok(result)
    }

    // --- inbound events ---------------------------------------------------

    #[wasm_bindgen(js_name = handleSelect)]
    pub fn handle_select(&self, event: JsValue) -> Result<(), JsValue> {
        let event: SelectEvent = from_js(&event)?;
        self.run(|c| c.handle_select(event))
    }

    #[wasm_bindgen(js_name = handleRelationEvent)]
    pub fn handle_relation_event(&self, event: JsValue) -> Result<(), JsValue> {
        let event: RelationEvent = from_js(&event)?;
        self.run(|c| c.handle_relation_event(event))
    }

    /// The highlighter has rendered its pending changes
    #[wasm_bindgen(js_name = visualCommit)]
    pub fn visual_commit(&self) -> Result<(), JsValue> {
        let settled = self.run(|c| {
            c.highlights_committed();
            c.is_settled()
        })?;
        if settled {
            let resolvers = std::mem::take(&mut *self.settling.borrow_mut());
            for resolve in resolvers {
                resolve.call0(&JsValue::NULL)?;
            }
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = annotationCreated)]
    pub fn annotation_created(&self, annotation: JsValue) -> Result<(), JsValue> {
        let annotation: Annotation = from_js(&annotation)?;
        self.run(|c| c.annotation_created(annotation))
    }

    #[wasm_bindgen(js_name = annotationUpdated)]
    pub fn annotation_updated(&self, annotation: JsValue, previous: JsValue) -> Result<(), JsValue> {
        let annotation: Annotation = from_js(&annotation)?;
        let previous: Annotation = from_js(&previous)?;
        self.run(|c| c.annotation_updated(annotation, previous))
    }

    #[wasm_bindgen(js_name = annotationDeleted)]
    pub fn annotation_deleted(&self, annotation: JsValue) -> Result<(), JsValue> {
        let annotation: Annotation = from_js(&annotation)?;
        self.run(|c| c.annotation_deleted(annotation))
    }

    #[wasm_bindgen(js_name = annotationCancelled)]
    pub fn annotation_cancelled(&self) -> Result<(), JsValue> {
        self.run(|c| c.annotation_cancelled())
    }

    #[wasm_bindgen(js_name = relationSaved)]
    pub fn relation_saved(&self, relation: JsValue, previous: JsValue) -> Result<(), JsValue> {
        let relation: Relation = from_js(&relation)?;
        let previous: Relation = from_js(&previous)?;
        self.run(|c| c.relation_created_or_updated(relation, previous))
    }

    #[wasm_bindgen(js_name = relationDeleted)]
    pub fn relation_deleted(&self, relation: JsValue) -> Result<(), JsValue> {
        let relation: Relation = from_js(&relation)?;
        self.run(|c| c.relation_deleted(relation))
    }

    #[wasm_bindgen(js_name = relationCancelled)]
    pub fn relation_cancelled(&self) -> Result<(), JsValue> {
        self.run(|c| c.relation_cancelled())
    }

    // --- external API -----------------------------------------------------

    #[wasm_bindgen(js_name = addAnnotation)]
    pub fn add_annotation(&self, annotation: JsValue) -> Result<(), JsValue> {
        let annotation: Annotation = from_js(&annotation)?;
        self.run(|c| c.add_annotation(annotation))
    }

    #[wasm_bindgen(js_name = getAnnotations)]
    pub fn get_annotations(&self) -> Result<JsValue, JsValue> {
        let annotations = self.run(|c| c.get_annotations())?;
        to_js(&annotations)
    }

    #[wasm_bindgen(js_name = removeAnnotation)]
    pub fn remove_annotation(&self, annotation: JsValue) -> Result<(), JsValue> {
        let annotation: Annotation = from_js(&annotation)?;
        self.run(|c| c.remove_annotation(&annotation))
    }

    #[wasm_bindgen(js_name = selectAnnotation)]
    pub fn select_annotation(&self, id: Option<String>) -> Result<JsValue, JsValue> {
        let selected = self.run(|c| c.select_annotation(id.as_deref()))?;
        match selected {
            Some(annotation) => to_js(&annotation),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Resolves once relations have been initialised on a visual commit
    #[wasm_bindgen(js_name = setAnnotations)]
    pub fn set_annotations(&self, annotations: JsValue) -> Result<Promise, JsValue> {
        let annotations: Vec<Annotation> = from_js(&annotations)?;
        self.run(|c| c.set_annotations(annotations))?;

        let settling = self.settling.clone();
        Ok(Promise::new(&mut |resolve, _reject| {
            settling.borrow_mut().push(resolve);
        }))
    }

    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode: Mode = mode
            .parse()
            .map_err(|e: glossa_core::Error| JsValue::from_str(&e.to_string()))?;
        self.run(|c| c.set_mode(mode))
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> String {
        self.controller.borrow().state().mode.to_string()
    }

    #[wasm_bindgen(getter, js_name = readOnly)]
    pub fn read_only(&self) -> bool {
        self.controller.borrow().state().read_only
    }

    #[wasm_bindgen(setter, js_name = readOnly)]
    pub fn set_read_only(&self, read_only: bool) {
        report(self.run(|c| c.set_read_only(read_only)));
    }

    #[wasm_bindgen(getter)]
    pub fn widgets(&self) -> Result<JsValue, JsValue> {
        to_js(&self.controller.borrow().state().widgets)
    }

    #[wasm_bindgen(setter)]
    pub fn set_widgets(&self, widgets: JsValue) {
        match from_js::<Vec<Widget>>(&widgets) {
            Ok(widgets) => report(self.run(|c| c.set_widgets(widgets))),
            Err(e) => web_sys::console::error_1(&e),
        }
    }

    #[wasm_bindgen(getter, js_name = disableEditor)]
    pub fn disable_editor(&self) -> bool {
        self.controller.borrow().state().editor_disabled
    }

    #[wasm_bindgen(setter, js_name = disableEditor)]
    pub fn set_disable_editor(&self, disabled: bool) {
        report(self.run(|c| c.set_disable_editor(disabled)));
    }

    #[wasm_bindgen(getter, js_name = disableSelect)]
    pub fn disable_select(&self) -> bool {
        self.controller.borrow().state().select_disabled
    }

    #[wasm_bindgen(setter, js_name = disableSelect)]
    pub fn set_disable_select(&self, disabled: bool) {
        report(self.run(|c| c.set_disable_select(disabled)));
    }

    /// Release the keyboard listener; the annotator stays usable otherwise
    pub fn destroy(&self) -> Result<(), JsValue> {
        self.run(|c| c.deactivate())
    }
}
