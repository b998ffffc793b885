pub mod annotation;
pub mod relation;
pub mod selection;

pub use annotation::{local_id, Annotation, Body, Target};
pub use relation::Relation;
pub use selection::{ElementHandle, RelationEvent, SelectEvent, Selection};
