//! Class selection for wrapped objects (spec.md §4.8.1).
//!
//! The original system dispatches on a live class hierarchy rewritten per
//! document. Rust has no open classes, so this is reshaped into a registry
//! of trait objects keyed by `/Type` and `/Subtype` name, with `/Subtype`
//! taking precedence — the same precedence rule, expressed as a lookup
//! table instead of a method-resolution order.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::object::{Object, ObjectId};

/// A validator/behavior bundle a [`Document`](crate::document::Document)
/// can associate with an object's shape.
pub trait PdfObjectType: std::fmt::Debug + Send + Sync {
    /// Checks `value` against this class's structural rules. Returns
    /// `Ok(Some(replacement))` when `auto_correct` allowed fixing the value
    /// in place, `Ok(None)` when it was already fine, and an error when a
    /// problem was found but couldn't (or wasn't allowed to) be corrected.
    fn validate(
        &self,
        value: &Object,
        auto_correct: bool,
        on_problem: &mut dyn FnMut(bool, &str) -> bool,
    ) -> Result<Option<Object>>;

    /// Hook run after a wrapped object's data changes (spec.md §4.8.1); the
    /// default class has nothing to do here.
    fn after_data_change(&self, _id: ObjectId) {}
}

#[derive(Debug, Default)]
struct GenericObject;
impl PdfObjectType for GenericObject {
    fn validate(&self, _: &Object, _: bool, _: &mut dyn FnMut(bool, &str) -> bool) -> Result<Option<Object>> {
        Ok(None)
    }
}

#[derive(Debug, Default)]
struct GenericDictionary;
impl PdfObjectType for GenericDictionary {
    fn validate(&self, _: &Object, _: bool, _: &mut dyn FnMut(bool, &str) -> bool) -> Result<Option<Object>> {
        Ok(None)
    }
}

#[derive(Debug, Default)]
struct GenericStream;
impl PdfObjectType for GenericStream {
    fn validate(&self, value: &Object, _auto_correct: bool, on_problem: &mut dyn FnMut(bool, &str) -> bool) -> Result<Option<Object>> {
        if let Ok(stream) = value.as_stream() {
            if !stream.dict.has(b"Length") && stream.start_position.is_none() && on_problem(true, "stream missing /Length") {
                return Err(crate::error::ValidationError::MissingKey("Length").into());
            }
        }
        Ok(None)
    }
}

fn default_class_for(value: &Object) -> Arc<dyn PdfObjectType> {
    static OBJECT_CLASS: OnceLock<Arc<dyn PdfObjectType>> = OnceLock::new();
    static DICT_CLASS: OnceLock<Arc<dyn PdfObjectType>> = OnceLock::new();
    static STREAM_CLASS: OnceLock<Arc<dyn PdfObjectType>> = OnceLock::new();
    match value {
        Object::Stream(_) => STREAM_CLASS.get_or_init(|| Arc::new(GenericStream)).clone(),
        Object::Dictionary(_) => DICT_CLASS.get_or_init(|| Arc::new(GenericDictionary)).clone(),
        _ => OBJECT_CLASS.get_or_init(|| Arc::new(GenericObject)).clone(),
    }
}

/// Per-document registry of classes, keyed by `/Type` and `/Subtype` name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    type_map: HashMap<Vec<u8>, Arc<dyn PdfObjectType>>,
    subtype_map: HashMap<Vec<u8>, Arc<dyn PdfObjectType>>,
}

impl TypeRegistry {
    pub fn register_type(&mut self, name: impl Into<Vec<u8>>, class: Arc<dyn PdfObjectType>) {
        self.type_map.insert(name.into(), class);
    }

    pub fn register_subtype(&mut self, name: impl Into<Vec<u8>>, class: Arc<dyn PdfObjectType>) {
        self.subtype_map.insert(name.into(), class);
    }

    /// Resolves the class for `value`, honoring explicit hints (from a
    /// caller-supplied `wrap(..., type_hint, subtype_hint)`) ahead of the
    /// value's own `/Type`/`/Subtype`, subtype ahead of type, falling back
    /// to a shape-based default (spec.md §4.8.1).
    pub fn resolve(&self, value: &Object, type_hint: Option<&[u8]>, subtype_hint: Option<&[u8]>) -> Arc<dyn PdfObjectType> {
        let dict = value.as_dict().ok();
        let subtype = subtype_hint.or_else(|| dict.and_then(Dictionary::subtype_name));
        let type_name = type_hint.or_else(|| dict.and_then(Dictionary::type_name));

        if let Some(st) = subtype {
            if let Some(class) = self.subtype_map.get(st) {
                return class.clone();
            }
        }
        if let Some(t) = type_name {
            if let Some(class) = self.type_map.get(t) {
                return class.clone();
            }
        }
        default_class_for(value)
    }
}
