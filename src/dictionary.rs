//! PDF dictionary: a Name -> Object map that preserves insertion order
//! (spec.md §3.1: "keys unique, insertion order preserved for round-trip
//! fidelity").

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::object::Object;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or_else(|| Error::InvalidObject(format!("missing key /{}", String::from_utf8_lossy(key))))
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        self.0
            .get_mut(key)
            .ok_or_else(|| Error::InvalidObject(format!("missing key /{}", String::from_utf8_lossy(key))))
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.0.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&[u8], &mut Object)> {
        self.0.iter_mut().map(|(k, v)| (k.as_slice(), v))
    }

    /// True when the `/Type` entry is the given name, as the teacher's
    /// `has_type`/`type_is` helper does.
    pub fn has_type(&self, type_name: &[u8]) -> bool {
        self.get(b"Type")
            .and_then(Object::as_name)
            .map(|n| n == type_name)
            .unwrap_or(false)
    }

    pub fn type_name(&self) -> Option<&[u8]> {
        self.get(b"Type").and_then(Object::as_name).ok()
    }

    pub fn subtype_name(&self) -> Option<&[u8]> {
        self.get(b"Subtype").and_then(Object::as_name).ok()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a [u8], &'a Object);
    type IntoIter = Box<dyn Iterator<Item = (&'a [u8], &'a Object)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Builds a [`Dictionary`] from `"key" => value` pairs, mirroring the
/// teacher's `dictionary!` macro.
#[macro_export]
macro_rules! dictionary {
    () => { $crate::dictionary::Dictionary::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::dictionary::Dictionary::new();
        $(dict.set($key, $value);)+
        dict
    }};
}
