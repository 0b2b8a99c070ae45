//! Configuration surface (spec.md §6.4). One `Config` value per `Document`,
//! built by overriding fields on `Config::default()` — there is no
//! process-wide mutable configuration state (spec.md §9).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::document::Document;
use crate::error::Result;

/// Callback invoked for a correctable parse error. Returning `true` raises
/// the error as fatal; returning `false` lets the parser recover with a
/// best-effort guess (spec.md §4.1 error policy).
///
/// Wrapped in a `Mutex` (not just owned by value) so `Config`, and in turn
/// `Document`, stays `Sync`: `Document::validate` walks objects through an
/// optional `rayon` iterator over `&Document`, which a bare `FnMut` behind a
/// `RefCell` would rule out.
pub type CorrectableErrorCallback = Box<dyn FnMut(&str, usize) -> bool + Send>;

pub type Task = Box<dyn Fn(&mut Document) -> Result<()> + Send + Sync>;

pub struct Config {
    /// If true and the trailer has an `Encrypt` entry, set up decryption at
    /// load time.
    pub auto_decrypt: bool,

    /// `(msg, pos) -> bool`; `true` means raise the error.
    pub on_correctable_error: Option<Mutex<CorrectableErrorCallback>>,

    /// If false, cross-reference reconstruction is never attempted even when
    /// parsing the xref table fails.
    pub try_xref_reconstruction: bool,

    /// Named document-level transformations (task.map).
    pub task_map: HashMap<String, Task>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auto_decrypt: true,
            on_correctable_error: None,
            try_xref_reconstruction: true,
            task_map: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("auto_decrypt", &self.auto_decrypt)
            .field("on_correctable_error", &self.on_correctable_error.is_some())
            .field("try_xref_reconstruction", &self.try_xref_reconstruction)
            .field("task_map", &self.task_map.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Config {
    pub fn with_auto_decrypt(mut self, value: bool) -> Self {
        self.auto_decrypt = value;
        self
    }

    pub fn with_try_xref_reconstruction(mut self, value: bool) -> Self {
        self.try_xref_reconstruction = value;
        self
    }

    pub fn with_correctable_error_callback(mut self, cb: CorrectableErrorCallback) -> Self {
        self.on_correctable_error = Some(Mutex::new(cb));
        self
    }

    /// Consult the callback, if any, about whether a correctable error
    /// should be raised. No callback means "always recover".
    pub fn should_raise(&self, message: &str, pos: usize) -> bool {
        match &self.on_correctable_error {
            Some(cb) => (cb.lock().expect("correctable-error callback mutex poisoned"))(message, pos),
            None => false,
        }
    }
}
