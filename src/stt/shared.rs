//! Shared model handles.
//!
//! Models are expensive to load, so each is loaded once per process and then
//! shared read-only by every segment worker. [`ModelHandle`] does the
//! explicit, locked, load-once initialization; [`Serialized`] guards a model
//! whose native runtime cannot run concurrent inference calls.

use crate::error::{DiarflowError, Result};
use crate::stt::aligner::{Aligner, WordTiming};
use crate::stt::transcriber::Transcriber;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{info, warn};

/// Lazily loaded, process-wide model slot.
///
/// The first successful [`ModelHandle::get_or_load`] stores the model; later
/// calls return the same `Arc` without invoking the loader. A failed load
/// leaves the slot empty so the caller may try again.
pub struct ModelHandle<T: ?Sized> {
    name: String,
    slot: Mutex<Option<Arc<T>>>,
}

impl<T: ?Sized> ModelHandle<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slot: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the loaded model, running `load` only if nothing is loaded yet.
    ///
    /// The slot lock is held while loading so concurrent first callers load
    /// the model exactly once.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<Arc<T>>,
    {
        let mut slot = self.slot.lock().map_err(|e| DiarflowError::ModelLoad {
            model: self.name.clone(),
            message: format!("model slot lock poisoned: {e}"),
        })?;

        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        let started = Instant::now();
        let model = load()?;
        info!(
            model = %self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model loaded"
        );
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// The loaded model, if any, without triggering a load.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.lock().ok().and_then(|slot| slot.as_ref().map(Arc::clone))
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

/// Wraps a model so only one inference call runs at a time.
///
/// Use for backends that are not safe for concurrent inference; the rest of
/// the pipeline can keep its concurrency for audio extraction and other
/// adapters.
pub struct Serialized<T> {
    inner: Mutex<T>,
    name: String,
}

impl<T: Transcriber> Serialized<T> {
    pub fn transcriber(inner: T) -> Self {
        let name = inner.model_name().to_string();
        Self {
            inner: Mutex::new(inner),
            name,
        }
    }
}

impl<T: Aligner> Serialized<T> {
    pub fn aligner(inner: T) -> Self {
        let name = inner.name().to_string();
        Self {
            inner: Mutex::new(inner),
            name,
        }
    }
}

impl<T> Serialized<T> {
    /// Take the model, recovering from a call that panicked while holding it.
    ///
    /// Inference does not mutate the model, so a panic in one segment leaves
    /// it usable for the next.
    fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(model = %self.name, "recovering model lock after a panicked call");
            self.inner.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl<T: Transcriber> Transcriber for Serialized<T> {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        self.lock().transcribe(audio)
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.lock().is_ready()
    }
}

impl<T: Aligner> Aligner for Serialized<T> {
    fn align(&self, audio: &[i16], sample_rate: u32, text: &str) -> Result<Vec<WordTiming>> {
        self.lock().align(audio, sample_rate, text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
