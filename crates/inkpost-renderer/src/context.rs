//! Per-document render context.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Mutable state for one document render.
///
/// Extensions are shared and immutable; anything they need to remember
/// between `prepare`, inline rendering and `postprocess` lives in a typed
/// slot here. A new context is created for every render, so concurrent
/// renders through one pipeline never see each other's state.
#[derive(Default)]
pub struct RenderContext {
    source_path: Option<PathBuf>,
    slots: HashMap<TypeId, Box<dyn Any + Send>>,
    warnings: Vec<String>,
}

impl RenderContext {
    #[must_use]
    pub fn new(source_path: Option<PathBuf>) -> Self {
        Self {
            source_path,
            ..Self::default()
        }
    }

    /// Path of the document being rendered, when it came from a file.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Replace the `T` slot with `T::default()`.
    pub fn reset<T: Default + Send + 'static>(&mut self) {
        self.slots.insert(TypeId::of::<T>(), Box::new(T::default()));
    }

    /// The `T` slot, created on first access.
    pub fn state_mut<T: Default + Send + 'static>(&mut self) -> &mut T {
        self.slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("slot is keyed by its own TypeId")
    }

    /// The `T` slot, if anything created it.
    #[must_use]
    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<T>())
    }

    /// Record a non-fatal problem with the document.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}
