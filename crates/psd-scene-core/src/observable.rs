use std::fmt;

/// A single value with an optional change callback.
///
/// Writes are gated on value equality: assigning a value equal to the current
/// one never invokes the callback, which is what makes chains of observers
/// terminate.
pub struct Observable<T> {
    value: T,
    on_change: Option<Box<dyn FnMut(&T)>>,
}

impl<T: PartialEq> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            on_change: None,
        }
    }

    pub fn with_callback(initial: T, on_change: impl FnMut(&T) + 'static) -> Self {
        Self {
            value: initial,
            on_change: Some(Box::new(on_change)),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replaces the value if it differs from the current one.
    ///
    /// Returns `true` when a change happened (and the callback ran).
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.value);
        }
        true
    }
}

impl<T: Copy + PartialEq> Observable<T> {
    pub fn value(&self) -> T {
        self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("has_callback", &self.on_change.is_some())
            .finish()
    }
}
