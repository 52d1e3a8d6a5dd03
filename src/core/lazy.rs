//! One-shot lazy cells.
//!
//! `LazyValue` memoizes a factory result until `reset`; concurrent first
//! readers block on the mutex and exactly one factory call happens.
//! `OnceSlot` is the per-page variant where the value is produced by the
//! caller (and may fail).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Memoized value computed by a factory at first read.
pub struct LazyValue<T> {
    factory: Factory<T>,
    cell: Mutex<Option<T>>,
}

impl<T: Clone> LazyValue<T> {
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            cell: Mutex::new(None),
        }
    }

    /// Return the cached value, computing it on first call.
    ///
    /// The lock is held while the factory runs.
    pub fn get(&self) -> T {
        let mut cell = self.cell.lock();
        if let Some(value) = cell.as_ref() {
            return value.clone();
        }
        let value = (self.factory)();
        *cell = Some(value.clone());
        value
    }

    /// Cached value without triggering computation.
    pub fn peek(&self) -> Option<T> {
        self.cell.lock().clone()
    }

    pub fn is_computed(&self) -> bool {
        self.cell.lock().is_some()
    }

    /// Drop the memoized value; the next `get` calls the factory again.
    pub fn reset(&self) {
        *self.cell.lock() = None;
    }
}

impl<T> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("computed", &self.cell.lock().is_some())
            .finish()
    }
}

/// Write-once slot for fallible per-page work.
#[derive(Default)]
pub struct OnceSlot<T> {
    cell: Mutex<Option<Arc<T>>>,
}

impl<T> OnceSlot<T> {
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(None),
        }
    }

    /// Return the stored value or run `init` to produce it.
    ///
    /// On error nothing is stored, so a later call retries.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let mut cell = self.cell.lock();
        if let Some(value) = cell.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(init()?);
        *cell = Some(Arc::clone(&value));
        Ok(value)
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.cell.lock().is_some()
    }

    pub fn reset(&self) {
        *self.cell.lock() = None;
    }
}

impl<T> fmt::Debug for OnceSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceSlot")
            .field("set", &self.cell.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_lazy_value_computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyValue::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert!(!lazy.is_computed());
        assert_eq!(lazy.peek(), None);
        assert_eq!(lazy.get(), 42);
        assert_eq!(lazy.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        lazy.reset();
        assert_eq!(lazy.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lazy_value_concurrent_first_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyValue::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Arc::new(vec![1, 2, 3])
        });

        let results: Vec<Arc<Vec<i32>>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| lazy.get())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_once_slot_error_is_not_cached() {
        let slot: OnceSlot<String> = OnceSlot::new();
        let err: Result<_, &str> = slot.get_or_try_init(|| Err("boom"));
        assert!(err.is_err());
        assert!(!slot.is_set());

        let value = slot.get_or_try_init::<&str>(|| Ok("ok".to_string())).unwrap();
        assert_eq!(value.as_str(), "ok");

        let again = slot
            .get_or_try_init::<&str>(|| Ok("other".to_string()))
            .unwrap();
        assert!(Arc::ptr_eq(&value, &again));

        slot.reset();
        assert!(slot.get().is_none());
    }
}
