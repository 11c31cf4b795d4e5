use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Process environment is global; config tests take turns.
static ENV_TURN: Mutex<()> = Mutex::new(());

/// Exclusive access to `SIMLAB_*` variables for one test. Every key touched
/// through the scope gets its original value back when the scope ends.
pub(crate) struct EnvScope {
    _turn: MutexGuard<'static, ()>,
    original: HashMap<&'static str, Option<String>>,
}

impl EnvScope {
    /// Takes the lock and unsets `keys` so ambient configuration cannot leak
    /// into the test.
    pub(crate) fn cleared(keys: &[&'static str]) -> Self {
        let mut scope = Self {
            _turn: ENV_TURN.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
            original: HashMap::new(),
        };
        for key in keys {
            scope.touch(key);
            std::env::remove_var(key);
        }
        scope
    }

    pub(crate) fn set(&mut self, key: &'static str, value: &str) {
        self.touch(key);
        std::env::set_var(key, value);
    }

    fn touch(&mut self, key: &'static str) {
        self.original
            .entry(key)
            .or_insert_with(|| std::env::var(key).ok());
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, value) in self.original.drain() {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}
