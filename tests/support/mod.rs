//! Shared helpers for the integration suites.

use std::collections::HashMap;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with backend-selection environment variables temporarily
/// applied (`REPOSITORY_TYPE`, `DATABASE_URL`, `PG_DATABASE_URL`), then
/// restores the previous values, panics included.
///
/// The process environment is global state, so access is serialized;
/// without the lock, parallel tests reading `RepositoryType::from_env`
/// would see each other's variables.
///
/// Each `(key, value)` pair in `changes` either sets the variable
/// (`Some(v)`) or removes it (`None`).
pub fn with_scoped_env<R>(changes: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
    let _lock = ENV_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvRestore::apply(changes);
    f()
}

struct EnvRestore {
    previous: HashMap<String, Option<String>>,
}

impl EnvRestore {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let mut previous = HashMap::new();
        for (key, value) in changes {
            previous
                .entry(key.to_string())
                .or_insert_with(|| std::env::var(key).ok());
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        Self { previous }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain() {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}
