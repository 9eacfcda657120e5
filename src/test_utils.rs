//! Helpers for tests that touch the process environment.
//!
//! Environment variables are process-wide, so every mutation goes through one
//! mutex. Tests that read configuration should also be `#[serial]`.

use std::env;
use std::ffi::{OsStr, OsString};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Set an environment variable while holding the global lock.
pub fn set_var<K: AsRef<OsStr>, V: AsRef<OsStr>>(key: K, value: V) {
    let _guard = lock();
    // SAFETY: the mutex serialises access to the unsynchronised std env calls.
    unsafe { env::set_var(key, value) };
}

/// Remove an environment variable while holding the global lock.
pub fn remove_var<K: AsRef<OsStr>>(key: K) {
    let _guard = lock();
    // SAFETY: the mutex serialises access to the unsynchronised std env calls.
    unsafe { env::remove_var(key) };
}

/// Clears a set of variables and restores their previous values on drop.
///
/// ```
/// use holonet::test_utils::{EnvVarGuard, set_var};
///
/// let _guard = EnvVarGuard::new(&["HOLONET_DOCTEST_VAR"]);
/// set_var("HOLONET_DOCTEST_VAR", "1");
/// ```
pub struct EnvVarGuard {
    saved: Vec<(OsString, Option<OsString>)>,
}

impl EnvVarGuard {
    #[must_use]
    pub fn new(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| {
                let previous = {
                    let _guard = lock();
                    env::var_os(key)
                };
                remove_var(key);
                (OsString::from(key), previous)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in &mut self.saved {
            match value.take() {
                Some(val) => set_var(&*key, val),
                None => remove_var(&*key),
            }
        }
    }
}
