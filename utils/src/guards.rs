use std::env;

/// Sets a group of environment variables for the lifetime of the guard.
///
/// On drop every variable gets its previous value back, or is removed if it was unset.
/// The process environment is global, so tests using this should be `#[serial]`.
///
/// ```no_run
/// use utils::EnvVarGuard;
///
/// let _env = EnvVarGuard::new()
///     .with("TRAINER_POLL_INTERVAL", "500ms")
///     .with("TRAINER_UPLOAD_MODE", "whole-file");
/// ```
#[derive(Debug, Default)]
#[must_use = "the variables are restored as soon as the guard is dropped"]
pub struct EnvVarGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvVarGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a guard over a single variable.
    pub fn set(key: &str, value: &str) -> Self {
        Self::new().with(key, value)
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.saved.push((key.to_string(), env::var(key).ok()));
        unsafe {
            env::set_var(key, value);
        }
        self
    }

    /// Unsets `key` until the guard is dropped.
    pub fn without(mut self, key: &str) -> Self {
        self.saved.push((key.to_string(), env::var(key).ok()));
        unsafe {
            env::remove_var(key);
        }
        self
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // Reverse order, so a key touched twice ends at its original value.
        for (key, prev) in self.saved.drain(..).rev() {
            unsafe {
                match prev {
                    Some(v) => env::set_var(&key, v),
                    None => env::remove_var(&key),
                }
            }
        }
    }
}
