//! Small extension traits that log an error or a missing value at the call site and pass the
//! value through unchanged, so that logging doesn't break up `?` chains.

use std::fmt::{Debug, Display};

use tracing::{debug, error, info, warn};

/// Logs the `Err` arm of a `Result` and returns the result unchanged.
pub trait ErrorPrinter {
    #[track_caller]
    fn log_error<M: Display>(self, message: M) -> Self;

    #[track_caller]
    fn warn_error<M: Display>(self, message: M) -> Self;

    #[track_caller]
    fn debug_error<M: Display>(self, message: M) -> Self;
}

impl<T, E: Debug> ErrorPrinter for Result<T, E> {
    #[track_caller]
    fn log_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = std::panic::Location::caller();
            error!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }

    #[track_caller]
    fn warn_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = std::panic::Location::caller();
            warn!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }

    #[track_caller]
    fn debug_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = std::panic::Location::caller();
            debug!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }
}

/// Logs when an `Option` is `None` and returns it unchanged.
pub trait OptionPrinter {
    #[track_caller]
    fn error_none<M: Display>(self, message: M) -> Self;

    #[track_caller]
    fn warn_none<M: Display>(self, message: M) -> Self;

    #[track_caller]
    fn info_none<M: Display>(self, message: M) -> Self;
}

impl<T> OptionPrinter for Option<T> {
    #[track_caller]
    fn error_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = std::panic::Location::caller();
            error!(caller = %caller, "{message}");
        }
        self
    }

    #[track_caller]
    fn warn_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = std::panic::Location::caller();
            warn!(caller = %caller, "{message}");
        }
        self
    }

    #[track_caller]
    fn info_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = std::panic::Location::caller();
            info!(caller = %caller, "{message}");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn logs_errors_and_passes_through() {
        let r: Result<u32, String> = Err("boom".to_string());
        let r = r.log_error("upload failed");
        assert!(r.is_err());
        assert!(logs_contain("upload failed"));
        assert!(logs_contain("boom"));

        let ok: Result<u32, String> = Ok(3);
        assert_eq!(ok.warn_error("never printed").unwrap(), 3);
        assert!(!logs_contain("never printed"));
    }

    #[test]
    #[traced_test]
    fn logs_missing_options() {
        let v: Option<u8> = None;
        assert!(v.info_none("auth disabled").is_none());
        assert!(logs_contain("auth disabled"));

        assert_eq!(Some(1).warn_none("not printed"), Some(1));
        assert!(!logs_contain("not printed"));
    }
}
