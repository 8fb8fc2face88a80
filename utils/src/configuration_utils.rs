use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::ByteSize;

/// Values that can be read from a `TRAINER_*` environment variable.
///
/// Anything that fails to parse keeps its default and is reported with a warning, so a typo
/// in the environment never stops the client from starting.
pub trait ParsableConfigValue: std::fmt::Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        let Some(raw) = value else {
            debug!(variable = variable_name, value = ?default, "config default");
            return default;
        };
        match Self::parse_user_value(&raw) {
            Some(parsed) if is_secret(variable_name) => {
                info!(variable = variable_name, "config set from environment (value redacted)");
                parsed
            },
            Some(parsed) => {
                info!(variable = variable_name, value = ?parsed, "config set from environment");
                parsed
            },
            None => {
                warn!(variable = variable_name, raw = %raw, fallback = ?default, "unparsable config value; using default");
                default
            },
        }
    }
}

fn is_secret(variable_name: &str) -> bool {
    variable_name.ends_with("_TOKEN")
}

/// Marker for types whose `FromStr` impl is the right parser.  `bool`, `Option<T>` and
/// `Duration` get their own impls below.
pub trait FromStrParseable: FromStr + std::fmt::Debug {}

impl<T: FromStrParseable> ParsableConfigValue for T {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.trim().parse::<T>().ok()
    }
}

impl FromStrParseable for usize {}
impl FromStrParseable for u8 {}
impl FromStrParseable for u16 {}
impl FromStrParseable for u32 {}
impl FromStrParseable for u64 {}
impl FromStrParseable for f64 {}
impl FromStrParseable for String {}
impl FromStrParseable for ByteSize {}

/// Accepts the usual spellings: 1/0, true/false, yes/no, y/n, on/off.
pub fn parse_bool_value(value: &str) -> Option<bool> {
    let t = value.trim().to_ascii_lowercase();

    match t.as_str() {
        "0" | "false" | "no" | "n" | "off" => Some(false),
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        _ => None,
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_bool_value(value)
    }
}

/// Unset stays `None`; a set and parsable value becomes `Some`.
impl<T: ParsableConfigValue> ParsableConfigValue for Option<T> {
    fn parse_user_value(value: &str) -> Option<Self> {
        T::parse_user_value(value).map(Some)
    }
}

/// Durations accept the suffixes understood by the duration_str crate, e.g. "1500ms", "2s" or "1m".
impl ParsableConfigValue for std::time::Duration {
    fn parse_user_value(value: &str) -> Option<Self> {
        duration_str::parse(value.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn falls_back_to_default_on_bad_input() {
        assert_eq!(usize::parse("X", Some("nope".into()), 7), 7);
        assert_eq!(usize::parse("X", None, 7), 7);
        assert_eq!(usize::parse("X", Some(" 12 ".into()), 7), 12);
    }

    #[test]
    fn parses_bools_and_options() {
        assert!(bool::parse("B", Some("yes".into()), false));
        assert!(!bool::parse("B", Some("off".into()), true));
        assert_eq!(Option::<String>::parse("S", Some("abc".into()), None), Some("abc".to_string()));
        assert_eq!(Option::<String>::parse("S", None, None), None);
    }

    #[test]
    fn token_variables_are_secret() {
        assert!(is_secret("TRAINER_CLIENT_AUTH_TOKEN"));
        assert!(!is_secret("TRAINER_CLIENT_ENDPOINT"));
    }

    #[test]
    fn parses_durations_and_sizes() {
        assert_eq!(Duration::parse("D", Some("1500ms".into()), Duration::ZERO), Duration::from_millis(1500));
        assert_eq!(ByteSize::parse("S", Some("2mib".into()), ByteSize::new(0)), ByteSize::mib(2));
    }
}
