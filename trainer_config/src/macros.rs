/// Declares the `ConfigValueGroup` struct of a configuration group.
///
/// ```rust
/// mod upload {
///     trainer_config::config_group!({
///         ref chunk_size: usize = 1024;
///         ref label: String = "default".to_string();
///     });
/// }
///
/// let mut group = upload::ConfigValueGroup::new();
/// group.apply_env_overrides();
/// assert_eq!(upload::ConfigValueGroup::FIELDS, &["chunk_size", "label"]);
/// ```
///
/// The group is named after the module the macro is expanded in, so `chunk_size` in module
/// `groups::upload` is read from `TRAINER_UPLOAD_CHUNK_SIZE`.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        #[allow(unused_imports)]
        use $crate::ParsableConfigValue;

        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            fn default() -> Self {
                Self {
                    $( $name: $value, )+
                }
            }
        }

        impl ConfigValueGroup {
            pub const FIELDS: &'static [&'static str] = &[$( stringify!($name), )+];

            /// Defaults only; the environment is not consulted.
            pub fn new() -> Self {
                Self::default()
            }

            pub fn group_name() -> &'static str {
                module_path!().rsplit("::").next().unwrap_or("unknown")
            }

            pub fn env_var_name(field: &str) -> String {
                format!("{}_{}_{}", $crate::ENV_PREFIX, Self::group_name().to_uppercase(), field.to_uppercase())
            }

            /// Overrides every field whose environment variable is set.
            ///
            /// Unset variables leave the field alone, and a value that does not parse keeps the
            /// field's current value.
            pub fn apply_env_overrides(&mut self) {
                $(
                    let var = Self::env_var_name(stringify!($name));
                    if let Ok(raw) = std::env::var(&var) {
                        self.$name = <$type>::parse(&var, Some(raw), self.$name.clone());
                    }
                )+
            }
        }
    };
}
