use std::time::Duration;

use serial_test::serial;
use trainer_config::{TrainerConfig, UploadMode, config_group};
use utils::{ByteSize, EnvVarGuard};

mod sample {
    use super::*;
    config_group!({
        ref retries: usize = 3;
        ref label: String = "default".to_string();
    });
}

#[test]
#[serial(default_config_env)]
fn defaults_match_the_documented_values() {
    let config = TrainerConfig::default();

    assert_eq!(config.client.endpoint, "http://localhost:8080");
    assert_eq!(config.client.auth_token, None);
    assert_eq!(config.upload.chunk_size, ByteSize::mib(1));
    assert_eq!(config.upload.max_file_size, ByteSize::mib(25));
    assert_eq!(config.upload.mode, UploadMode::Chunked);
    assert_eq!(config.poll.interval, Duration::from_secs(2));
    assert_eq!(config.log.prefix, "trainer");
}

#[test]
#[serial(default_config_env)]
fn environment_overrides_each_group() {
    let _env = EnvVarGuard::new()
        .with("TRAINER_CLIENT_ENDPOINT", "http://gateway:9000")
        .with("TRAINER_UPLOAD_CHUNK_SIZE", "256kib")
        .with("TRAINER_UPLOAD_MODE", "whole-file")
        .with("TRAINER_POLL_INTERVAL", "1500ms")
        .with("TRAINER_CLIENT_AUTH_TOKEN", "secret");

    let config = TrainerConfig::new();

    assert_eq!(config.client.endpoint, "http://gateway:9000");
    assert_eq!(config.client.auth_token.as_deref(), Some("secret"));
    assert_eq!(config.upload.chunk_size, ByteSize::kib(256));
    assert_eq!(config.upload.mode, UploadMode::WholeFile);
    assert_eq!(config.poll.interval, Duration::from_millis(1500));
}

#[test]
#[serial(default_config_env)]
fn unparsable_values_fall_back_to_defaults() {
    let _env = EnvVarGuard::new()
        .with("TRAINER_UPLOAD_MAX_FILE_SIZE", "huge")
        .with("TRAINER_UPLOAD_MODE", "carrier-pigeon");

    let config = TrainerConfig::new();

    assert_eq!(config.upload.max_file_size, ByteSize::mib(25));
    assert_eq!(config.upload.mode, UploadMode::Chunked);
}

#[test]
#[serial(default_config_env)]
fn group_name_comes_from_the_module() {
    assert_eq!(sample::ConfigValueGroup::env_var_name("retries"), "TRAINER_SAMPLE_RETRIES");

    let _retries = EnvVarGuard::set("TRAINER_SAMPLE_RETRIES", "9");
    let mut group = sample::ConfigValueGroup::new();
    group.apply_env_overrides();

    assert_eq!(group.retries, 9);
    assert_eq!(group.label, "default");
}

#[test]
#[serial(default_config_env)]
fn unset_variables_keep_programmatic_values() {
    let _env = EnvVarGuard::new()
        .without("TRAINER_CLIENT_ENDPOINT")
        .with("TRAINER_POLL_INTERVAL", "soon");

    let mut config = TrainerConfig::default().with_endpoint("http://edge:7000");
    config.poll.interval = Duration::from_millis(250);
    config.apply_env_overrides();

    assert_eq!(config.client.endpoint, "http://edge:7000");
    assert_eq!(config.poll.interval, Duration::from_millis(250));
    assert_eq!(sample::ConfigValueGroup::FIELDS, &["retries", "label"]);
}
