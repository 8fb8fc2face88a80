use crate::groups;

/// All configuration groups of the trainer client.
#[derive(Debug, Clone, Default)]
pub struct TrainerConfig {
    pub client: groups::client::ConfigValueGroup,
    pub upload: groups::upload::ConfigValueGroup,
    pub poll: groups::poll::ConfigValueGroup,
    pub log: groups::log::ConfigValueGroup,
}

impl TrainerConfig {
    /// Defaults with environment overrides applied.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.client.apply_env_overrides();
        self.upload.apply_env_overrides();
        self.poll.apply_env_overrides();
        self.log.apply_env_overrides();
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.client.endpoint = endpoint.into();
        self
    }
}
