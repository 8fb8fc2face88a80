use std::time::Duration;

crate::config_group!({

    /// Base URL of the API gateway that serves the `/api/...` routes.
    ///
    /// The default value is "http://localhost:8080".
    ///
    /// Use the environment variable `TRAINER_CLIENT_ENDPOINT` to set this value.
    ref endpoint: String = "http://localhost:8080".to_string();

    /// Bearer token attached to every request when set.
    ///
    /// The default value is None (no authorization header).
    ///
    /// Use the environment variable `TRAINER_CLIENT_AUTH_TOKEN` to set this value.
    ref auth_token: Option<String> = None;

    /// Maximum time allowed to establish a TCP connection to the server.
    ///
    /// The default value is 30 seconds.
    ///
    /// Use the environment variable `TRAINER_CLIENT_CONNECT_TIMEOUT` to set this value.
    ref connect_timeout: Duration = Duration::from_secs(30);

    /// Maximum time allowed between receiving data packets of a response.
    ///
    /// The default value is 120 seconds.
    ///
    /// Use the environment variable `TRAINER_CLIENT_READ_TIMEOUT` to set this value.
    ref read_timeout: Duration = Duration::from_secs(120);

    /// User agent sent with each request.
    ///
    /// Use the environment variable `TRAINER_CLIENT_USER_AGENT` to set this value.
    ref user_agent: String = concat!("trainer-client/", env!("CARGO_PKG_VERSION")).to_string();

});
