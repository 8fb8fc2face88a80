use std::time::Duration;

crate::config_group!({

    /// Delay between two consecutive training status requests for the same job.
    ///
    /// The default value is 2s.
    ///
    /// Use the environment variable `TRAINER_POLL_INTERVAL` to set this value.
    ref interval: Duration = Duration::from_millis(2000);

});
