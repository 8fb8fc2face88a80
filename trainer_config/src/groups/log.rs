crate::config_group!({

    /// The log destination.  If this path exists as a directory or ends with a /, a new log file
    /// is created inside it for every process; otherwise logs are appended to that file.
    ///
    /// If given but empty, logs are printed to the console.  The default value is None (console).
    ///
    /// Use the environment variable `TRAINER_LOG_DEST` to set this value.
    ref dest: Option<String> = None;

    /// The format the logs are printed in. If "json", logs are dumped as json blobs; otherwise they
    /// are treated as text.  By default file logging is json and console logging is text.
    ///
    /// Use the environment variable `TRAINER_LOG_FORMAT` to set this value.
    ref format: Option<String> = None;

    /// The base name for a log file when logging to a directory.
    ///
    /// The default value is "trainer".
    ///
    /// Use the environment variable `TRAINER_LOG_PREFIX` to set this value.
    ref prefix: String = "trainer".to_string();

});
