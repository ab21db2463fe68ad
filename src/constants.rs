/// Name of the dedicated event pump thread.
pub(crate) const PUMP_THREAD_NAME: &str = "mpv-event-pump";

/// Environment variable naming an extra configuration file.
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Prefix for configuration overrides, e.g. `MPV__REQUEST__REPLY_TIMEOUT_MS`.
pub(crate) const ENV_PREFIX: &str = "MPV";

/// Engine options applied before initialization when none are configured.
/// Tuned for network streams: GPU output, on-screen controls and a large
/// demuxer cache.
pub(crate) const STREAMING_OPTIONS: &[(&str, &str)] = &[
    ("vo", "gpu"),
    ("keepaspect", "yes"),
    ("keepaspect-window", "no"),
    ("osc", "yes"),
    ("input-default-bindings", "yes"),
    ("input-vo-keyboard", "yes"),
    ("cache", "yes"),
    ("demuxer-max-bytes", "512M"),
    ("demuxer-max-back-bytes", "256M"),
];

/// Levels accepted by the engine's log message request.
pub(crate) const LOG_LEVELS: &[&str] = &["no", "fatal", "error", "warn", "info", "status", "v", "debug", "trace"];
