/// Maximum message length, in characters.
pub const MAX_MESSAGE_LEN: usize = 10_000;

/// Accepted range for the per-task timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// File name used when the archive URL does not end in `.zip`.
pub const FALLBACK_ARCHIVE_NAME: &str = "downloaded_file.zip";

/// How long the quick endpoint waits for a conversation reference.
pub const QUICK_WAIT_SECS: u64 = 8;
