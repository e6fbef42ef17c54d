use std::time::Duration;

/// Default timeout for connect, read and write operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default upper bound on a single socket read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Default maximum declared frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for a [`crate::Connection`].
#[derive(Debug, Clone)]
pub struct ConnConfig {
    /// Timeout applied to connect and to every blocking read and write.
    /// `None` blocks indefinitely.
    pub timeout: Option<Duration>,
    /// Maximum bytes requested from the stream per read.
    pub read_chunk_size: usize,
    /// Frames declaring a larger size are rejected before their payload is read.
    pub max_frame_size: usize,
}

impl Default for ConnConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}
