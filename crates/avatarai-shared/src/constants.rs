/// Application name
pub const APP_NAME: &str = "AvatarAI";

/// Path of the streaming chat WebSocket endpoint
pub const STREAM_PATH: &str = "/api/chat/stream";

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

// ---------------------------------------------------------------------------
// Upload limits
// ---------------------------------------------------------------------------

/// Maximum image upload size in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum video upload size in bytes (100 MiB)
pub const MAX_VIDEO_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum avatar upload size in bytes (5 MiB)
pub const MAX_AVATAR_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum banner upload size in bytes (10 MiB)
pub const MAX_BANNER_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of images attached to one post
pub const MAX_IMAGES: usize = 4;

// ---------------------------------------------------------------------------
// Text limits (in characters)
// ---------------------------------------------------------------------------

pub const MAX_POST_LENGTH: usize = 3000;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 300;

/// Character count above which the post counter turns to a warning
pub const POST_COUNTER_WARNING: usize = 2500;

/// Character count above which the post counter turns to an error
pub const POST_COUNTER_ERROR: usize = 2800;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Token refresh interval in seconds (23 hours)
pub const TOKEN_REFRESH_INTERVAL_SECS: u64 = 23 * 60 * 60;

/// A token expiring within this many seconds is refreshed proactively
pub const TOKEN_EXPIRY_THRESHOLD_SECS: i64 = 5 * 60;

/// Delay before the single reconnect attempt after an abnormal close
pub const RECONNECT_DELAY_MS: u64 = 3000;

/// WebSocket normal-closure code
pub const CLOSE_NORMAL: u16 = 1000;

/// WebSocket abnormal-closure code (no close frame received)
pub const CLOSE_ABNORMAL: u16 = 1006;

// ---------------------------------------------------------------------------
// Chat / feed defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_ROOM_ID: &str = "default";
pub const DEFAULT_THREAD_ID: &str = "default";

/// Receiver id of outbound chat messages
pub const ASSISTANT_RECEIVER_ID: &str = "assistant";

pub const FEED_PAGE_LIMIT: u32 = 20;
pub const HISTORY_LIMIT: u32 = 20;

/// Reply depth requested when opening a thread
pub const THREAD_DEPTH: u32 = 10;

/// Languages attached to every new moment
pub const POST_LANGS: [&str; 2] = ["zh", "en"];

/// Lexicon collection of moment records
pub const MOMENT_COLLECTION: &str = "app.vtri.activity.moment";

// ---------------------------------------------------------------------------
// Persisted state keys
// ---------------------------------------------------------------------------

pub const ACCESS_TOKEN_KEY: &str = "avatarai_access_token";
pub const REFRESH_TOKEN_KEY: &str = "avatarai_refresh_token";
pub const USER_KEY: &str = "avatarai_user";

/// Cookie names mirroring the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const LEGACY_TOKEN_COOKIE: &str = "avatarai_token";

/// Access token cookie lifetime in seconds (24 hours)
pub const TOKEN_COOKIE_MAX_AGE_SECS: i64 = 24 * 60 * 60;
