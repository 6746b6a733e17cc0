//! Shared constants used across the application.

/// User agent string sent on relayed and fetched upstream requests.
///
/// Some Discourse installs reject obvious bot agents on the JSON endpoints,
/// so requests present themselves as a regular desktop browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Discourse post action type id for "like".
pub const LIKE_ACTION_TYPE_ID: i64 = 2;

/// Number of post ids requested per `posts.json` call.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Number of progress lines retained for display.
pub const PROGRESS_LINES: usize = 3;

/// Upper bound on simulation ticks when laying out a graph server-side.
pub const MAX_LAYOUT_TICKS: u64 = 1000;

/// Ticks run while nodes are pinned. A held node keeps the layout warm, so
/// it never settles on its own.
pub const PINNED_LAYOUT_TICKS: u64 = 300;

/// Pan step of the page's arrow controls, in screen pixels.
pub const PAN_STEP: f64 = 80.0;

/// Zoom factor of the page's zoom controls.
pub const ZOOM_STEP: f64 = 1.25;
