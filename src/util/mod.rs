//! Helpers for printing feed text to a terminal.
//!
//! # Examples
//!
//! ```
//! use feedtree::util::{display_width, sanitize_line, truncate_to_width};
//!
//! let title = sanitize_line("Liftoff\n  News\x1b[0m");
//! assert_eq!(title, "Liftoff News");
//! assert_eq!(display_width(&title), 12);
//! assert_eq!(truncate_to_width(&title, 10), "Liftoff...");
//! ```

mod text;

pub use text::{display_width, sanitize_line, truncate_to_width};
