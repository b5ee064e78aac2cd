//! Small shared primitives.
//!
//! - **Debounce**: tick-driven settling of rapidly changing values
//! - **Text**: terminal-safe, width-aware string helpers for the CLI
//! - **URL validation**: HTTPS policy for the Articles API base URL

mod debounce;
mod text;
mod url_validator;

pub use debounce::Debounced;
pub use text::{display_width, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, UrlValidationError};
