pub mod browser;
pub mod core;
pub mod fetch;
pub mod redirect;

// --- Primary exports ---
pub use crate::browser::{BypassSession, SessionOptions};
pub use crate::core::config::{load_config, ToolConfig};
pub use crate::core::error::{DirectError, DirectResult};
pub use crate::core::types::{RewriteReport, RewrittenLink};
pub use crate::redirect::{decode_redirect_target, rewrite_document, RewriteOutcome};
