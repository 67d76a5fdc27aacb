mod chrome;
mod traits;

pub use chrome::{ChromeRenderer, ChromeSession};
pub use traits::{HtmlRenderer, RenderScope, RenderSession};

use crate::config::RenderConfig;
use std::sync::Arc;

/// Create the HTML renderer from configuration
pub fn create_renderer(config: &RenderConfig) -> Arc<dyn HtmlRenderer> {
    Arc::new(ChromeRenderer::new(config.clone()))
}
