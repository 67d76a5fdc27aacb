use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ConvertError;

/// Factory for HTML-to-PDF rendering sessions
#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &'static str;

    /// Acquire a session (e.g. launch a browser process).
    async fn start(&self) -> Result<Box<dyn RenderSession>, ConvertError>;
}

/// A live renderer, reused for every HTML document in one merge request
#[async_trait]
pub trait RenderSession: Send {
    /// Render a complete HTML document to PDF bytes.
    ///
    /// Implementations wait for the document to finish loading (images,
    /// stylesheets) before capturing.
    async fn render(&mut self, html: &str) -> Result<Vec<u8>, ConvertError>;

    /// Release the session. Calling it more than once is a no-op.
    async fn stop(&mut self) -> Result<(), ConvertError>;
}

/// Request-scoped render session that is only started on first use.
///
/// The owner must call [`RenderScope::close`] once it is done, on success
/// and failure paths alike.
pub struct RenderScope<'a> {
    renderer: &'a dyn HtmlRenderer,
    session: Option<Box<dyn RenderSession>>,
}

impl<'a> RenderScope<'a> {
    pub fn new(renderer: &'a dyn HtmlRenderer) -> Self {
        Self {
            renderer,
            session: None,
        }
    }

    pub const fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// The live session, started now if this is the first request for it.
    pub async fn session(&mut self) -> Result<&mut dyn RenderSession, ConvertError> {
        if self.session.is_none() {
            debug!("Starting {} render session", self.renderer.name());
            self.session = Some(self.renderer.start().await?);
        }

        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(ConvertError::rendering("render session unavailable")),
        }
    }

    /// Stop the session if one was started.
    pub async fn close(&mut self) -> Result<(), ConvertError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        debug!("Stopping {} render session", self.renderer.name());
        session.stop().await.inspect_err(|e| {
            warn!("Render session did not stop cleanly: {}", e);
        })
    }
}
