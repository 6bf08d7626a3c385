//! The browser automation capability boundary.
//!
//! Warden does not drive a browser itself. An embedding application supplies
//! an [`AutomationBackend`]; approved `browser_*` calls are routed to it by
//! [`BrowserTool`](crate::BrowserTool).

use async_trait::async_trait;
use serde_json::Value;
use warden_core::{OpError, OpResult};

/// Operations a browser driver exposes. Every method has a default that
/// reports the operation as unsupported.
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// Result for an operation this backend does not implement.
    fn unsupported(&self, operation: &str) -> OpResult<Value> {
        OpResult::err(OpError::execution(format!(
            "automation backend does not support {operation}"
        )))
    }

    /// Load `url` in the page.
    async fn navigate(&self, page_id: &str, url: &str) -> OpResult<Value> {
        let _ = (page_id, url);
        self.unsupported("navigate")
    }

    /// Click the element matching `selector`.
    async fn click(&self, page_id: &str, selector: &str) -> OpResult<Value> {
        let _ = (page_id, selector);
        self.unsupported("click")
    }

    /// Type `value` into the element matching `selector`.
    async fn fill(&self, page_id: &str, selector: &str, value: &str) -> OpResult<Value> {
        let _ = (page_id, selector, value);
        self.unsupported("fill")
    }

    /// Capture the page as an image.
    async fn screenshot(&self, page_id: &str) -> OpResult<Value> {
        let _ = page_id;
        self.unsupported("screenshot")
    }

    /// Text content of the element matching `selector`.
    async fn get_text(&self, page_id: &str, selector: &str) -> OpResult<Value> {
        let _ = (page_id, selector);
        self.unsupported("get_text")
    }

    /// Wait until `selector` appears.
    async fn wait_for(
        &self,
        page_id: &str,
        selector: &str,
        timeout_ms: Option<u64>,
    ) -> OpResult<Value> {
        let _ = (page_id, selector, timeout_ms);
        self.unsupported("wait_for")
    }

    /// Run `script` in the page.
    async fn evaluate(&self, page_id: &str, script: &str) -> OpResult<Value> {
        let _ = (page_id, script);
        self.unsupported("evaluate")
    }

    /// Cookies visible to the page.
    async fn get_cookies(&self, page_id: &str) -> OpResult<Value> {
        let _ = page_id;
        self.unsupported("get_cookies")
    }

    /// Set a cookie.
    async fn set_cookie(&self, page_id: &str, cookie: &Value) -> OpResult<Value> {
        let _ = (page_id, cookie);
        self.unsupported("set_cookie")
    }

    /// Attach a local file to the input matching `selector`.
    async fn upload(&self, page_id: &str, selector: &str, file_path: &str) -> OpResult<Value> {
        let _ = (page_id, selector, file_path);
        self.unsupported("upload")
    }

    /// Download `url` to `save_path`.
    async fn download(&self, page_id: &str, url: &str, save_path: &str) -> OpResult<Value> {
        let _ = (page_id, url, save_path);
        self.unsupported("download")
    }
}

/// Backend used when no driver is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAutomation;

#[async_trait]
impl AutomationBackend for NoopAutomation {
    fn unsupported(&self, _operation: &str) -> OpResult<Value> {
        OpResult::err(OpError::execution("no automation backend configured"))
    }
}
