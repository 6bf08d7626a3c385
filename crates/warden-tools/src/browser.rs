//! Built-in tools that route `browser_*` calls to an [`AutomationBackend`].

use serde_json::{Value, json};
use warden_core::{OpResult, params};

use crate::{BuiltinTool, ToolContext, ToolError};

/// One browser operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserAction {
    /// `browser_navigate`
    Navigate,
    /// `browser_click`
    Click,
    /// `browser_fill`
    Fill,
    /// `browser_screenshot`
    Screenshot,
    /// `browser_get_text`
    GetText,
    /// `browser_wait_for`
    WaitFor,
    /// `browser_evaluate`
    Evaluate,
    /// `browser_get_cookies`
    GetCookies,
    /// `browser_set_cookie`
    SetCookie,
    /// `browser_upload`
    Upload,
    /// `browser_download`
    Download,
}

impl BrowserAction {
    /// Every action.
    pub const ALL: [Self; 11] = [
        Self::Navigate,
        Self::Click,
        Self::Fill,
        Self::Screenshot,
        Self::GetText,
        Self::WaitFor,
        Self::Evaluate,
        Self::GetCookies,
        Self::SetCookie,
        Self::Upload,
        Self::Download,
    ];

    /// The tool name.
    #[must_use]
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::Navigate => "browser_navigate",
            Self::Click => "browser_click",
            Self::Fill => "browser_fill",
            Self::Screenshot => "browser_screenshot",
            Self::GetText => "browser_get_text",
            Self::WaitFor => "browser_wait_for",
            Self::Evaluate => "browser_evaluate",
            Self::GetCookies => "browser_get_cookies",
            Self::SetCookie => "browser_set_cookie",
            Self::Upload => "browser_upload",
            Self::Download => "browser_download",
        }
    }

    /// Parameters besides `page_id`.
    const fn required(self) -> &'static [&'static str] {
        match self {
            Self::Navigate => &["url"],
            Self::Click | Self::GetText | Self::WaitFor => &["selector"],
            Self::Fill => &["selector", "value"],
            Self::Evaluate => &["script"],
            Self::SetCookie => &["cookie"],
            Self::Upload => &["selector", "path"],
            Self::Download => &["url", "path"],
            Self::Screenshot | Self::GetCookies => &[],
        }
    }
}

/// Adapter from a `browser_*` tool call to the automation backend.
#[derive(Debug, Clone, Copy)]
pub struct BrowserTool {
    action: BrowserAction,
}

impl BrowserTool {
    /// A tool for one action.
    #[must_use]
    pub const fn new(action: BrowserAction) -> Self {
        Self { action }
    }

    /// The action this tool performs.
    #[must_use]
    pub const fn action(&self) -> BrowserAction {
        self.action
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

#[async_trait::async_trait]
impl BuiltinTool for BrowserTool {
    fn name(&self) -> &'static str {
        self.action.tool_name()
    }

    fn description(&self) -> &'static str {
        "Performs a browser action through the configured automation backend."
    }

    fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        properties.insert("page_id".into(), json!({"type": "string"}));
        for key in self.action.required() {
            let ty = if *key == "cookie" { "object" } else { "string" };
            properties.insert((*key).to_string(), json!({"type": ty}));
        }
        if self.action == BrowserAction::WaitFor {
            properties.insert("timeout_ms".into(), json!({"type": "integer"}));
        }
        let mut required = vec!["page_id"];
        required.extend(self.action.required());
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> OpResult<Value> {
        match self.run(&args, ctx).await {
            Ok(result) => result,
            Err(e) => OpResult::err(e.into()),
        }
    }
}

impl BrowserTool {
    async fn run(&self, args: &Value, ctx: &ToolContext) -> Result<OpResult<Value>, ToolError> {
        let page = str_arg(args, "page_id")?;
        let backend = ctx.automation.as_ref();
        let tool = self.name();

        Ok(match self.action {
            BrowserAction::Navigate => {
                let url = ctx.executor.authorize_url(tool, str_arg(args, "url")?)?;
                backend.navigate(page, &url).await
            },
            BrowserAction::Click => backend.click(page, str_arg(args, "selector")?).await,
            BrowserAction::Fill => {
                backend
                    .fill(page, str_arg(args, "selector")?, str_arg(args, "value")?)
                    .await
            },
            BrowserAction::Screenshot => backend.screenshot(page).await,
            BrowserAction::GetText => backend.get_text(page, str_arg(args, "selector")?).await,
            BrowserAction::WaitFor => {
                let timeout = args.get("timeout_ms").and_then(Value::as_u64);
                backend
                    .wait_for(page, str_arg(args, "selector")?, timeout)
                    .await
            },
            BrowserAction::Evaluate => backend.evaluate(page, str_arg(args, "script")?).await,
            BrowserAction::GetCookies => backend.get_cookies(page).await,
            BrowserAction::SetCookie => {
                let cookie = args
                    .get("cookie")
                    .ok_or_else(|| ToolError::InvalidArguments("cookie is required".into()))?;
                backend.set_cookie(page, cookie).await
            },
            BrowserAction::Upload => {
                let raw = params::path_param(args)
                    .ok_or_else(|| ToolError::InvalidArguments("path is required".into()))?;
                let path = ctx.executor.authorize_path(tool, raw)?;
                backend
                    .upload(page, str_arg(args, "selector")?, &path.to_string_lossy())
                    .await
            },
            BrowserAction::Download => {
                let url = ctx.executor.authorize_url(tool, str_arg(args, "url")?)?;
                let raw = params::path_param(args)
                    .ok_or_else(|| ToolError::InvalidArguments("path is required".into()))?;
                let path = ctx.executor.authorize_path(tool, raw)?;
                backend.download(page, &url, &path.to_string_lossy()).await
            },
        })
    }
}
