//! `url` action: open a URL in the default browser.
//!
//! args:
//! - `url`: the URL to open

use async_trait::async_trait;
use vocalis_core::Arguments;

use crate::error::ActionError;
use crate::handler::{required_str_arg, Action};
use crate::types::ActionResult;

/// Hands a URL to the platform opener.
pub struct UrlOpenAction;

impl UrlOpenAction {
    /// Program and leading arguments that open a URL on this platform.
    fn opener() -> (&'static str, &'static [&'static str]) {
        if cfg!(target_os = "windows") {
            ("cmd", &["/C", "start", ""])
        } else if cfg!(target_os = "macos") {
            ("open", &[])
        } else {
            ("xdg-open", &[])
        }
    }
}

#[async_trait]
impl Action for UrlOpenAction {
    fn name(&self) -> &str {
        "url"
    }

    async fn perform(&self, args: Option<&Arguments>) -> Result<ActionResult, ActionError> {
        let url = required_str_arg(args, "url")?;

        let (program, lead) = Self::opener();
        tokio::process::Command::new(program)
            .args(lead)
            .arg(url)
            .stdin(std::process::Stdio::null())
            .spawn()?;

        tracing::info!(url = %url, "Opened URL");

        Ok(ActionResult::message(format!("Opened URL: {}", url)))
    }

    fn describe(&self, args: Option<&Arguments>) -> String {
        let url = required_str_arg(args, "url").unwrap_or("<no url>");
        format!("Open URL: {}", url)
    }
}
