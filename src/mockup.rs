//! Mockup Generation - ordered fallback strategies
//!
//! An AI request runs `AiImage -> PlaceholderDocument -> ManualComposite`.
//! A logo-only request runs `ManualComposite`. Failures before the last
//! strategy are logged and swallowed; the last strategy's error is returned.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ai::{build_prompt, AiError, ImageGenerator};
use crate::artifacts::{ArtifactStore, StoredArtifact};
use crate::catalog::ColorTable;
use crate::compositor::{CompositeError, Compositor};
use crate::models::OrderId;

#[derive(Debug, Error)]
pub enum MockupError {
    #[error("No logo provided: supply a logo URL or an AI prompt")]
    NoLogoProvided,

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error("Failed to write mockup artifact: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockupRequest {
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub ai_prompt: Option<String>,
}

impl MockupRequest {
    pub fn manual(logo_url: &str) -> Self {
        Self {
            logo_url: Some(logo_url.to_string()),
            ai_prompt: None,
        }
    }

    pub fn ai(prompt: &str, logo_url: Option<&str>) -> Self {
        Self {
            logo_url: logo_url.map(str::to_string),
            ai_prompt: Some(prompt.to_string()),
        }
    }

    pub fn logo(&self) -> Option<&str> {
        non_empty(self.logo_url.as_deref())
    }

    pub fn prompt(&self) -> Option<&str> {
        non_empty(self.ai_prompt.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockupStrategy {
    AiImage,
    PlaceholderDocument,
    ManualComposite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockupOutcome {
    pub artifact: StoredArtifact,
    pub strategy: MockupStrategy,
    pub ai_generated: bool,
    /// The user's prompt for any AI request, even when a fallback produced
    /// the artifact. Empty for manual requests.
    pub ai_prompt: String,
}

/// Strategies to try for `request`, in order.
pub fn plan(request: &MockupRequest) -> Result<Vec<MockupStrategy>, MockupError> {
    if request.prompt().is_some() {
        return Ok(vec![
            MockupStrategy::AiImage,
            MockupStrategy::PlaceholderDocument,
            MockupStrategy::ManualComposite,
        ]);
    }
    if request.logo().is_some() {
        return Ok(vec![MockupStrategy::ManualComposite]);
    }
    Err(MockupError::NoLogoProvided)
}

struct MockupJob<'a> {
    order_id: OrderId,
    product: &'a str,
    color: &'a str,
    request: &'a MockupRequest,
}

pub fn ai_mockup_key(order_id: OrderId, extension: &str) -> String {
    format!("mockups/ai_mockup_order_{}.{}", order_id, extension)
}

pub struct MockupGenerator {
    compositor: Compositor,
    generator: Box<dyn ImageGenerator>,
    artifacts: Arc<dyn ArtifactStore>,
    colors: Arc<ColorTable>,
}

impl MockupGenerator {
    pub fn new(
        compositor: Compositor,
        generator: Box<dyn ImageGenerator>,
        artifacts: Arc<dyn ArtifactStore>,
        colors: Arc<ColorTable>,
    ) -> Self {
        Self {
            compositor,
            generator,
            artifacts,
            colors,
        }
    }

    pub fn generate(
        &self,
        order_id: OrderId,
        product: &str,
        color: &str,
        request: &MockupRequest,
    ) -> Result<MockupOutcome, MockupError> {
        let strategies = plan(request)?;
        let job = MockupJob {
            order_id,
            product,
            color,
            request,
        };

        let last = strategies.len() - 1;
        for (depth, strategy) in strategies.into_iter().enumerate() {
            match self.attempt(strategy, &job) {
                Ok(artifact) => {
                    info!(order_id, ?strategy, depth, url = %artifact.url, "mockup generated");
                    return Ok(MockupOutcome {
                        artifact,
                        strategy,
                        ai_generated: strategy == MockupStrategy::AiImage,
                        ai_prompt: request.prompt().unwrap_or_default().to_string(),
                    });
                }
                Err(e) if depth < last => {
                    warn!(order_id, ?strategy, error = %e, "mockup strategy failed, falling back");
                }
                Err(e) => return Err(e),
            }
        }
        Err(MockupError::NoLogoProvided)
    }

    fn attempt(&self, strategy: MockupStrategy, job: &MockupJob<'_>) -> Result<StoredArtifact, MockupError> {
        match strategy {
            MockupStrategy::AiImage => self.ai_image(job),
            MockupStrategy::PlaceholderDocument => self.placeholder_document(job),
            MockupStrategy::ManualComposite => self.manual_composite(job),
        }
    }

    fn ai_image(&self, job: &MockupJob<'_>) -> Result<StoredArtifact, MockupError> {
        if !self.generator.is_available() {
            return Err(AiError::Unavailable.into());
        }
        let prompt = build_prompt(job.product, job.color, job.request.prompt().unwrap_or_default());
        debug!(order_id = job.order_id, %prompt, "AI prompt built");

        let bytes = self.generator.generate(&prompt)?;
        Ok(self.artifacts.write(&ai_mockup_key(job.order_id, "png"), &bytes)?)
    }

    fn placeholder_document(&self, job: &MockupJob<'_>) -> Result<StoredArtifact, MockupError> {
        let html = render_placeholder_html(
            job.order_id,
            job.product,
            job.color,
            &self.colors.css_hex(job.color),
            job.request.prompt().unwrap_or_default(),
        );
        Ok(self.artifacts.write(&ai_mockup_key(job.order_id, "html"), html.as_bytes())?)
    }

    fn manual_composite(&self, job: &MockupJob<'_>) -> Result<StoredArtifact, MockupError> {
        let logo = job.request.logo().ok_or(MockupError::NoLogoProvided)?;
        Ok(self.compositor.composite(job.order_id, logo, job.product, job.color)?)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Stand-in page shown when no AI image could be generated.
pub fn render_placeholder_html(
    order_id: OrderId,
    product: &str,
    color: &str,
    swatch: &str,
    prompt: &str,
) -> String {
    let product = escape_html(product);
    let color = escape_html(color);
    let prompt = escape_html(prompt);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>AI Mockup - Order {order_id}</title>
    <style>
        body {{ margin: 0; padding: 20px; font-family: 'Segoe UI', Tahoma, sans-serif;
               background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
               display: flex; justify-content: center; align-items: center; min-height: 100vh; }}
        .mockup {{ background: white; padding: 40px; border-radius: 20px; text-align: center; max-width: 500px; }}
        .product {{ width: 300px; height: 350px; margin: 20px auto; border: 3px solid #333;
                   border-radius: 20px; background: {swatch}; display: flex;
                   align-items: center; justify-content: center; }}
        .design {{ width: 180px; height: 120px; background: rgba(255,255,255,0.95); border-radius: 15px;
                  display: flex; align-items: center; justify-content: center; padding: 15px;
                  box-sizing: border-box; font-size: 14px; font-weight: 600; color: #333; }}
        .prompt {{ background: #f8f9fa; padding: 20px; border-radius: 15px; margin-top: 20px;
                  font-style: italic; color: #666; border-left: 4px solid #4ecdc4; }}
        .note {{ background: #e3f2fd; color: #1565c0; padding: 20px; border-radius: 10px;
                margin-top: 15px; font-size: 13px; text-align: left; line-height: 1.5; }}
    </style>
</head>
<body>
    <div class="mockup">
        <div class="badge">AI Mockup Preview</div>
        <h2>{color} {product}</h2>
        <div class="product"><div class="design">{prompt}</div></div>
        <div class="prompt"><strong>Your Design Vision:</strong><br>"{prompt}"</div>
        <div class="note">
            <strong>AI Image Generation Setup Required</strong>
            <p>To generate real AI images, you need a Hugging Face API token:</p>
            <ol>
                <li>Go to <strong>https://huggingface.co/settings/tokens</strong></li>
                <li>Generate a new token with "Read" permissions</li>
                <li>Export it as <code>HUGGINGFACE_API_KEY</code> (or <code>HF_TOKEN</code>)</li>
                <li>Restart the service</li>
            </ol>
        </div>
    </div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_orders_strategies() {
        let ai = MockupRequest::ai("retro sunset", Some("/uploads/logo.png"));
        assert_eq!(
            plan(&ai).unwrap(),
            vec![
                MockupStrategy::AiImage,
                MockupStrategy::PlaceholderDocument,
                MockupStrategy::ManualComposite
            ]
        );
        assert_eq!(plan(&MockupRequest::manual("/uploads/logo.png")).unwrap(), vec![MockupStrategy::ManualComposite]);
    }

    #[test]
    fn test_plan_requires_logo_or_prompt() {
        assert!(matches!(plan(&MockupRequest::default()), Err(MockupError::NoLogoProvided)));
        let blank = MockupRequest {
            logo_url: Some("  ".to_string()),
            ai_prompt: Some(String::new()),
        };
        assert!(matches!(plan(&blank), Err(MockupError::NoLogoProvided)));
    }

    #[test]
    fn test_placeholder_html_escapes_prompt() {
        let html = render_placeholder_html(5, "Hoodie", "red", "#e53e3e", "<script>alert(1)</script>");
        assert!(html.contains("AI Mockup - Order 5"));
        assert!(html.contains("background: #e53e3e;"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("HUGGINGFACE_API_KEY"));
    }
}
