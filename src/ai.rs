//! AI image generation client
//!
//! One attempt per candidate model, in order. The first response that looks
//! like an image wins. A missing API key is a normal condition: the generator
//! reports itself unavailable and no request is made.

use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static NETWORK_ATTEMPT_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_network_attempt_count() -> u32 {
    NETWORK_ATTEMPT_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_network_attempt_count() {
    NETWORK_ATTEMPT_COUNT.store(0, Ordering::SeqCst);
}

/// Responses shorter than this are error bodies, not images.
pub const MIN_IMAGE_BYTES: usize = 100;

pub const ROUTER_BASE_URL: &str = "https://router.huggingface.co/models";

pub const DEFAULT_MODELS: [&str; 4] = [
    "black-forest-labs/FLUX.2-klein-9B",
    "ostris/OpenFLUX.1",
    "lodestones/Chroma",
    "runwayml/stable-diffusion-v1-5",
];

const STYLE_QUALIFIERS: &str = "Professional product photography, clean white background, \
    studio lighting, high quality, detailed, realistic, \
    e-commerce style, front view, centered composition, \
    photorealistic, 4k resolution";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI image service unavailable: no API key configured")]
    Unavailable,

    #[error("Model {model} failed: {reason}")]
    ModelFailed { model: String, reason: String },

    #[error("All {0} candidate models failed")]
    Exhausted(usize),
}

/// Text-to-image capability.
pub trait ImageGenerator {
    /// False when credentials are absent; callers must not call `generate`.
    fn is_available(&self) -> bool;

    fn generate(&self, prompt: &str) -> Result<Vec<u8>, AiError>;
}

pub fn build_prompt(product: &str, color: &str, user_prompt: &str) -> String {
    let mut prompt = format!(
        "A professional product photo of a {} {} in {} color, ",
        color, product, color
    );
    let user_prompt = user_prompt.trim();
    if !user_prompt.is_empty() {
        prompt.push_str(user_prompt);
        prompt.push_str(". ");
    }
    prompt.push_str(STYLE_QUALIFIERS);
    prompt
}

/// Reject empty or error bodies that a server labelled as image data.
pub fn check_image_bytes(model: &str, bytes: Vec<u8>) -> Result<Vec<u8>, AiError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(AiError::ModelFailed {
            model: model.to_string(),
            reason: format!("received invalid image data ({} bytes)", bytes.len()),
        });
    }
    Ok(bytes)
}

/// Hugging Face inference router client.
pub struct HuggingFaceGenerator {
    api_key: Option<String>,
    base_url: String,
    models: Vec<String>,
    agent: ureq::Agent,
}

impl HuggingFaceGenerator {
    /// `timeout` bounds each candidate attempt.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: ROUTER_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            agent,
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    fn request(&self, api_key: &str, model: &str, prompt: &str) -> Result<Vec<u8>, AiError> {
        #[cfg(feature = "test-hooks")]
        NETWORK_ATTEMPT_COUNT.fetch_add(1, Ordering::SeqCst);

        let fail = |reason: String| AiError::ModelFailed {
            model: model.to_string(),
            reason,
        };
        let url = format!("{}/{}", self.base_url, model);
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "num_inference_steps": 20,
                "guidance_scale": 7.5,
            },
        });

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::StatusCode(503) => fail("model is loading".to_string()),
                other => fail(other.to_string()),
            })?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(32 * 1024 * 1024)
            .read_to_vec()
            .map_err(|e| fail(e.to_string()))?;
        check_image_bytes(model, bytes)
    }
}

impl ImageGenerator for HuggingFaceGenerator {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn generate(&self, prompt: &str) -> Result<Vec<u8>, AiError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AiError::Unavailable);
        };

        for model in &self.models {
            debug!(model = %model, "requesting AI image");
            match self.request(api_key, model, prompt) {
                Ok(bytes) => {
                    info!(model = %model, bytes = bytes.len(), "AI image generated");
                    return Ok(bytes);
                }
                Err(e) => warn!(error = %e, "AI candidate failed"),
            }
        }
        Err(AiError::Exhausted(self.models.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    /// Answer one connection per canned response and return the request paths.
    fn serve(responses: Vec<(u16, Vec<u8>)>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut paths = vec![];
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let head = read_request(&mut stream);
                paths.push(head.split_whitespace().nth(1).unwrap_or_default().to_string());
                let reply = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
                stream.write_all(&body).unwrap();
            }
            paths
        });
        (base, handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let complete = if head.contains("transfer-encoding: chunked") {
                buf.ends_with(b"0\r\n\r\n")
            } else {
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                buf.len() >= end + 4 + length
            };
            if complete {
                return head;
            }
        }
        String::from_utf8_lossy(&buf).to_lowercase()
    }

    fn generator_for(base: &str, models: &[&str]) -> HuggingFaceGenerator {
        HuggingFaceGenerator::new(Some("hf_test".to_string()), Duration::from_secs(5))
            .with_base_url(base)
            .with_models(models.iter().map(|m| m.to_string()).collect())
    }

    #[test]
    fn test_candidates_tried_once_each_in_order() {
        let (base, server) = serve(vec![
            (503, b"loading".to_vec()),
            (200, b"tiny!".to_vec()),
            (200, vec![0x89; 300]),
        ]);
        let generator = generator_for(&base, &["a/one", "b/two", "c/three"]);

        let image = generator.generate("a hoodie").unwrap();
        assert_eq!(image.len(), 300);
        assert_eq!(server.join().unwrap(), vec!["/a/one", "/b/two", "/c/three"]);
    }

    #[test]
    fn test_first_plausible_image_stops_the_loop() {
        let (base, server) = serve(vec![(200, vec![7; MIN_IMAGE_BYTES])]);
        let generator = generator_for(&base, &["a/one", "b/two"]);

        assert_eq!(generator.generate("a tee").unwrap().len(), MIN_IMAGE_BYTES);
        assert_eq!(server.join().unwrap(), vec!["/a/one"]);
    }

    #[test]
    fn test_all_candidates_failing_is_exhaustion() {
        let (base, server) = serve(vec![(503, vec![]), (500, b"boom".to_vec())]);
        let generator = generator_for(&base, &["a/one", "b/two"]);

        assert!(matches!(generator.generate("a tee"), Err(AiError::Exhausted(2))));
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("Hoodie", "navy", "a mountain at dawn");
        assert!(prompt.starts_with("A professional product photo of a navy Hoodie in navy color, a mountain at dawn. "));
        assert!(prompt.ends_with("photorealistic, 4k resolution"));
    }

    #[test]
    fn test_prompt_without_user_text() {
        let prompt = build_prompt("T-Shirt", "red", "   ");
        assert_eq!(
            prompt,
            format!("A professional product photo of a red T-Shirt in red color, {}", STYLE_QUALIFIERS)
        );
    }

    #[test]
    fn test_tiny_response_rejected() {
        assert!(check_image_bytes("m", vec![0; MIN_IMAGE_BYTES - 1]).is_err());
        assert_eq!(check_image_bytes("m", vec![7; MIN_IMAGE_BYTES]).unwrap().len(), MIN_IMAGE_BYTES);
    }

    #[test]
    fn test_blank_key_is_unavailable() {
        let generator = HuggingFaceGenerator::new(Some("  ".to_string()), Duration::from_secs(1));
        assert!(!generator.is_available());
        assert!(matches!(generator.generate("x"), Err(AiError::Unavailable)));

        let keyed = HuggingFaceGenerator::new(Some("hf_abc".to_string()), Duration::from_secs(1));
        assert!(keyed.is_available());
        assert_eq!(keyed.models().len(), DEFAULT_MODELS.len());
    }
}
