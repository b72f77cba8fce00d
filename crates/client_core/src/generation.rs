//! Poem and movie suggestions from a text-generation service.
//!
//! Nothing here ever surfaces an error to the caller: a failed or unusable
//! generation is replaced by fixed fallback text.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::domain::Genre;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

pub const POEM_PROMPT: &str = "Write a very short, sweet, 2-line Valentine's poem about a date at Carillon Point Kirkland. Keep it minimalistic and cute. NO MARKDOWN. JUST TEXT.";
pub const EMPTY_POEM_FALLBACK: &str = "You are the one I love, My Valentine forever.";
pub const POEM_FALLBACK: &str =
    "A day by the water, a night under stars, My heart is yours, wherever we are.";
pub const MOVIE_FALLBACK_TITLE: &str = "About Time";
pub const MOVIE_FALLBACK_DESCRIPTION: &str = "A beautiful story about love and moments.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation is not configured")]
    NotConfigured,
    #[error("text generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("text generation returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Stand-in used when no API key is available; every call falls back.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL)
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let response: GenerateResponse = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieSuggestion {
    pub title: String,
    pub description: String,
}

impl MovieSuggestion {
    pub fn fallback() -> Self {
        Self {
            title: MOVIE_FALLBACK_TITLE.to_string(),
            description: MOVIE_FALLBACK_DESCRIPTION.to_string(),
        }
    }
}

pub async fn compose_poem(generator: &dyn TextGenerator) -> String {
    match generator.generate(POEM_PROMPT).await {
        Ok(text) => {
            let poem = text.trim();
            if poem.is_empty() {
                EMPTY_POEM_FALLBACK.to_string()
            } else {
                poem.to_string()
            }
        }
        Err(GenerationError::EmptyResponse) => EMPTY_POEM_FALLBACK.to_string(),
        Err(error) => {
            warn!(%error, "poem generation failed; using fallback");
            POEM_FALLBACK.to_string()
        }
    }
}

pub fn movie_prompt(genre: Genre) -> String {
    format!(
        "List 5 different highly-rated {genre} movies for a Valentine's date night. For each, format as: \"TITLE | DESCRIPTION\". One per line. No markdown or numbering."
    )
}

/// Lines shaped like `TITLE | DESCRIPTION`.
pub fn movie_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| line.contains('|')).collect()
}

/// Picks one suggestion at random. `None` when the reply had no usable line.
pub async fn suggest_movie<R: Rng + ?Sized>(
    generator: &dyn TextGenerator,
    genre: Genre,
    rng: &mut R,
) -> Option<MovieSuggestion> {
    let text = match generator.generate(&movie_prompt(genre)).await {
        Ok(text) => text,
        Err(error) => {
            warn!(%error, %genre, "movie generation failed; using fallback");
            return Some(MovieSuggestion::fallback());
        }
    };
    let text = text.trim();

    let lines = movie_lines(text);
    if lines.is_empty() {
        debug!(%genre, "movie reply had no `title | description` lines");
        return None;
    }

    let line = lines[rng.gen_range(0..lines.len())];
    let mut fields = line.split('|').map(str::trim);
    let title = fields.next().unwrap_or_default();
    let description = fields.next().unwrap_or_default();

    if !title.is_empty() && !description.is_empty() {
        return Some(MovieSuggestion {
            title: title.to_string(),
            description: description.to_string(),
        });
    }

    Some(MovieSuggestion {
        title: if text.is_empty() {
            MOVIE_FALLBACK_TITLE.to_string()
        } else {
            text.to_string()
        },
        description: MOVIE_FALLBACK_DESCRIPTION.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/generation_tests.rs"]
mod tests;
