use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

macro_rules! debug_println {
    ($($arg:tt)*) => {
        if std::env::var("BOTANICA_DEBUG").is_ok() {
            eprintln!($($arg)*);
        }
    };
}

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const IDENTIFY_PROMPT: &str = "Identify this plant. Provide the common name, \
scientific name, and detailed care instructions formatted in clear Markdown. \
Include sections for Water, Sunlight, Soil, and Hardiness Zone. Keep the tone \
helpful and encouraging for a gardener.";

const SYSTEM_INSTRUCTION: &str = "You are an expert botanist and gardening \
assistant named 'Sprout'. You are helpful, friendly, and knowledgeable about \
all types of plants, gardening techniques, pests, and plant care. Answer \
questions concisely but thoroughly. If you don't know the answer, admit it and \
suggest where to look.";

pub const IDENTIFY_FALLBACK: &str = "Could not identify the plant. Please try another image.";
pub const CHAT_FALLBACK: &str = "I'm having trouble thinking right now.";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Content {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }
    }

    fn system(text: &str) -> Self {
        Content {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }
    }
}

/// Concatenated text of the first candidate, or None when the response
/// carries no text at all.
fn response_text(response: &GenerateResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn with_config(api_key: Option<String>, model: String) -> Self {
        GeminiClient {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", BASE_URL, self.model);
        debug_println!("[Gemini] POST {} ({} contents)", url, request.contents.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({}): {}", status, body));
        }

        Ok(response.json().await?)
    }

    /// Single-shot identification: one content carrying the image payload and
    /// the instruction prompt.
    pub async fn generate_with_image(
        &self,
        mime_type: &str,
        base64_data: &str,
        prompt: &str,
    ) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64_data.to_string(),
                        }),
                    },
                    Part {
                        text: Some(prompt.to_string()),
                        inline_data: None,
                    },
                ],
            }],
            system_instruction: None,
        };

        let response = self.generate(&request).await?;
        Ok(response_text(&response).unwrap_or_else(|| IDENTIFY_FALLBACK.to_string()))
    }
}

/// A stateful conversation. The Gemini REST endpoint itself is stateless, so
/// the session keeps the turn history client-side and replays it on each send.
pub struct ChatSession {
    client: GeminiClient,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(client: GeminiClient) -> Self {
        ChatSession {
            client,
            history: Vec::new(),
        }
    }

    /// Sends one user turn and returns the model's reply text. The pending
    /// user turn is rolled back on failure so the history only ever holds
    /// completed turns.
    pub async fn send(&mut self, message: &str) -> Result<String> {
        self.history.push(Content::text("user", message));

        let request = GenerateRequest {
            contents: self.history.clone(),
            system_instruction: Some(Content::system(SYSTEM_INSTRUCTION)),
        };

        match self.client.generate(&request).await {
            Ok(response) => {
                let text =
                    response_text(&response).unwrap_or_else(|| CHAT_FALLBACK.to_string());
                self.history.push(Content::text("model", &text));
                debug_println!("[Gemini] history now {} turns", self.history.len());
                Ok(text)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }
}
