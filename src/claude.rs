use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::chatbot::completion::{CompletionClient, CompletionError, Persona};

/// Blank line (possibly holding spaces) between two chat messages.
static MESSAGE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid message break pattern"));

fn system_prompt(persona: Persona) -> &'static str {
    match persona {
        Persona::Friend => {
            "You are the user's friend, chatting with them on Telegram. \
             Be warm, casual and brief, like a real person texting. \
             When you want to send several separate chat messages, put a blank line between them. \
             Reply in the language the user writes in."
        }
    }
}

pub struct Client {
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'static str,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentPart {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ImageSource {
    Url { url: String },
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// One user turn: quoted context first, then the new inputs.
fn user_turn(inputs: &[String], context: &[String], image_url: Option<&str>) -> ApiMessage {
    let mut content = Vec::new();
    if let Some(url) = image_url {
        content.push(ContentPart::Image {
            source: ImageSource::Url { url: url.to_string() },
        });
    }
    for quoted in context {
        content.push(ContentPart::Text {
            text: format!("(replying to your earlier message: \"{quoted}\")"),
        });
    }
    for input in inputs {
        content.push(ContentPart::Text { text: input.clone() });
    }
    ApiMessage { role: "user", content }
}

/// Split a reply into separate chat messages on blank lines.
///
/// Whitespace-only pieces come back as empty strings.
fn split_outputs(text: &str) -> Vec<String> {
    MESSAGE_BREAK
        .split(text)
        .map(|part| part.trim().to_string())
        .collect()
}

impl Client {
    pub fn new(api_key: String, endpoint: String, model: String, max_tokens: u32) -> Self {
        Self {
            api_key,
            endpoint,
            model,
            max_tokens,
            http: reqwest::Client::new(),
        }
    }

    async fn message(&self, persona: Persona, turn: ApiMessage) -> Result<String, CompletionError> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt(persona),
            messages: vec![turn],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        let text: String = api_response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        debug!("Completion: {} chars", text.len());
        Ok(text)
    }
}

#[async_trait]
impl CompletionClient for Client {
    async fn complete(
        &self,
        persona: Persona,
        inputs: &[String],
        context: &[String],
    ) -> Result<Vec<String>, CompletionError> {
        info!("🤖 Completing as {} ({} input(s), {} context)", persona.as_str(), inputs.len(), context.len());
        let text = self.message(persona, user_turn(inputs, context, None)).await?;
        Ok(split_outputs(&text))
    }

    async fn complete_with_image(
        &self,
        persona: Persona,
        inputs: &[String],
        image_url: &str,
    ) -> Result<Option<String>, CompletionError> {
        info!("🤖 Completing image as {} ({} input(s))", persona.as_str(), inputs.len());
        let text = self.message(persona, user_turn(inputs, &[], Some(image_url))).await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_outputs_on_blank_lines() {
        assert_eq!(split_outputs("hello\n\nworld"), ["hello", "world"]);
        assert_eq!(split_outputs("one line\nsame message"), ["one line\nsame message"]);
        assert_eq!(split_outputs("a\n  \nb"), ["a", "b"]);
    }

    #[test]
    fn test_split_outputs_blank_pieces_are_empty() {
        assert_eq!(split_outputs("hi\n\n \n\nthere"), ["hi", "", "there"]);
        assert_eq!(split_outputs(""), [""]);
    }

    #[test]
    fn test_user_turn_puts_context_before_input() {
        let turn = user_turn(&["why?".to_string()], &["because".to_string()], None);
        assert_eq!(turn.role, "user");
        assert_eq!(
            turn.content,
            vec![
                ContentPart::Text { text: "(replying to your earlier message: \"because\")".to_string() },
                ContentPart::Text { text: "why?".to_string() },
            ]
        );
    }

    #[test]
    fn test_image_turn_serializes_url_source() {
        let turn = user_turn(&[], &[], Some("https://example.com/p.jpg"));
        let json = serde_json::to_value(&turn.content).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "type": "image", "source": { "type": "url", "url": "https://example.com/p.jpg" } }
            ])
        );
    }

    #[test]
    fn test_response_text_blocks() {
        let body = r#"{"content":[{"type":"text","text":"a"},{"type":"tool_use","id":"x"},{"type":"text","text":"b"}]}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        assert_eq!(text, "ab");
    }
}
