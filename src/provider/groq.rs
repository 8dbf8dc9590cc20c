use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::types::*;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Client for Groq's OpenAI-compatible chat-completions endpoint.
/// Configuration-bound and stateless per call; one instance is built at
/// startup and shared across requests.
pub struct GroqProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GroqProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    pub async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "temperature": 0.7,
            "messages": messages,
        });

        debug!("Groq API request: model={}", self.model);

        let resp = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::AuthError("Invalid API key".into()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::RequestError(format!("HTTP {status}: {text}")));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parse_completion(&body)
    }
}

/// Pull the assistant text out of an OpenAI-style completion body.
fn parse_completion(body: &serde_json::Value) -> Result<String, ProviderError> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::ParseError("missing message content in completion".into()))
}

impl super::ChatModel for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn chat<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<String, ProviderError>> + Send + 'a>,
    > {
        Box::pin(self.complete(messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completion_content() {
        let body = json!({
            "id": "chatcmpl-123",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Rest and fluids." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 40, "completion_tokens": 8 }
        });

        assert_eq!(parse_completion(&body).unwrap(), "Rest and fluids.");
    }

    #[test]
    fn missing_content_is_a_parse_error() {
        let body = json!({ "choices": [] });
        assert!(matches!(
            parse_completion(&body),
            Err(ProviderError::ParseError(_))
        ));
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let turns = [Message::system("rules"), Message::user("hi")];
        let v = serde_json::to_value(turns).unwrap();
        assert_eq!(v[0]["role"], "system");
        assert_eq!(v[1]["role"], "user");
        assert_eq!(v[1]["content"], "hi");
    }
}
