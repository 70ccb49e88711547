#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{LlmProvider, Message};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given closure for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::OpenAi($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

/// Provider selected at runtime from configuration.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        delegate_provider!(self, |p| p.chat(messages).await)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    fn supports_embeddings(&self) -> bool {
        delegate_provider!(self, |p| p.supports_embeddings())
    }

    fn is_configured(&self) -> bool {
        delegate_provider!(self, |p| p.is_configured())
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama() -> AnyProvider {
        AnyProvider::Ollama(OllamaProvider::new(
            "http://localhost:11434",
            "llama3.1".into(),
            "nomic-embed-text".into(),
        ))
    }

    fn groq(api_key: &str) -> AnyProvider {
        AnyProvider::OpenAi(
            OpenAiProvider::new(
                api_key.into(),
                "https://api.groq.com/openai/v1".into(),
                "llama-3.1-8b-instant".into(),
                0.7,
                1024,
                None,
            )
            .with_name("groq"),
        )
    }

    #[test]
    fn any_ollama_name() {
        assert_eq!(ollama().name(), "ollama");
    }

    #[test]
    fn any_openai_name_uses_custom_name() {
        assert_eq!(groq("k").name(), "groq");
    }

    #[test]
    fn any_delegates_supports_embeddings() {
        assert!(ollama().supports_embeddings());
        assert!(!groq("k").supports_embeddings());
    }

    #[test]
    fn any_delegates_is_configured() {
        assert!(ollama().is_configured());
        assert!(groq("k").is_configured());
        assert!(!groq("").is_configured());
    }

    #[tokio::test]
    async fn any_openai_chat_unreachable_errors() {
        let provider = AnyProvider::OpenAi(OpenAiProvider::new(
            "k".into(),
            "http://127.0.0.1:1".into(),
            "m".into(),
            0.0,
            16,
            None,
        ));
        assert!(provider.chat(&[Message::user("hi")]).await.is_err());
    }
}
