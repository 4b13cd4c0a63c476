use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use faq_common::openai::OpenAiClient;

use crate::error::AppError;

/// Reviews a question's steps and returns free-form feedback, shown verbatim.
#[async_trait]
pub trait StepValidator: Send + Sync {
    /// Identifies the reviewer in cache keys, so switching models does not serve
    /// stale feedback.
    fn model(&self) -> &str;
    async fn review(&self, question: &str, steps_text: &str) -> Result<String, AppError>;
}

pub fn build_prompt(question: &str, steps_text: &str) -> String {
    format!(
        "You are an expert technical documentation assistant. \
Review the following steps for the FAQ question: \"{question}\".\n\
1. Highlight if the question is addressed in the steps.\n\
2. Suggest alternatives or missing steps for clarity.\n\
3. Return a cleaned and improved version of the steps.\n\n\
Steps:\n{steps_text}"
    )
}

pub struct LlmValidator {
    client: Arc<OpenAiClient>,
    model: String,
}

impl LlmValidator {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl StepValidator for LlmValidator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn review(&self, question: &str, steps_text: &str) -> Result<String, AppError> {
        let prompt = build_prompt(question, steps_text);
        let feedback = self.client.complete_prompt(&self.model, &prompt).await?;
        info!(model = %self.model, chars = feedback.len(), "validation feedback received");
        Ok(feedback)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Echoes its input and counts calls.
    #[derive(Default)]
    pub struct EchoValidator {
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl EchoValidator {
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StepValidator for EchoValidator {
        fn model(&self) -> &str {
            "echo"
        }

        async fn review(&self, question: &str, steps_text: &str) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::from(
                    faq_common::openai::OpenAiClientError::EmptyCompletion,
                ));
            }
            Ok(format!("reviewed {question}: {steps_text}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use faq_common::openai::OpenAiClientConfig;

    use super::*;

    #[test]
    fn prompt_embeds_question_and_steps() {
        let prompt = build_prompt("Why does X fail?", "Step 1: Check logs\nStep 2: Restart");
        assert!(prompt.starts_with("You are an expert technical documentation assistant."));
        assert!(prompt.contains("FAQ question: \"Why does X fail?\""));
        assert!(prompt.contains("3. Return a cleaned and improved version of the steps."));
        assert!(prompt.ends_with("Steps:\nStep 1: Check logs\nStep 2: Restart"));
    }

    #[test]
    fn llm_validator_reports_its_model() {
        let client = OpenAiClient::new(OpenAiClientConfig::from_env()).unwrap();
        let validator = LlmValidator::new(Arc::new(client), "gemini-2.5-flash");
        assert_eq!(validator.model(), "gemini-2.5-flash");
    }
}
