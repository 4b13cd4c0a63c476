/// Error types shared by the FAQ tooling crates.
///
/// These cover the external collaborators (Redis, the backend REST/storage API, the LLM)
/// that any binary in the workspace talks to. Application errors are defined in each
/// binary crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("backend error: {0}")]
    Backend(#[from] crate::supabase::BackendError),

    #[error("llm error: {0}")]
    Llm(#[from] crate::openai::OpenAiClientError),
}
