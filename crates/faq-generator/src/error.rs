use faq_common::error::CommonError;

use crate::model::{FaqId, StepId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("faq not found: {0}")]
    NotFound(FaqId),

    #[error("step not found: {0}")]
    StepNotFound(StepId),

    #[error("document error: {0}")]
    Document(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid base64 payload: {0}")]
    Encoding(#[from] base64::DecodeError),
}

impl From<faq_common::supabase::BackendError> for AppError {
    fn from(e: faq_common::supabase::BackendError) -> Self {
        AppError::Common(CommonError::Backend(e))
    }
}

impl From<faq_common::openai::OpenAiClientError> for AppError {
    fn from(e: faq_common::openai::OpenAiClientError) -> Self {
        AppError::Common(CommonError::Llm(e))
    }
}
