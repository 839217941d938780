//! Generation service trait.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::error::{ErrorCode, MindcordError, MindcordResult};

/// Black-box text completion: a prompt in, text out.
///
/// Implementations may be slow and may fail. The engine never retries; one
/// failure sends the caller down its fallback path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, prompt: &str) -> MindcordResult<String>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Output of a deadline-bounded completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub latency: Duration,
}

/// Run one completion under a deadline.
///
/// A timeout or a blank answer is reported as a generation error so every
/// caller handles it the same way.
pub async fn complete_within(
    service: &dyn GenerationService,
    prompt: &str,
    deadline: Duration,
) -> MindcordResult<Completion> {
    let started = Instant::now();
    let text = tokio::time::timeout(deadline, service.complete(prompt))
        .await
        .map_err(|_| MindcordError::generation_timeout(deadline))??;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(MindcordError::Generation {
            message: format!("{} returned an empty completion", service.model_name()),
            code: ErrorCode::GenEmptyResponse,
            source: None,
        });
    }

    Ok(Completion {
        text,
        latency: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_within_trims() {
        let mut service = MockGenerationService::new();
        service
            .expect_complete()
            .returning(|_| Ok("  hello there \n".to_string()));

        let out = complete_within(&service, "hi", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out.text, "hello there");
    }

    #[tokio::test]
    async fn test_blank_completion_is_error() {
        let mut service = MockGenerationService::new();
        service.expect_complete().returning(|_| Ok("   ".to_string()));
        service.expect_model_name().return_const("mock".to_string());

        let err = complete_within(&service, "hi", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::GenEmptyResponse);
    }

    struct Stalled;

    #[async_trait]
    impl GenerationService for Stalled {
        async fn complete(&self, _prompt: &str) -> MindcordResult<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".into())
        }

        fn model_name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_turns_stall_into_timeout() {
        let err = complete_within(&Stalled, "hi", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_generation());
        assert_eq!(err.code(), ErrorCode::GenTimeout);
    }
}
