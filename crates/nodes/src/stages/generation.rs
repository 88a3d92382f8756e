use pipeline::{
    AttemptKind, GenerationRequest, GenerationResponse, PipelineError, RequestState, Stage,
};
use tracing::{error, info, warn};

use super::{bounded, StageRunner};

impl StageRunner<'_> {
    /// Runs the generation stage with a fresh local budget.
    ///
    /// When called from the syntax or reference stage, that stage is restored
    /// after a successful attempt so a later failure is attributed to it.
    pub async fn generate(&self, state: &mut RequestState) -> Result<(), PipelineError> {
        let caller = state.current_stage();
        state.enter_stage(Stage::Generating);
        let limit = self.config.max_generation_retries;

        for attempt in 1..=limit {
            if let Some(cap) = self.config.max_total_generation_attempts {
                let used = state.attempts().generation;
                if used >= cap {
                    error!(attempts = used, cap, "global generation cap reached");
                    return Err(PipelineError::GlobalBudgetExhausted {
                        attempts: used,
                        limit: cap,
                    });
                }
            }

            let total = state.record_attempt(AttemptKind::Generation);
            let request = self.generation_request(state);
            info!(attempt, limit, total, retry = request.is_retry(), "generation attempt");

            match bounded(
                self.timeout(),
                self.collaborators.generator.generate(&request),
            )
            .await
            {
                Ok(GenerationResponse::Success { code, .. }) => {
                    state.set_generated_code(code);
                    info!(attempt, "code generated");
                    if matches!(caller, Stage::SyntaxCheck | Stage::ReferenceCheck) {
                        state.enter_stage(caller);
                    }
                    return Ok(());
                }
                Ok(GenerationResponse::Error { error, .. }) => {
                    warn!(attempt, error = %error, "generation failed");
                    state.log_error(format!("Generation error: {error}"));
                }
                Err(fault) => {
                    warn!(attempt, error = %fault, "generation call faulted");
                    state.log_error(format!("Generation exception: {fault}"));
                }
            }
        }

        error!(limit, "generation budget exhausted");
        Err(PipelineError::BudgetExhausted {
            stage: Stage::Generating,
            limit,
        })
    }

    /// Feedback and the last candidate ride along whenever the error log is non-empty.
    fn generation_request(&self, state: &RequestState) -> GenerationRequest {
        let feedback = state.latest_feedback().map(str::to_string);
        let previous_attempt = feedback
            .as_ref()
            .and_then(|_| state.generated_code().map(str::to_string));
        GenerationRequest {
            request: state.user_request().to_string(),
            constraints: self.config.constraints.clone(),
            previous_attempt,
            feedback,
        }
    }
}
