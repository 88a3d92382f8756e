use pipeline::{format_reference_errors, AttemptKind, PipelineError, RequestState, Stage};
use tracing::{error, info, warn};

use super::{bounded, StageRunner};

impl StageRunner<'_> {
    /// Verifies every reference in the candidate, regenerating with feedback
    /// until nothing is flagged or the pass budget runs out.
    pub async fn verify_references(&self, state: &mut RequestState) -> Result<(), PipelineError> {
        state.enter_stage(Stage::ReferenceCheck);
        let limit = self.config.max_hallucination_retries;

        for pass in 1..=limit {
            state.record_attempt(AttemptKind::HallucinationFix);
            let code = state.generated_code().unwrap_or_default().to_string();
            info!(pass, limit, "reference verification pass");

            let report = match bounded(
                self.timeout(),
                self.collaborators.references.verify(&code),
            )
            .await
            {
                Ok(report) => report,
                Err(fault) => {
                    warn!(pass, error = %fault, "reference verification call faulted");
                    state.log_error(format!("Hallucination detection exception: {fault}"));
                    continue;
                }
            };

            if report.is_verified() {
                state.set_hallucination_result(report);
                info!(pass, "all references verified");
                return Ok(());
            }

            warn!(
                pass,
                hallucinations = report.hallucinations().len(),
                "unverified references found"
            );
            let brief = format_reference_errors(&report);
            state.set_hallucination_result(report);
            state.log_error(brief);
            self.generate(state).await?;
        }

        error!(limit, "reference verification budget exhausted");
        Err(PipelineError::BudgetExhausted {
            stage: Stage::ReferenceCheck,
            limit,
        })
    }
}
