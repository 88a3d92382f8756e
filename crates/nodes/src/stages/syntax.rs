use pipeline::{format_syntax_errors, AttemptKind, PipelineError, RequestState, Stage};
use tracing::{error, info, warn};

use super::{bounded, StageRunner};

impl StageRunner<'_> {
    /// Validates the candidate, adopting auto-corrections or regenerating
    /// with feedback until it parses or the pass budget runs out.
    pub async fn validate_syntax(&self, state: &mut RequestState) -> Result<(), PipelineError> {
        state.enter_stage(Stage::SyntaxCheck);
        let limit = self.config.max_syntax_retries;
        let context = format!("Generated for: {}", state.user_request());

        for pass in 1..=limit {
            state.record_attempt(AttemptKind::SyntaxFix);
            let code = state.generated_code().unwrap_or_default().to_string();
            info!(pass, limit, "syntax validation pass");

            let report = match bounded(
                self.timeout(),
                self.collaborators.syntax.validate(&code, Some(&context)),
            )
            .await
            {
                Ok(report) => report,
                Err(fault) => {
                    warn!(pass, error = %fault, "syntax validation call faulted");
                    state.log_error(format!("Syntax validation exception: {fault}"));
                    continue;
                }
            };

            if report.is_valid() {
                state.set_syntax_result(report);
                info!(pass, "syntax validation passed");
                return Ok(());
            }

            warn!(pass, issues = report.issues().len(), "syntax errors found");
            if let Some(fixed) = report.corrected_code().map(str::to_string) {
                state.set_syntax_result(report);
                info!(pass, "adopting auto-corrected code");
                state.set_generated_code(fixed);
                continue;
            }

            let brief = format_syntax_errors(&report);
            state.set_syntax_result(report);
            state.log_error(brief);
            self.generate(state).await?;
        }

        error!(limit, "syntax validation budget exhausted");
        Err(PipelineError::BudgetExhausted {
            stage: Stage::SyntaxCheck,
            limit,
        })
    }
}
