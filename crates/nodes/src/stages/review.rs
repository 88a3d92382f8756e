use pipeline::{CodeReviewer, RequestState, ReviewReport, Stage};
use tracing::{info, warn};

use super::{bounded, StageRunner};

impl StageRunner<'_> {
    /// Runs the review once. Never fails the run: a fault is stored as an
    /// error report.
    pub async fn review(&self, state: &mut RequestState, reviewer: &dyn CodeReviewer) {
        state.enter_stage(Stage::Review);
        let code = state.generated_code().unwrap_or_default().to_string();

        let report = match bounded(self.timeout(), reviewer.review(&code, state.user_request()))
            .await
        {
            Ok(report) => report,
            Err(fault) => {
                warn!(error = %fault, "code review call faulted");
                ReviewReport::Error {
                    error: fault.to_string(),
                }
            }
        };

        match &report {
            ReviewReport::Success(findings) => info!(
                score = ?findings.score.map(f64::from),
                critical = findings.critical_issues.len(),
                "code review completed"
            ),
            ReviewReport::Error { error } => warn!(error = %error, "code review unavailable"),
        }
        state.set_review_result(report);
    }
}
