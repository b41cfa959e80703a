use std::sync::Arc;

use clausewatch_config::ApiKey;
use clausewatch_extraction::Document;
use clausewatch_llm::BackendConnector;
use clausewatch_utils::error::{ClauseWatchError, ValidationError};
use clausewatch_utils::logging::{Stage, stage_span};
use tracing::{debug, info, warn};

use crate::pipeline::{Analysis, AnalysisPipeline};
use crate::state::{ResultStep, Session, View};

/// Owns a [`Session`] and applies user actions to it.
///
/// Every failed action leaves the session exactly as it was.
pub struct SessionController {
    session: Session,
    api_key: Option<ApiKey>,
    connector: Arc<dyn BackendConnector>,
    pipeline: AnalysisPipeline,
}

impl SessionController {
    pub fn new(
        connector: Arc<dyn BackendConnector>,
        pipeline: AnalysisPipeline,
        api_key: Option<ApiKey>,
    ) -> Self {
        Self {
            session: Session::new(),
            api_key,
            connector,
            pipeline,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn set_api_key(&mut self, api_key: Option<ApiKey>) {
        self.api_key = api_key;
    }

    /// Replace the contract text. Only possible on the input view.
    pub fn set_contract_text(&mut self, text: impl Into<String>) -> Result<(), ValidationError> {
        if self.session.current_view != View::Input {
            return Err(ValidationError::NotAtInput);
        }
        self.session.contract_text = text.into();
        Ok(())
    }

    /// Extract `document` into the contract text. Returns the extracted
    /// character count.
    pub fn load_document(&mut self, document: &Document) -> Result<usize, ClauseWatchError> {
        if self.session.current_view != View::Input {
            return Err(ValidationError::NotAtInput.into());
        }
        let text = {
            let _span = stage_span(Stage::Extract, "-").entered();
            document.extract_text()?
        };
        let chars = text.chars().count();
        debug!(
            file = document.file_name.as_deref().unwrap_or("-"),
            chars, "loaded document"
        );
        self.session.contract_text = text;
        Ok(chars)
    }

    fn check_submittable(&self) -> Result<&ApiKey, ValidationError> {
        if self.session.current_view != View::Input {
            return Err(ValidationError::NotAtInput);
        }
        if self.session.contract_text.trim().is_empty() {
            return Err(ValidationError::EmptyContract);
        }
        self.api_key.as_ref().ok_or(ValidationError::MissingCredential)
    }

    /// `Input --submit--> Result(Overview)`.
    ///
    /// Runs the pipeline to completion before returning. On any error the
    /// session stays on the input view with its text intact.
    pub async fn submit(
        &mut self,
        on_fragment: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Analysis, ClauseWatchError> {
        let api_key = self.check_submittable()?;
        let backend = self.connector.connect(api_key)?;

        let analysis = match self
            .pipeline
            .run(backend, &self.session.contract_text, on_fragment)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "analysis failed; staying on input");
                return Err(e.into());
            }
        };

        let summary = analysis.parsed.summary_or(&self.session.risk_summary);
        self.session.risk_summary = summary;
        self.session.analysis_report = analysis.parsed.report.clone();
        self.session.negotiation_script = analysis.parsed.tips.clone();
        self.session.selected_model_id = analysis.model.model_id.clone();
        self.session.current_view = View::Result(ResultStep::Overview);

        info!(
            model = %self.session.selected_model_id,
            score = self.session.risk_summary.score.get(),
            "analysis complete"
        );
        Ok(analysis)
    }

    /// `Result --reset--> Input`, clearing every field.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Advance to the next result sub-step. No effect on the input view.
    pub fn next_step(&mut self) -> View {
        if let View::Result(step) = self.session.current_view {
            self.session.current_view = View::Result(step.next());
        }
        self.session.current_view
    }

    pub fn previous_step(&mut self) -> View {
        if let View::Result(step) = self.session.current_view {
            self.session.current_view = View::Result(step.previous());
        }
        self.session.current_view
    }
}
