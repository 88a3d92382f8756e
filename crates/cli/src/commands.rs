//! Subcommand implementations and collaborator wiring.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use analysis::{ReferenceChecker, SyntaxChecker};
use anyhow::Context;
use nodes::{AgentSettings, LlmCodeGenerator, LlmCodeReviewer, PipelineExecutor, RunOptions};
use pipeline::FinalResponse;
use server::{AppState, ProviderInfo};
use tracing::info;

use crate::config::AppConfig;

/// Everything a run needs, built once from configuration.
pub struct Runtime {
    executor: Arc<PipelineExecutor>,
    syntax: Arc<SyntaxChecker>,
    references: Arc<ReferenceChecker>,
    provider: ProviderInfo,
}

impl Runtime {
    pub fn assemble(config: &AppConfig) -> anyhow::Result<Self> {
        let provider = llm::build_provider(&config.llm).context("cannot build LLM provider")?;
        let settings = AgentSettings {
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        };
        let generator = LlmCodeGenerator::new(provider.clone(), settings)?;
        let reviewer = LlmCodeReviewer::new(provider, settings)?;

        let syntax = Arc::new(SyntaxChecker::new());
        let references = Arc::new(ReferenceChecker::from_config(&config.analysis));
        let executor = PipelineExecutor::builder(
            Arc::new(generator),
            syntax.clone(),
            references.clone(),
        )
        .reviewer(Arc::new(reviewer))
        .config(config.pipeline.clone())
        .build()?;

        Ok(Self {
            executor: Arc::new(executor),
            syntax,
            references,
            provider: ProviderInfo {
                provider: config.llm.provider.as_str().to_string(),
                model: config.llm.resolved_model().to_string(),
                base_url: config.llm.resolved_base_url().to_string(),
            },
        })
    }

    fn app_state(&self) -> AppState {
        AppState::new(
            self.executor.clone(),
            self.syntax.clone(),
            self.references.clone(),
            self.provider.clone(),
        )
    }
}

pub async fn serve(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let runtime = Runtime::assemble(config)?;
    server::serve(runtime.app_state(), config.server.bind).await?;
    Ok(ExitCode::SUCCESS)
}

/// How `generate` presents its result.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions<'a> {
    pub no_review: bool,
    pub json: bool,
    pub output: Option<&'a Path>,
}

pub async fn generate(
    config: &AppConfig,
    request: &str,
    options: OutputOptions<'_>,
) -> anyhow::Result<ExitCode> {
    let runtime = Runtime::assemble(config)?;
    let mut run = RunOptions::from(&config.pipeline);
    if options.no_review {
        run.enable_review = false;
    }

    let response = runtime.executor.submit_with(request, run).await;
    let json = serde_json::to_string_pretty(&response)?;

    if options.json {
        println!("{json}");
    } else {
        println!("{}", runtime.executor.render(&response));
    }
    if let Some(path) = options.output {
        std::fs::write(path, &json)
            .with_context(|| format!("cannot write result to {}", path.display()))?;
        info!(path = %path.display(), "Result written");
    }
    Ok(exit_code(&response))
}

pub async fn examples(
    config: &AppConfig,
    run: Option<u32>,
    options: OutputOptions<'_>,
) -> anyhow::Result<ExitCode> {
    let Some(id) = run else {
        for entry in server::EXAMPLES {
            println!("{}. {}\n   {}", entry.id, entry.title, entry.request);
        }
        return Ok(ExitCode::SUCCESS);
    };
    let entry = server::example(id).with_context(|| {
        format!(
            "no example with id {id} (expected 1-{})",
            server::EXAMPLES.len()
        )
    })?;
    info!(id, title = entry.title, "Running example");
    generate(config, entry.request, options).await
}

pub async fn check_agents(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let report = analysis::self_test(
        &SyntaxChecker::new(),
        &ReferenceChecker::from_config(&config.analysis),
    )
    .await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.all_working() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn exit_code(response: &FinalResponse) -> ExitCode {
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
