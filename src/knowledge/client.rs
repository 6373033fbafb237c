use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion, Region};
use aws_sdk_bedrockagent::{error::ProvideErrorMetadata, types::IngestionJob as SdkIngestionJob};
use aws_sdk_bedrockagentruntime::{
    error::DisplayErrorContext,
    types::{
        GenerationConfiguration, InferenceConfig, KnowledgeBaseRetrievalConfiguration,
        KnowledgeBaseRetrieveAndGenerateConfiguration, KnowledgeBaseVectorSearchConfiguration,
        OrchestrationConfiguration, PromptTemplate, QueryTransformationConfiguration,
        QueryTransformationType, RetrieveAndGenerateConfiguration, RetrieveAndGenerateInput,
        RetrieveAndGenerateType, SearchType, TextInferenceConfig,
    },
};
use tracing::{debug, error};

use super::{
    prompt::{InferenceParams, RagRequest},
    repo_types::{Citation, IngestionJob, RagAnswer},
};
use crate::{
    config::KnowledgeBaseConfig,
    error::{AppError, AppResult},
};

#[async_trait]
pub trait KnowledgeBaseClient: Send + Sync {
    /// Fails with `ServiceUnavailable` when the upstream call does.
    async fn retrieve_and_generate(&self, request: RagRequest) -> AppResult<RagAnswer>;
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> AppResult<IngestionJob>;
    async fn ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> AppResult<IngestionJob>;
}

#[derive(Clone)]
pub struct BedrockKnowledgeBase {
    runtime: aws_sdk_bedrockagentruntime::Client,
    agent: aws_sdk_bedrockagent::Client,
}

impl BedrockKnowledgeBase {
    pub async fn new(cfg: &KnowledgeBaseConfig) -> Self {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .load()
            .await;
        Self {
            runtime: aws_sdk_bedrockagentruntime::Client::new(&shared),
            agent: aws_sdk_bedrockagent::Client::new(&shared),
        }
    }
}

fn build_failed(err: impl std::fmt::Display) -> AppError {
    AppError::Unexpected(format!("build retrieve-and-generate request: {err}"))
}

fn inference_config(params: &InferenceParams) -> InferenceConfig {
    InferenceConfig::builder()
        .text_inference_config(
            TextInferenceConfig::builder()
                .temperature(params.temperature)
                .top_p(params.top_p)
                .max_tokens(params.max_tokens)
                .set_stop_sequences(Some(params.stop_sequences.clone()))
                .build(),
        )
        .build()
}

fn configuration(req: &RagRequest) -> AppResult<RetrieveAndGenerateConfiguration> {
    let retrieval = KnowledgeBaseRetrievalConfiguration::builder()
        .vector_search_configuration(
            KnowledgeBaseVectorSearchConfiguration::builder()
                .number_of_results(req.number_of_results)
                .override_search_type(SearchType::Hybrid)
                .build(),
        )
        .build();

    let generation = GenerationConfiguration::builder()
        .prompt_template(
            PromptTemplate::builder()
                .text_prompt_template(&req.answer_prompt)
                .build(),
        )
        .inference_config(inference_config(&req.inference))
        .build();

    let orchestration = OrchestrationConfiguration::builder()
        .query_transformation_configuration(
            QueryTransformationConfiguration::builder()
                .r#type(QueryTransformationType::QueryDecomposition)
                .build()
                .map_err(build_failed)?,
        )
        .prompt_template(
            PromptTemplate::builder()
                .text_prompt_template(&req.orchestration_prompt)
                .build(),
        )
        .inference_config(inference_config(&req.inference))
        .build();

    let knowledge_base = KnowledgeBaseRetrieveAndGenerateConfiguration::builder()
        .knowledge_base_id(&req.knowledge_base_id)
        .model_arn(&req.model_arn)
        .retrieval_configuration(retrieval)
        .generation_configuration(generation)
        .orchestration_configuration(orchestration)
        .build()
        .map_err(build_failed)?;

    RetrieveAndGenerateConfiguration::builder()
        .r#type(RetrieveAndGenerateType::KnowledgeBase)
        .knowledge_base_configuration(knowledge_base)
        .build()
        .map_err(build_failed)
}

/// Maps a Bedrock control-plane error code onto the crate's error kinds.
pub(crate) fn classify_control_plane_error(code: Option<&str>, message: &str) -> AppError {
    match code {
        Some("ThrottlingException") => {
            AppError::ServiceUnavailable(format!("throttling error: {message}"))
        }
        Some("ServiceQuotaExceededException") => {
            AppError::ServiceUnavailable(format!("service quota exceeded: {message}"))
        }
        Some("AccessDeniedException") => AppError::Forbidden(format!("access denied: {message}")),
        Some("ValidationException") => {
            AppError::bad_request(format!("validation error: {message}"))
        }
        Some("InternalServerException") => {
            AppError::Unexpected(format!("internal server error: {message}"))
        }
        Some("ResourceNotFoundException") => {
            AppError::not_found(format!("resource not found: {message}"))
        }
        Some("ConflictException") => AppError::Conflict(format!("conflict error: {message}")),
        Some(_) => AppError::Unexpected(format!("unknown error: {message}")),
        None => AppError::ServiceUnavailable(message.to_string()),
    }
}

fn control_plane_error<E>(err: E, operation: &str) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let detail = DisplayErrorContext(&err).to_string();
    error!(operation, error = %detail, "bedrock agent call failed");
    let message = err.message().map(str::to_string).unwrap_or(detail);
    classify_control_plane_error(err.code(), &message)
}

fn to_ingestion_job(job: &SdkIngestionJob) -> IngestionJob {
    IngestionJob {
        ingestion_job_id: job.ingestion_job_id().to_string(),
        knowledge_base_id: job.knowledge_base_id().to_string(),
        data_source_id: job.data_source_id().to_string(),
        status: job.status().as_str().to_string(),
        failure_reasons: job.failure_reasons().to_vec(),
    }
}

#[async_trait]
impl KnowledgeBaseClient for BedrockKnowledgeBase {
    async fn retrieve_and_generate(&self, request: RagRequest) -> AppResult<RagAnswer> {
        let input = RetrieveAndGenerateInput::builder()
            .text(&request.question)
            .build()
            .map_err(build_failed)?;

        let output = self
            .runtime
            .retrieve_and_generate()
            .set_session_id(request.session_id.clone())
            .input(input)
            .retrieve_and_generate_configuration(configuration(&request)?)
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                error!(error = %detail, "retrieve_and_generate failed");
                AppError::ServiceUnavailable("Knowledge base is unavailable".into())
            })?;

        let citations: Vec<Citation> = output
            .citations()
            .iter()
            .map(|citation| Citation {
                text: citation
                    .generated_response_part()
                    .and_then(|part| part.text_response_part())
                    .and_then(|part| part.text())
                    .map(str::to_string),
                sources: citation
                    .retrieved_references()
                    .iter()
                    .filter_map(|r| r.location()?.s3_location()?.uri())
                    .map(str::to_string)
                    .collect(),
            })
            .collect();
        debug!(citations = citations.len(), "answer generated");

        Ok(RagAnswer {
            text: output
                .output()
                .map(|o| o.text().to_string())
                .unwrap_or_default(),
            session_id: output.session_id().to_string(),
            citations,
        })
    }

    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> AppResult<IngestionJob> {
        let output = self
            .agent
            .start_ingestion_job()
            .knowledge_base_id(knowledge_base_id)
            .data_source_id(data_source_id)
            .send()
            .await
            .map_err(|e| control_plane_error(e, "start_ingestion_job"))?;

        output
            .ingestion_job()
            .map(to_ingestion_job)
            .ok_or_else(|| AppError::Unexpected("ingestion job missing from response".into()))
    }

    async fn ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> AppResult<IngestionJob> {
        let output = self
            .agent
            .get_ingestion_job()
            .knowledge_base_id(knowledge_base_id)
            .data_source_id(data_source_id)
            .ingestion_job_id(job_id)
            .send()
            .await
            .map_err(|e| control_plane_error(e, "get_ingestion_job"))?;

        output
            .ingestion_job()
            .map(to_ingestion_job)
            .ok_or_else(|| AppError::Unexpected("ingestion job missing from response".into()))
    }
}
