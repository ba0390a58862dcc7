//! Client for the AI annotation service.
//!
//! Both calls are free of server-side effects, so connection failures are
//! retried with backoff.

use async_trait::async_trait;
use fsa_audit::{
    AnalysisRequest, AnnotationService, GeneratedText, ImageAnnotation, PortError, TextRequest,
};
use reqwest::multipart::{Form, Part};

use crate::error::ClientError;
use crate::transport::{check_status, directory, json, send_error};
use crate::types::{AnaliseImagemDto, GerarTextoRequest, TextoGeradoDto};

const API_PREFIX: &str = "api/v1";

/// Client for image analysis and finding drafts.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: url::Url,
    timeout_ms: u64,
}

impl AiClient {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url, timeout_ms: u64) -> Self {
        Self {
            http,
            base_url: directory(base_url),
            timeout_ms,
        }
    }

    /// Judge a photo against a checklist question.
    ///
    /// Calls `POST {base_url}/api/v1/ia/analisar-imagem-checklist` with a
    /// multipart body: `imagem`, `pergunta`, `categoria` and, when known,
    /// `tipoAtividade`.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<ImageAnnotation, ClientError> {
        let endpoint = "POST /ia/analisar-imagem-checklist";
        let url = format!("{}{}/ia/analisar-imagem-checklist", self.base_url, API_PREFIX);

        // Forms are consumed by send, so one is built per attempt.
        let form = || -> Result<Form, reqwest::Error> {
            let image = &request.image;
            let part = Part::bytes(image.bytes.to_vec())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)?;
            let mut form = Form::new()
                .part("imagem", part)
                .text("pergunta", request.question.clone())
                .text("categoria", request.category.clone());
            if let Some(activity) = &request.activity_type {
                form = form.text("tipoAtividade", activity.clone());
            }
            Ok(form)
        };
        // Validate the content type once, before any network attempt.
        form().map_err(|e| ClientError::Invalid {
            endpoint: endpoint.to_string(),
            reason: format!("content type {:?}: {e}", request.image.content_type),
        })?;

        let resp = crate::retry::retry_send(|| async {
            self.http.post(&url).multipart(form()?).send().await
        })
        .await
        .map_err(|e| send_error(endpoint, self.timeout_ms, e))?;
        let resp = check_status(endpoint, resp).await?;
        let dto: AnaliseImagemDto = json(endpoint, resp).await?;
        Ok(dto.into())
    }

    /// Draft a technical finding.
    ///
    /// Calls `POST {base_url}/api/v1/ia/gerar-texto`.
    pub async fn draft(&self, request: &TextRequest) -> Result<GeneratedText, ClientError> {
        let endpoint = "POST /ia/gerar-texto";
        let url = format!("{}{}/ia/gerar-texto", self.base_url, API_PREFIX);
        let body = GerarTextoRequest {
            contexto: request.context.clone(),
            tipo_atividade: request.activity_type.clone(),
        };

        let resp = crate::retry::retry_send(|| self.http.post(&url).json(&body).send())
            .await
            .map_err(|e| send_error(endpoint, self.timeout_ms, e))?;
        let resp = check_status(endpoint, resp).await?;
        let dto: TextoGeradoDto = json(endpoint, resp).await?;
        if dto.descricao_tecnica.trim().is_empty() {
            return Err(ClientError::Invalid {
                endpoint: endpoint.to_string(),
                reason: "empty descricaoTecnica".into(),
            });
        }
        Ok(dto.into())
    }
}

#[async_trait]
impl AnnotationService for AiClient {
    async fn analyze_image(&self, request: &AnalysisRequest) -> Result<ImageAnnotation, PortError> {
        Ok(self.analyze(request).await?)
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<GeneratedText, PortError> {
        Ok(self.draft(request).await?)
    }
}
