//! Typed client for the backing audit API, also serving as the photo store.
//!
//! ## Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/api/v1/auditorias` | `iniciarAuditoria` |
//! | GET    | `/api/v1/auditorias/{id}` | `buscarAuditoriaPorId` |
//! | PUT    | `/api/v1/auditorias/{id}/itens/{itemId}/resposta` | `responderItem` |
//! | POST   | `/api/v1/auditorias/{id}/itens/{itemId}/fotos` | `adicionarFoto` (multipart `foto`) |
//! | DELETE | `/api/v1/auditorias/{id}/itens/{itemId}/fotos/{fotoId}` | `removerFoto` |
//! | POST   | `/api/v1/auditorias/{id}/finalizar` | `finalizarAuditoria` |
//! | POST   | `/api/v1/auditorias/{id}/reabrir` | reopen |

use async_trait::async_trait;
use fsa_audit::{
    AuditBackend, AuditSession, EvidenceStore, FinalizeReceipt, ImageData, PortError,
    ResponseExtras, StoredPhoto,
};
use fsa_core::{Answer, AuditId, AuditItemId, GeoPoint, PhotoId, TemplateId, UnitId};
use reqwest::multipart::{Form, Part};

use crate::error::ClientError;
use crate::transport::{check_status, directory, json, send_error};
use crate::types::{
    AuditoriaDto, FinalizarRequest, FinalizarResponse, FotoDto, IniciarAuditoriaRequest,
    ResponderItemRequest,
};

/// API version path segment.
const API_PREFIX: &str = "api/v1";

/// Client for the backing audit API.
#[derive(Debug, Clone)]
pub struct AuditApiClient {
    http: reqwest::Client,
    base_url: url::Url,
    timeout_ms: u64,
}

impl AuditApiClient {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url, timeout_ms: u64) -> Self {
        Self {
            http,
            base_url: directory(base_url),
            timeout_ms,
        }
    }

    fn audit_url(&self, audit: AuditId) -> String {
        format!("{}{}/auditorias/{}", self.base_url, API_PREFIX, audit.as_uuid())
    }

    fn item_url(&self, audit: AuditId, item: AuditItemId) -> String {
        format!("{}/itens/{}", self.audit_url(audit), item.as_uuid())
    }

    /// Create an audit.
    ///
    /// Calls `POST {base_url}/api/v1/auditorias`.
    pub async fn start(
        &self,
        unit: UnitId,
        template: TemplateId,
        geo: Option<GeoPoint>,
    ) -> Result<AuditSession, ClientError> {
        let endpoint = "POST /auditorias";
        let url = format!("{}{}/auditorias", self.base_url, API_PREFIX);
        let req = IniciarAuditoriaRequest {
            unidade_id: *unit.as_uuid(),
            template_id: *template.as_uuid(),
            latitude: geo.map(|g| g.lat),
            longitude: geo.map(|g| g.lng),
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| send_error(endpoint, self.timeout_ms, e))?;
        let resp = check_status(endpoint, resp).await?;
        let dto: AuditoriaDto = json(endpoint, resp).await?;
        into_session(endpoint, dto)
    }

    /// Fetch an audit by id.
    ///
    /// Calls `GET {base_url}/api/v1/auditorias/{id}`.
    pub async fn get(&self, audit: AuditId) -> Result<AuditSession, ClientError> {
        let endpoint = format!("GET /auditorias/{}", audit.as_uuid());
        let url = self.audit_url(audit);

        let resp = crate::retry::retry_send(|| self.http.get(&url).send())
            .await
            .map_err(|e| send_error(&endpoint, self.timeout_ms, e))?;
        let resp = check_status(&endpoint, resp).await?;
        let dto: AuditoriaDto = json(&endpoint, resp).await?;
        into_session(&endpoint, dto)
    }

    /// Persist an item's answer and documentation fields.
    ///
    /// Calls `PUT {base_url}/api/v1/auditorias/{id}/itens/{itemId}/resposta`.
    pub async fn respond(
        &self,
        audit: AuditId,
        item: AuditItemId,
        answer: &Answer,
        extras: &ResponseExtras,
    ) -> Result<(), ClientError> {
        let endpoint = format!(
            "PUT /auditorias/{}/itens/{}/resposta",
            audit.as_uuid(),
            item.as_uuid()
        );
        let url = format!("{}/resposta", self.item_url(audit, item));
        let req = ResponderItemRequest::new(answer, extras);

        let resp = self
            .http
            .put(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, self.timeout_ms, e))?;
        check_status(&endpoint, resp).await?;
        Ok(())
    }

    /// Upload a photo for an item.
    ///
    /// Calls `POST {base_url}/api/v1/auditorias/{id}/itens/{itemId}/fotos`.
    pub async fn add_photo(
        &self,
        audit: AuditId,
        item: AuditItemId,
        image: &ImageData,
    ) -> Result<StoredPhoto, ClientError> {
        let endpoint = format!(
            "POST /auditorias/{}/itens/{}/fotos",
            audit.as_uuid(),
            item.as_uuid()
        );
        let url = format!("{}/fotos", self.item_url(audit, item));
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| ClientError::Invalid {
                endpoint: endpoint.clone(),
                reason: format!("content type {:?}: {e}", image.content_type),
            })?;
        let form = Form::new().part("foto", part);

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, self.timeout_ms, e))?;
        let resp = check_status(&endpoint, resp).await?;
        let foto: FotoDto = json(&endpoint, resp).await?;
        foto.into_photo().map_err(|reason| ClientError::Invalid {
            endpoint,
            reason,
        })
    }

    /// Delete a stored photo.
    ///
    /// Calls `DELETE {base_url}/api/v1/auditorias/{id}/itens/{itemId}/fotos/{fotoId}`.
    pub async fn remove_photo(
        &self,
        audit: AuditId,
        item: AuditItemId,
        photo: &PhotoId,
    ) -> Result<(), ClientError> {
        let endpoint = format!(
            "DELETE /auditorias/{}/itens/{}/fotos/{}",
            audit.as_uuid(),
            item.as_uuid(),
            photo.as_str()
        );
        let mut url = url::Url::parse(&format!("{}/fotos/", self.item_url(audit, item)))
            .map_err(|e| ClientError::Invalid {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        // Photo ids are opaque; let the URL encoder handle them.
        url.path_segments_mut()
            .map_err(|_| ClientError::Invalid {
                endpoint: endpoint.clone(),
                reason: "base URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .push(photo.as_str());

        let resp = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, self.timeout_ms, e))?;
        check_status(&endpoint, resp).await?;
        Ok(())
    }

    /// Finalize an audit. When the server answers without a body, the
    /// final score is read back from the audit record.
    ///
    /// Calls `POST {base_url}/api/v1/auditorias/{id}/finalizar`.
    pub async fn finalize(
        &self,
        audit: AuditId,
        general_observations: Option<&str>,
    ) -> Result<FinalizeReceipt, ClientError> {
        let endpoint = format!("POST /auditorias/{}/finalizar", audit.as_uuid());
        let url = format!("{}/finalizar", self.audit_url(audit));
        let req = FinalizarRequest {
            observacoes_gerais: general_observations.map(str::to_string),
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, self.timeout_ms, e))?;
        let resp = check_status(&endpoint, resp).await?;
        let body = resp.bytes().await.map_err(|e| ClientError::Deserialization {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        let final_score = if body.iter().all(u8::is_ascii_whitespace) {
            self.get(audit).await?.final_score
        } else {
            serde_json::from_slice::<FinalizarResponse>(&body)
                .map_err(|e| ClientError::Invalid {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                })?
                .pontuacao_final
        };
        tracing::debug!(audit_id = %audit, ?final_score, "finalize acknowledged");
        Ok(FinalizeReceipt { final_score })
    }

    /// Reopen a finalized audit.
    ///
    /// Calls `POST {base_url}/api/v1/auditorias/{id}/reabrir`.
    pub async fn reopen(&self, audit: AuditId) -> Result<(), ClientError> {
        let endpoint = format!("POST /auditorias/{}/reabrir", audit.as_uuid());
        let url = format!("{}/reabrir", self.audit_url(audit));

        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, self.timeout_ms, e))?;
        check_status(&endpoint, resp).await?;
        Ok(())
    }
}

fn into_session(endpoint: &str, dto: AuditoriaDto) -> Result<AuditSession, ClientError> {
    dto.into_session().map_err(|reason| ClientError::Invalid {
        endpoint: endpoint.to_string(),
        reason,
    })
}

#[async_trait]
impl AuditBackend for AuditApiClient {
    async fn start_audit(
        &self,
        unit: UnitId,
        template: TemplateId,
        geo: Option<GeoPoint>,
    ) -> Result<AuditSession, PortError> {
        Ok(self.start(unit, template, geo).await?)
    }

    async fn fetch_audit(&self, audit: AuditId) -> Result<AuditSession, PortError> {
        Ok(self.get(audit).await?)
    }

    async fn save_response(
        &self,
        audit: AuditId,
        item: AuditItemId,
        answer: &Answer,
        extras: &ResponseExtras,
    ) -> Result<(), PortError> {
        Ok(self.respond(audit, item, answer, extras).await?)
    }

    async fn finalize_audit(
        &self,
        audit: AuditId,
        general_observations: Option<&str>,
    ) -> Result<FinalizeReceipt, PortError> {
        Ok(self.finalize(audit, general_observations).await?)
    }

    async fn reopen_audit(&self, audit: AuditId) -> Result<(), PortError> {
        Ok(self.reopen(audit).await?)
    }
}

#[async_trait]
impl EvidenceStore for AuditApiClient {
    async fn upload_photo(
        &self,
        audit: AuditId,
        item: AuditItemId,
        image: &ImageData,
    ) -> Result<StoredPhoto, PortError> {
        Ok(self.add_photo(audit, item, image).await?)
    }

    async fn delete_photo(
        &self,
        audit: AuditId,
        item: AuditItemId,
        photo: &PhotoId,
    ) -> Result<(), PortError> {
        Ok(self.remove_photo(audit, item, photo).await?)
    }
}
