//! Wire types of the backing API and the AI service.
//!
//! Field names follow the services' Portuguese camelCase JSON. Optional and
//! collection fields use `#[serde(default)]` so older or newer servers that
//! omit or add fields still decode. Conversion into the domain types of
//! `fsa-audit` happens here and nowhere else.

use fsa_audit::{
    AuditItem, AuditSession, AuditStatus, Evidence, GeneratedText, ImageAnnotation,
    ResponseExtras, Severity, StoredPhoto, TemplateItem,
};
use fsa_core::{
    Answer, AnswerSet, AuditId, AuditItemId, GeoPoint, PhotoId, TemplateId, TemplateItemId,
    Timestamp, UnitId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Backing API --------------------------------------------------------------

/// Audit status as emitted by the backing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusDto {
    #[serde(rename = "em_andamento", alias = "in_progress")]
    EmAndamento,
    #[serde(rename = "finalizada", alias = "finalized")]
    Finalizada,
    #[serde(rename = "cancelada", alias = "cancelled")]
    Cancelada,
}

impl From<StatusDto> for AuditStatus {
    fn from(s: StatusDto) -> Self {
        match s {
            StatusDto::EmAndamento => AuditStatus::InProgress,
            StatusDto::Finalizada => AuditStatus::Finalized,
            StatusDto::Cancelada => AuditStatus::Cancelled,
        }
    }
}

/// Stored photo (`{id, url}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FotoDto {
    pub id: String,
    pub url: String,
}

impl FotoDto {
    pub(crate) fn into_photo(self) -> Result<StoredPhoto, String> {
        let id = PhotoId::new(self.id).map_err(|e| e.to_string())?;
        Ok(StoredPhoto { id, url: self.url })
    }
}

/// Checklist item inside an audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: Uuid,
    pub template_item_id: Uuid,
    pub pergunta: String,
    #[serde(default)]
    pub categoria: String,
    #[serde(default = "default_peso")]
    pub peso: u32,
    #[serde(default)]
    pub obrigatorio: bool,
    #[serde(default)]
    pub usar_respostas_personalizadas: bool,
    #[serde(default)]
    pub opcoes_resposta: Vec<String>,
    #[serde(default)]
    pub resposta: Option<String>,
    #[serde(default)]
    pub observacao: Option<String>,
    #[serde(default)]
    pub descricao_ia: Option<String>,
    #[serde(default)]
    pub descricao_nao_conformidade: Option<String>,
    #[serde(default)]
    pub referencia_legal: Option<String>,
    #[serde(default)]
    pub plano_acao_sugerido: Option<String>,
    #[serde(default)]
    pub fotos: Vec<FotoDto>,
}

fn default_peso() -> u32 {
    1
}

/// Audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditoriaDto {
    pub id: Uuid,
    pub status: StatusDto,
    pub data_inicio: String,
    #[serde(default)]
    pub data_fim: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub template_id: Uuid,
    pub unidade_id: Uuid,
    #[serde(default)]
    pub tipo_atividade: Option<String>,
    #[serde(default)]
    pub pontuacao_final: Option<f64>,
    #[serde(default)]
    pub observacoes_gerais: Option<String>,
    #[serde(default)]
    pub itens: Vec<ItemDto>,
}

impl AuditoriaDto {
    /// Convert into a domain session. Stored photos become uploaded,
    /// unanalyzed evidence.
    pub fn into_session(self) -> Result<AuditSession, String> {
        let started_at = Timestamp::parse(&self.data_inicio).map_err(|e| e.to_string())?;
        let finished_at = self
            .data_fim
            .as_deref()
            .map(Timestamp::parse)
            .transpose()
            .map_err(|e| e.to_string())?;
        let geo = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng).map_err(|e| e.to_string())?),
            _ => None,
        };
        let items = self
            .itens
            .into_iter()
            .map(ItemDto::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        let mut session = AuditSession::new(
            AuditId::from_uuid(self.id),
            UnitId::from_uuid(self.unidade_id),
            TemplateId::from_uuid(self.template_id),
            items,
        );
        session.status = self.status.into();
        session.started_at = started_at;
        session.finished_at = finished_at;
        session.geo = geo;
        session.activity_type = self.tipo_atividade;
        session.final_score = self.pontuacao_final;
        session.general_observations = self.observacoes_gerais;
        Ok(session)
    }
}

impl ItemDto {
    fn into_item(self) -> Result<AuditItem, String> {
        let template_item = TemplateItem {
            id: TemplateItemId::from_uuid(self.template_item_id),
            question: self.pergunta,
            category: self.categoria,
            weight: self.peso,
            mandatory: self.obrigatorio,
            answer_set: AnswerSet::from_template(
                self.usar_respostas_personalizadas,
                self.opcoes_resposta,
            ),
        };
        let mut item = AuditItem::new(AuditItemId::from_uuid(self.id), template_item);
        item.answer = self
            .resposta
            .as_deref()
            .map(Answer::from_wire)
            .unwrap_or_default();
        item.observation = self.observacao;
        item.ai_description = self.descricao_ia;
        item.non_conformity = self.descricao_nao_conformidade;
        item.legal_reference = self.referencia_legal;
        item.corrective_actions = self.plano_acao_sugerido;
        for foto in self.fotos {
            let content_type = content_type_for(&foto.url);
            item.evidence.push(Evidence::stored(foto.into_photo()?, content_type));
        }
        Ok(item)
    }
}

fn content_type_for(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// `iniciarAuditoria` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IniciarAuditoriaRequest {
    pub unidade_id: Uuid,
    pub template_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// `responderItem` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderItemRequest {
    pub resposta: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao_ia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao_nao_conformidade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencia_legal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plano_acao_sugerido: Option<String>,
}

impl ResponderItemRequest {
    pub fn new(answer: &Answer, extras: &ResponseExtras) -> Self {
        Self {
            resposta: answer.as_str().to_string(),
            observacao: extras.observation.clone(),
            descricao_ia: extras.ai_description.clone(),
            descricao_nao_conformidade: extras.non_conformity.clone(),
            referencia_legal: extras.legal_reference.clone(),
            plano_acao_sugerido: extras.corrective_actions.clone(),
        }
    }
}

/// `finalizarAuditoria` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizarRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes_gerais: Option<String>,
}

/// `finalizarAuditoria` response; servers may also answer 204.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizarResponse {
    #[serde(default)]
    pub pontuacao_final: Option<f64>,
}

// -- AI service ---------------------------------------------------------------

/// `analisarImagemChecklist` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnaliseImagemDto {
    pub imagem_relevante: bool,
    #[serde(default)]
    pub descricao_ia: String,
    #[serde(default)]
    pub tipo_nao_conformidade: Option<String>,
    #[serde(default)]
    pub gravidade: Option<Severity>,
    #[serde(default)]
    pub referencia_legal: Option<String>,
    #[serde(default)]
    pub sugestoes: Vec<String>,
}

impl From<AnaliseImagemDto> for ImageAnnotation {
    fn from(d: AnaliseImagemDto) -> Self {
        Self {
            relevant: d.imagem_relevante,
            description: d.descricao_ia,
            non_conformity: d.tipo_nao_conformidade,
            severity: d.gravidade,
            legal_reference: d.referencia_legal,
            suggestions: d.sugestoes,
        }
    }
}

/// `gerarTexto` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GerarTextoRequest {
    pub contexto: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_atividade: Option<String>,
}

/// Action plan inside a `gerarTexto` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanoAcaoDto {
    #[serde(default)]
    pub acoes_corretivas: Vec<String>,
}

/// `gerarTexto` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextoGeradoDto {
    pub descricao_tecnica: String,
    #[serde(default)]
    pub referencia_legal: Option<String>,
    #[serde(default)]
    pub plano_acao: PlanoAcaoDto,
}

impl From<TextoGeradoDto> for GeneratedText {
    fn from(d: TextoGeradoDto) -> Self {
        Self {
            technical_description: d.descricao_tecnica,
            legal_reference: d.referencia_legal,
            corrective_actions: d.plano_acao.acoes_corretivas,
        }
    }
}
