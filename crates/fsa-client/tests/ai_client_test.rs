//! Contract tests for AiClient.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/api/v1/ia/analisar-imagem-checklist` | `analyze_*` |
//! | POST   | `/api/v1/ia/gerar-texto` | `draft_*` |

use fsa_audit::{AnalysisRequest, AnnotationService, ImageData, PortError, Severity, TextRequest};
use fsa_client::{FsaApiConfig, FsaClient};
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_client(mock_server: &MockServer) -> FsaClient {
    let config = FsaApiConfig {
        api_url: "http://127.0.0.1:19000".parse().unwrap(),
        ai_url: mock_server.uri().parse().unwrap(),
        api_token: zeroize::Zeroizing::new("test-token".into()),
        timeout_secs: 5,
    };
    FsaClient::new(config).unwrap()
}

fn request(activity: Option<&str>) -> AnalysisRequest {
    AnalysisRequest {
        image: ImageData::new("bancada.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0]),
        question: "As bancadas estão limpas e sem resíduos?".into(),
        category: "Higienização".into(),
        activity_type: activity.map(str::to_string),
    }
}

// ── POST /api/v1/ia/analisar-imagem-checklist ────────────────────────

#[tokio::test]
async fn analyze_sends_question_category_and_activity() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ia/analisar-imagem-checklist"))
        .and(body_string_contains("name=\"imagem\""))
        .and(body_string_contains("name=\"pergunta\""))
        .and(body_string_contains("name=\"categoria\""))
        .and(body_string_contains("name=\"tipoAtividade\""))
        .and(body_string_contains("padaria"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "imagemRelevante": true,
            "descricaoIa": "Resíduos de farinha sobre a bancada",
            "tipoNaoConformidade": "Higienização inadequada",
            "gravidade": "media",
            "referenciaLegal": "RDC 216/2004 item 4.2.1",
            "sugestoes": ["Higienizar a bancada após cada uso"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server).await;
    let annotation = client.ai().analyze(&request(Some("padaria"))).await.unwrap();

    assert!(annotation.relevant);
    assert_eq!(annotation.severity, Some(Severity::Media));
    assert_eq!(annotation.suggestions.len(), 1);
    assert_eq!(annotation.legal_reference.as_deref(), Some("RDC 216/2004 item 4.2.1"));
}

#[tokio::test]
async fn analyze_accepts_minimal_not_relevant_answer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ia/analisar-imagem-checklist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "imagemRelevante": false
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server).await;
    let annotation = client.ai().analyze_image(&request(None)).await.unwrap();
    assert!(!annotation.relevant);
    assert!(annotation.description.is_empty());
    assert_eq!(annotation.severity, None);
}

#[tokio::test]
async fn analyze_failure_is_not_retried_on_http_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ia/analisar-imagem-checklist"))
        .respond_with(ResponseTemplate::new(502).set_body_string("modelo indisponível"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server).await;
    let err = client.ai().analyze_image(&request(None)).await.unwrap_err();
    assert!(matches!(err, PortError::Unavailable { .. }));
}

// ── POST /api/v1/ia/gerar-texto ──────────────────────────────────────

#[tokio::test]
async fn draft_sends_context_and_decodes_action_plan() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ia/gerar-texto"))
        .and(body_json(serde_json::json!({
            "contexto": "geladeira sem termômetro",
            "tipoAtividade": "restaurante"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "descricaoTecnica": "Equipamento de refrigeração sem controle de temperatura.",
            "referenciaLegal": "RDC 216/2004 item 4.1.16",
            "planoAcao": {
                "acoesCorretivas": ["Instalar termômetro", "Registrar temperatura diariamente"]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server).await;
    let text = client
        .ai()
        .generate_text(&TextRequest {
            context: "geladeira sem termômetro".into(),
            activity_type: Some("restaurante".into()),
        })
        .await
        .unwrap();

    assert!(text.technical_description.starts_with("Equipamento"));
    assert_eq!(text.corrective_actions.len(), 2);
}

#[tokio::test]
async fn draft_with_empty_description_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ia/gerar-texto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "descricaoTecnica": "  "
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server).await;
    let err = client
        .ai()
        .generate_text(&TextRequest {
            context: "x".into(),
            activity_type: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Malformed { .. }));
}
