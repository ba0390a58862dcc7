//! # Audit Session Flow Tests
//!
//! Answer, observation, finalize and reopen against the in-memory backend.

mod common;

use common::{start, three_item_template, Fixture};
use fsa_audit::mock::MockCollaborators;
use fsa_audit::{
    AuditSessionController, AuditStatus, Operation, PortError, TemplateItem, ValidationError,
};
use fsa_core::{Answer, AnswerSet, TemplateId, TemplateItemId, UnitId};

#[tokio::test]
async fn new_session_has_every_item_unanswered() {
    let Fixture { controller, .. } = start(MockCollaborators::new(), three_item_template()).await;
    let s = controller.snapshot();
    assert_eq!(s.status, AuditStatus::InProgress);
    assert_eq!(s.items.len(), 3);
    assert!(s.items.iter().all(|i| i.answer == Answer::NaoAvaliado));
    assert_eq!(s.activity_type.as_deref(), Some("restaurante"));
    assert_eq!(controller.progress(), 0);
}

#[tokio::test]
async fn start_fails_for_unknown_template() {
    let mocks = MockCollaborators::new();
    let unit = UnitId::new();
    mocks.backend.register_unit(unit, None);
    let err = AuditSessionController::start(mocks.collaborators(), unit, TemplateId::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.operation(), Some(Operation::StartAudit));
    assert!(matches!(
        err,
        fsa_audit::AuditError::Collaborator {
            source: PortError::NotFound { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn finalize_blocked_until_mandatory_item_answered() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let ids: Vec<_> = controller.snapshot().items.iter().map(|i| i.id).collect();

    controller.answer_item(ids[0], Answer::Conforme).await.unwrap();
    controller.answer_item(ids[1], Answer::NaoConforme).await.unwrap();
    assert_eq!(controller.progress(), 67);
    assert!(!controller.is_finalize_allowed());

    let err = controller.finalize(None).await.unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::MandatoryIncomplete {
            missing: 1,
            items: vec![ids[2]],
        })
    );
    assert_eq!(mocks.backend.calls(Operation::Finalize), 0);
    assert_eq!(controller.status(), AuditStatus::InProgress);

    controller.answer_item(ids[2], Answer::NaoAplicavel).await.unwrap();
    assert!(controller.is_finalize_allowed());
    controller
        .finalize(Some("  Unidade organizada, ajustar lavatórios.  ".into()))
        .await
        .unwrap();

    let s = controller.snapshot();
    assert_eq!(s.status, AuditStatus::Finalized);
    assert!(s.finished_at.is_some());
    assert_eq!(
        s.general_observations.as_deref(),
        Some("Unidade organizada, ajustar lavatórios.")
    );
    // 2 conforming weight out of 4 judged weight.
    assert_eq!(s.final_score, Some(50.0));
    assert_eq!(controller.progress(), 100);
}

#[tokio::test]
async fn finalize_rejection_counts_every_missing_item() {
    let template = vec![
        common::question("Manipuladores com uniforme limpo?", true),
        common::question("Controle de temperatura registrado?", true),
        common::question("Produtos de limpeza regularizados?", true),
        common::question("Iluminação adequada?", false),
    ];
    let Fixture { controller, .. } = start(MockCollaborators::new(), template).await;
    let err = controller.finalize(None).await.unwrap_err();
    assert_eq!(err.to_string(), "3 mandatory item(s) not answered");
}

#[tokio::test]
async fn finalized_session_rejects_edits_until_reopened() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let ids: Vec<_> = controller.snapshot().items.iter().map(|i| i.id).collect();
    controller.answer_item(ids[2], Answer::Conforme).await.unwrap();
    controller.finalize(None).await.unwrap();

    let saves = mocks.backend.calls(Operation::SaveAnswer);
    let err = controller.answer_item(ids[0], Answer::Conforme).await.unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::SessionNotEditable {
            status: AuditStatus::Finalized,
            ..
        })
    ));
    assert_eq!(mocks.backend.calls(Operation::SaveAnswer), saves);
    assert!(controller
        .save_observation(ids[2], "ok")
        .await
        .unwrap_err()
        .as_validation()
        .is_some());
    assert!(controller.finalize(None).await.is_err());

    controller.reopen().await.unwrap();
    let s = controller.snapshot();
    assert_eq!(s.status, AuditStatus::InProgress);
    assert_eq!(s.items[2].answer, Answer::Conforme);
    assert_eq!(s.transitions.len(), 2);

    controller.answer_item(ids[0], Answer::NaoConforme).await.unwrap();
    assert_eq!(controller.progress(), 67);
}

#[tokio::test]
async fn reopen_requires_finalized_session() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let err = controller.reopen().await.unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::InvalidTransition { .. })
    ));
    assert_eq!(mocks.backend.calls(Operation::Reopen), 0);
}

#[tokio::test]
async fn failed_reopen_keeps_session_finalized() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let mandatory = controller.snapshot().items[2].id;
    controller.answer_item(mandatory, Answer::Conforme).await.unwrap();
    controller.finalize(None).await.unwrap();

    mocks.backend.set_failing(Operation::Reopen, true);
    let err = controller.reopen().await.unwrap_err();
    assert_eq!(err.operation(), Some(Operation::Reopen));
    assert_eq!(controller.status(), AuditStatus::Finalized);
}

#[tokio::test]
async fn failed_answer_save_restores_previous_answer() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let item = controller.snapshot().items[0].id;
    controller.answer_item(item, Answer::Conforme).await.unwrap();

    mocks.backend.set_failing(Operation::SaveAnswer, true);
    let err = controller.answer_item(item, Answer::NaoConforme).await.unwrap_err();
    assert_eq!(err.operation(), Some(Operation::SaveAnswer));
    assert_eq!(controller.snapshot().items[0].answer, Answer::Conforme);

    mocks.backend.set_failing(Operation::SaveAnswer, false);
    controller.answer_item(item, Answer::NaoConforme).await.unwrap();
    assert_eq!(
        mocks.backend.stored(controller.audit_id()).unwrap().items[0].answer,
        Answer::NaoConforme
    );
}

#[tokio::test]
async fn failed_finalize_leaves_session_in_progress() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let mandatory = controller.snapshot().items[2].id;
    controller.answer_item(mandatory, Answer::Conforme).await.unwrap();

    mocks.backend.set_failing(Operation::Finalize, true);
    let err = controller.finalize(None).await.unwrap_err();
    assert_eq!(err.operation(), Some(Operation::Finalize));
    let s = controller.snapshot();
    assert_eq!(s.status, AuditStatus::InProgress);
    assert!(s.final_score.is_none());
}

#[tokio::test]
async fn custom_answer_set_is_enforced() {
    let template = vec![TemplateItem {
        id: TemplateItemId::new(),
        question: "Frequência de higienização dos reservatórios".into(),
        category: "Água".into(),
        weight: 1,
        mandatory: true,
        answer_set: AnswerSet::Custom(vec!["Semestral".into(), "Anual".into()]),
    }];
    let Fixture { mocks, controller } = start(MockCollaborators::new(), template).await;
    let item = controller.snapshot().items[0].id;

    let err = controller.answer_item(item, Answer::Conforme).await.unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::AnswerNotAllowed { .. })
    ));
    assert_eq!(mocks.backend.calls(Operation::SaveAnswer), 0);

    controller
        .answer_item(item, Answer::Custom("Semestral".into()))
        .await
        .unwrap();
    assert!(controller.is_finalize_allowed());
    assert_eq!(controller.breakdown().custom, 1);
}

#[tokio::test]
async fn unanswering_reopens_the_gate() {
    let Fixture { controller, .. } = start(MockCollaborators::new(), three_item_template()).await;
    let mandatory = controller.snapshot().items[2].id;
    controller.answer_item(mandatory, Answer::NaoConforme).await.unwrap();
    assert!(controller.is_finalize_allowed());
    controller.answer_item(mandatory, Answer::NaoAvaliado).await.unwrap();
    assert!(!controller.is_finalize_allowed());
    assert_eq!(controller.missing_mandatory(), vec![mandatory]);
}

#[tokio::test]
async fn observation_requires_text() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let item = controller.snapshot().items[0].id;
    let err = controller.save_observation(item, " \n\t").await.unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::EmptyObservation { item })
    );
    assert_eq!(mocks.backend.calls(Operation::SaveObservation), 0);
}

#[tokio::test]
async fn observation_is_persisted_with_ai_fields() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let item = controller.snapshot().items[0].id;
    controller.answer_item(item, Answer::NaoConforme).await.unwrap();
    controller
        .draft_finding(item, "rachaduras no piso da cozinha")
        .await
        .unwrap();
    controller
        .save_observation(item, "  Piso com rachaduras próximas à pia.  ")
        .await
        .unwrap();

    let local = &controller.snapshot().items[0];
    assert_eq!(local.observation.as_deref(), Some("Piso com rachaduras próximas à pia."));

    let stored = mocks.backend.stored(controller.audit_id()).unwrap();
    let remote = &stored.items[0];
    assert_eq!(remote.answer, Answer::NaoConforme);
    assert_eq!(remote.observation, local.observation);
    assert_eq!(remote.ai_description, local.ai_description);
    assert_eq!(remote.legal_reference.as_deref(), Some("RDC ANVISA 216/2004"));
}

#[tokio::test]
async fn failed_observation_save_reverts() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let item = controller.snapshot().items[0].id;
    controller.answer_item(item, Answer::Conforme).await.unwrap();
    controller.save_observation(item, "primeira").await.unwrap();

    mocks.backend.set_failing(Operation::SaveObservation, true);
    let err = controller.save_observation(item, "segunda").await.unwrap_err();
    assert_eq!(err.operation(), Some(Operation::SaveObservation));
    assert_eq!(
        controller.snapshot().items[0].observation.as_deref(),
        Some("primeira")
    );
}

#[tokio::test]
async fn draft_requires_answered_item() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let item = controller.snapshot().items[1].id;
    let err = controller.draft_finding(item, "sem sabonete").await.unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::ItemUnanswered { item })
    );
    assert_eq!(mocks.annotator.calls(Operation::GenerateText), 0);
}

#[tokio::test]
async fn load_restores_a_stored_audit() {
    let Fixture { mocks, controller } =
        start(MockCollaborators::new(), three_item_template()).await;
    let item = controller.snapshot().items[1].id;
    controller.answer_item(item, Answer::Conforme).await.unwrap();
    let audit = controller.audit_id();
    drop(controller);

    let loaded = AuditSessionController::load(mocks.collaborators(), audit)
        .await
        .unwrap();
    assert_eq!(loaded.audit_id(), audit);
    assert_eq!(loaded.progress(), 33);
    assert_eq!(loaded.snapshot().items[1].answer, Answer::Conforme);
}
