//! Shared fixtures for the audit integration tests.

#![allow(dead_code)]

use std::time::Duration;

use fsa_audit::mock::MockCollaborators;
use fsa_audit::{AuditSession, AuditSessionController, ImageData, TemplateItem};
use fsa_core::{AnswerSet, TemplateId, TemplateItemId, UnitId};

pub struct Fixture {
    pub mocks: MockCollaborators,
    pub controller: AuditSessionController,
}

pub fn question(text: &str, mandatory: bool) -> TemplateItem {
    TemplateItem {
        id: TemplateItemId::new(),
        question: text.into(),
        category: "Boas práticas".into(),
        weight: 2,
        mandatory,
        answer_set: AnswerSet::Standard,
    }
}

/// Three items; only the last one is mandatory.
pub fn three_item_template() -> Vec<TemplateItem> {
    vec![
        question("Piso e paredes em bom estado de conservação?", false),
        question("Lavatórios exclusivos para higiene das mãos?", false),
        question("Água utilizada é potável?", true),
    ]
}

pub async fn start(mocks: MockCollaborators, template: Vec<TemplateItem>) -> Fixture {
    let unit = UnitId::new();
    let template_id = TemplateId::new();
    mocks.backend.register_unit(unit, Some("restaurante"));
    mocks.backend.register_template(template_id, template);
    let controller =
        AuditSessionController::start(mocks.collaborators(), unit, template_id, None)
            .await
            .expect("start audit");
    Fixture { mocks, controller }
}

pub fn photo(n: usize) -> ImageData {
    ImageData::new(
        format!("foto-{n}.jpg"),
        "image/jpeg",
        vec![0xFF, 0xD8, 0xFF, n as u8],
    )
}

/// Poll the session until `pred` holds.
pub async fn wait_until(
    controller: &AuditSessionController,
    pred: impl Fn(&AuditSession) -> bool,
) {
    for _ in 0..400 {
        if pred(&controller.snapshot()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
