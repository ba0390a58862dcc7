//! # Evidence Lifecycle
//!
//! A photo attached to an answered checklist item, optionally annotated by
//! the AI service.
//!
//! ## Stages
//!
//! ```text
//! Selected ──▶ Uploading ──▶ Uploaded ──▶ Analyzing ──▶ Annotated
//!                  │                          │
//!                  ▼                          ▼
//!               Failed                  Uploaded (analysis Failed)
//! ```
//!
//! The stage is derived from two status fields: `upload` and `analysis`.
//! A failed upload never stays on the item (the pipeline rolls the
//! insertion back), so `Failed` is only read from snapshots recorded
//! elsewhere and has no transition into it. A failed analysis leaves a usable stored photo, so the
//! evidence reads as `Uploaded` with `analysis == Failed`.

use fsa_core::{EvidenceKey, ImageDigest, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ports::{ImageAnnotation, ImageData, StoredPhoto};

/// Persistence state of the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Selected, not sent yet.
    Pending,
    /// Store call in flight.
    Uploading,
    /// Stored; `Evidence::photo` is set.
    Uploaded,
    /// Store call failed. Only found in deserialized snapshots.
    Failed,
}

/// AI analysis state of the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Not requested.
    Pending,
    /// AI call in flight.
    Analyzing,
    /// Annotation merged.
    Done,
    /// AI call failed; no annotation.
    Failed,
}

/// Pipeline stage derived from the two status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStage {
    /// Picked by the auditor.
    Selected,
    /// Upload in flight.
    Uploading,
    /// Stored, no annotation.
    Uploaded,
    /// Analysis in flight.
    Analyzing,
    /// Stored and annotated.
    Annotated,
    /// Upload failed.
    Failed,
}

impl std::fmt::Display for EvidenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Selected => "selected",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Analyzing => "analyzing",
            Self::Annotated => "annotated",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Metadata of the selected image. Bytes are not kept on the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// Payload size in bytes.
    pub size_bytes: usize,
    /// SHA-256 of the payload, absent for photos loaded from the backend.
    pub digest: Option<ImageDigest>,
}

impl ImageRef {
    /// Describe a selected image.
    pub fn of(image: &ImageData) -> Self {
        Self {
            file_name: image.file_name.clone(),
            content_type: image.content_type.clone(),
            size_bytes: image.bytes.len(),
            digest: Some(ImageDigest::of(&image.bytes)),
        }
    }
}

/// A photo attached to a checklist item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Client-side key, stable for the life of the entry.
    pub key: EvidenceKey,
    /// Server copy, once uploaded.
    pub photo: Option<StoredPhoto>,
    /// Image metadata.
    pub image: ImageRef,
    /// Upload state.
    pub upload: UploadStatus,
    /// Analysis state.
    pub analysis: AnalysisStatus,
    /// Latest AI annotation.
    pub annotation: Option<ImageAnnotation>,
    /// When the auditor selected the image.
    pub selected_at: Timestamp,
}

impl Evidence {
    /// A freshly selected image.
    pub fn selected(image: &ImageData) -> Self {
        Self {
            key: EvidenceKey::new(),
            photo: None,
            image: ImageRef::of(image),
            upload: UploadStatus::Pending,
            analysis: AnalysisStatus::Pending,
            annotation: None,
            selected_at: Timestamp::now(),
        }
    }

    /// A photo already held by the backend (loaded with the audit).
    pub fn stored(photo: StoredPhoto, content_type: impl Into<String>) -> Self {
        let file_name = photo
            .url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            key: EvidenceKey::new(),
            image: ImageRef {
                file_name,
                content_type: content_type.into(),
                size_bytes: 0,
                digest: None,
            },
            photo: Some(photo),
            upload: UploadStatus::Uploaded,
            analysis: AnalysisStatus::Pending,
            annotation: None,
            selected_at: Timestamp::now(),
        }
    }

    /// Current pipeline stage.
    pub fn stage(&self) -> EvidenceStage {
        match (self.upload, self.analysis) {
            (UploadStatus::Pending, _) => EvidenceStage::Selected,
            (UploadStatus::Uploading, _) => EvidenceStage::Uploading,
            (UploadStatus::Failed, _) => EvidenceStage::Failed,
            (UploadStatus::Uploaded, AnalysisStatus::Analyzing) => EvidenceStage::Analyzing,
            (UploadStatus::Uploaded, AnalysisStatus::Done) => EvidenceStage::Annotated,
            (UploadStatus::Uploaded, _) => EvidenceStage::Uploaded,
        }
    }

    /// Whether a store or AI call for this evidence has not settled.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.stage(),
            EvidenceStage::Selected | EvidenceStage::Uploading | EvidenceStage::Analyzing
        )
    }

    /// Whether the AI judged the image irrelevant to the question. The
    /// evidence stays attached; consumers should warn the auditor.
    pub fn is_flagged_not_relevant(&self) -> bool {
        self.annotation.as_ref().is_some_and(|a| !a.relevant)
    }

    /// `Selected → Uploading`.
    pub fn begin_upload(&mut self) -> Result<(), ValidationError> {
        self.require(EvidenceStage::Selected, EvidenceStage::Uploading)?;
        self.upload = UploadStatus::Uploading;
        Ok(())
    }

    /// `Uploading → Uploaded`.
    pub fn mark_uploaded(&mut self, photo: StoredPhoto) -> Result<(), ValidationError> {
        self.require(EvidenceStage::Uploading, EvidenceStage::Uploaded)?;
        self.photo = Some(photo);
        self.upload = UploadStatus::Uploaded;
        Ok(())
    }

    /// `Uploaded | Annotated → Analyzing`.
    pub fn begin_analysis(&mut self) -> Result<(), ValidationError> {
        match self.stage() {
            EvidenceStage::Uploaded | EvidenceStage::Annotated => {
                self.analysis = AnalysisStatus::Analyzing;
                Ok(())
            }
            from => Err(self.invalid(from, EvidenceStage::Analyzing)),
        }
    }

    /// `Analyzing → Annotated`.
    pub fn apply_annotation(&mut self, annotation: ImageAnnotation) -> Result<(), ValidationError> {
        self.require(EvidenceStage::Analyzing, EvidenceStage::Annotated)?;
        self.annotation = Some(annotation);
        self.analysis = AnalysisStatus::Done;
        Ok(())
    }

    /// `Analyzing → Uploaded` with the analysis marked failed.
    pub fn mark_analysis_failed(&mut self) -> Result<(), ValidationError> {
        self.require(EvidenceStage::Analyzing, EvidenceStage::Uploaded)?;
        self.analysis = AnalysisStatus::Failed;
        Ok(())
    }

    /// `Analyzing → Uploaded | Annotated` when a result is dropped; the
    /// previous annotation, if any, stays.
    pub fn cancel_analysis(&mut self) -> Result<(), ValidationError> {
        let target = if self.annotation.is_some() {
            EvidenceStage::Annotated
        } else {
            EvidenceStage::Uploaded
        };
        self.require(EvidenceStage::Analyzing, target)?;
        self.analysis = if self.annotation.is_some() {
            AnalysisStatus::Done
        } else {
            AnalysisStatus::Pending
        };
        Ok(())
    }

    fn require(
        &self,
        expected: EvidenceStage,
        target: EvidenceStage,
    ) -> Result<(), ValidationError> {
        let from = self.stage();
        if from != expected {
            return Err(self.invalid(from, target));
        }
        Ok(())
    }

    fn invalid(&self, from: EvidenceStage, to: EvidenceStage) -> ValidationError {
        ValidationError::InvalidEvidenceTransition {
            evidence: self.key,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsa_core::PhotoId;

    fn image() -> ImageData {
        ImageData::new("camara-fria.jpg", "image/jpeg", vec![0xFFu8, 0xD8, 0xFF])
    }

    fn photo(id: &str) -> StoredPhoto {
        StoredPhoto {
            id: PhotoId::new(id).unwrap(),
            url: format!("https://cdn.example/fotos/{id}.jpg"),
        }
    }

    fn annotation(relevant: bool) -> ImageAnnotation {
        ImageAnnotation {
            relevant,
            description: "Termômetro indicando 9 °C".into(),
            non_conformity: Some("temperatura inadequada".into()),
            severity: None,
            legal_reference: Some("RDC 216/2004".into()),
            suggestions: vec!["Ajustar termostato".into()],
        }
    }

    #[test]
    fn selected_records_digest_and_size() {
        let ev = Evidence::selected(&image());
        assert_eq!(ev.stage(), EvidenceStage::Selected);
        assert_eq!(ev.image.size_bytes, 3);
        assert!(ev.image.digest.is_some());
        assert!(ev.is_in_flight());
    }

    #[test]
    fn full_happy_path() {
        let mut ev = Evidence::selected(&image());
        ev.begin_upload().unwrap();
        assert_eq!(ev.stage(), EvidenceStage::Uploading);
        ev.mark_uploaded(photo("f1")).unwrap();
        assert_eq!(ev.stage(), EvidenceStage::Uploaded);
        assert!(!ev.is_in_flight());
        ev.begin_analysis().unwrap();
        assert_eq!(ev.stage(), EvidenceStage::Analyzing);
        assert!(ev.is_in_flight());
        ev.apply_annotation(annotation(true)).unwrap();
        assert_eq!(ev.stage(), EvidenceStage::Annotated);
        assert!(!ev.is_flagged_not_relevant());
    }

    #[test]
    fn analysis_failure_leaves_photo_usable() {
        let mut ev = Evidence::selected(&image());
        ev.begin_upload().unwrap();
        ev.mark_uploaded(photo("f2")).unwrap();
        ev.begin_analysis().unwrap();
        ev.mark_analysis_failed().unwrap();
        assert_eq!(ev.stage(), EvidenceStage::Uploaded);
        assert_eq!(ev.analysis, AnalysisStatus::Failed);
        assert!(ev.annotation.is_none());
        assert!(ev.photo.is_some());
    }

    #[test]
    fn recorded_upload_failure_is_terminal_stage() {
        let mut value = serde_json::to_value(Evidence::selected(&image())).unwrap();
        value["upload"] = "failed".into();
        let mut ev: Evidence = serde_json::from_value(value).unwrap();
        assert_eq!(ev.stage(), EvidenceStage::Failed);
        assert!(!ev.is_in_flight());
        assert!(ev.begin_upload().is_err());
        assert!(ev.begin_analysis().is_err());
    }

    #[test]
    fn not_relevant_flag() {
        let mut ev = Evidence::selected(&image());
        ev.begin_upload().unwrap();
        ev.mark_uploaded(photo("f3")).unwrap();
        ev.begin_analysis().unwrap();
        ev.apply_annotation(annotation(false)).unwrap();
        assert!(ev.is_flagged_not_relevant());
    }

    #[test]
    fn cannot_annotate_before_upload() {
        let mut ev = Evidence::selected(&image());
        let err = ev.apply_annotation(annotation(true)).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidEvidenceTransition {
                from: EvidenceStage::Selected,
                to: EvidenceStage::Annotated,
                ..
            }
        ));
    }

    #[test]
    fn cancelled_analysis_settles_without_annotation() {
        let mut ev = Evidence::selected(&image());
        ev.begin_upload().unwrap();
        ev.mark_uploaded(photo("f4")).unwrap();
        ev.begin_analysis().unwrap();
        ev.cancel_analysis().unwrap();
        assert_eq!(ev.stage(), EvidenceStage::Uploaded);
        assert_eq!(ev.analysis, AnalysisStatus::Pending);
        assert!(!ev.is_in_flight());
    }

    #[test]
    fn stored_photo_is_uploaded_without_digest() {
        let ev = Evidence::stored(photo("f9"), "image/jpeg");
        assert_eq!(ev.stage(), EvidenceStage::Uploaded);
        assert_eq!(ev.image.file_name, "f9.jpg");
        assert!(ev.image.digest.is_none());
    }
}
