//! # Audit Subcommand
//!
//! Drives one audit session against the backing API and the AI service.
//! Every mutating subcommand loads the audit, applies a single controller
//! operation, and prints the resulting session report.
//!
//! ## Subcommands
//!
//! - `start` — Start an audit of a unit against a template.
//! - `show` — Print the session report (remote, or offline from a snapshot).
//! - `answer` — Record an item's answer.
//! - `observe` — Save an item's observation.
//! - `photo` — Attach a photo and wait for its AI annotation.
//! - `draft` — Have the AI draft the finding for an item.
//! - `finalize` — Close the audit (refused while mandatory items are open).
//! - `reopen` — Return a finalized audit to in-progress.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use fsa_audit::{AnnotationOutcome, AuditSession, AuditSessionController, ImageData};
use fsa_client::{FsaApiConfig, FsaClient};
use fsa_core::{Answer, AuditId, AuditItemId, GeoPoint, TemplateId, UnitId};

use crate::report::SessionReport;

/// Connection settings shared by every remote subcommand.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// Base URL of the backing API.
    #[arg(long, env = "FSA_API_URL", default_value = "http://127.0.0.1:8080", global = true)]
    pub api_url: String,

    /// Base URL of the AI service (defaults to the API URL).
    #[arg(long, env = "FSA_AI_URL", global = true)]
    pub ai_url: Option<String>,

    /// Bearer token.
    #[arg(long, env = "FSA_API_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "FSA_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,
}

impl ApiArgs {
    /// Build the client configuration. A token is required.
    pub fn config(&self) -> Result<FsaApiConfig> {
        let Some(token) = self.token.clone() else {
            bail!("an API token is required (--token or FSA_API_TOKEN)");
        };
        let api_url: url::Url = self
            .api_url
            .parse()
            .with_context(|| format!("invalid --api-url {:?}", self.api_url))?;
        let ai_url = match &self.ai_url {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid --ai-url {raw:?}"))?,
            None => api_url.clone(),
        };
        Ok(FsaApiConfig {
            api_url,
            ai_url,
            api_token: token.into(),
            timeout_secs: self.timeout_secs,
        })
    }
}

/// Arguments for the `fsa audit` subcommand.
#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Print reports as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Start an audit of a unit against a checklist template.
    Start {
        /// Unit (establishment) id.
        #[arg(long)]
        unit: String,
        /// Checklist template id.
        #[arg(long)]
        template: String,
        /// Latitude where the audit starts.
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude where the audit starts.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Print the session report.
    Show {
        /// Audit id to fetch from the backing API.
        #[arg(long, required_unless_present = "file", conflicts_with = "file")]
        id: Option<String>,
        /// Read a saved session snapshot instead of calling the API.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Write the fetched session snapshot to this path.
        #[arg(long, requires = "id")]
        save: Option<PathBuf>,
    },

    /// Record an item's answer (`conforme`, `nao_conforme`, `nao_aplicavel`,
    /// `nao_avaliado`, or a custom option).
    Answer {
        #[arg(long)]
        id: String,
        #[arg(long)]
        item: String,
        #[arg(long)]
        answer: String,
    },

    /// Save an item's observation.
    Observe {
        #[arg(long)]
        id: String,
        #[arg(long)]
        item: String,
        #[arg(long)]
        text: String,
    },

    /// Attach a photo to an answered item.
    Photo {
        #[arg(long)]
        id: String,
        #[arg(long)]
        item: String,
        /// JPEG, PNG or WebP file.
        #[arg(long)]
        path: PathBuf,
    },

    /// Have the AI draft the finding for an answered item.
    Draft {
        #[arg(long)]
        id: String,
        #[arg(long)]
        item: String,
        /// What the auditor saw.
        #[arg(long)]
        context: String,
    },

    /// Finalize the audit.
    Finalize {
        #[arg(long)]
        id: String,
        /// General observations for the report.
        #[arg(long)]
        observations: Option<String>,
    },

    /// Reopen a finalized audit.
    Reopen {
        #[arg(long)]
        id: String,
    },
}

/// Execute the audit subcommand.
pub fn run_audit(args: &AuditArgs) -> Result<u8> {
    if let AuditCommand::Show {
        file: Some(path), ..
    } = &args.command
    {
        let session = read_snapshot(path)?;
        print_report(&session, args.json)?;
        return Ok(0);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run_remote(args))
}

async fn run_remote(args: &AuditArgs) -> Result<u8> {
    let client = FsaClient::new(args.api.config()?)?;

    let controller = match &args.command {
        AuditCommand::Start {
            unit,
            template,
            lat,
            lng,
        } => {
            let geo = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(GeoPoint::new(*lat, *lng)?),
                _ => None,
            };
            let controller = AuditSessionController::start(
                client.collaborators(),
                UnitId::parse(unit)?,
                TemplateId::parse(template)?,
                geo,
            )
            .await?;
            tracing::info!(audit_id = %controller.audit_id(), "audit started");
            controller
        }
        AuditCommand::Show { id: Some(id), save, .. } => {
            let controller = load(&client, id).await?;
            if let Some(path) = save {
                write_snapshot(path, &controller.snapshot())?;
            }
            controller
        }
        AuditCommand::Show { id: None, .. } => bail!("either --id or --file is required"),
        AuditCommand::Answer { id, item, answer } => {
            let controller = load(&client, id).await?;
            controller
                .answer_item(AuditItemId::parse(item)?, Answer::from_wire(answer.trim()))
                .await?;
            controller
        }
        AuditCommand::Observe { id, item, text } => {
            let controller = load(&client, id).await?;
            controller
                .save_observation(AuditItemId::parse(item)?, text)
                .await?;
            controller
        }
        AuditCommand::Photo { id, item, path } => {
            let controller = load(&client, id).await?;
            let image = read_image(path)?;
            let report = controller
                .add_evidence(AuditItemId::parse(item)?, image)
                .await?;
            match &report.outcome {
                AnnotationOutcome::Annotated { severity } => {
                    eprintln!("Photo stored and annotated (severity: {severity:?}).")
                }
                AnnotationOutcome::NotRelevant => {
                    eprintln!("Photo stored; the AI judged it not relevant to the question.")
                }
                AnnotationOutcome::Failed { reason } => {
                    eprintln!("Photo stored; analysis failed: {reason}")
                }
                AnnotationOutcome::Discarded => {
                    eprintln!("Photo stored; the analysis result was discarded.")
                }
            }
            controller
        }
        AuditCommand::Draft { id, item, context } => {
            let controller = load(&client, id).await?;
            let text = controller
                .draft_finding(AuditItemId::parse(item)?, context)
                .await?;
            eprintln!("{}", text.technical_description);
            controller
        }
        AuditCommand::Finalize { id, observations } => {
            let controller = load(&client, id).await?;
            controller.finalize(observations.clone()).await?;
            controller
        }
        AuditCommand::Reopen { id } => {
            let controller = load(&client, id).await?;
            controller.reopen().await?;
            controller
        }
    };

    print_report(&controller.snapshot(), args.json)?;
    Ok(0)
}

async fn load(client: &FsaClient, id: &str) -> Result<AuditSessionController> {
    let audit = AuditId::parse(id)?;
    AuditSessionController::load(client.collaborators(), audit)
        .await
        .with_context(|| format!("failed to load audit {id}"))
}

fn print_report(session: &AuditSession, json: bool) -> Result<()> {
    let report = SessionReport::of(session);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

/// Load a session snapshot written by `show --save`.
pub fn read_snapshot(path: &Path) -> Result<AuditSession> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a session snapshot", path.display()))
}

/// Write a session snapshot as pretty JSON.
pub fn write_snapshot(path: &Path, session: &AuditSession) -> Result<()> {
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Read an image file, inferring its MIME type from the extension.
pub fn read_image(path: &Path) -> Result<ImageData> {
    let content_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => bail!("{} is not a JPEG, PNG or WebP image", path.display()),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("foto")
        .to_string();
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(ImageData::new(file_name, content_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsa_audit::{AuditItem, TemplateItem};
    use fsa_core::{AnswerSet, TemplateItemId};

    fn api(token: Option<&str>) -> ApiArgs {
        ApiArgs {
            api_url: "http://api.local:8080".into(),
            ai_url: None,
            token: token.map(str::to_string),
            timeout_secs: 10,
        }
    }

    #[test]
    fn config_requires_token() {
        let err = api(None).config().unwrap_err();
        assert!(err.to_string().contains("API token is required"));
    }

    #[test]
    fn config_defaults_ai_url_to_api_url() {
        let config = api(Some("secret")).config().unwrap();
        assert_eq!(config.ai_url, config.api_url);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.api_token.as_str(), "secret");
    }

    #[test]
    fn config_rejects_bad_url() {
        let mut args = api(Some("t"));
        args.api_url = "not a url".into();
        assert!(args.config().is_err());
    }

    #[test]
    fn read_image_infers_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bancada.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = read_image(&path).unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.file_name, "Bancada.PNG");
        assert_eq!(image.bytes.len(), 4);
    }

    #[test]
    fn read_image_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laudo.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        assert!(read_image(&path).is_err());
    }

    #[test]
    fn snapshot_survives_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let mut item = AuditItem::new(
            AuditItemId::new(),
            TemplateItem {
                id: TemplateItemId::new(),
                question: "Temperatura da câmara fria registrada?".into(),
                category: "Controle de temperatura".into(),
                weight: 3,
                mandatory: true,
                answer_set: AnswerSet::Custom(vec!["Até 4 °C".into(), "Acima de 4 °C".into()]),
            },
        );
        item.answer = Answer::Custom("Até 4 °C".into());
        let session =
            AuditSession::new(AuditId::new(), UnitId::new(), TemplateId::new(), vec![item]);

        write_snapshot(&path, &session).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), session);
    }

    #[test]
    fn show_from_file_runs_offline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let session = AuditSession::new(AuditId::new(), UnitId::new(), TemplateId::new(), vec![]);
        write_snapshot(&path, &session).unwrap();

        let args = AuditArgs {
            api: api(None),
            json: true,
            command: AuditCommand::Show {
                id: None,
                file: Some(path),
                save: None,
            },
        };
        assert_eq!(run_audit(&args).unwrap(), 0);
    }
}
