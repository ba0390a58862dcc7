//! # fsa-cli — Audit Session Command-Line Interface
//!
//! Runs the audit-execution core from a terminal: the same session
//! controller the field app embeds, wired to the HTTP collaborators of
//! `fsa-client`.
//!
//! ## Subcommands
//!
//! - `fsa audit start|show|answer|observe|photo|draft|finalize|reopen`
//!
//! ```bash
//! export FSA_API_URL=https://api.example FSA_API_TOKEN=...
//! fsa audit show --id 6f1c2b1e-8d0a-4c55-9a7e-3c2f1d0e9b11 --save audit.json
//! fsa audit show --file audit.json --json
//! fsa audit answer --id ... --item ... --answer nao_conforme
//! fsa audit finalize --id ... --observations "Boa organização geral"
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from execution.
//! - Handlers delegate to `fsa-audit`; no session rules live here.

pub mod audit;
pub mod report;
