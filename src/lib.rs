//! # rag-sync
//!
//! Keeps a branch-scoped RAG document index in sync with a repository from
//! inside a CI job.
//!
//! Each run resolves which files changed (GitHub API or local `git diff`),
//! asks the index which of them it already holds, and sends the minimal set
//! of create, update, and delete calls. When the branch has no index yet,
//! the whole working tree is indexed in one call.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ ChangeSource │──▶│  Reconciler  │──▶│ DocumentIndex│
//! │ GitHub / git │   │ classify+send│   │  HTTP (RAG)  │
//! └──────────────┘   └──────┬───────┘   └──────────────┘
//!                           │
//!                     ┌─────▼─────┐
//!                     │  Corpus   │
//!                     │ work tree │
//!                     └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Layered configuration (TOML, CI env, CLI) |
//! | [`models`] | Index wire types |
//! | [`index`] | `DocumentIndex` trait, HTTP client, in-memory double |
//! | [`changes`] | `ChangeSource` trait and selection |
//! | [`changes_github`] | GitHub commit / pull request file lists |
//! | [`changes_git`] | Local `git diff` |
//! | [`corpus`] | Working tree filtering, reads, bootstrap scan |
//! | [`reconcile`] | Reconciliation engine |
//! | [`ci`] | GitHub Actions annotations and step summary |
//! | [`error`] | Error taxonomy |

pub mod changes;
pub mod changes_git;
pub mod changes_github;
pub mod ci;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod models;
pub mod reconcile;
