//! RevenuePilot Risk Recovery API Library
//!
//! Core of the revenue-risk recovery service: scores enterprise accounts
//! from weighted signals, selects deterministic recovery playbooks, gates
//! high-value strategies behind human approval, dispatches approved
//! strategies to the outbound-action collaborator, and accumulates
//! explainable audit metrics across runs.
//!
//! # Modules
//!
//! - `approvals`: Pending-approval queue and its state machine.
//! - `audit`: Cross-run metrics accumulator and per-run reporting.
//! - `config`: Configuration management.
//! - `connector`: Outbound-action collaborator boundary.
//! - `errors`: Error handling types.
//! - `executor`: Strategy dispatch.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `pipeline`: Per-batch pipeline orchestration.
//! - `scoring`: Multi-signal risk scoring.
//! - `strategy`: Playbook selection.
//! - `validator`: Account validation.

pub mod approvals;
pub mod audit;
pub mod config;
pub mod connector;
pub mod errors;
pub mod executor;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod strategy;
pub mod validator;
