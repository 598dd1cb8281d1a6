//! # Live Quiz Session Library
//!
//! This library runs live trivia sessions: a host drives a quiz through a
//! sequence of timed multiple choice questions while players join with a short
//! code, answer concurrently, and watch a leaderboard converge. It covers the
//! session state machine, time-decayed scoring, answer deduplication, join
//! code allocation, leaderboard and vote aggregation, and the host and player
//! read models. Transport and persistence are left to the embedding
//! application through the [`store::Store`] and [`tunnel::Tunnel`] traits.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod ids;
pub mod join_code;
pub mod leaderboard;
pub mod ledger;
pub mod names;
pub mod quiz;
pub mod scoring;
pub mod session;
pub mod store;
pub mod tunnel;
pub mod view;

pub use config::{ConfigError, EngineConfig, TimingPolicy};
pub use engine::{AnswerSubmission, Engine, Joined, SessionPreview, SessionTicket};
pub use error::Error;
pub use ids::{HostToken, ParticipantId, QuestionId, QuizId, SessionId};
pub use join_code::JoinCode;
pub use ledger::Submission;
pub use quiz::{OptionLabel, QuestionDraft, QuizDraft};
pub use session::{Advance, Status};
