//! Core domain types for Gala.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod draw;
mod ids;
mod participant;
mod prize;
mod proofs;

pub use draw::{DrawStatus, OverrideEntry, OverrideSnapshot, OverrideState, WinnerCommit};
pub use ids::{ParticipantId, PrizeId};
pub use participant::{Participant, WinRecord};
pub use prize::{Prize, PrizeError};
pub use proofs::{EmptyStringError, NonEmptyString, Quota, ZeroQuotaError};
