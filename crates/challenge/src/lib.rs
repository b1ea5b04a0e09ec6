//! Challenge view controller.
//!
//! Classifies server status into a view state, wires the shared countdown to
//! server-reported remaining time, and runs flag submission with the server
//! as the authority over the local clock.

pub mod controller;

pub use controller::{classify, ChallengeController, ChallengeEvent, SubmitOutcome, ViewState};
