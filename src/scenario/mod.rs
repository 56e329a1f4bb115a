//! Scripted wallet scenarios
//!
//! A scenario deploys a wallet, funds it, installs receivers (including
//! reentrant attackers) and then plays a list of owner and transfer steps,
//! recording the outcome of each one.

pub mod runner;
pub mod scenario;

pub use runner::{ScenarioReport, ScenarioRunner, Simulation, StepOutcome};
pub use scenario::{ReceiverKind, ReceiverSpec, Scenario, ScenarioError, Step};
