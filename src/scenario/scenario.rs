//! Scenario definitions
//!
//! Scenarios are plain JSON documents.

use crate::ledger::{LedgerConfig, LedgerError, ETHER};
use crate::wallet::{FailurePolicy, ReentryPlan, WalletConfig, WalletError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Scenario errors
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    #[error("Setup failed: {0}")]
    WalletSetup(#[from] WalletError),
    #[error("Funding failed: {0}")]
    Funding(#[from] LedgerError),
}

/// Behaviour installed on a destination account
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverKind {
    /// Refuse every incoming transfer
    Reject,
    /// Call back into the wallet on receipt
    Reentrant(ReentryPlan),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReceiverSpec {
    pub address: String,
    pub kind: ReceiverKind,
}

/// One scripted action
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Transfer {
        caller: String,
        to: String,
        amount: u128,
    },
    AddOwners {
        caller: String,
        owners: Vec<String>,
    },
    Resign {
        caller: String,
    },
    RemoveOwner {
        caller: String,
        owner: String,
    },
    /// Replace the plan of a reentrant receiver
    Arm {
        receiver: String,
        plan: ReentryPlan,
    },
    /// Stop a reentrant receiver from calling back
    Disarm {
        receiver: String,
    },
}

impl Step {
    /// One-line description for reports
    pub fn describe(&self) -> String {
        match self {
            Step::Transfer { caller, to, amount } => {
                format!("{} transfers {} to {}", caller, amount, to)
            }
            Step::AddOwners { caller, owners } => {
                format!("{} adds owners [{}]", caller, owners.join(", "))
            }
            Step::Resign { caller } => format!("{} resigns", caller),
            Step::RemoveOwner { caller, owner } => format!("{} removes {}", caller, owner),
            Step::Arm { receiver, plan } => format!(
                "{} arms reentry as {} for {} (x{}, {:?})",
                receiver, plan.caller, plan.amount, plan.max_reentries, plan.on_failure
            ),
            Step::Disarm { receiver } => format!("{} disarms", receiver),
        }
    }
}

fn default_deployer() -> String {
    "deployer".to_string()
}

/// A complete scripted run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_deployer")]
    pub deployer: String,
    /// Deployment nonce; a random one is used when absent
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Value moved into the wallet before the steps run
    pub funding: u128,
    pub owners: Vec<String>,
    #[serde(default)]
    pub deployer_resigns: bool,
    #[serde(default)]
    pub receivers: Vec<ReceiverSpec>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

impl Scenario {
    /// Load and validate a scenario file
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parse and validate a scenario document
    pub fn from_json(data: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(data)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check references between receivers and steps
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.deployer.is_empty() {
            return Err(ScenarioError::Invalid("deployer must not be empty".into()));
        }

        let mut seen = HashSet::new();
        let mut reentrant = HashSet::new();
        for receiver in &self.receivers {
            if !seen.insert(receiver.address.as_str()) {
                return Err(ScenarioError::Invalid(format!(
                    "receiver {} declared twice",
                    receiver.address
                )));
            }
            if receiver.address == self.deployer {
                return Err(ScenarioError::Invalid(
                    "the deployer cannot be a receiver".into(),
                ));
            }
            if matches!(receiver.kind, ReceiverKind::Reentrant(_)) {
                reentrant.insert(receiver.address.as_str());
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            let target = match step {
                Step::Arm { receiver, .. } | Step::Disarm { receiver } => receiver,
                _ => continue,
            };
            if !reentrant.contains(target.as_str()) {
                return Err(ScenarioError::Invalid(format!(
                    "step {} targets {}, which is not a reentrant receiver",
                    index, target
                )));
            }
        }

        Ok(())
    }

    /// The reentrancy attack on a wallet shared by two owners
    ///
    /// The wallet holds 3 ether, owners are wallet1 and wallet2, and the
    /// deployer resigns. wallet1 pays the hacker, whose reentry as wallet1
    /// bounces and is ignored, leaving 2 ether. The hacker then re-enters as
    /// wallet2 while wallet2 pays it and reverts when that fails, so the
    /// balance stays at 2 ether. A final plain attempt by wallet2 is refused
    /// because the blocked transfer already spent its right.
    pub fn multi_attack() -> Self {
        let plan = |caller: &str, on_failure: FailurePolicy| ReentryPlan {
            caller: caller.to_string(),
            amount: ETHER,
            max_reentries: 1,
            on_failure,
        };
        let transfer = |caller: &str| Step::Transfer {
            caller: caller.to_string(),
            to: "hacker".to_string(),
            amount: ETHER,
        };

        Self {
            name: "multi-attack".to_string(),
            deployer: default_deployer(),
            nonce: Some(0),
            funding: 3 * ETHER,
            owners: vec!["wallet1".to_string(), "wallet2".to_string()],
            deployer_resigns: true,
            receivers: vec![ReceiverSpec {
                address: "hacker".to_string(),
                kind: ReceiverKind::Reentrant(plan("wallet1", FailurePolicy::Swallow)),
            }],
            steps: vec![
                transfer("wallet1"),
                Step::Arm {
                    receiver: "hacker".to_string(),
                    plan: plan("wallet2", FailurePolicy::Revert),
                },
                transfer("wallet2"),
                Step::Disarm {
                    receiver: "hacker".to_string(),
                },
                transfer("wallet2"),
            ],
            ledger: LedgerConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}
