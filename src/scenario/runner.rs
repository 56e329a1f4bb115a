//! Scenario execution

use crate::crypto::random_nonce;
use crate::ledger::{Ledger, RejectingReceiver, ValueTransfer};
use crate::scenario::scenario::{ReceiverKind, Scenario, ScenarioError, Step};
use crate::wallet::{GuardedWallet, ReentrantReceiver, ReentryAttempt, TransferRight, WalletError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Result of one step
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepOutcome {
    pub index: usize,
    pub description: String,
    /// `None` if the step succeeded
    pub error: Option<String>,
    pub balance_after: u128,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a finished run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScenarioReport {
    pub name: String,
    pub wallet: String,
    pub initial_balance: u128,
    pub final_balance: u128,
    /// Value that left the wallet during the steps
    pub total_sent: u128,
    pub owners: Vec<String>,
    pub rights: Vec<(String, TransferRight)>,
    pub steps: Vec<StepOutcome>,
    /// Reentry attempts per reentrant receiver
    pub reentry_attempts: BTreeMap<String, Vec<ReentryAttempt>>,
}

impl ScenarioReport {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.succeeded()).count()
    }
}

/// A deployed and funded wallet with its ledger and receivers
pub struct Simulation {
    pub ledger: Ledger,
    pub wallet: Rc<GuardedWallet>,
    reentrants: BTreeMap<String, Rc<ReentrantReceiver>>,
}

impl Simulation {
    pub fn reentrant(&self, address: &str) -> Option<&Rc<ReentrantReceiver>> {
        self.reentrants.get(address)
    }

    fn apply(&self, step: &Step) -> Result<(), WalletError> {
        match step {
            Step::Transfer { caller, to, amount } => self
                .wallet
                .transfer_to(&self.ledger, caller, to, *amount)
                .map(|_| ()),
            Step::AddOwners { caller, owners } => {
                let owners: Vec<&str> = owners.iter().map(String::as_str).collect();
                self.wallet.add_owners(caller, &owners).map(|_| ())
            }
            Step::Resign { caller } => self.wallet.resign_ownership(caller),
            Step::RemoveOwner { caller, owner } => self.wallet.remove_owner(caller, owner),
            // Targets are checked by validation
            Step::Arm { receiver, plan } => {
                if let Some(r) = self.reentrants.get(receiver) {
                    r.arm(plan.clone());
                }
                Ok(())
            }
            Step::Disarm { receiver } => {
                if let Some(r) = self.reentrants.get(receiver) {
                    r.disarm();
                }
                Ok(())
            }
        }
    }
}

/// Plays a scenario against a fresh ledger
pub struct ScenarioRunner {
    scenario: Scenario,
}

impl ScenarioRunner {
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        Ok(Self { scenario })
    }

    /// Deploy, configure owners, fund the wallet and install receivers
    pub fn setup(&self) -> Result<Simulation, ScenarioError> {
        let s = &self.scenario;
        let ledger = Ledger::with_config(s.ledger.clone());
        let nonce = s.nonce.unwrap_or_else(random_nonce);
        let wallet = Rc::new(GuardedWallet::deploy(&s.deployer, nonce, s.wallet.clone()));

        let owners: Vec<&str> = s.owners.iter().map(String::as_str).collect();
        wallet.add_owners(&s.deployer, &owners)?;
        if s.deployer_resigns {
            wallet.resign_ownership(&s.deployer)?;
        }

        if s.funding > 0 {
            ledger.mint(&s.deployer, s.funding)?;
            ledger.send(&s.deployer, wallet.address(), s.funding)?;
        }

        let mut reentrants = BTreeMap::new();
        for spec in &s.receivers {
            match &spec.kind {
                ReceiverKind::Reject => {
                    ledger.register_receiver(&spec.address, Rc::new(RejectingReceiver::new()));
                }
                ReceiverKind::Reentrant(plan) => {
                    let receiver = Rc::new(ReentrantReceiver::new(
                        &spec.address,
                        wallet.clone(),
                        plan.clone(),
                    ));
                    ledger.register_receiver(&spec.address, receiver.clone());
                    reentrants.insert(spec.address.clone(), receiver);
                }
            }
        }

        Ok(Simulation {
            ledger,
            wallet,
            reentrants,
        })
    }

    /// Run every step; failing steps are recorded, not fatal
    pub fn run(&self) -> Result<(ScenarioReport, Simulation), ScenarioError> {
        let sim = self.setup()?;
        let initial_balance = sim.wallet.get_balance(&sim.ledger);

        log::info!(
            "Running scenario '{}' against {} ({} steps)",
            self.scenario.name,
            sim.wallet.address(),
            self.scenario.steps.len()
        );

        let mut steps = Vec::with_capacity(self.scenario.steps.len());
        for (index, step) in self.scenario.steps.iter().enumerate() {
            let error = match sim.apply(step) {
                Ok(()) => None,
                Err(e) => {
                    if e.is_rejection() {
                        log::info!("Step {} rejected: {}", index, e);
                    } else {
                        log::warn!("Step {} failed after spending a right: {}", index, e);
                    }
                    Some(e.to_string())
                }
            };
            steps.push(StepOutcome {
                index,
                description: step.describe(),
                error,
                balance_after: sim.wallet.get_balance(&sim.ledger),
            });
        }

        let final_balance = sim.wallet.get_balance(&sim.ledger);
        let report = ScenarioReport {
            name: self.scenario.name.clone(),
            wallet: sim.wallet.address().to_string(),
            initial_balance,
            final_balance,
            total_sent: initial_balance.saturating_sub(final_balance),
            owners: sim.wallet.owners(),
            rights: sim.wallet.rights(),
            steps,
            reentry_attempts: sim
                .reentrants
                .iter()
                .map(|(address, r)| (address.clone(), r.attempts()))
                .collect(),
        };

        Ok((report, sim))
    }
}
