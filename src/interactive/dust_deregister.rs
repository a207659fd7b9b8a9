//! Dust deregistration wizard: opt registered NIGHT coins back out of
//! reward generation. Mirrors the registration wizard minus the receiver
//! step; only registered coins are offered.

use anyhow::Result;
use console::{style, Term};

use crate::engine::pipeline::{self, TransactionOutcome};
use crate::engine::Utxo;
use crate::utils::balance::format_balance;

use super::{
    multi_select, prompt_event, render_outcome, spinner, wait_for_key, FlowOutcome, PromptEvent,
    WalletSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeregisterStep {
    SelectUtxos,
    Confirm,
    Processing,
    Result,
}

pub struct DeregisterWizard {
    step: DeregisterStep,
    candidates: Vec<Utxo>,
    pub selected: Vec<Utxo>,
    pub outcome: Option<TransactionOutcome>,
}

impl DeregisterWizard {
    pub fn new(candidates: Vec<Utxo>) -> DeregisterWizard {
        DeregisterWizard {
            step: DeregisterStep::SelectUtxos,
            candidates,
            selected: Vec::new(),
            outcome: None,
        }
    }

    pub fn step(&self) -> DeregisterStep {
        self.step
    }

    pub fn candidates(&self) -> &[Utxo] {
        &self.candidates
    }

    /// Commit a non-empty selection; empty selections refuse the transition.
    pub fn select_utxos(&mut self, indices: &[usize]) -> bool {
        if self.step != DeregisterStep::SelectUtxos || indices.is_empty() {
            return false;
        }
        self.selected = indices
            .iter()
            .filter_map(|&i| self.candidates.get(i).cloned())
            .collect();
        if self.selected.is_empty() {
            return false;
        }
        self.step = DeregisterStep::Confirm;
        true
    }

    pub fn confirm(&mut self) -> bool {
        if self.step == DeregisterStep::Confirm && !self.selected.is_empty() {
            self.step = DeregisterStep::Processing;
            true
        } else {
            false
        }
    }

    pub fn finish(&mut self, outcome: TransactionOutcome) {
        if self.step == DeregisterStep::Processing {
            self.outcome = Some(outcome);
            self.step = DeregisterStep::Result;
        }
    }

    pub fn back(&mut self) -> bool {
        match self.step {
            DeregisterStep::SelectUtxos | DeregisterStep::Result => false,
            DeregisterStep::Confirm => {
                self.selected.clear();
                self.step = DeregisterStep::SelectUtxos;
                true
            }
            DeregisterStep::Processing => true,
        }
    }
}

/// Drive the deregistration wizard to completion.
pub(crate) async fn run(session: &WalletSession) -> Result<FlowOutcome> {
    let state = session.snapshot();
    let candidates: Vec<Utxo> = state
        .unshielded
        .available_coins
        .iter()
        .filter(|coin| coin.meta.registered_for_dust)
        .map(|coin| coin.utxo.clone())
        .collect();

    if candidates.is_empty() {
        println!(
            "\n{}",
            style("No NIGHT coins are registered for dust generation.").yellow()
        );
        wait_for_key()?;
        return Ok(FlowOutcome::Done);
    }

    let mut wizard = DeregisterWizard::new(candidates);
    let term = Term::stdout();

    loop {
        match wizard.step() {
            DeregisterStep::SelectUtxos => {
                let rows: Vec<String> = wizard
                    .candidates()
                    .iter()
                    .map(|utxo| {
                        format!(
                            "{}:{} — {} NIGHT",
                            utxo.intent_hash,
                            utxo.output_index,
                            format_balance(utxo.value)
                        )
                    })
                    .collect();
                match multi_select::interact(
                    &term,
                    "🌘 Deregister from Dust Generation",
                    "Select all coins",
                    &rows,
                )? {
                    PromptEvent::Value(indices) => {
                        wizard.select_utxos(&indices);
                    }
                    PromptEvent::Back => return Ok(FlowOutcome::Done),
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }

            DeregisterStep::Confirm => {
                clearscreen::clear().ok();
                println!("{}", style("📝 Deregistration Summary").bold());
                println!("{}", "=".repeat(30));
                let total: u128 = wizard.selected.iter().map(|u| u.value).sum();
                println!(
                    "Coins: {} ({} NIGHT)",
                    wizard.selected.len(),
                    format_balance(total)
                );
                println!("These coins will stop generating dust.");

                let prompt = inquire::Confirm::new("Deregister these coins?")
                    .with_default(true)
                    .prompt();
                match prompt_event(prompt)? {
                    PromptEvent::Value(true) => {
                        wizard.confirm();
                    }
                    PromptEvent::Value(false) | PromptEvent::Back => {
                        wizard.back();
                    }
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }

            DeregisterStep::Processing => {
                let progress =
                    spinner("Building, proving, and broadcasting the deregistration...");
                let outcome = pipeline::execute_deregistration(
                    session.engine.as_ref(),
                    wizard.selected.clone(),
                    &session.keystore,
                )
                .await;
                progress.finish_and_clear();
                wizard.finish(outcome);
            }

            DeregisterStep::Result => {
                render_outcome("Dust deregistration", wizard.outcome.as_ref());
                wait_for_key()?;
                return Ok(FlowOutcome::Done);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(index: u32) -> Utxo {
        Utxo {
            intent_hash: format!("intent-{index:02}"),
            output_index: index,
            token: crate::engine::NIGHT_TOKEN_ID.to_string(),
            value: 1_000_000,
        }
    }

    #[test]
    fn requires_a_non_empty_selection() {
        let mut wizard = DeregisterWizard::new(vec![utxo(0), utxo(1)]);
        assert!(!wizard.select_utxos(&[]));
        assert!(!wizard.confirm());
        assert_eq!(wizard.step(), DeregisterStep::SelectUtxos);
    }

    #[test]
    fn runs_forward_to_a_terminal_result() {
        let mut wizard = DeregisterWizard::new(vec![utxo(0), utxo(1)]);
        assert!(wizard.select_utxos(&[1]));
        assert!(wizard.confirm());
        wizard.finish(TransactionOutcome::Failure {
            error: "proof generation failed: timeout".to_string(),
        });
        assert_eq!(wizard.step(), DeregisterStep::Result);
        assert!(!wizard.back());
    }

    #[test]
    fn back_from_confirm_clears_the_selection() {
        let mut wizard = DeregisterWizard::new(vec![utxo(0), utxo(1)]);
        wizard.select_utxos(&[0, 1]);
        assert!(wizard.back());
        assert_eq!(wizard.step(), DeregisterStep::SelectUtxos);
        assert!(wizard.selected.is_empty());
        assert!(!wizard.back());
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let mut wizard = DeregisterWizard::new(vec![utxo(0)]);
        assert!(wizard.select_utxos(&[0, 7]));
        assert_eq!(wizard.selected.len(), 1);
    }
}
