//! Dust registration wizard: opt NIGHT coins into passive reward generation.
//!
//! Steps: pick the UTXOs to register, choose the dust receiver (`c` switches
//! to custom entry, `d` back to the wallet's own dust address), confirm with
//! a best-effort fee estimate, then submit. Only coins not yet registered
//! are offered.

use anyhow::Result;
use console::{style, Key, Term};
use inquire::Text;
use log::warn;

use crate::config::NetworkId;
use crate::engine::pipeline::{self, TransactionOutcome};
use crate::engine::{Utxo, WalletEngine};
use crate::utils::address::{validate_address, AddressKind};
use crate::utils::balance::format_balance;
use crate::utils::display::truncate_address;

use super::{
    multi_select, prompt_event, render_outcome, spinner, wait_for_key, FlowOutcome, PromptEvent,
    WalletSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterStep {
    SelectUtxos,
    SelectAddress,
    Confirm,
    Processing,
    Result,
}

/// Where generated dust should accrue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DustReceiver {
    /// The wallet's own dust address.
    #[default]
    WalletDefault,
    Custom(String),
}

/// State machine for the registration wizard. `candidates` is the fixed
/// list of registerable coins captured when the wizard starts; `selected`
/// holds indices into it.
pub struct RegisterWizard {
    step: RegisterStep,
    network: NetworkId,
    candidates: Vec<Utxo>,
    pub selected: Vec<Utxo>,
    pub receiver: DustReceiver,
    pub fee: Option<u128>,
    pub outcome: Option<TransactionOutcome>,
    error: Option<String>,
}

impl RegisterWizard {
    pub fn new(network: NetworkId, candidates: Vec<Utxo>) -> RegisterWizard {
        RegisterWizard {
            step: RegisterStep::SelectUtxos,
            network,
            candidates,
            selected: Vec::new(),
            receiver: DustReceiver::WalletDefault,
            fee: None,
            outcome: None,
            error: None,
        }
    }

    pub fn step(&self) -> RegisterStep {
        self.step
    }

    pub fn candidates(&self) -> &[Utxo] {
        &self.candidates
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Commit a non-empty selection of candidate indices. An empty
    /// selection refuses the transition.
    pub fn select_utxos(&mut self, indices: &[usize]) -> bool {
        if self.step != RegisterStep::SelectUtxos || indices.is_empty() {
            return false;
        }
        self.selected = indices
            .iter()
            .filter_map(|&i| self.candidates.get(i).cloned())
            .collect();
        if self.selected.is_empty() {
            return false;
        }
        self.step = RegisterStep::SelectAddress;
        true
    }

    /// Keep rewards on the wallet's own dust address.
    pub fn accept_default_receiver(&mut self) {
        if self.step == RegisterStep::SelectAddress {
            self.receiver = DustReceiver::WalletDefault;
            self.step = RegisterStep::Confirm;
        }
    }

    /// Validate and commit a custom dust receiver.
    pub fn accept_custom_receiver(&mut self, input: &str) -> bool {
        if self.step != RegisterStep::SelectAddress {
            return false;
        }
        match validate_address(input.trim(), AddressKind::Dust, self.network) {
            Ok(address) => {
                self.receiver = DustReceiver::Custom(address);
                self.error = None;
                self.step = RegisterStep::Confirm;
                true
            }
            Err(error) => {
                self.error = Some(error.to_string());
                false
            }
        }
    }

    /// Best-effort fee estimate captured on entry to `confirm`; `None`
    /// simply omits the fee line, it is never fatal.
    pub fn set_fee_estimate(&mut self, fee: Option<u128>) {
        if self.step == RegisterStep::Confirm {
            self.fee = fee;
        }
    }

    pub fn confirm(&mut self) -> bool {
        if self.step == RegisterStep::Confirm && !self.selected.is_empty() {
            self.step = RegisterStep::Processing;
            true
        } else {
            false
        }
    }

    pub fn finish(&mut self, outcome: TransactionOutcome) {
        if self.step == RegisterStep::Processing {
            self.outcome = Some(outcome);
            self.step = RegisterStep::Result;
        }
    }

    /// The receiver to hand the engine: `None` when rewards go to the
    /// wallet's own dust address, including a custom entry that spells out
    /// that same address.
    pub fn receiver_param(&self, own_dust_address: &str) -> Option<String> {
        match &self.receiver {
            DustReceiver::WalletDefault => None,
            DustReceiver::Custom(address) if address == own_dust_address => None,
            DustReceiver::Custom(address) => Some(address.clone()),
        }
    }

    /// One step back, clearing what the step being returned to collected.
    pub fn back(&mut self) -> bool {
        self.error = None;
        match self.step {
            RegisterStep::SelectUtxos | RegisterStep::Result => false,
            RegisterStep::SelectAddress => {
                self.selected.clear();
                self.step = RegisterStep::SelectUtxos;
                true
            }
            RegisterStep::Confirm => {
                self.receiver = DustReceiver::WalletDefault;
                self.fee = None;
                self.step = RegisterStep::SelectAddress;
                true
            }
            RegisterStep::Processing => true,
        }
    }
}

/// What a key press on the receiver screen means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiverAction {
    EnterCustom,
    UseDefault,
    Continue,
    Back,
    Quit,
    None,
}

fn receiver_action(key: &Key) -> ReceiverAction {
    match key {
        Key::Char('c') => ReceiverAction::EnterCustom,
        Key::Char('d') => ReceiverAction::UseDefault,
        Key::Enter => ReceiverAction::Continue,
        Key::Escape => ReceiverAction::Back,
        Key::Char('\u{3}') => ReceiverAction::Quit,
        _ => ReceiverAction::None,
    }
}

fn utxo_row(utxo: &Utxo) -> String {
    format!(
        "{}:{} — {} NIGHT",
        utxo.intent_hash,
        utxo.output_index,
        format_balance(utxo.value)
    )
}

/// Drive the registration wizard to completion.
pub(crate) async fn run(session: &WalletSession) -> Result<FlowOutcome> {
    let state = session.snapshot();
    let candidates: Vec<Utxo> = state
        .unshielded
        .available_coins
        .iter()
        .filter(|coin| !coin.meta.registered_for_dust)
        .map(|coin| coin.utxo.clone())
        .collect();

    if candidates.is_empty() {
        println!(
            "\n{}",
            style("Every NIGHT coin is already registered for dust generation.").yellow()
        );
        wait_for_key()?;
        return Ok(FlowOutcome::Done);
    }

    let own_dust_address = state.dust.dust_address.clone();
    let mut wizard = RegisterWizard::new(session.config.network_id, candidates);
    let term = Term::stdout();

    loop {
        match wizard.step() {
            RegisterStep::SelectUtxos => {
                let rows: Vec<String> = wizard.candidates().iter().map(utxo_row).collect();
                match multi_select::interact(
                    &term,
                    "🌒 Register for Dust Generation",
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

            RegisterStep::SelectAddress => {
                // Screen-local custom entry; `d` discards it and goes back
                // to the wallet's own dust address.
                let mut custom: Option<String> = None;
                loop {
                    clearscreen::clear().ok();
                    println!("{}\n", style("Dust receiver").bold());
                    match &custom {
                        Some(address) => println!("Receiver: {address}"),
                        None => println!(
                            "Receiver: {} (this wallet's dust address)",
                            style(truncate_address(&own_dust_address)).dim()
                        ),
                    }
                    if let Some(error) = wizard.take_error() {
                        println!("\n{}", style(format!("✖ {error}")).red());
                    }
                    println!(
                        "\n{}",
                        style(
                            "[c] custom address · [d] wallet default · \
                             [enter] continue · [esc] back"
                        )
                        .dim()
                    );

                    match receiver_action(&term.read_key()?) {
                        ReceiverAction::EnterCustom => {
                            // Esc in the entry keeps whatever was committed
                            // before, discarding the partial input.
                            let initial = custom.clone().unwrap_or_default();
                            let prompt = Text::new("Custom dust address:")
                                .with_initial_value(&initial)
                                .with_help_message("mn_dust...")
                                .prompt();
                            match prompt_event(prompt)? {
                                PromptEvent::Value(input) => custom = Some(input),
                                PromptEvent::Back => {}
                                PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                            }
                        }
                        ReceiverAction::UseDefault => custom = None,
                        ReceiverAction::Continue => match &custom {
                            Some(input) => {
                                if wizard.accept_custom_receiver(input) {
                                    break;
                                }
                            }
                            None => {
                                wizard.accept_default_receiver();
                                break;
                            }
                        },
                        ReceiverAction::Back => {
                            wizard.back();
                            break;
                        }
                        ReceiverAction::Quit => return Ok(FlowOutcome::Quit),
                        ReceiverAction::None => {}
                    }
                }
            }

            RegisterStep::Confirm => {
                // Fee estimate is best effort; a failure just drops the line.
                let fee = match session.engine.estimate_registration(&wizard.selected).await {
                    Ok(estimate) => Some(estimate.fee),
                    Err(error) => {
                        warn!("registration fee estimate failed: {error}");
                        None
                    }
                };
                wizard.set_fee_estimate(fee);

                clearscreen::clear().ok();
                println!("{}", style("📝 Registration Summary").bold());
                println!("{}", "=".repeat(30));
                let total: u128 = wizard.selected.iter().map(|u| u.value).sum();
                println!(
                    "Coins:    {} ({} NIGHT)",
                    wizard.selected.len(),
                    format_balance(total)
                );
                let receiver_line = match &wizard.receiver {
                    DustReceiver::WalletDefault => "this wallet's dust address".to_string(),
                    DustReceiver::Custom(address) => truncate_address(address),
                };
                println!("Receiver: {receiver_line}");
                if let Some(fee) = wizard.fee {
                    println!("Est. fee: {} DUST", format_balance(fee));
                }

                let prompt = inquire::Confirm::new("Register these coins?")
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

            RegisterStep::Processing => {
                let receiver = wizard.receiver_param(&own_dust_address);
                let progress = spinner("Building, proving, and broadcasting the registration...");
                let outcome = pipeline::execute_registration(
                    session.engine.as_ref(),
                    wizard.selected.clone(),
                    &session.keystore,
                    receiver,
                )
                .await;
                progress.finish_and_clear();
                wizard.finish(outcome);
            }

            RegisterStep::Result => {
                render_outcome("Dust registration", wizard.outcome.as_ref());
                wait_for_key()?;
                return Ok(FlowOutcome::Done);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::address::encode_address;

    const NETWORK: NetworkId = NetworkId::Undeployed;

    fn utxo(index: u32, value: u128) -> Utxo {
        Utxo {
            intent_hash: format!("intent-{index:02}"),
            output_index: index,
            token: crate::engine::NIGHT_TOKEN_ID.to_string(),
            value,
        }
    }

    fn candidates() -> Vec<Utxo> {
        vec![utxo(0, 1_000_000), utxo(1, 2_000_000), utxo(2, 3_000_000)]
    }

    fn dust_address(byte: u8) -> String {
        encode_address(AddressKind::Dust, NETWORK, &[byte; 32]).unwrap()
    }

    #[test]
    fn empty_selection_refuses_to_advance() {
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        assert!(!wizard.select_utxos(&[]));
        assert_eq!(wizard.step(), RegisterStep::SelectUtxos);
    }

    #[test]
    fn selection_maps_indices_to_candidates() {
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        assert!(wizard.select_utxos(&[0, 2]));
        assert_eq!(wizard.step(), RegisterStep::SelectAddress);
        assert_eq!(wizard.selected.len(), 2);
        assert_eq!(wizard.selected[1].output_index, 2);
    }

    #[test]
    fn default_receiver_resolves_to_engine_default() {
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        wizard.select_utxos(&[0]);
        wizard.accept_default_receiver();
        assert_eq!(wizard.step(), RegisterStep::Confirm);
        assert_eq!(wizard.receiver_param(&dust_address(9)), None);
    }

    #[test]
    fn custom_receiver_matching_own_address_is_still_the_default() {
        let own = dust_address(9);
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        wizard.select_utxos(&[0]);
        assert!(wizard.accept_custom_receiver(&own));
        assert_eq!(wizard.receiver_param(&own), None);
    }

    #[test]
    fn custom_receiver_is_validated_as_a_dust_address() {
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        wizard.select_utxos(&[0]);

        let wrong_kind = encode_address(AddressKind::Unshielded, NETWORK, &[1u8; 32]).unwrap();
        assert!(!wizard.accept_custom_receiver(&wrong_kind));
        assert_eq!(wizard.step(), RegisterStep::SelectAddress);
        assert!(wizard.take_error().unwrap().contains("expected dust"));

        let custom = dust_address(3);
        assert!(wizard.accept_custom_receiver(&custom));
        assert_eq!(wizard.receiver_param(&dust_address(9)), Some(custom));
    }

    #[test]
    fn estimate_failure_does_not_block_confirm() {
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        wizard.select_utxos(&[0, 1]);
        wizard.accept_default_receiver();
        wizard.set_fee_estimate(None);
        assert!(wizard.confirm());
        assert_eq!(wizard.step(), RegisterStep::Processing);
    }

    #[test]
    fn back_from_confirm_resets_receiver_then_selection() {
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        wizard.select_utxos(&[1]);
        assert!(wizard.accept_custom_receiver(&dust_address(4)));
        wizard.set_fee_estimate(Some(50_000));

        assert!(wizard.back());
        assert_eq!(wizard.step(), RegisterStep::SelectAddress);
        assert_eq!(wizard.receiver, DustReceiver::WalletDefault);
        assert!(wizard.fee.is_none());
        // Selection survives until the selection step itself is re-entered.
        assert_eq!(wizard.selected.len(), 1);

        assert!(wizard.back());
        assert_eq!(wizard.step(), RegisterStep::SelectUtxos);
        assert!(wizard.selected.is_empty());
        assert!(!wizard.back());
    }

    #[test]
    fn receiver_screen_key_map_matches_the_advertised_shortcuts() {
        assert_eq!(
            receiver_action(&Key::Char('c')),
            ReceiverAction::EnterCustom
        );
        assert_eq!(receiver_action(&Key::Char('d')), ReceiverAction::UseDefault);
        assert_eq!(receiver_action(&Key::Enter), ReceiverAction::Continue);
        assert_eq!(receiver_action(&Key::Escape), ReceiverAction::Back);
        assert_eq!(receiver_action(&Key::Char('\u{3}')), ReceiverAction::Quit);
        assert_eq!(receiver_action(&Key::Char('x')), ReceiverAction::None);
    }

    #[test]
    fn processing_cannot_be_backed_out_of() {
        let mut wizard = RegisterWizard::new(NETWORK, candidates());
        wizard.select_utxos(&[0]);
        wizard.accept_default_receiver();
        assert!(wizard.confirm());
        assert!(wizard.back());
        assert_eq!(wizard.step(), RegisterStep::Processing);

        wizard.finish(TransactionOutcome::Success {
            tx_id: "tx".to_string(),
        });
        assert_eq!(wizard.step(), RegisterStep::Result);
    }
}
