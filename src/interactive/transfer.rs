//! Asset transfer wizard.
//!
//! Six states: select the sub-wallet, select the token, enter the amount,
//! enter the receiver, confirm, then a single submission through the engine
//! pipeline ending in a terminal result. [`TransferWizard`] is the state
//! machine; [`run`] drives it against the terminal.

use anyhow::Result;
use console::style;
use inquire::{Confirm, Text};

use crate::config::NetworkId;
use crate::engine::pipeline::{self, TransactionOutcome, TransferParams};
use crate::engine::{TokenId, TokenType, WalletState};
use crate::utils::address::{validate_receiver, AddressKind};
use crate::utils::balance::{format_balance, parse_amount};
use crate::utils::display::token_display_name;

use super::{
    prompt_event, render_outcome, select_prompt, spinner, wait_for_key, FlowOutcome, PromptEvent,
    WalletSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    SelectType,
    SelectToken,
    EnterAmount,
    EnterAddress,
    Confirm,
    Processing,
    Result,
}

/// Accumulated transfer form data plus the current step. Fields fill in
/// monotonically going forward; back-navigation clears the field owned by
/// the step being returned to, so stale values are never submitted.
pub struct TransferWizard {
    step: TransferStep,
    network: NetworkId,
    pub token_type: Option<TokenType>,
    pub token: Option<TokenId>,
    pub amount: Option<u128>,
    pub receiver: Option<String>,
    pub outcome: Option<TransactionOutcome>,
    error: Option<String>,
}

impl TransferWizard {
    pub fn new(network: NetworkId) -> TransferWizard {
        TransferWizard {
            step: TransferStep::SelectType,
            network,
            token_type: None,
            token: None,
            amount: None,
            receiver: None,
            outcome: None,
            error: None,
        }
    }

    pub fn step(&self) -> TransferStep {
        self.step
    }

    /// Inline validation error for the current step, cleared on read.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    pub fn select_type(&mut self, token_type: TokenType) {
        if self.step == TransferStep::SelectType {
            self.token_type = Some(token_type);
            self.step = TransferStep::SelectToken;
        }
    }

    pub fn select_token(&mut self, token: TokenId) {
        if self.step == TransferStep::SelectToken {
            self.token = Some(token);
            self.step = TransferStep::EnterAmount;
        }
    }

    /// Parse and validate the amount against the available balance. On
    /// failure the step does not advance and an inline error is set.
    pub fn enter_amount(&mut self, input: &str, available: u128) -> bool {
        if self.step != TransferStep::EnterAmount {
            return false;
        }
        match parse_amount(input, available) {
            Ok(amount) => {
                self.amount = Some(amount);
                self.error = None;
                self.step = TransferStep::EnterAddress;
                true
            }
            Err(error) => {
                self.error = Some(error.to_string());
                false
            }
        }
    }

    /// Validate the receiver for the selected sub-wallet's address kind.
    pub fn enter_receiver(&mut self, input: &str) -> bool {
        if self.step != TransferStep::EnterAddress {
            return false;
        }
        let shielded = self.token_type == Some(TokenType::Shielded);
        match validate_receiver(input.trim(), shielded, self.network) {
            Ok(address) => {
                self.receiver = Some(address);
                self.error = None;
                self.step = TransferStep::Confirm;
                true
            }
            Err(error) => {
                self.error = Some(error.to_string());
                false
            }
        }
    }

    /// Enter `processing`. Refused unless every field has been collected,
    /// so an incomplete wizard can never reach the engine.
    pub fn confirm(&mut self) -> bool {
        if self.step == TransferStep::Confirm && self.params().is_some() {
            self.step = TransferStep::Processing;
            true
        } else {
            false
        }
    }

    pub fn params(&self) -> Option<TransferParams> {
        Some(TransferParams {
            token_type: self.token_type?,
            token: self.token.clone()?,
            amount: self.amount?,
            receiver: self.receiver.clone()?,
        })
    }

    pub fn finish(&mut self, outcome: TransactionOutcome) {
        if self.step == TransferStep::Processing {
            self.outcome = Some(outcome);
            self.step = TransferStep::Result;
        }
    }

    /// Step one state back, clearing the field owned by the step being
    /// returned to. Returns false when the wizard should exit instead
    /// (first step, terminal result). `processing` refuses back navigation:
    /// an in-flight submission must be allowed to finish.
    pub fn back(&mut self) -> bool {
        self.error = None;
        match self.step {
            TransferStep::SelectType | TransferStep::Result => false,
            TransferStep::SelectToken => {
                self.token_type = None;
                self.step = TransferStep::SelectType;
                true
            }
            TransferStep::EnterAmount => {
                self.token = None;
                self.step = TransferStep::SelectToken;
                true
            }
            TransferStep::EnterAddress => {
                self.amount = None;
                self.step = TransferStep::EnterAmount;
                true
            }
            TransferStep::Confirm => {
                self.receiver = None;
                self.step = TransferStep::EnterAddress;
                true
            }
            TransferStep::Processing => true,
        }
    }

    fn address_kind(&self) -> AddressKind {
        if self.token_type == Some(TokenType::Shielded) {
            AddressKind::Shielded
        } else {
            AddressKind::Unshielded
        }
    }
}

fn tokens_for(state: &WalletState, token_type: TokenType) -> Vec<(TokenId, u128)> {
    let balances = match token_type {
        TokenType::Shielded => &state.shielded.balances,
        TokenType::Unshielded => &state.unshielded.balances,
    };
    balances
        .iter()
        .filter(|(_, balance)| **balance > 0)
        .map(|(token, balance)| (token.clone(), *balance))
        .collect()
}

fn available_balance(state: &WalletState, token_type: TokenType, token: &str) -> u128 {
    let balances = match token_type {
        TokenType::Shielded => &state.shielded.balances,
        TokenType::Unshielded => &state.unshielded.balances,
    };
    balances.get(token).copied().unwrap_or(0)
}

/// Drive the transfer wizard to completion.
pub(crate) async fn run(session: &WalletSession) -> Result<FlowOutcome> {
    let mut wizard = TransferWizard::new(session.config.network_id);
    let mut amount_input = String::new();
    let mut address_input = String::new();

    loop {
        match wizard.step() {
            TransferStep::SelectType => {
                clearscreen::clear().ok();
                println!("{}\n", style("💸 Transfer").bold());
                let options = vec!["🛡  Shielded".to_string(), "🔓 Unshielded".to_string()];
                match select_prompt("Which wallet do you want to send from?", &options)? {
                    PromptEvent::Value(0) => wizard.select_type(TokenType::Shielded),
                    PromptEvent::Value(_) => wizard.select_type(TokenType::Unshielded),
                    PromptEvent::Back => {
                        if !wizard.back() {
                            return Ok(FlowOutcome::Done);
                        }
                    }
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }

            TransferStep::SelectToken => {
                let token_type = wizard.token_type.unwrap_or(TokenType::Unshielded);
                let tokens = tokens_for(&session.snapshot(), token_type);
                if tokens.is_empty() {
                    println!(
                        "\n{}",
                        style(format!("No {} balance to send.", token_type.label())).yellow()
                    );
                    wait_for_key()?;
                    wizard.back();
                    continue;
                }

                let options: Vec<String> = tokens
                    .iter()
                    .map(|(token, balance)| {
                        format!("{} — {}", token_display_name(token), format_balance(*balance))
                    })
                    .collect();
                match select_prompt("Select a token:", &options)? {
                    PromptEvent::Value(index) => wizard.select_token(tokens[index].0.clone()),
                    PromptEvent::Back => {
                        wizard.back();
                    }
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }

            TransferStep::EnterAmount => {
                let token = wizard.token.clone().unwrap_or_default();
                let token_type = wizard.token_type.unwrap_or(TokenType::Unshielded);
                let available = available_balance(&session.snapshot(), token_type, &token);

                if let Some(error) = wizard.take_error() {
                    println!("{}", style(format!("✖ {error}")).red());
                }
                let help = format!("available: {}", format_balance(available));
                let prompt = Text::new(&format!(
                    "Amount of {} to send:",
                    token_display_name(&token)
                ))
                .with_initial_value(&amount_input)
                .with_help_message(&help)
                .prompt();

                match prompt_event(prompt)? {
                    PromptEvent::Value(input) => {
                        amount_input = input.clone();
                        wizard.enter_amount(&input, available);
                    }
                    PromptEvent::Back => {
                        amount_input.clear();
                        wizard.back();
                    }
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }

            TransferStep::EnterAddress => {
                if let Some(error) = wizard.take_error() {
                    println!("{}", style(format!("✖ {error}")).red());
                }
                let help = format!("{}...", wizard.address_kind().hint());
                let prompt = Text::new("Receiver address:")
                    .with_initial_value(&address_input)
                    .with_help_message(&help)
                    .prompt();

                match prompt_event(prompt)? {
                    PromptEvent::Value(input) => {
                        address_input = input.clone();
                        wizard.enter_receiver(&input);
                    }
                    PromptEvent::Back => {
                        address_input.clear();
                        wizard.back();
                    }
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }

            TransferStep::Confirm => {
                clearscreen::clear().ok();
                println!("{}", style("📝 Transfer Summary").bold());
                println!("{}", "=".repeat(30));
                if let Some(params) = wizard.params() {
                    println!("From:   {} wallet", params.token_type.label());
                    println!("Token:  {}", token_display_name(&params.token));
                    println!("Amount: {}", format_balance(params.amount));
                    println!("To:     {}", params.receiver);
                }

                let prompt = Confirm::new("Submit this transfer?")
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

            TransferStep::Processing => {
                let Some(params) = wizard.params() else {
                    wizard.finish(TransactionOutcome::Failure {
                        error: "incomplete transfer details".to_string(),
                    });
                    continue;
                };
                let progress = spinner("Building, proving, and broadcasting the transfer...");
                let outcome = pipeline::execute_transfer(
                    session.engine.as_ref(),
                    &params,
                    &session.keys,
                    &session.keystore,
                )
                .await;
                progress.finish_and_clear();
                wizard.finish(outcome);
            }

            TransferStep::Result => {
                render_outcome("Transfer", wizard.outcome.as_ref());
                wait_for_key()?;
                return Ok(FlowOutcome::Done);
            }
        }
    }
}
