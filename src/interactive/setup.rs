//! First-run screens: environment selection, seed-type selection, seed
//! entry, and engine initialization.
//!
//! Seed submission replaces the seed screen with the initializing screen so
//! the seed never lingers in navigation history; an initialization failure
//! replaces back to seed entry with an error banner.

use anyhow::Result;
use console::style;
use inquire::{Password, PasswordDisplayMode, Text};
use log::error;

use crate::config::{environment_config, Environment};
use crate::engine::keys::Seed;
use crate::navigation::{Route, SeedType};
use crate::types::SeedError;

use super::{prompt_event, select_prompt, spinner, App, FlowOutcome, PromptEvent, WalletSession};

pub(crate) fn environment_screen(app: &mut App) -> Result<FlowOutcome> {
    clearscreen::clear().ok();
    println!("\n{}", style("🌙 Midnight Wallet").bold().blue().underlined());
    println!(
        "{}",
        style("Shielded, unshielded, and dust ledgers from one keyboard").dim()
    );
    println!("{}\n", "-".repeat(44));
    if let Some(banner) = app.banner.take() {
        println!("{}\n", style(banner).red());
    }

    let labels: Vec<String> = Environment::ALL
        .iter()
        .map(|environment| environment.label().to_string())
        .collect();
    match select_prompt("Select an environment:", &labels)? {
        PromptEvent::Value(index) => {
            app.navigator.push(Route::SeedType {
                environment: Environment::ALL[index],
            });
            Ok(FlowOutcome::Done)
        }
        // The environment screen is the root; backing out means quitting.
        PromptEvent::Back | PromptEvent::Quit => Ok(FlowOutcome::Quit),
    }
}

pub(crate) fn seed_type_screen(app: &mut App, environment: Environment) -> Result<FlowOutcome> {
    clearscreen::clear().ok();
    println!("{}\n", style("🔑 Wallet Seed").bold());
    if let Some(banner) = app.banner.take() {
        println!("{}\n", style(banner).red());
    }

    let options = vec![
        SeedType::Mnemonic.label().to_string(),
        SeedType::Hex.label().to_string(),
        SeedType::RandomHex.label().to_string(),
    ];
    match select_prompt("How do you want to provide the seed?", &options)? {
        PromptEvent::Value(0) => {
            app.navigator.push(Route::Seed {
                environment,
                seed_type: SeedType::Mnemonic,
            });
        }
        PromptEvent::Value(1) => {
            app.navigator.push(Route::Seed {
                environment,
                seed_type: SeedType::Hex,
            });
        }
        PromptEvent::Value(_) => {
            // A random seed skips the seed screen entirely.
            app.pending_seed = Some(Seed::random());
            app.navigator.replace(Route::Initializing {
                environment,
                seed_type: SeedType::RandomHex,
            });
        }
        PromptEvent::Back => app.navigator.pop(),
        PromptEvent::Quit => return Ok(FlowOutcome::Quit),
    }
    Ok(FlowOutcome::Done)
}

pub(crate) fn seed_screen(
    app: &mut App,
    environment: Environment,
    seed_type: SeedType,
) -> Result<FlowOutcome> {
    clearscreen::clear().ok();
    println!("{}\n", style("🔑 Enter Seed").bold());
    if let Some(banner) = app.banner.take() {
        println!("{}\n", style(banner).red());
    }

    let mut mnemonic_input = String::new();
    let seed = loop {
        let attempt: Result<Seed, SeedError> = match seed_type {
            SeedType::Mnemonic => {
                let prompt = Text::new("Mnemonic phrase:")
                    .with_initial_value(&mnemonic_input)
                    .with_help_message("24 words, separated by spaces or commas")
                    .prompt();
                match prompt_event(prompt)? {
                    PromptEvent::Value(input) => {
                        mnemonic_input = input.clone();
                        Seed::from_mnemonic(&input)
                    }
                    PromptEvent::Back => {
                        app.navigator.pop();
                        return Ok(FlowOutcome::Done);
                    }
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }
            SeedType::Hex => {
                let prompt = Password::new("Hex seed:")
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .without_confirmation()
                    .with_help_message("64 hexadecimal characters")
                    .prompt();
                match prompt_event(prompt)? {
                    PromptEvent::Value(input) => Seed::from_hex(&input),
                    PromptEvent::Back => {
                        app.navigator.pop();
                        return Ok(FlowOutcome::Done);
                    }
                    PromptEvent::Quit => return Ok(FlowOutcome::Quit),
                }
            }
            SeedType::RandomHex => Ok(Seed::random()),
        };

        match attempt {
            Ok(seed) => break seed,
            Err(error) => println!("{}", style(format!("✖ {error}")).red()),
        }
    };

    app.pending_seed = Some(seed);
    // Replace, not push: the seed screen must not stay in history.
    app.navigator.replace(Route::Initializing {
        environment,
        seed_type,
    });
    Ok(FlowOutcome::Done)
}

pub(crate) async fn initializing_screen(
    app: &mut App,
    environment: Environment,
    seed_type: SeedType,
) -> Result<FlowOutcome> {
    let Some(seed) = app.pending_seed.take() else {
        app.banner = Some("No seed was provided; please try again.".to_string());
        app.navigator.replace(Route::SeedType { environment });
        return Ok(FlowOutcome::Done);
    };

    clearscreen::clear().ok();
    println!("{}\n", style("⏳ Initializing").bold());
    let progress = spinner("Starting the wallet engine...");
    let config = environment_config(environment);
    let started = WalletSession::start(environment, config, seed).await;
    progress.finish_and_clear();

    match started {
        Ok(session) => {
            app.session = Some(session);
            // Setup history has no meaningful "back" once the engine runs.
            app.navigator.reset(Route::Dashboard { environment });
        }
        Err(err) => {
            error!("wallet initialization failed: {err}");
            app.banner = Some(format!("Wallet initialization failed: {err}"));
            let fallback = match seed_type {
                SeedType::RandomHex => Route::SeedType { environment },
                _ => Route::Seed {
                    environment,
                    seed_type,
                },
            };
            app.navigator.replace(fallback);
        }
    }
    Ok(FlowOutcome::Done)
}
