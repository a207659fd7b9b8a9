//! The dashboard: wallet-state and sync-progress views plus the single-key
//! launch points for every wizard.
//!
//! Key map: `s` wallet state, `p` sync progress, `t` transfer, `r` register
//! dust, `d` deregister dust, `c` settings, `q` quit. Any other key
//! refreshes the view from the latest state snapshot.

use anyhow::Result;
use console::{style, Key, Term};

use crate::config::Environment;
use crate::engine::WalletState;
use crate::navigation::Route;
use crate::utils::balance::format_balance;
use crate::utils::display::{format_time_remaining, token_display_name, truncate_address};
use crate::utils::sync::{format_progress, sync_status};

use super::{App, FlowOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Wallet,
    Sync,
}

pub(crate) fn dashboard_screen(app: &mut App, environment: Environment) -> Result<FlowOutcome> {
    let Some(session) = &app.session else {
        // No engine to show; fall back to setup.
        app.navigator.reset(Route::Environment);
        return Ok(FlowOutcome::Done);
    };

    let term = Term::stdout();
    let mut view = View::Wallet;

    loop {
        let state = session.snapshot();
        render(environment, &state, view, app.banner.take());

        match term.read_key()? {
            Key::Char('s') => view = View::Wallet,
            Key::Char('p') => view = View::Sync,
            Key::Char('t') => {
                app.navigator.push(Route::Transfer { environment });
                return Ok(FlowOutcome::Done);
            }
            Key::Char('r') => {
                app.navigator.push(Route::RegisterDust { environment });
                return Ok(FlowOutcome::Done);
            }
            Key::Char('d') => {
                app.navigator.push(Route::DeregisterDust { environment });
                return Ok(FlowOutcome::Done);
            }
            Key::Char('c') => {
                app.navigator.push(Route::Settings { environment });
                return Ok(FlowOutcome::Done);
            }
            Key::Char('q') | Key::Char('\u{3}') => return Ok(FlowOutcome::Quit),
            _ => {} // re-render with the latest snapshot
        }
    }
}

fn render(environment: Environment, state: &WalletState, view: View, banner: Option<String>) {
    clearscreen::clear().ok();
    println!(
        "{}  {}  {}",
        style("🌙 Midnight Wallet").bold().blue(),
        style(format!("[{}]", environment.label())).dim(),
        style(sync_status(state)).cyan()
    );
    println!("{}", "-".repeat(60));
    if let Some(banner) = banner {
        println!("{}", style(banner).red());
        println!("{}", "-".repeat(60));
    }

    match view {
        View::Wallet => render_wallet(state),
        View::Sync => render_sync(state),
    }

    println!("{}", "-".repeat(60));
    println!(
        "{}",
        style(
            "[s] wallet · [p] sync · [t] transfer · [r] register dust · \
             [d] deregister dust · [c] settings · [q] quit"
        )
        .dim()
    );
}

fn render_balances(balances: &std::collections::BTreeMap<String, u128>) {
    if balances.is_empty() {
        println!("  (no balances)");
    }
    for (token, balance) in balances {
        println!(
            "  {}: {}",
            token_display_name(token),
            format_balance(*balance)
        );
    }
}

fn render_wallet(state: &WalletState) {
    println!("\n{}", style("🛡  Shielded").bold());
    println!("  {}", truncate_address(&state.shielded.address));
    render_balances(&state.shielded.balances);
    println!("  {} coin(s)", state.shielded.coin_values.len());

    println!("\n{}", style("🔓 Unshielded").bold());
    println!("  {}", truncate_address(&state.unshielded.address));
    render_balances(&state.unshielded.balances);
    for coin in &state.unshielded.available_coins {
        let marker = if coin.meta.registered_for_dust {
            style(" ✓ dust").green().to_string()
        } else {
            String::new()
        };
        println!(
            "  • {}:{} — {} {}{marker}",
            coin.utxo.intent_hash,
            coin.utxo.output_index,
            format_balance(coin.utxo.value),
            token_display_name(&coin.utxo.token),
        );
    }

    println!("\n{}", style("🌒 Dust").bold());
    println!("  {}", truncate_address(&state.dust.dust_address));
    println!("  balance: {} DUST", format_balance(state.dust.balance));
    for coin in &state.dust.coins {
        let remaining = coin
            .time_to_cap
            .map(format_time_remaining)
            .unwrap_or_else(|| "Complete".to_string());
        println!(
            "  • generating {}/{} ({remaining})",
            format_balance(coin.generated_now),
            format_balance(coin.max_cap),
        );
    }
}

fn render_sync(state: &WalletState) {
    println!("\n{}", style("📡 Sync Progress").bold());
    println!("  shielded:   {}", format_progress(&state.shielded.progress));
    println!(
        "  unshielded: {}",
        format_progress(&state.unshielded.progress)
    );
    println!("  dust:       {}", format_progress(&state.dust.progress));
}
