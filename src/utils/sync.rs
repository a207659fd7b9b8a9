//! Aggregate sync-progress math over the three sub-wallets.

use crate::engine::{SyncProgress, WalletState};

fn wallet_percent(progress: &SyncProgress) -> f64 {
    if progress.highest == 0 {
        return 100.0;
    }
    (progress.applied as f64 / progress.highest as f64) * 100.0
}

/// Overall sync percentage: floor of the mean of the three wallets.
/// A wallet with nothing to sync counts as fully synced.
pub fn sync_percentage(state: &WalletState) -> u8 {
    let overall = (wallet_percent(&state.shielded.progress)
        + wallet_percent(&state.unshielded.progress)
        + wallet_percent(&state.dust.progress))
        / 3.0;
    overall.floor() as u8
}

/// Status label shown in the dashboard header.
pub fn sync_status(state: &WalletState) -> String {
    let percentage = sync_percentage(state);
    if state.synced || percentage == 100 {
        "synced".to_string()
    } else {
        format!("syncing ({percentage}%)")
    }
}

/// `applied/highest (pct%)` line used by the sync progress view.
pub fn format_progress(progress: &SyncProgress) -> String {
    if progress.highest == 0 {
        return "0/0 (100%)".to_string();
    }
    let percentage = ((progress.applied as f64 / progress.highest as f64) * 100.0).floor();
    format!("{}/{} ({}%)", progress.applied, progress.highest, percentage as u64)
}
