//! Terminal rendering of app state

use stacks_counter::{
    format_stx_address, NetworkType, Notice, NoticeLevel, QueryState, SessionSnapshot,
    TrackedTransaction,
};

pub fn network_badge(network: NetworkType) -> String {
    format!("[{}]", network.label())
}

pub fn session_line(session: &SessionSnapshot) -> String {
    match (&session.address, session.connecting) {
        (_, true) => "Connecting...".to_string(),
        (Some(address), _) => format!("Connected: {}", format_stx_address(address)),
        (None, _) => "Not connected".to_string(),
    }
}

pub fn counter_line(state: &QueryState<u128>) -> String {
    match (&state.data, state.is_loading, &state.error) {
        (_, true, _) => "Counter: loading...".to_string(),
        (Some(value), _, None) => format!("Counter: {}", value),
        (Some(value), _, Some(err)) => format!("Counter: {} (stale: {})", value, err),
        (None, _, Some(err)) => format!("Counter: unavailable ({})", err),
        (None, _, None) => "Counter: -".to_string(),
    }
}

pub fn height_line(state: &QueryState<u64>) -> String {
    match &state.data {
        Some(height) => format!("Bitcoin block: {}", height),
        None if state.is_error => "Bitcoin block: unavailable".to_string(),
        None => "Bitcoin block: ...".to_string(),
    }
}

pub fn transaction_line(tx: &TrackedTransaction) -> String {
    let mut line = format!("{} {}", tx.txid, tx.status);
    if let Some(height) = tx.block_height {
        line.push_str(&format!(" (block {})", height));
    }
    if let Some(ref result) = tx.result {
        line.push_str(&format!(" -> {}", result));
    }
    line
}

pub fn notice_line(notice: &Notice) -> String {
    let marker = match notice.level {
        NoticeLevel::Info => "ℹ️ ",
        NoticeLevel::Success => "✅",
        NoticeLevel::Error => "❌",
    };
    format!("{} {}", marker, notice.message)
}
