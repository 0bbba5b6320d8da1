//! Plain-text rendering of the dashboard.

use std::fmt::Write;

use qrtrack_core::edit::EditSlot;
use qrtrack_core::notice::Notice;
use qrtrack_core::qr_code::QrCode;
use qrtrack_core::screen::Screen;
use qrtrack_core::working_set::{DashboardStats, WorkingSet};

pub fn header(screen: Screen) -> String {
    let title = screen.title();
    format!("== {title} {}\n", "=".repeat(60_usize.saturating_sub(title.len() + 4)))
}

pub fn stats(stats: DashboardStats) -> String {
    format!(
        "Active links: {}    Total scans: {}\n",
        stats.active_links, stats.total_scans
    )
}

/// One line per code, in working-set order. The code in edit mode shows
/// the typed value instead of its label.
pub fn codes(codes: &WorkingSet, edit: &EditSlot, api_base: &str) -> String {
    if codes.is_empty() {
        return "No QR codes yet. Use `generate <url> [count]` to create some.\n".to_string();
    }

    let mut out = String::new();
    for qr in codes {
        let _ = writeln!(out, "{}", row(qr, edit, api_base));
    }
    out
}

fn row(qr: &QrCode, edit: &EditSlot, api_base: &str) -> String {
    let label = match edit.draft() {
        Some(draft) if draft.id == qr.id => format!("[editing: {:?}]", draft.text),
        _ => qr.display_name().to_string(),
    };
    format!(
        "#{:<4} {:<24} {:>6} scans  {} -> {}{}",
        qr.id,
        label,
        qr.scan_count,
        qr.original_url,
        api_base,
        qr.redirect_path(),
    )
}

/// The whole dashboard screen.
pub fn dashboard(codes_set: &WorkingSet, edit: &EditSlot, api_base: &str) -> String {
    let mut out = header(Screen::Dashboard);
    out.push_str(&stats(codes_set.stats()));
    out.push('\n');
    out.push_str(&codes(codes_set, edit, api_base));
    out
}

pub fn notice(notice: &Notice) -> String {
    format!("{} {notice}\n", notice.raised_at.format("%H:%M:%S"))
}
