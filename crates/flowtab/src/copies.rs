// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `flowtab copy` command implementation.

use std::io::IsTerminal;

use flowtab_core::FlowtabError;
use flowtab_payouts::CopyReceipt;
use flowtab_payouts::pricing::format_cents;

use crate::app::{App, render_json};

/// Record a copy and print the receipt.
pub async fn run_copy_record(
    app: &App,
    user_id: &str,
    flow_id: &str,
    creator_id: &str,
    json: bool,
    plain: bool,
) -> Result<(), FlowtabError> {
    let receipt = app.copies.copy_flow(user_id, flow_id, creator_id).await?;
    if json {
        println!("{}", render_json(&receipt)?);
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_receipt(&receipt, use_color);
    }
    Ok(())
}

fn print_receipt(receipt: &CopyReceipt, use_color: bool) {
    println!();
    println!("  copy recorded");
    println!("  {}", "-".repeat(35));
    println!("    Event:     {}", receipt.event_id);

    let counted = if receipt.counted { "yes" } else { "no (monthly cap reached)" };
    if use_color {
        use colored::Colorize;
        let styled = if receipt.counted {
            counted.green()
        } else {
            counted.yellow()
        };
        println!("    Counted:   {styled}");
    } else {
        println!("    Counted:   {counted}");
    }

    println!("    This month: {}", receipt.copies_this_month);
    println!("    Remaining: {}", receipt.copies_remaining);
    println!(
        "    Creator earned: {}",
        format_cents(receipt.payout_earned_cents)
    );
    println!();
}
