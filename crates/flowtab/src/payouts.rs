// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `flowtab payouts` and `flowtab earnings` command implementations.

use std::io::IsTerminal;

use flowtab_core::{BillingMonth, CreatorPayout, FlowtabError, PayoutStatus};
use flowtab_payouts::EarningsSummary;
use flowtab_payouts::pricing::format_cents;
use serde::Serialize;

use crate::app::{App, render_json};

/// Structured output for `payouts aggregate --json`.
#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub billing_month: BillingMonth,
    pub creators: usize,
    pub total_cents: i64,
    pub payouts: Vec<CreatorPayout>,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), FlowtabError> {
    println!("{}", render_json(value)?);
    Ok(())
}

fn styled_status(status: PayoutStatus, use_color: bool) -> String {
    if !use_color {
        return status.to_string();
    }
    use colored::Colorize;
    match status {
        PayoutStatus::Paid => status.to_string().green().to_string(),
        PayoutStatus::Failed => status.to_string().red().to_string(),
        PayoutStatus::Processing => status.to_string().cyan().to_string(),
        PayoutStatus::Pending => status.to_string().yellow().to_string(),
    }
}

/// Recompute every creator's payout for `month` (default: the previous month).
pub async fn run_aggregate(
    app: &App,
    month: Option<BillingMonth>,
    json: bool,
    plain: bool,
) -> Result<(), FlowtabError> {
    let month = month.unwrap_or_else(|| BillingMonth::current(app.clock.as_ref()).previous());
    let payouts = app.engine.aggregate_month(month).await?;
    let response = AggregateResponse {
        billing_month: month,
        creators: payouts.len(),
        total_cents: payouts.iter().map(|p| p.amount_cents).sum(),
        payouts,
    };

    if json {
        print_json(&response)?;
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  payouts for {}", month.label());
    println!("  {}", "-".repeat(50));
    if response.payouts.is_empty() {
        println!("    no counted copies this month");
    }
    for payout in &response.payouts {
        println!(
            "    {:<24} {:>6} copies {:>10}  {}",
            payout.creator_id,
            payout.copy_count,
            format_cents(payout.amount_cents),
            styled_status(payout.status, use_color)
        );
    }
    println!("  {}", "-".repeat(50));
    println!(
        "    {} creator(s), {} total",
        response.creators,
        format_cents(response.total_cents)
    );
    println!();
    Ok(())
}

/// Move a payout to a new status.
pub async fn run_status(
    app: &App,
    payout_id: &str,
    status: PayoutStatus,
    transfer_id: Option<&str>,
    json: bool,
) -> Result<(), FlowtabError> {
    let payout = app
        .engine
        .update_payout_status(payout_id, status, transfer_id)
        .await?;
    if json {
        print_json(&payout)?;
    } else {
        println!(
            "payout {} for {} ({}) is now {}",
            payout.id,
            payout.creator_id,
            payout.billing_month.label(),
            payout.status
        );
    }
    Ok(())
}

/// List a creator's recent payouts.
pub async fn run_list(
    app: &App,
    creator_id: &str,
    limit: u32,
    json: bool,
    plain: bool,
) -> Result<(), FlowtabError> {
    let payouts = app.engine.payouts_for_creator(creator_id, limit).await?;
    if json {
        print_json(&payouts)?;
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  payouts for {creator_id}");
    println!("  {}", "-".repeat(60));
    for payout in &payouts {
        println!(
            "    {}  {:<36} {:>6} {:>10}  {}",
            payout.billing_month.label(),
            payout.id,
            payout.copy_count,
            format_cents(payout.amount_cents),
            styled_status(payout.status, use_color)
        );
    }
    if payouts.is_empty() {
        println!("    none");
    }
    println!();
    Ok(())
}

/// Print a creator's earnings summary.
pub async fn run_earnings(
    app: &App,
    creator_id: &str,
    json: bool,
    plain: bool,
) -> Result<(), FlowtabError> {
    let summary = app.earnings.my_earnings(creator_id).await?;
    if json {
        print_json(&summary)?;
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_earnings(creator_id, &summary, use_color);
    }
    Ok(())
}

fn print_earnings(creator_id: &str, summary: &EarningsSummary, use_color: bool) {
    println!();
    println!("  earnings for {creator_id}");
    println!("  {}", "-".repeat(50));
    println!(
        "    Balance owed: {}",
        format_cents(summary.account_balance_cents)
    );
    println!(
        "    Paid to date: {}",
        format_cents(summary.total_earnings_cents)
    );
    println!();
    for month in &summary.monthly_breakdown {
        let paid_at = month
            .paid_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "    {}  {:>6} copies {:>10}  {:<10} {}",
            month.billing_month.label(),
            month.copy_count,
            format_cents(month.amount_cents),
            styled_status(month.status, use_color),
            paid_at
        );
    }
    println!();
}
