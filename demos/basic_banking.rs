//! Basic banking walkthrough

use banking_core::utils::{MemoryNotifier, MemoryStorage};
use banking_core::{AccountType, Bank, Decision, StatementFilter};
use bigdecimal::BigDecimal;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "banking_core=info".into()),
        )
        .init();

    println!("🏦 Banking Core - Basic Banking Example\n");

    let notifier = MemoryNotifier::new();
    let bank = Bank::new(MemoryStorage::new(), notifier.clone());
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let manager = Uuid::new_v4();

    // 1. Open accounts
    println!("📂 Opening accounts...");
    let savings = bank
        .open_account(alice, AccountType::Savings, &BigDecimal::from(500))
        .await?;
    let current = bank
        .open_account(bob, AccountType::Current, &BigDecimal::from(50))
        .await?;
    println!("  ✓ {} {} balance {}", savings.account_type, savings.account_number, savings.balance);
    println!("  ✓ {} {} balance {}", current.account_type, current.account_number, current.balance);
    println!();

    // 2. Move money
    println!("💸 Recording transactions...");
    bank.deposit(&savings.account_number, &BigDecimal::from_str("125.25")?)
        .await?;
    bank.withdraw(&savings.account_number, &BigDecimal::from(25))
        .await?;
    let receipt = bank
        .transfer(&savings.account_number, &current.account_number, &BigDecimal::from(300))
        .await?;
    println!(
        "  ✓ Transfer of {} from {} to {}",
        receipt.debit.amount, receipt.debit.account_number, receipt.credit.account_number
    );

    match bank
        .withdraw(&current.account_number, &BigDecimal::from(10_000))
        .await
    {
        Ok(_) => println!("  ✗ Overdraft was accepted"),
        Err(err) => println!("  ✓ Overdraft refused: {}", err),
    }
    println!();

    // 3. Statement
    println!("📜 Statement for {}:", savings.account_number);
    for record in bank
        .statement(&savings.account_number, &StatementFilter::all())
        .await?
    {
        println!("  {} {:>8} {}", record.timestamp, record.leg_type, record.amount);
    }
    println!();

    // 4. Account application
    println!("📝 Processing an application...");
    let application = bank
        .submit_application(bob, AccountType::Savings, &BigDecimal::from(1000), "Rainy day fund")
        .await?;
    let outcome = bank
        .decide_application(application.id, manager, Decision::Approved, Some("Verified"))
        .await?;
    if let Some(account) = &outcome.account {
        println!("  ✓ Application approved, opened {}", account.account_number);
    }
    println!();

    // 5. Reconciliation and overview
    println!("🔍 Reconciling...");
    for report in bank.reconcile_all().await? {
        println!(
            "  {} expected {} recorded {} {}",
            report.account_number,
            report.expected_balance,
            report.recorded_balance,
            if report.is_consistent { "✓" } else { "✗" }
        );
    }

    let overview = bank.overview().await?;
    println!(
        "\n📊 {} accounts, {} transactions, total balance {}",
        overview.total_accounts, overview.total_transactions, overview.total_balance
    );

    println!("\n📬 Notifications:");
    for delivery in notifier.deliveries() {
        println!("  {} → {}", delivery.user_id, delivery.message);
    }

    Ok(())
}
