mod common;

use anyhow::Result;
use chrono::Utc;

use common::{Ledger, parse_date, test_service};
use rokda::application::{AppError, InvestmentInput, NewTransaction};
use rokda::domain::InvestmentKind;

#[tokio::test]
async fn test_monthly_summary_splits_income_and_expense() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 1_000_000).await?;

    let entries = [
        (ledger.income.id, 50_000, "2025-03-01"),
        (ledger.income.id, 20_000, "2025-04-02"), // different month
        (ledger.expense.id, 10_000, "2025-03-15"),
        (ledger.expense.id, 7_500, "2025-03-28"),
    ];
    for (category_id, amount, date) in entries {
        service
            .record_transaction(
                session,
                NewTransaction {
                    account_id: ledger.account.id,
                    category_id,
                    amount,
                    description: None,
                    transaction_date: parse_date(date),
                },
            )
            .await?;
    }

    let summary = service.monthly_summary(session, 3, 2025).await?;
    assert_eq!(summary.totals.income, 50_000);
    assert_eq!(summary.totals.expense, 17_500);
    assert_eq!(summary.totals.net(), 32_500);

    // Only March income counts for March
    let april = service.monthly_summary(session, 4, 2025).await?;
    assert_eq!(april.totals.income, 20_000);
    assert_eq!(april.totals.expense, 0);
    Ok(())
}

#[tokio::test]
async fn test_monthly_summary_rejects_bad_month() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let result = service.monthly_summary(session, 13, 2025).await;
    assert!(matches!(result, Err(AppError::InvalidInput { field: "month", .. })));
    Ok(())
}

#[tokio::test]
async fn test_monthly_summary_includes_portfolio() -> Result<()> {
    let (service, session, _) = test_service().await?;

    service
        .create_investment(
            session,
            InvestmentInput {
                name: "Index Fund".into(),
                kind: InvestmentKind::MutualFund,
                quantity: 100.0,
                purchase_price: 5_000,
                current_value: 620_000,
                purchase_date: parse_date("2024-06-01"),
                closed_at: None,
            },
        )
        .await?;

    let summary = service.monthly_summary(session, 1, 2025).await?;
    assert_eq!(summary.portfolio.invested, 500_000);
    assert_eq!(summary.portfolio.current_value, 620_000);
    assert_eq!(summary.portfolio.profit_loss(), 120_000);
    Ok(())
}

#[tokio::test]
async fn test_unresolvable_category_excluded_from_totals() -> Result<()> {
    use rokda::store::{Collection, DocumentStore};

    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 1_000_000).await?;

    service
        .record_transaction(
            session,
            NewTransaction {
                account_id: ledger.account.id,
                category_id: ledger.income.id,
                amount: 40_000,
                description: None,
                transaction_date: Utc::now(),
            },
        )
        .await?;
    service
        .record_transaction(
            session,
            NewTransaction {
                account_id: ledger.account.id,
                category_id: ledger.expense.id,
                amount: 15_000,
                description: None,
                transaction_date: Utc::now(),
            },
        )
        .await?;

    // Orphan the expense transactions by removing their category out-of-band
    service
        .store()
        .delete(Collection::Categories, ledger.expense.id)
        .await?;

    let now = Utc::now();
    use chrono::Datelike;
    let summary = service
        .monthly_summary(session, now.month(), now.year())
        .await?;
    assert_eq!(summary.totals.income, 40_000);
    assert_eq!(summary.totals.expense, 0); // silently excluded
    Ok(())
}

#[tokio::test]
async fn test_portfolio_totals_across_positions() -> Result<()> {
    let (service, session, _) = test_service().await?;

    service
        .create_investment(
            session,
            InvestmentInput {
                name: "INFY".into(),
                kind: InvestmentKind::Equity,
                quantity: 10.0,
                purchase_price: 10_000,
                current_value: 120_000,
                purchase_date: parse_date("2024-01-01"),
                closed_at: None,
            },
        )
        .await?;
    service
        .create_investment(
            session,
            InvestmentInput {
                name: "Fixed Deposit".into(),
                kind: InvestmentKind::Deposit,
                quantity: 3.0, // forced to a single unit for lump kinds
                purchase_price: 50_000,
                current_value: 52_000,
                purchase_date: parse_date("2024-02-01"),
                closed_at: None,
            },
        )
        .await?;

    let portfolio = service.portfolio(session).await?;
    assert_eq!(portfolio.invested, 150_000);
    assert_eq!(portfolio.current_value, 172_000);
    assert_eq!(portfolio.profit_loss(), 22_000);
    Ok(())
}
