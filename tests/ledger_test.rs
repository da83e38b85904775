mod common;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use common::{FlakyStore, Ledger, parse_date, test_service, test_service_for};
use rokda::application::{AppError, LedgerService, NewTransaction, Principal, Session};
use rokda::store::Collection;

fn entry(ledger: &Ledger, category_income: bool, amount: i64) -> NewTransaction {
    NewTransaction {
        account_id: ledger.account.id,
        category_id: if category_income {
            ledger.income.id
        } else {
            ledger.expense.id
        },
        amount,
        description: None,
        transaction_date: Utc::now(),
    }
}

#[tokio::test]
async fn test_expense_debits_account() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 100_000).await?;

    let outcome = service
        .record_transaction(session, entry(&ledger, false, 30_000))
        .await?;

    assert_eq!(outcome.delta, -30_000);
    assert_eq!(outcome.account_balance, 70_000);
    assert_eq!(outcome.transaction.amount, 30_000); // stored unsigned

    let account = service.get_account(session, ledger.account.id).await?;
    assert_eq!(account.balance, 70_000);
    Ok(())
}

#[tokio::test]
async fn test_income_credits_account() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 10_000).await?;

    let outcome = service
        .record_transaction(session, entry(&ledger, true, 50_000))
        .await?;

    assert_eq!(outcome.delta, 50_000);
    assert_eq!(outcome.account_balance, 60_000);
    Ok(())
}

#[tokio::test]
async fn test_overdraft_rejected_without_writes() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 5_000).await?;

    let result = service
        .record_transaction(session, entry(&ledger, false, 10_000))
        .await;

    assert!(matches!(
        result,
        Err(AppError::InsufficientBalance {
            balance: 5_000,
            required: 10_000,
            ..
        })
    ));

    // No transaction was created and the balance is untouched
    assert!(service.list_transactions(session, None).await?.is_empty());
    let account = service.get_account(session, ledger.account.id).await?;
    assert_eq!(account.balance, 5_000);
    Ok(())
}

#[tokio::test]
async fn test_income_is_never_overdraft_checked() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 0).await?;

    let outcome = service
        .record_transaction(session, entry(&ledger, true, 1))
        .await?;
    assert_eq!(outcome.account_balance, 1);
    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_rejected() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 100_000).await?;

    for amount in [0, -500] {
        let result = service
            .record_transaction(session, entry(&ledger, true, amount))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput { field: "amount", .. })));
    }
    Ok(())
}

#[tokio::test]
async fn test_balance_is_cumulative_signed_sum() -> Result<()> {
    // Final balance equals the opening balance plus the signed sum of
    // recorded entries
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 100_000).await?;

    let entries = [(true, 50_000), (false, 20_000), (false, 5_000), (true, 1_000)];
    let mut expected = 100_000;
    for (income, amount) in entries {
        service
            .record_transaction(session, entry(&ledger, income, amount))
            .await?;
        expected += if income { amount } else { -amount };
    }

    let account = service.get_account(session, ledger.account.id).await?;
    assert_eq!(account.balance, expected);
    assert_eq!(account.balance, 126_000);
    Ok(())
}

#[tokio::test]
async fn test_revert_restores_balance() -> Result<()> {
    // 1000 - 300 = 700, revert -> 1000
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 100_000).await?;

    let outcome = service
        .record_transaction(session, entry(&ledger, false, 30_000))
        .await?;
    assert_eq!(outcome.account_balance, 70_000);

    let revert = service
        .revert_transaction(session, outcome.transaction.id)
        .await?;
    assert!(revert.balance_reverted);
    assert_eq!(revert.account_balance, Some(100_000));

    assert!(service.list_transactions(session, None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_revert_income_entry() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 20_000).await?;

    let outcome = service
        .record_transaction(session, entry(&ledger, true, 80_000))
        .await?;
    let revert = service
        .revert_transaction(session, outcome.transaction.id)
        .await?;
    assert_eq!(revert.account_balance, Some(20_000));
    Ok(())
}

#[tokio::test]
async fn test_revert_missing_transaction() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let result = service.revert_transaction(session, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_revert_orphaned_transaction_skips_balance() -> Result<()> {
    use rokda::store::{Collection, DocumentStore};

    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 100_000).await?;

    let outcome = service
        .record_transaction(session, entry(&ledger, false, 10_000))
        .await?;

    // The guarded API refuses to delete a referenced account, so orphan the
    // transaction by removing the account document out-of-band.
    service
        .store()
        .delete(Collection::Accounts, ledger.account.id)
        .await?;

    let revert = service
        .revert_transaction(session, outcome.transaction.id)
        .await?;
    assert!(!revert.balance_reverted);
    assert_eq!(revert.account_balance, None);
    assert!(service.list_transactions(session, None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_revert_propagates_store_failure_and_keeps_entry() -> Result<()> {
    let service = LedgerService::new(FlakyStore::new());
    let user = service
        .ensure_user(&Principal {
            auth_id: "auth-dana".into(),
            email: "dana@example.com".into(),
            name: "dana".into(),
        })
        .await?;
    let session = Session::for_user(&user);
    let ledger = Ledger::create(&service, session, 100_000).await?;

    let outcome = service
        .record_transaction(session, entry(&ledger, false, 30_000))
        .await?;
    assert_eq!(outcome.account_balance, 70_000);

    // A transient backend failure while resolving the account must not be
    // mistaken for a deleted account: the entry stays, nothing is skipped.
    service.store().fail_gets_in(Collection::Accounts);
    let result = service
        .revert_transaction(session, outcome.transaction.id)
        .await;
    assert!(matches!(result, Err(AppError::Store(_))));

    service.store().heal();
    assert_eq!(service.list_transactions(session, None).await?.len(), 1);
    let account = service.get_account(session, ledger.account.id).await?;
    assert_eq!(account.balance, 70_000);

    // Once the store recovers the same revert goes through
    let revert = service
        .revert_transaction(session, outcome.transaction.id)
        .await?;
    assert_eq!(revert.account_balance, Some(100_000));
    Ok(())
}

#[tokio::test]
async fn test_cross_user_references_are_invisible() -> Result<()> {
    let (service, session_a, _) = test_service_for("alice@example.com").await?;

    // Bob shares the same store but must not see or spend Alice's documents
    let bob = service
        .ensure_user(&rokda::application::Principal {
            auth_id: "auth-bob".into(),
            email: "bob@example.com".into(),
            name: "bob".into(),
        })
        .await?;
    let session_b = rokda::application::Session::for_user(&bob);

    let ledger = Ledger::create(&service, session_a, 100_000).await?;

    let result = service
        .record_transaction(
            session_b,
            NewTransaction {
                account_id: ledger.account.id,
                category_id: ledger.expense.id,
                amount: 1_000,
                description: None,
                transaction_date: Utc::now(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::CategoryNotFound(_))));

    assert!(service.get_account(session_b, ledger.account.id).await.is_err());
    assert!(service.list_accounts(session_b).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_transactions_listed_most_recent_first() -> Result<()> {
    let (service, session, _) = test_service().await?;
    let ledger = Ledger::create(&service, session, 100_000).await?;

    for date in ["2025-01-10", "2025-03-05", "2025-02-20"] {
        service
            .record_transaction(
                session,
                NewTransaction {
                    account_id: ledger.account.id,
                    category_id: ledger.income.id,
                    amount: 1_000,
                    description: Some(date.to_string()),
                    transaction_date: parse_date(date),
                },
            )
            .await?;
    }

    let listed = service.list_transactions(session, None).await?;
    let dates: Vec<_> = listed
        .iter()
        .map(|t| t.description.clone().unwrap())
        .collect();
    assert_eq!(dates, ["2025-03-05", "2025-02-20", "2025-01-10"]);

    let limited = service.list_transactions(session, Some(2)).await?;
    assert_eq!(limited.len(), 2);
    Ok(())
}
