mod common;

use anyhow::Result;
use cashbook::application::AppError;
use cashbook::domain::{AccountType, Direction, LedgerFilter, SourceType};
use common::{
    StandardAccounts, assert_ledger_matches_balances, balance, cashier, rp, test_service,
};

#[tokio::test]
async fn test_transfer_moves_money_and_writes_two_linked_legs() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let result = service
        .transfer(
            accounts.kas.id,
            accounts.bank.id,
            rp(30_000),
            "Setor ke bank".into(),
            &cashier(),
        )
        .await?;

    assert_eq!(result.from_account.balance, rp(70_000));
    assert_eq!(result.to_account.balance, rp(80_000));
    assert_eq!(balance(&service, accounts.kas.id).await?, rp(70_000));
    assert_eq!(balance(&service, accounts.bank.id).await?, rp(80_000));

    let legs: Vec<_> = service
        .list_ledger_entries(&LedgerFilter::default())
        .await?
        .into_iter()
        .filter(|e| e.reference_id == result.reference)
        .collect();
    assert_eq!(legs.len(), 2);

    let out = legs.iter().find(|e| e.account_id == accounts.kas.id).unwrap();
    let inn = legs.iter().find(|e| e.account_id == accounts.bank.id).unwrap();
    assert_eq!(out.source_type, SourceType::TransferOut);
    assert_eq!(out.direction, Direction::Outflow);
    assert_eq!(inn.source_type, SourceType::TransferIn);
    assert_eq!(inn.direction, Direction::Inflow);
    assert_eq!(out.amount, rp(30_000));
    assert_eq!(inn.amount, rp(30_000));
    assert_eq!(out.created_by, "u-kasir");
    assert_eq!(inn.created_by_name, "Kasir Satu");

    assert_ledger_matches_balances(&service).await?;
    Ok(())
}

#[tokio::test]
async fn test_transfer_insufficient_balance_leaves_both_accounts_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let err = service
        .transfer(
            accounts.bank.id,
            accounts.kas.id,
            rp(50_001),
            "Too much".into(),
            &cashier(),
        )
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientBalance {
            account,
            balance,
            required,
        } => {
            assert_eq!(account, "Bank");
            assert_eq!(balance, rp(50_000));
            assert_eq!(required, rp(50_001));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }

    assert_eq!(balance(&service, accounts.kas.id).await?, rp(100_000));
    assert_eq!(balance(&service, accounts.bank.id).await?, rp(50_000));
    assert!(
        service
            .list_ledger_entries(&LedgerFilter::default())
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test]
async fn test_transfer_of_entire_balance_is_allowed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    service
        .transfer(
            accounts.bank.id,
            accounts.kas.id,
            rp(50_000),
            "Tarik semua".into(),
            &cashier(),
        )
        .await?;

    assert_eq!(balance(&service, accounts.bank.id).await?, 0);
    assert_eq!(balance(&service, accounts.kas.id).await?, rp(150_000));
    Ok(())
}

#[tokio::test]
async fn test_transfer_validation_errors_have_no_side_effects() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;
    let equity = service
        .create_account("Modal".into(), AccountType::Equity, rp(10_000), None)
        .await?;

    let same = service
        .transfer(accounts.kas.id, accounts.kas.id, rp(1), "".into(), &cashier())
        .await
        .unwrap_err();
    assert!(matches!(same, AppError::SameAccountTransfer(_)));

    for amount in [0, -rp(5)] {
        let err = service
            .transfer(accounts.kas.id, accounts.bank.id, amount, "".into(), &cashier())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert!(err.is_validation());
    }

    let not_payment = service
        .transfer(equity.id, accounts.kas.id, rp(1), "".into(), &cashier())
        .await
        .unwrap_err();
    assert!(matches!(not_payment, AppError::NotPaymentAccount(name) if name == "Modal"));

    let missing = service
        .transfer(
            accounts.kas.id,
            uuid::Uuid::new_v4(),
            rp(1),
            "".into(),
            &cashier(),
        )
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::AccountNotFound(_)));

    assert_eq!(balance(&service, accounts.kas.id).await?, rp(100_000));
    assert_eq!(balance(&service, accounts.bank.id).await?, rp(50_000));
    assert_eq!(balance(&service, equity.id).await?, rp(10_000));
    assert!(
        service
            .list_ledger_entries(&LedgerFilter::default())
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test]
async fn test_reverse_transfer_posts_opposite_transfer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let original = service
        .transfer(
            accounts.kas.id,
            accounts.bank.id,
            rp(25_000),
            "Salah setor".into(),
            &cashier(),
        )
        .await?;
    let reversal = service
        .reverse_transfer(original.reference, &cashier())
        .await?;

    assert_ne!(reversal.reference, original.reference);
    assert_eq!(reversal.from_account.id, accounts.bank.id);
    assert_eq!(reversal.to_account.id, accounts.kas.id);
    assert_eq!(reversal.inflow.description, "Reversal of: Salah setor");
    assert_eq!(balance(&service, accounts.kas.id).await?, rp(100_000));
    assert_eq!(balance(&service, accounts.bank.id).await?, rp(50_000));

    // Both the original legs and the reversal legs stay on the ledger.
    let entries = service
        .list_ledger_entries(&LedgerFilter::default())
        .await?;
    assert_eq!(entries.len(), 4);
    assert_ledger_matches_balances(&service).await?;
    Ok(())
}

#[tokio::test]
async fn test_reversed_transfer_still_blocks_account_deletion() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;
    let shop = service
        .create_account("Toko".into(), AccountType::Asset, 0, None)
        .await?;

    let original = service
        .transfer(accounts.kas.id, shop.id, rp(7_500), "Modal toko".into(), &cashier())
        .await?;
    service
        .reverse_transfer(original.reference, &cashier())
        .await?;
    assert_eq!(balance(&service, shop.id).await?, 0);

    // Net zero, but the account still has two legs of history.
    let err = service.delete_account(shop.id).await.unwrap_err();
    assert!(
        matches!(err, AppError::AccountInUse { entries: 2, .. }),
        "got {:?}",
        err
    );
    assert!(service.get_account(shop.id).await.is_ok());
    assert_ledger_matches_balances(&service).await?;
    Ok(())
}

#[tokio::test]
async fn test_reverse_unknown_transfer_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;

    let reference = uuid::Uuid::new_v4();
    let err = service
        .reverse_transfer(reference, &cashier())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TransferNotFound(r) if r == reference));
    Ok(())
}

#[tokio::test]
async fn test_running_balance_uses_each_legs_own_sign() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    service
        .transfer(accounts.kas.id, accounts.bank.id, rp(30_000), "".into(), &cashier())
        .await?;
    service
        .transfer(accounts.bank.id, accounts.kas.id, rp(5_000), "".into(), &cashier())
        .await?;

    let kas = service.running_balances(accounts.kas.id, false).await?;
    let after: Vec<_> = kas.iter().map(|r| r.balance_after).collect();
    assert_eq!(after, vec![rp(75_000), rp(70_000)]);

    let bank = service.running_balances(accounts.bank.id, false).await?;
    let after: Vec<_> = bank.iter().map(|r| r.balance_after).collect();
    assert_eq!(after, vec![rp(75_000), rp(80_000)]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_lose_no_updates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        let (from, to) = if i % 2 == 0 {
            (accounts.kas.id, accounts.bank.id)
        } else {
            (accounts.bank.id, accounts.kas.id)
        };
        handles.push(tokio::spawn(async move {
            service
                .transfer(from, to, rp(1_000), format!("Transfer {}", i), &cashier())
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    // Ten each way: net zero.
    assert_eq!(balance(&service, accounts.kas.id).await?, rp(100_000));
    assert_eq!(balance(&service, accounts.bank.id).await?, rp(50_000));

    let kas = service.get_account(accounts.kas.id).await?;
    assert_eq!(kas.version, 20);
    assert_eq!(
        service
            .list_ledger_entries(&LedgerFilter::default())
            .await?
            .len(),
        40
    );
    assert_ledger_matches_balances(&service).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    // Bank holds 50,000; twelve attempts of 5,000 can only succeed ten times.
    let mut handles = Vec::new();
    for _ in 0..12 {
        let service = service.clone();
        let (from, to) = (accounts.bank.id, accounts.kas.id);
        handles.push(tokio::spawn(async move {
            service
                .transfer(from, to, rp(5_000), "Tarik".into(), &cashier())
                .await
        }));
    }

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientBalance { .. }) => insufficient += 1,
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(insufficient, 2);
    assert_eq!(balance(&service, accounts.bank.id).await?, 0);
    assert_eq!(balance(&service, accounts.kas.id).await?, rp(150_000));
    assert_ledger_matches_balances(&service).await?;
    Ok(())
}
