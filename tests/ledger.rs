#![cfg(feature = "sqlite")]

mod common;

use chrono::TimeZone;
use chrono::Utc;
use common::fixture;
use common::TestResult;
use pharma_ledger::ledger::NewSale;
use pharma_ledger::ledger::SaleUpdate;
use pharma_ledger::db::driver::DatabaseDriver;
use pharma_ledger::prelude::*;
use sea_orm::ConnectionTrait;

#[tokio::test]
async fn sale_debits_inventory() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Ibuprofen", 50).await;

    let sale = fx.ledger.create_sale("Ibuprofen", 20, 200.0, None).await?;
    assert_eq!(sale.drug_name, "Ibuprofen");
    assert_eq!(sale.quantity, 20);
    assert_eq!(sale.total_amount, 200.0);
    assert_eq!(sale.ledger_status, LedgerStatus::Completed);
    assert_eq!(sale.status, ShipmentStatus::Processing);

    let item = fx.item("Ibuprofen").await;
    assert_eq!(item.quantity, 30);
    assert_eq!(item.status, InventoryStatus::Active);

    let stored = fx.ledger.find_sale(sale.id).await?;
    assert_eq!(stored.id, sale.id);
    assert_eq!(stored.quantity, 20);
    Ok(())
}

#[tokio::test]
async fn insufficient_stock_changes_nothing() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Aspirin", 5).await;

    let err = fx.ledger.create_sale("Aspirin", 10, 50.0, None).await.unwrap_err();
    assert!(
        matches!(
            err,
            LedgerError::InsufficientStock {
                available: 5,
                requested: 10,
            }
        ),
        "unexpected error: {err:?}"
    );

    assert_eq!(fx.item("Aspirin").await.quantity, 5);
    assert!(fx.ledger.list_sales().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_sale_insert_rolls_back_the_debit() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Aspirin", 50).await;
    let conn = fx.db.connection();

    // The debit goes through, then the store refuses the sale row.
    conn.execute_unprepared(
        "CREATE TRIGGER sales_frozen BEFORE INSERT ON sales BEGIN SELECT RAISE(ABORT, 'sales are frozen'); END;",
    )
    .await?;

    let err = fx.ledger.create_sale("Aspirin", 10, 100.0, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::Store(_)), "unexpected error: {err:?}");

    let item = fx.item("Aspirin").await;
    assert_eq!(item.quantity, 50);
    assert_eq!(item.status, InventoryStatus::Active);
    assert!(fx.ledger.list_sales().await?.is_empty());

    // Nothing is left locked: the same sale goes through once the store accepts it.
    conn.execute_unprepared("DROP TRIGGER sales_frozen;").await?;
    fx.ledger.create_sale("Aspirin", 10, 100.0, None).await?;
    assert_eq!(fx.item("Aspirin").await.quantity, 40);
    assert_eq!(fx.ledger.list_sales().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn selling_down_to_threshold_marks_low_stock() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Diclofenac", 12).await;

    fx.ledger.create_sale("Diclofenac", 1, 5.0, None).await?;
    let item = fx.item("Diclofenac").await;
    assert_eq!(item.quantity, 11);
    assert_eq!(item.status, InventoryStatus::Active);

    fx.ledger.create_sale("Diclofenac", 1, 5.0, None).await?;
    let item = fx.item("Diclofenac").await;
    assert_eq!(item.quantity, LOW_STOCK_THRESHOLD);
    assert_eq!(item.status, InventoryStatus::LowStock);

    // Selling out entirely is allowed and keeps the item.
    fx.ledger.create_sale("Diclofenac", 10, 50.0, None).await?;
    let item = fx.item("Diclofenac").await;
    assert_eq!(item.quantity, 0);
    assert_eq!(item.status, InventoryStatus::LowStock);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sales_never_oversell() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Naproxen", 15).await;

    let (first, second) = tokio::join!(
        fx.ledger.create_sale("Naproxen", 10, 100.0, None),
        fx.ledger.create_sale("Naproxen", 10, 100.0, None),
    );

    let outcomes = [first, second];
    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(succeeded, 1, "exactly one sale must go through: {outcomes:?}");
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Err(LedgerError::InsufficientStock {
            available: 5,
            requested: 10,
        })
    )));

    assert_eq!(fx.item("Naproxen").await.quantity, 5);
    assert_eq!(fx.ledger.list_sales().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_drug_is_not_found() -> TestResult {
    let fx = fixture().await?;

    let err = fx.ledger.create_sale("Unobtainium", 1, 1.0, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { what: "Drug", .. }), "{err:?}");
    assert!(fx.ledger.list_sales().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_sale_input_is_rejected() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Paracetamol", 10).await;

    for (name, quantity, amount) in [("", 1, 1.0), ("Paracetamol", 0, 1.0), ("Paracetamol", -2, 1.0)] {
        let err = fx.ledger.create_sale(name, quantity, amount, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }), "{err:?}");
    }

    let err = fx
        .ledger
        .record_sale(&NewSale {
            drug_name: Some("Paracetamol".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation {
            reason: "Missing required fields",
            ..
        }
    ));

    assert_eq!(fx.item("Paracetamol").await.quantity, 10);
    Ok(())
}

#[tokio::test]
async fn shipment_status_transitions() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Cetirizine", 30).await;
    let sale = fx.ledger.create_sale("Cetirizine", 1, 3.5, None).await?;
    let id = sale.id.to_string();

    let updated = fx.ledger.update_sale_status(&id, "In Transit").await?;
    assert_eq!(updated.status, ShipmentStatus::InTransit);
    assert_eq!(updated.quantity, sale.quantity);
    assert_eq!(updated.total_amount, sale.total_amount);

    let updated = fx.ledger.update_sale_status(&id, "Delivered").await?;
    assert_eq!(updated.status, ShipmentStatus::Delivered);

    // Any direction is accepted.
    let updated = fx.ledger.update_sale_status(&id, "Processing").await?;
    assert_eq!(updated.status, ShipmentStatus::Processing);

    let err = fx.ledger.update_sale_status(&id, "Shipped").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument { .. }), "{err:?}");
    assert_eq!(fx.ledger.find_sale(sale.id).await?.status, ShipmentStatus::Processing);

    let err = fx
        .ledger
        .update_sale_status("67e55044-10b1-426f-9247-bb680e5fe0c8", "Delivered")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { what: "Sale", .. }), "{err:?}");

    let err = fx.ledger.update_sale_status("42", "Delivered").await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation {
            reason: "Invalid ID format",
            ..
        }
    ));

    // A body without status leaves the record as it is.
    let same = fx.ledger.update_sale(&id, &SaleUpdate::default()).await?;
    assert_eq!(same.status, ShipmentStatus::Processing);
    Ok(())
}

#[tokio::test]
async fn sales_are_listed_most_recent_first() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Loratadine", 100).await;

    for day in [3, 1, 2] {
        let date = Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap();
        fx.ledger.create_sale("Loratadine", 1, day as f64, Some(date)).await?;
    }

    let amounts: Vec<f64> = fx.ledger.list_sales().await?.iter().map(|s| s.total_amount).collect();
    assert_eq!(amounts, vec![3.0, 2.0, 1.0]);
    Ok(())
}

#[tokio::test]
async fn summary_over_the_ledger() -> TestResult {
    let fx = fixture().await?;

    let empty = fx.ledger.compute_sales_summary().await?;
    assert_eq!(empty.total_sales, 0.0);
    assert_eq!(empty.total_orders, 0);
    assert_eq!(empty.average_order, 0.0);
    assert_eq!(empty.monthly_growth, 0.0);
    assert!(empty.recent_transactions.is_empty());

    fx.stock("Salbutamol", 100).await;
    for (month, day, amount) in [(1, 15, 100.0), (1, 20, 200.0), (2, 5, 150.0)] {
        let date = Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap();
        fx.ledger.create_sale("Salbutamol", 1, amount, Some(date)).await?;
    }

    let summary = fx.ledger.compute_sales_summary().await?;
    assert_eq!(summary.total_sales, 450.0);
    assert_eq!(summary.total_orders, 3);
    assert_eq!(summary.average_order, 150.0);
    assert_eq!(summary.monthly_growth, -50.0);
    assert_eq!(summary.recent_transactions.len(), 3);
    assert_eq!(summary.recent_transactions[0].total_amount, 150.0);
    Ok(())
}

#[tokio::test]
async fn summary_keeps_only_latest_transactions() -> TestResult {
    let fx = fixture().await?;
    fx.stock("Diazepam", 100).await;

    for day in 1..=8 {
        let date = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        fx.ledger.create_sale("Diazepam", 1, 10.0, Some(date)).await?;
    }

    let summary = fx.ledger.compute_sales_summary().await?;
    assert_eq!(summary.total_orders, 8);
    assert_eq!(summary.total_sales, 80.0);
    assert_eq!(summary.recent_transactions.len(), RECENT_TRANSACTIONS as usize);
    let days: Vec<u32> = summary
        .recent_transactions
        .iter()
        .map(|s| chrono::Datelike::day(&s.transaction_date))
        .collect();
    assert_eq!(days, vec![8, 7, 6, 5, 4]);
    Ok(())
}
