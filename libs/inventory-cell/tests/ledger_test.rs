// libs/inventory-cell/tests/ledger_test.rs

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};

use inventory_cell::models::{AddStockRequest, AllocationScope, InventoryError, StockStatus, MAX_UNITS};
use inventory_cell::services::{allocate, credit_units, InventoryService};
use shared_models::auth::AuthContext;
use shared_models::BloodType;
use shared_utils::test_utils::{seed_stock, stock_quantity, TestConfig, TestHospital};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn days(offset: i64) -> NaiveDate {
    today() + Duration::days(offset)
}

// ==============================================================================
// LEDGER OPERATIONS
// ==============================================================================

#[tokio::test]
async fn same_bucket_is_incremented_not_duplicated() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let service = InventoryService::new(&state);
    let context = AuthContext::hospital(hospital);

    let request = AddStockRequest {
        blood_type: BloodType::OPositive,
        quantity: 10,
        expiry_date: days(30),
    };
    let first = service.add_or_increment_stock(&context, request.clone()).await.unwrap();
    let second = service
        .add_or_increment_stock(&context, AddStockRequest { quantity: 4, ..request })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 14);
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let service = InventoryService::new(&state);

    let result = service
        .add_or_increment_stock(
            &AuthContext::hospital(hospital),
            AddStockRequest { blood_type: BloodType::APositive, quantity: 0, expiry_date: days(10) },
        )
        .await;

    assert_matches!(result, Err(InventoryError::ValidationError(_)));
}

#[tokio::test]
async fn oversized_quantity_is_rejected() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let service = InventoryService::new(&state);

    let result = service
        .add_or_increment_stock(
            &AuthContext::hospital(hospital),
            AddStockRequest { blood_type: BloodType::APositive, quantity: i64::MAX, expiry_date: days(10) },
        )
        .await;

    assert_matches!(result, Err(InventoryError::ValidationError(_)));
}

#[tokio::test]
async fn full_bucket_refuses_more_and_stays_readable() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let row = seed_stock(&state.db, hospital, BloodType::OPositive, MAX_UNITS - 5, days(30)).await;
    let service = InventoryService::new(&state);
    let context = AuthContext::hospital(hospital);

    let result = service
        .add_or_increment_stock(
            &context,
            AddStockRequest { blood_type: BloodType::OPositive, quantity: 10, expiry_date: days(30) },
        )
        .await;
    assert_matches!(result, Err(InventoryError::ValidationError(_)));
    assert_eq!(stock_quantity(&state.db, row).await, MAX_UNITS - 5);

    // Topping up to the cap is still allowed, and listings keep working.
    let topped = service
        .add_or_increment_stock(
            &context,
            AddStockRequest { blood_type: BloodType::OPositive, quantity: 5, expiry_date: days(30) },
        )
        .await
        .unwrap();
    assert_eq!(topped.quantity, MAX_UNITS);
    assert_eq!(service.list_stock(hospital, today()).await.unwrap().len(), 1);
    assert_eq!(service.stock_summary(hospital, today()).await.unwrap()[0].total_units, MAX_UNITS);
}

#[tokio::test]
async fn admins_cannot_stock() {
    let state = TestConfig::default().to_state().await;
    let service = InventoryService::new(&state);

    let result = service
        .add_or_increment_stock(
            &AuthContext::admin(1),
            AddStockRequest { blood_type: BloodType::APositive, quantity: 3, expiry_date: days(10) },
        )
        .await;

    assert_matches!(result, Err(InventoryError::Unauthorized));
}

#[tokio::test]
async fn listing_skips_empty_rows_and_classifies() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    seed_stock(&state.db, hospital, BloodType::OPositive, 20, days(3)).await;
    seed_stock(&state.db, hospital, BloodType::APositive, 2, days(40)).await;
    seed_stock(&state.db, hospital, BloodType::APositive, 9, days(60)).await;
    seed_stock(&state.db, hospital, BloodType::BPositive, 0, days(60)).await;

    let entries = InventoryService::new(&state).list_stock(hospital, today()).await.unwrap();

    let shape: Vec<_> = entries
        .iter()
        .map(|entry| (entry.unit.blood_type, entry.unit.quantity, entry.status))
        .collect();
    assert_eq!(
        shape,
        vec![
            (BloodType::APositive, 2, StockStatus::Low),
            (BloodType::APositive, 9, StockStatus::Healthy),
            (BloodType::OPositive, 20, StockStatus::Expiring),
        ]
    );
}

#[tokio::test]
async fn summary_counts_expiring_units() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    seed_stock(&state.db, hospital, BloodType::ONegative, 3, days(2)).await;
    seed_stock(&state.db, hospital, BloodType::ONegative, 5, days(20)).await;

    let summary = InventoryService::new(&state).stock_summary(hospital, today()).await.unwrap();

    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].blood_type, BloodType::ONegative);
    assert_eq!(summary[0].total_units, 8);
    assert_eq!(summary[0].expiring_soon, 3);
}

#[tokio::test]
async fn availability_ignores_expired_stock() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    seed_stock(&state.db, hospital, BloodType::AbPositive, 6, days(-1)).await;
    seed_stock(&state.db, hospital, BloodType::AbPositive, 4, days(0)).await;

    let service = InventoryService::new(&state);
    let availability = service.availability(hospital, today()).await.unwrap();

    assert_eq!(availability.len(), 1);
    assert_eq!(availability[0].total_units, 4);
    assert_matches!(
        service.availability(hospital + 100, today()).await,
        Err(InventoryError::HospitalNotFound)
    );
}

// ==============================================================================
// ALLOCATION
// ==============================================================================

#[tokio::test]
async fn network_allocation_prefers_soonest_then_own_hospital() {
    let state = TestConfig::default().to_state().await;
    let own = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let other = TestHospital::new("Sterling", "Ahmedabad").insert(&state.db).await;
    let other_soon = seed_stock(&state.db, other, BloodType::OPositive, 2, days(1)).await;
    let other_tied = seed_stock(&state.db, other, BloodType::OPositive, 5, days(5)).await;
    let own_tied = seed_stock(&state.db, own, BloodType::OPositive, 3, days(5)).await;
    let expired = seed_stock(&state.db, own, BloodType::OPositive, 9, days(-1)).await;

    let mut tx = state.db.begin().await.unwrap();
    let allocation = allocate(
        &mut tx,
        BloodType::OPositive,
        6,
        AllocationScope::Network { preferred_hospital: own },
        today(),
        false,
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let order: Vec<_> = allocation.draws.iter().map(|d| (d.inventory_id, d.units)).collect();
    assert_eq!(order, vec![(other_soon, 2), (own_tied, 3), (other_tied, 1)]);
    assert_eq!(stock_quantity(&state.db, other_tied).await, 4);
    assert_eq!(stock_quantity(&state.db, expired).await, 9);
}

#[tokio::test]
async fn strict_shortfall_touches_nothing() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let row = seed_stock(&state.db, hospital, BloodType::BNegative, 3, days(10)).await;

    let mut tx = state.db.begin().await.unwrap();
    let result = allocate(&mut tx, BloodType::BNegative, 5, AllocationScope::Hospital(hospital), today(), false).await;
    tx.rollback().await.unwrap();

    assert_matches!(
        result,
        Err(InventoryError::InsufficientStock { requested: 5, available: 3, .. })
    );
    assert_eq!(stock_quantity(&state.db, row).await, 3);
}

#[tokio::test]
async fn partial_allocation_drains_what_exists() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let row = seed_stock(&state.db, hospital, BloodType::BNegative, 3, days(10)).await;

    let mut tx = state.db.begin().await.unwrap();
    let allocation = allocate(&mut tx, BloodType::BNegative, 5, AllocationScope::Hospital(hospital), today(), true)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(allocation.allocated(), 3);
    assert_eq!(allocation.shortfall(), 2);
    assert_eq!(stock_quantity(&state.db, row).await, 0);
}

#[tokio::test]
async fn credit_merges_into_matching_bucket() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    let row = seed_stock(&state.db, hospital, BloodType::APositive, 2, days(12)).await;

    let mut conn = state.db.acquire().await.unwrap();
    let merged = credit_units(&mut conn, hospital, BloodType::APositive, 5, days(12)).await.unwrap();
    let fresh = credit_units(&mut conn, hospital, BloodType::APositive, 1, days(13)).await.unwrap();
    drop(conn);

    assert_eq!(merged.id, row);
    assert_eq!(merged.quantity, 7);
    assert_ne!(fresh.id, row);
}
