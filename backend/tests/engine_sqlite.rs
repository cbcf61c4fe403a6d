use std::sync::Arc;

use chrono::Utc;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use tokio::task::JoinSet;
use uuid::Uuid;

use backend::attempts::recorder::FailedAttemptRecorder;
use backend::attempts::recorder_sqlx::SqlxFailedAttemptRecorder;
use backend::error::{Rejection, SubmitError};
use backend::identity::{Role, StaticIdentity, User};
use backend::metrics::counters::Counters;
use backend::movement::engine::MovementEngine;
use backend::movement::model::{Movement, MovementKind, NewMovementDetail};
use backend::movement::repository_sqlx::SqlxMovementRepository;
use backend::product::model::Product;
use backend::product::repository::ProductRepository;
use backend::product::repository_sqlx::SqlxProductRepository;
use backend::time::to_epoch_ms;
use backend::warehouse::model::Warehouse;
use backend::warehouse::registry_sqlx::SqlxWarehouseRegistry;

/// Helper to setup an isolated, unique in-memory SQLite database.
/// Using a unique name in the connection string prevents "Table already exists"
/// errors during parallel test execution while still allowing shared cache access.
async fn setup_db() -> AnyPool {
    sqlx::any::install_default_drivers();

    let db_name = Uuid::new_v4().to_string();
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await
        .expect("connect sqlite memory db");

    backend::db::schema::init(&pool).await.expect("init schema");

    pool
}

// -----------------------
// Fixtures + seed helpers
// -----------------------

fn mk_warehouse(name: &str, capacity: i64) -> Warehouse {
    Warehouse {
        id: Uuid::new_v4(),
        name: name.to_string(),
        location: "Dock 1".to_string(),
        capacity,
        manager_id: Uuid::new_v4(),
    }
}

fn mk_product(name: &str, quantity: i64, warehouse_id: Uuid) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: "General".to_string(),
        price_minor: 990,
        quantity,
        warehouse_id,
    }
}

fn mk_movement(
    kind: MovementKind,
    origin: Option<&Warehouse>,
    destination: Option<&Warehouse>,
) -> Movement {
    Movement {
        id: Uuid::new_v4(),
        occurred_at: Utc::now(),
        kind,
        user_id: None,
        origin_warehouse_id: origin.map(|w| w.id),
        destination_warehouse_id: destination.map(|w| w.id),
    }
}

async fn insert_warehouse(pool: &AnyPool, w: &Warehouse) {
    sqlx::query(r#"INSERT INTO warehouses VALUES (?, ?, ?, ?, ?)"#)
        .bind(w.id.to_string())
        .bind(w.name.as_str())
        .bind(w.location.as_str())
        .bind(w.capacity)
        .bind(w.manager_id.to_string())
        .execute(pool)
        .await
        .expect("insert warehouse");
}

async fn insert_product(pool: &AnyPool, p: &Product) {
    sqlx::query(r#"INSERT INTO products VALUES (?, ?, ?, ?, ?, ?)"#)
        .bind(p.id.to_string())
        .bind(p.name.as_str())
        .bind(p.category.as_str())
        .bind(p.price_minor)
        .bind(p.quantity)
        .bind(p.warehouse_id.to_string())
        .execute(pool)
        .await
        .expect("insert product");
}

async fn insert_movement(pool: &AnyPool, m: &Movement) {
    sqlx::query(r#"INSERT INTO movements VALUES (?, ?, ?, ?, ?, ?)"#)
        .bind(m.id.to_string())
        .bind(to_epoch_ms(&m.occurred_at))
        .bind(m.kind.to_string())
        .bind(m.user_id.map(|u| u.to_string()))
        .bind(m.origin_warehouse_id.map(|w| w.to_string()))
        .bind(m.destination_warehouse_id.map(|w| w.to_string()))
        .execute(pool)
        .await
        .expect("insert movement");
}

fn build_engine(pool: &AnyPool) -> Arc<MovementEngine> {
    let operator = User {
        id: Some(Uuid::new_v4()),
        username: "mvega".to_string(),
        role: Role::Operator,
    };

    Arc::new(MovementEngine::new(
        Arc::new(SqlxMovementRepository::new(pool.clone())),
        Arc::new(SqlxProductRepository::new(pool.clone())),
        Arc::new(SqlxWarehouseRegistry::new(pool.clone())),
        Arc::new(SqlxFailedAttemptRecorder::new(pool.clone())),
        Arc::new(StaticIdentity(operator)),
        Counters::default(),
    ))
}

fn submission(m: &Movement, p: &Product, quantity: i64) -> NewMovementDetail {
    NewMovementDetail {
        movement_id: m.id,
        product_id: p.id,
        quantity,
    }
}

async fn quantity_of(pool: &AnyPool, product_id: &Uuid) -> i64 {
    sqlx::query("SELECT quantity FROM products WHERE id = ?")
        .bind(product_id.to_string())
        .fetch_one(pool)
        .await
        .expect("fetch quantity")
        .get::<i64, _>("quantity")
}

async fn count(pool: &AnyPool, sql: &str) -> i64 {
    sqlx::query_scalar(sql)
        .fetch_one(pool)
        .await
        .expect("count query")
}

// -----------------------
// SCENARIO TESTS
// -----------------------

#[tokio::test]
async fn transfer_exceeding_stock_is_rejected_and_logged() {
    let pool = setup_db().await;

    let origin = mk_warehouse("North", 10_000);
    let dest = mk_warehouse("South", 10_000);
    let bolts = mk_product("Bolts", 100, origin.id);
    let movement = mk_movement(MovementKind::Transfer, Some(&origin), Some(&dest));

    insert_warehouse(&pool, &origin).await;
    insert_warehouse(&pool, &dest).await;
    insert_product(&pool, &bolts).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);
    let err = engine
        .submit(submission(&movement, &bolts, 500))
        .await
        .unwrap_err();

    match err {
        SubmitError::Rejected(Rejection::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 100);
            assert_eq!(requested, 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Stock untouched, no detail row, exactly one attempt on file.
    assert_eq!(quantity_of(&pool, &bolts.id).await, 100);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM movement_details").await, 0);

    let attempts = SqlxFailedAttemptRecorder::new(pool.clone())
        .recent(10)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].kind, MovementKind::Transfer);
    assert_eq!(attempts[0].product_name, "Bolts");
    assert_eq!(attempts[0].username, "mvega");
    assert_eq!(attempts[0].quantity, 500);
    assert!(attempts[0].reason.contains("available 100, requested 500"));
}

#[tokio::test]
async fn inbound_over_capacity_is_rejected_with_remaining() {
    let pool = setup_db().await;

    let supplier = mk_warehouse("North", 10_000);
    let dest = mk_warehouse("South", 100);
    let template = mk_product("Bolts", 50, supplier.id);
    let already_there = mk_product("Nuts", 95, dest.id);
    let movement = mk_movement(MovementKind::Inbound, None, Some(&dest));

    insert_warehouse(&pool, &supplier).await;
    insert_warehouse(&pool, &dest).await;
    insert_product(&pool, &template).await;
    insert_product(&pool, &already_there).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);
    let err = engine
        .submit(submission(&movement, &template, 10))
        .await
        .unwrap_err();

    match err {
        SubmitError::Rejected(Rejection::CapacityExceeded {
            remaining,
            requested,
            ..
        }) => {
            assert_eq!(remaining, 5);
            assert_eq!(requested, 10);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Nothing materialized in the destination.
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM products").await, 2);

    let attempts = SqlxFailedAttemptRecorder::new(pool.clone())
        .recent(10)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].reason.contains("remaining capacity 5"));
}

#[tokio::test]
async fn transfer_moves_stock_and_creates_the_destination_row() {
    let pool = setup_db().await;

    let origin = mk_warehouse("North", 10_000);
    let dest = mk_warehouse("South", 10_000);
    let bolts = mk_product("Bolts", 40, origin.id);
    let movement = mk_movement(MovementKind::Transfer, Some(&origin), Some(&dest));

    insert_warehouse(&pool, &origin).await;
    insert_warehouse(&pool, &dest).await;
    insert_product(&pool, &bolts).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);
    let detail = engine
        .submit(submission(&movement, &bolts, 30))
        .await
        .unwrap();

    assert_eq!(detail.movement_id, movement.id);
    assert_eq!(detail.quantity, 30);

    assert_eq!(quantity_of(&pool, &bolts.id).await, 10);

    // Landed row carries the source's name, category and price.
    let repo = SqlxProductRepository::new(pool.clone());
    let landed = repo
        .fetch_by_name_in_warehouse("Bolts", &dest.id)
        .await
        .unwrap()
        .expect("destination row created");
    assert_ne!(landed.id, bolts.id);
    assert_eq!(landed.quantity, 30);
    assert_eq!(landed.category, bolts.category);
    assert_eq!(landed.price_minor, bolts.price_minor);

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM movement_details").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM failed_attempts").await, 0);
}

#[tokio::test]
async fn inbound_tops_up_an_existing_row_instead_of_duplicating() {
    let pool = setup_db().await;

    let supplier = mk_warehouse("North", 10_000);
    let dest = mk_warehouse("South", 10_000);
    let template = mk_product("Bolts", 50, supplier.id);
    let existing = mk_product("Bolts", 5, dest.id);
    let movement = mk_movement(MovementKind::Inbound, None, Some(&dest));

    insert_warehouse(&pool, &supplier).await;
    insert_warehouse(&pool, &dest).await;
    insert_product(&pool, &template).await;
    insert_product(&pool, &existing).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);
    engine
        .submit(submission(&movement, &template, 10))
        .await
        .unwrap();

    assert_eq!(quantity_of(&pool, &existing.id).await, 15);
    // template row untouched, no third row created
    assert_eq!(quantity_of(&pool, &template.id).await, 50);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM products").await, 2);
}

#[tokio::test]
async fn same_warehouse_transfer_leaves_stock_unchanged() {
    let pool = setup_db().await;

    let origin = mk_warehouse("North", 10_000);
    let bolts = mk_product("Bolts", 40, origin.id);
    let movement = mk_movement(MovementKind::Transfer, Some(&origin), Some(&origin));

    insert_warehouse(&pool, &origin).await;
    insert_product(&pool, &bolts).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);
    engine
        .submit(submission(&movement, &bolts, 10))
        .await
        .unwrap();

    assert_eq!(quantity_of(&pool, &bolts.id).await, 40);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM products").await, 1);
    // The line itself is still on record.
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM movement_details").await, 1);
}

#[tokio::test]
async fn repeat_submissions_accumulate() {
    let pool = setup_db().await;

    let origin = mk_warehouse("North", 10_000);
    let bolts = mk_product("Bolts", 50, origin.id);
    let movement = mk_movement(MovementKind::Outbound, Some(&origin), None);

    insert_warehouse(&pool, &origin).await;
    insert_product(&pool, &bolts).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);

    // Two identical lines are two draws, not one.
    engine.submit(submission(&movement, &bolts, 5)).await.unwrap();
    engine.submit(submission(&movement, &bolts, 5)).await.unwrap();

    assert_eq!(quantity_of(&pool, &bolts.id).await, 40);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM movement_details").await, 2);
}

#[tokio::test]
async fn unknown_movement_leaves_every_table_untouched() {
    let pool = setup_db().await;

    let origin = mk_warehouse("North", 10_000);
    let bolts = mk_product("Bolts", 50, origin.id);

    insert_warehouse(&pool, &origin).await;
    insert_product(&pool, &bolts).await;

    let engine = build_engine(&pool);
    let missing = Uuid::new_v4();
    let err = engine
        .submit(NewMovementDetail {
            movement_id: missing,
            product_id: bolts.id,
            quantity: 5,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::MovementNotFound(id) if id == missing));
    assert_eq!(quantity_of(&pool, &bolts.id).await, 50);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM movement_details").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM failed_attempts").await, 0);
}

#[tokio::test]
async fn invalid_quantity_is_rejected_but_not_logged() {
    let pool = setup_db().await;

    let origin = mk_warehouse("North", 10_000);
    let bolts = mk_product("Bolts", 50, origin.id);
    let movement = mk_movement(MovementKind::Outbound, Some(&origin), None);

    insert_warehouse(&pool, &origin).await;
    insert_product(&pool, &bolts).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);
    let err = engine
        .submit(submission(&movement, &bolts, 0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SubmitError::Rejected(Rejection::InvalidQuantity { .. })
    ));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM failed_attempts").await, 0);
}

// -----------------------
// CONCURRENCY
// -----------------------

#[tokio::test]
async fn concurrent_outbounds_cannot_oversell() {
    let pool = setup_db().await;

    let origin = mk_warehouse("North", 10_000);
    let bolts = mk_product("Bolts", 8, origin.id);
    let movement = mk_movement(MovementKind::Outbound, Some(&origin), None);

    insert_warehouse(&pool, &origin).await;
    insert_product(&pool, &bolts).await;
    insert_movement(&pool, &movement).await;

    let engine = build_engine(&pool);

    let mut set = JoinSet::new();
    for _ in 0..2 {
        let engine = Arc::clone(&engine);
        let sub = submission(&movement, &bolts, 5);
        set.spawn(async move { engine.submit(sub).await });
    }

    let mut accepted = 0;
    let mut rejected = 0;
    while let Some(res) = set.join_next().await {
        match res.expect("task panicked") {
            Ok(_) => accepted += 1,
            Err(SubmitError::Rejected(Rejection::InsufficientStock { available, .. })) => {
                assert_eq!(available, 3);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(accepted, 1, "exactly one draw must win the race");
    assert_eq!(rejected, 1);
    assert_eq!(quantity_of(&pool, &bolts.id).await, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM movement_details").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM failed_attempts").await, 1);
}
