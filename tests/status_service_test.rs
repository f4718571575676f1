mod common;

use common::TestApp;
use uuid::Uuid;
use wms_api::{
    entities::{
        entity_status::EntityType,
        status_definition::{Effect, StatusType},
    },
    errors::ServiceError,
    services::status::{quantity_breakdown, ApplyStatusInput},
};

fn apply_input(entity_id: &str, status_id: Uuid, affected: Option<i32>, total: Option<i32>) -> ApplyStatusInput {
    ApplyStatusInput {
        entity_type: EntityType::Stock,
        entity_id: entity_id.to_string(),
        status_id,
        affected_quantity: affected,
        total_quantity: total,
        reason: Some("test".to_string()),
    }
}

#[tokio::test]
async fn apply_partial_then_remove_partial_converges() {
    let app = TestApp::new().await;
    let warehouse = Uuid::new_v4();
    let loc = app.create_location(warehouse, "A-01", None).await;
    let stock = app.create_stock(Uuid::new_v4(), loc.id, None, 10).await;
    let def = app
        .create_definition("Quarantine", Effect::TransactionsProhibited, StatusType::Product)
        .await;

    let stock_key = stock.id.to_string();
    let actor = Uuid::new_v4();

    let applied = app
        .state
        .services
        .status
        .apply_status(apply_input(&stock_key, def.id, Some(4), Some(10)), actor)
        .await
        .expect("apply failed");
    assert_eq!(applied.affected_quantity, Some(4));

    // Shared breakdown function drives both UI display and preflight math.
    let (status, _) = app
        .state
        .services
        .status
        .get_status(EntityType::Stock, &stock_key)
        .await
        .expect("get failed")
        .expect("status missing");
    let b = quantity_breakdown(10, Some(&status));
    assert_eq!((b.total, b.normal, b.affected), (10, 6, 4));

    let remaining = app
        .state
        .services
        .status
        .remove_partial(EntityType::Stock, &stock_key, 3, Some("resolved".into()), actor)
        .await
        .expect("partial removal failed");
    assert_eq!(remaining, 1);

    let remaining = app
        .state
        .services
        .status
        .remove_partial(EntityType::Stock, &stock_key, 1, None, actor)
        .await
        .expect("final removal failed");
    assert_eq!(remaining, 0);

    let status = app
        .state
        .services
        .status
        .get_status(EntityType::Stock, &stock_key)
        .await
        .expect("get failed");
    assert!(status.is_none(), "status should be fully removed");
}

#[tokio::test]
async fn partial_removal_logs_equal_from_and_to_ids() {
    let app = TestApp::new().await;
    let loc = app.create_location(Uuid::new_v4(), "A-02", None).await;
    let stock = app.create_stock(Uuid::new_v4(), loc.id, None, 10).await;
    let def = app
        .create_definition("Hold", Effect::Closed, StatusType::Product)
        .await;
    let key = stock.id.to_string();
    let actor = Uuid::nil();

    app.state
        .services
        .status
        .apply_status(apply_input(&key, def.id, Some(5), Some(10)), actor)
        .await
        .expect("apply failed");
    app.state
        .services
        .status
        .remove_partial(EntityType::Stock, &key, 2, None, actor)
        .await
        .expect("partial failed");
    app.state
        .services
        .status
        .remove_partial(EntityType::Stock, &key, 3, None, actor)
        .await
        .expect("final failed");

    let history = app
        .state
        .services
        .status
        .history(EntityType::Stock, &key)
        .await
        .expect("history failed");
    assert_eq!(history.len(), 3);

    // Application from nothing.
    assert_eq!(history[0].from_status_id, None);
    assert_eq!(history[0].to_status_id, Some(def.id));

    // Partial removal: same status on both sides, reduced quantity.
    assert_eq!(history[1].from_status_id, Some(def.id));
    assert_eq!(history[1].to_status_id, Some(def.id));
    assert_eq!(history[1].affected_quantity, Some(3));

    // Zero-quantity partial behaves like full removal.
    assert_eq!(history[2].from_status_id, Some(def.id));
    assert_eq!(history[2].to_status_id, None);
}

#[tokio::test]
async fn remove_status_is_idempotent_in_state_but_not_in_log() {
    let app = TestApp::new().await;
    let loc = app.create_location(Uuid::new_v4(), "B-01", None).await;
    let stock = app.create_stock(Uuid::new_v4(), loc.id, None, 5).await;
    let def = app
        .create_definition("Damaged", Effect::TransactionsProhibited, StatusType::Product)
        .await;
    let key = stock.id.to_string();
    let actor = Uuid::nil();

    app.state
        .services
        .status
        .apply_status(apply_input(&key, def.id, Some(5), Some(5)), actor)
        .await
        .expect("apply failed");

    app.state
        .services
        .status
        .remove_status(EntityType::Stock, &key, None, actor)
        .await
        .expect("first removal failed");

    // Second removal: nothing to delete, still succeeds, still logged.
    app.state
        .services
        .status
        .remove_status(EntityType::Stock, &key, None, actor)
        .await
        .expect("second removal should succeed");

    let history = app
        .state
        .services
        .status
        .history(EntityType::Stock, &key)
        .await
        .expect("history failed");
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].from_status_id, None);
    assert_eq!(history[2].to_status_id, None);
}

#[tokio::test]
async fn reapplying_overwrites_and_logs_prior_status() {
    let app = TestApp::new().await;
    let loc = app.create_location(Uuid::new_v4(), "B-02", None).await;
    let stock = app.create_stock(Uuid::new_v4(), loc.id, None, 8).await;
    let first = app
        .create_definition("Inspect", Effect::AuditOnly, StatusType::Product)
        .await;
    let second = app
        .create_definition("Blocked", Effect::Closed, StatusType::Product)
        .await;
    let key = stock.id.to_string();
    let actor = Uuid::nil();

    app.state
        .services
        .status
        .apply_status(apply_input(&key, first.id, Some(8), Some(8)), actor)
        .await
        .expect("first apply failed");
    app.state
        .services
        .status
        .apply_status(apply_input(&key, second.id, Some(2), Some(8)), actor)
        .await
        .expect("second apply failed");

    let (status, def) = app
        .state
        .services
        .status
        .get_status(EntityType::Stock, &key)
        .await
        .expect("get failed")
        .expect("status missing");
    assert_eq!(status.status_id, second.id);
    assert_eq!(def.name, "Blocked");
    assert_eq!(status.affected_quantity, Some(2));

    let history = app
        .state
        .services
        .status
        .history(EntityType::Stock, &key)
        .await
        .expect("history failed");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].from_status_id, Some(first.id));
    assert_eq!(history[1].to_status_id, Some(second.id));
}

#[tokio::test]
async fn product_scope_requires_positive_affected_quantity() {
    let app = TestApp::new().await;
    let def = app
        .create_definition("Hold", Effect::Closed, StatusType::Product)
        .await;
    let key = Uuid::new_v4().to_string();

    let err = app
        .state
        .services
        .status
        .apply_status(apply_input(&key, def.id, None, Some(10)), Uuid::nil())
        .await
        .expect_err("apply without affected quantity should fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = app
        .state
        .services
        .status
        .apply_status(apply_input(&key, def.id, Some(0), Some(10)), Uuid::nil())
        .await
        .expect_err("apply with zero affected quantity should fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn affected_quantity_is_clamped_to_total() {
    let app = TestApp::new().await;
    let def = app
        .create_definition("Hold", Effect::Closed, StatusType::Product)
        .await;
    let key = Uuid::new_v4().to_string();

    let applied = app
        .state
        .services
        .status
        .apply_status(apply_input(&key, def.id, Some(25), Some(10)), Uuid::nil())
        .await
        .expect("apply failed");
    assert_eq!(applied.affected_quantity, Some(10));
}

#[tokio::test]
async fn inactive_definition_cannot_be_applied() {
    let app = TestApp::new().await;
    let def = app
        .create_inactive_definition("Retired", Effect::Closed, StatusType::Product)
        .await;

    let err = app
        .state
        .services
        .status
        .apply_status(
            apply_input(&Uuid::new_v4().to_string(), def.id, Some(1), Some(1)),
            Uuid::nil(),
        )
        .await
        .expect_err("inactive definition should be rejected");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn remove_partial_rejects_location_scoped_statuses() {
    let app = TestApp::new().await;
    let loc = app.create_location(Uuid::new_v4(), "C-01", None).await;
    let def = app
        .create_definition("Aisle closed", Effect::Closed, StatusType::Location)
        .await;
    let key = loc.id.to_string();
    let actor = Uuid::nil();

    app.state
        .services
        .status
        .apply_status(
            ApplyStatusInput {
                entity_type: EntityType::Location,
                entity_id: key.clone(),
                status_id: def.id,
                affected_quantity: None,
                total_quantity: None,
                reason: None,
            },
            actor,
        )
        .await
        .expect("apply failed");

    let err = app
        .state
        .services
        .status
        .remove_partial(EntityType::Location, &key, 1, None, actor)
        .await
        .expect_err("location-scoped partial removal should fail");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn definition_listing_filters_by_scope_and_activity() {
    let app = TestApp::new().await;
    app.create_definition("P1", Effect::Closed, StatusType::Product).await;
    app.create_definition("L1", Effect::Closed, StatusType::Location).await;
    let retired = app
        .create_inactive_definition("Gone", Effect::Closed, StatusType::Product)
        .await;

    let all = app
        .state
        .services
        .status
        .list_definitions(None)
        .await
        .expect("list failed");
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|d| d.id != retired.id));

    let products = app
        .state
        .services
        .status
        .list_definitions(Some(StatusType::Product))
        .await
        .expect("list failed");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "P1");
}

#[tokio::test]
async fn concurrent_partial_removals_converge_to_full_removal() {
    let app = TestApp::new().await;
    let warehouse = Uuid::new_v4();
    let loc = app.create_location(warehouse, "A-03", None).await;
    let stock = app.create_stock(Uuid::new_v4(), loc.id, None, 10).await;
    let def = app
        .create_definition("Damage hold", Effect::Closed, StatusType::Product)
        .await;
    let entity_id = stock.id.to_string();

    app.state
        .services
        .status
        .apply_status(apply_input(&entity_id, def.id, Some(5), Some(10)), Uuid::nil())
        .await
        .expect("apply failed");

    // Two removals racing for the same 5 affected units. Whatever order they
    // land in, together they drain the status; neither may overwrite the
    // other's decrement.
    let svc = app.state.services.status.clone();
    let (r1, r2) = tokio::join!(
        svc.remove_partial(EntityType::Stock, &entity_id, 2, None, Uuid::nil()),
        app.state.services.status.remove_partial(
            EntityType::Stock,
            &entity_id,
            3,
            None,
            Uuid::nil()
        ),
    );
    let r1 = r1.expect("first removal failed");
    let r2 = r2.expect("second removal failed");
    assert_eq!(r1.min(r2), 0, "one of the removals must drain the status");

    let remaining = app
        .state
        .services
        .status
        .get_status(EntityType::Stock, &entity_id)
        .await
        .expect("get failed");
    assert!(remaining.is_none(), "status must be fully removed, got {remaining:?}");
}
