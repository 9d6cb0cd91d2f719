//! Integration tests for the order workflow.
//!
//! These tests drive `OrderService` against the in-memory store, covering
//! pricing, reservation, payment and the status lifecycle without a database.

use std::sync::Arc;
use std::time::Duration;

use plateshop_core::{OrderStatus, OwnerId, PaymentMethod, PlateText, ShippingMethod};
use plateshop_integration_tests::MemoryStorage;
use plateshop_storefront::models::{
    Caller, CreateOrderRequest, LineItemRequest, Order, PaymentDetails,
};
use plateshop_storefront::services::orders::{OrderDraft, OrderError, OrderService};

fn service(store: &Arc<MemoryStorage>) -> OrderService {
    OrderService::new(store.clone(), Duration::from_millis(200))
}

fn item(text: &str, tier: &str) -> LineItemRequest {
    LineItemRequest {
        text: text.to_owned(),
        tier: tier.to_owned(),
        quantity: 1,
        background_index: None,
        unit_price: None,
    }
}

fn draft(items: Vec<LineItemRequest>, shipping_method: ShippingMethod) -> OrderDraft {
    OrderDraft::parse(&CreateOrderRequest {
        items,
        shipping_method,
        address: Some("  ".to_owned()),
        city: Some("Nairobi".to_owned()),
        phone_number: None,
    })
    .unwrap()
}

fn customer() -> Caller {
    Caller::guest(OwnerId::random())
}

fn operator() -> Caller {
    Caller {
        owner_id: OwnerId::random(),
        is_operator: true,
    }
}

fn mpesa(reference: &str) -> PaymentDetails {
    PaymentDetails {
        method: PaymentMethod::Mpesa,
        reference: reference.to_owned(),
    }
}

async fn place(svc: &OrderService, caller: Caller, text: &str, tier: &str) -> Order {
    svc.create_order(caller, draft(vec![item(text, tier)], ShippingMethod::Free))
        .await
        .unwrap()
}

// =============================================================================
// Creation and pricing
// =============================================================================

#[tokio::test]
async fn test_order_total_uses_tier_prices_and_shipping() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let mut prestige = item("KCB001", "prestige");
    prestige.background_index = Some(2);
    let mut standard = item("I❤NBO", "standard_custom");
    standard.quantity = 2;

    let order = svc
        .create_order(
            customer(),
            draft(vec![item("KAA00", "special"), standard, prestige], ShippingMethod::Express),
        )
        .await
        .unwrap();

    // 20_000 + 2 * 40_000 + 80_000 + 500
    assert_eq!(order.total_amount.amount(), 180_500);
    assert_eq!(order.shipping_cost.amount(), 500);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.line_items.len(), 3);
    assert_eq!(order.address, None);
    assert_eq!(order.city.as_deref(), Some("Nairobi"));
    assert_eq!(order.recomputed_total().unwrap(), order.total_amount);
}

#[tokio::test]
async fn test_text_is_reserved_after_order() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let (text, available) = svc.check_availability("kcb100").await.unwrap();
    assert_eq!(text.as_str(), "KCB100");
    assert!(available);

    place(&svc, customer(), "kcb100", "prestige").await;

    let (_, available) = svc.check_availability("KCB100").await.unwrap();
    assert!(!available);
    assert!(store.is_reserved_in_catalog("KCB100"));
}

#[tokio::test]
async fn test_second_order_for_same_text_is_unavailable() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    place(&svc, customer(), "KBZ00", "special").await;

    let err = svc
        .create_order(customer(), draft(vec![item("kbz00", "special")], ShippingMethod::Free))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::PlateUnavailable(ref t) if t.as_str() == "KBZ00"));
    assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn test_reservation_race_is_caught_by_storage() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    place(&svc, customer(), "RACE01", "prestige").await;

    // The pre-check now says "free"; the reservation must still refuse.
    store.set_stale_availability(true);
    let err = svc
        .create_order(
            customer(),
            draft(
                vec![item("OTHER1", "prestige"), item("RACE01", "prestige")],
                ShippingMethod::Free,
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::PlateUnavailable(_)));
    assert_eq!(store.order_count(), 1);
    // Nothing from the failed order was reserved.
    assert!(!store.is_reserved_in_catalog("OTHER1"));
}

#[tokio::test]
async fn test_text_listed_under_other_tier_is_unavailable() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let first = place(&svc, customer(), "TIER01", "standard_custom").await;
    svc.set_status(operator(), first.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let err = svc
        .create_order(customer(), draft(vec![item("TIER01", "prestige")], ShippingMethod::Free))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::PlateUnavailable(ref t) if t.as_str() == "TIER01"));
    assert_eq!(store.order_count(), 1);
    assert!(!store.is_reserved_in_catalog("TIER01"));

    // Same tier still reorders.
    place(&svc, customer(), "TIER01", "standard_custom").await;
}

#[tokio::test]
async fn test_concurrent_orders_reserve_text_once() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move {
                svc.create_order(customer(), draft(vec![item("ONE00", "special")], ShippingMethod::Free))
                    .await
            })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(OrderError::PlateUnavailable(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn test_price_override_requires_operator() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let mut discounted = item("DEAL01", "prestige");
    discounted.unit_price = Some(1_000);

    let err = svc
        .create_order(customer(), draft(vec![discounted.clone()], ShippingMethod::Free))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
    assert_eq!(store.order_count(), 0);

    let order = svc
        .create_order(operator(), draft(vec![discounted], ShippingMethod::Free))
        .await
        .unwrap();
    assert_eq!(order.total_amount.amount(), 1_000);
}

#[tokio::test]
async fn test_list_price_supplied_by_customer_is_accepted() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let mut exact = item("EXACT1", "prestige");
    exact.unit_price = Some(80_000);

    let order = svc
        .create_order(customer(), draft(vec![exact], ShippingMethod::Pickup))
        .await
        .unwrap();
    assert_eq!(order.total_amount.amount(), 80_000);
}

#[test]
fn test_draft_rejects_bad_carts() {
    let parse = |items: Vec<LineItemRequest>| {
        OrderDraft::parse(&CreateOrderRequest {
            items,
            shipping_method: ShippingMethod::Free,
            address: None,
            city: None,
            phone_number: None,
        })
    };

    assert!(matches!(parse(vec![]), Err(OrderError::Validation(_))));
    assert!(parse(vec![item("KCB100", "gold")]).is_err());
    assert!(parse(vec![item("KCB123", "special")]).is_err());
    assert!(parse(vec![item("AB00", "special"), item("ab00", "special")]).is_err());

    let mut background = item("KCB100", "standard_custom");
    background.background_index = Some(1);
    assert!(parse(vec![background]).is_err());

    let mut too_many = item("KCB100", "prestige");
    too_many.quantity = 101;
    assert!(parse(vec![too_many]).is_err());

    let mut none = item("KCB100", "prestige");
    none.quantity = 0;
    assert!(parse(vec![none]).is_err());
}

// =============================================================================
// Payment
// =============================================================================

#[tokio::test]
async fn test_mark_paid_is_idempotent_for_same_reference() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();
    let order = place(&svc, owner, "PAY001", "prestige").await;

    let paid = svc.mark_paid(owner, order.id, mpesa(" QK12AB ")).await.unwrap();
    assert_eq!(paid.status, OrderStatus::PaymentCompleted);
    assert_eq!(paid.payment_reference.as_deref(), Some("QK12AB"));
    assert_eq!(paid.payment_method, Some(PaymentMethod::Mpesa));

    let again = svc.mark_paid(owner, order.id, mpesa("QK12AB")).await.unwrap();
    assert_eq!(again, paid);

    let err = svc.mark_paid(owner, order.id, mpesa("OTHER")).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::PaymentCompleted,
            to: OrderStatus::PaymentCompleted
        }
    ));
}

#[tokio::test]
async fn test_repeat_payment_with_other_method_is_rejected() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();
    let order = place(&svc, owner, "PAY003", "prestige").await;

    svc.mark_paid(owner, order.id, mpesa("REF")).await.unwrap();

    let card = PaymentDetails {
        method: PaymentMethod::Card,
        reference: "REF".to_owned(),
    };
    let err = svc.mark_paid(owner, order.id, card).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::PaymentCompleted,
            to: OrderStatus::PaymentCompleted
        }
    ));

    let current = svc.get_order(owner, order.id).await.unwrap();
    assert_eq!(current.payment_method, Some(PaymentMethod::Mpesa));
}

#[tokio::test]
async fn test_mark_paid_requires_owner_and_reference() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();
    let order = place(&svc, owner, "PAY002", "prestige").await;

    let err = svc.mark_paid(customer(), order.id, mpesa("REF")).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    // Operators manage status; they do not pay on behalf of customers.
    let err = svc.mark_paid(operator(), order.id, mpesa("REF")).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    let err = svc.mark_paid(owner, order.id, mpesa("   ")).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));

    let current = svc.get_order(owner, order.id).await.unwrap();
    assert_eq!(current.status, OrderStatus::Pending);
}

// =============================================================================
// Status lifecycle
// =============================================================================

#[tokio::test]
async fn test_full_lifecycle() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();
    let ops = operator();
    let order = place(&svc, owner, "LIFE01", "prestige").await;

    svc.mark_paid(owner, order.id, mpesa("REF1")).await.unwrap();
    for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        let updated = svc.set_status(ops, order.id, next).await.unwrap();
        assert_eq!(updated.status, next);
    }

    let err = svc
        .set_status(ops, order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { from: OrderStatus::Delivered, .. }));
}

#[tokio::test]
async fn test_status_cannot_skip_steps() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let order = place(&svc, customer(), "SKIP01", "prestige").await;

    let err = svc
        .set_status(operator(), order.id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped
        }
    ));
}

#[tokio::test]
async fn test_set_status_requires_operator() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();
    let order = place(&svc, owner, "OPS001", "prestige").await;

    let err = svc
        .set_status(owner, order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
}

#[tokio::test]
async fn test_cancel_releases_reservation() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let order = place(&svc, customer(), "FREE01", "prestige").await;

    let cancelled = svc
        .set_status(operator(), order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let text = PlateText::parse("FREE01").unwrap();
    assert!(svc.is_available(&text).await.unwrap());

    // The text can be ordered again.
    place(&svc, customer(), "FREE01", "prestige").await;
}

// =============================================================================
// Retrieval
// =============================================================================

#[tokio::test]
async fn test_get_order_visibility() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();
    let order = place(&svc, owner, "SEE001", "prestige").await;

    assert_eq!(svc.get_order(owner, order.id).await.unwrap().id, order.id);
    assert_eq!(svc.get_order(operator(), order.id).await.unwrap().id, order.id);
    assert!(matches!(
        svc.get_order(customer(), order.id).await,
        Err(OrderError::Forbidden(_))
    ));
    assert!(matches!(
        svc.get_order(owner, plateshop_core::OrderId::random()).await,
        Err(OrderError::NotFound)
    ));
}

#[tokio::test]
async fn test_listings_are_newest_first_and_scoped() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();

    let first = place(&svc, owner, "LIST01", "prestige").await;
    let second = place(&svc, owner, "LIST02", "prestige").await;
    place(&svc, customer(), "LIST03", "prestige").await;

    let mine = svc.list_orders_for_owner(owner.owner_id).await.unwrap();
    let ids: Vec<_> = mine.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    assert!(matches!(
        svc.list_all_orders(owner).await,
        Err(OrderError::Forbidden(_))
    ));
    assert_eq!(svc.list_all_orders(operator()).await.unwrap().len(), 3);
}

// =============================================================================
// Storage failures
// =============================================================================

#[tokio::test]
async fn test_storage_failure_is_not_reported_as_unavailable() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    store.set_unavailable(true);

    let err = svc.check_availability("KCB100").await.unwrap_err();
    assert!(matches!(err, OrderError::StorageUnavailable(_)));

    let err = svc
        .create_order(customer(), draft(vec![item("KCB100", "prestige")], ShippingMethod::Free))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::StorageUnavailable(_)));
}

#[tokio::test]
async fn test_slow_storage_times_out() {
    let store = MemoryStorage::new();
    let svc = OrderService::new(store.clone(), Duration::from_millis(20));
    store.set_delay(Some(Duration::from_millis(200)));

    let err = svc.check_availability("KCB100").await.unwrap_err();
    assert!(matches!(err, OrderError::StorageUnavailable(_)));
}

// =============================================================================
// Documented scenarios
// =============================================================================

#[tokio::test]
async fn test_special_plate_with_express_shipping() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let order = svc
        .create_order(customer(), draft(vec![item("KBB100K", "special")], ShippingMethod::Express))
        .await
        .unwrap();

    assert_eq!(order.total_amount.amount(), 20_500);
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_availability_is_stable_and_case_insensitive() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    for _ in 0..3 {
        assert!(svc.check_availability("KAA007A").await.unwrap().1);
    }

    place(&svc, customer(), "KAA007A", "special").await;

    for raw in ["kaa007a", "KAA007A", " Kaa007A "] {
        assert!(!svc.check_availability(raw).await.unwrap().1);
    }
}

#[tokio::test]
async fn test_mark_paid_on_cancelled_order_is_rejected() {
    let store = MemoryStorage::new();
    let svc = service(&store);
    let owner = customer();
    let order = place(&svc, owner, "GONE01", "prestige").await;
    svc.set_status(operator(), order.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let err = svc.mark_paid(owner, order.id, mpesa("LATE")).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Cancelled,
            ..
        }
    ));

    let current = svc.get_order(owner, order.id).await.unwrap();
    assert_eq!(current.status, OrderStatus::Cancelled);
    assert_eq!(current.payment_reference, None);
}

#[tokio::test]
async fn test_set_status_on_unknown_order_is_not_found() {
    let store = MemoryStorage::new();
    let svc = service(&store);

    let err = svc
        .set_status(operator(), plateshop_core::OrderId::random(), OrderStatus::Processing)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound));
}
