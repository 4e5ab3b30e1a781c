use super::*;
use crate::ledger::LedgerError;
use crate::orders::machine::ActorRole;
use shared::models::{
    GeoPoint, OrderItemInput, PaymentMethod, PendingDelivery, Product, QuoteLine, ShippingFee,
};

/// 2024-05-02 12:00 in Ho Chi Minh City
const NOON: i64 = 1_714_626_000_000;
/// 2024-05-01 23:30 in Ho Chi Minh City
const LATE_NIGHT: i64 = 1_714_581_000_000;

fn setup() -> (MarketStorage, OrdersManager) {
    let storage = MarketStorage::open_in_memory().unwrap();
    let ledger = LedgerEngine::new(storage.clone());
    let manager = OrdersManager::new(storage.clone(), ledger, chrono_tz::Asia::Ho_Chi_Minh);
    (storage, manager)
}

fn product(id: &str, seller: &str, price: i64, stock: u32) -> Product {
    Product {
        id: id.into(),
        seller_id: seller.into(),
        name: format!("Món {id}"),
        price,
        commission_bps: 1000,
        stock,
        sale_window: None,
        requires_consultation: false,
        updated_at: 0,
    }
}

fn input(items: &[(&str, u32)]) -> OrderCreate {
    OrderCreate {
        items: items
            .iter()
            .map(|(id, qty)| OrderItemInput {
                product_id: (*id).into(),
                quantity: *qty,
            })
            .collect(),
        customer_name: "Trần Thị B".into(),
        phone: "0901234567".into(),
        shipping_address: "12 Nguyễn Huệ, Quận 1".into(),
        shipping_location: GeoPoint::new(10.7757, 106.7004),
        payment_method: PaymentMethod::Cod,
        shipping_fee: ShippingFee {
            actual: 20_000,
            customer_paid: 15_000,
        },
        surcharge: 0,
        voucher_discount: 0,
        total: None,
        consultation: false,
        note: None,
    }
}

fn customer(id: &str) -> Actor {
    Actor::new(id, ActorRole::Customer)
}

fn shipper(id: &str) -> Actor {
    Actor::new(id, ActorRole::Shipper)
}

fn admin() -> Actor {
    Actor::new("admin-1", ActorRole::Staff)
}

fn offer(storage: &MarketStorage, order_id: &str, shipper_id: &str) {
    let mut record = PendingDelivery::new(order_id, NOON, 600_000);
    record.tried_shippers.push(shipper_id.into());
    record.attempts = 1;
    let txn = storage.begin_write().unwrap();
    storage.put_pending_delivery_txn(&txn, &record).unwrap();
    txn.commit().unwrap();
}

fn stock_of(storage: &MarketStorage, product_id: &str) -> u32 {
    storage.get_product(product_id).unwrap().unwrap().stock
}

/// Create, offer, accept and deliver an order
fn delivered_order(storage: &MarketStorage, manager: &OrdersManager) -> Order {
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();
    offer(storage, &order.id, "sh-1");
    manager.accept_order_at(&order.id, &shipper("sh-1"), NOON).unwrap();
    manager
        .update_status(&order.id, OrderStatus::Delivering, &shipper("sh-1"))
        .unwrap();
    manager
        .update_status(&order.id, OrderStatus::Delivered, &shipper("sh-1"))
        .unwrap()
}

// ========================================================================
// Creation
// ========================================================================

#[test]
fn test_create_order_reserves_stock_and_prices_items() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 50_000, 10)).unwrap();
    storage.upsert_product(&product("p-2", "s-2", 30_000, 5)).unwrap();
    let mut events = manager.subscribe();

    let order = manager
        .create_order_at("c-1", input(&[("p-1", 2), ("p-2", 1)]), NOON)
        .unwrap();

    assert_eq!(order.status, OrderStatus::PendingConfirmation);
    assert_eq!(order.items[0].commission_amount, 10_000);
    assert_eq!(order.items[1].seller_id, "s-2");
    assert_eq!(order.total, 100_000 + 30_000 + 15_000);
    assert_eq!(order.timestamps.created_at, NOON);
    assert_eq!(stock_of(&storage, "p-1"), 8);
    assert_eq!(stock_of(&storage, "p-2"), 4);

    let event = events.try_recv().unwrap();
    assert_eq!(event.order_id, order.id);
    assert_eq!(
        event.kind,
        OrderEventKind::Created {
            status: OrderStatus::PendingConfirmation
        }
    );
    assert_eq!(
        storage.pending_order_ids_created_before(NOON + 1).unwrap(),
        vec![order.id]
    );
}

#[test]
fn test_insufficient_stock_creates_nothing() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 50_000, 2)).unwrap();

    let err = manager
        .create_order_at("c-1", input(&[("p-1", 3)]), NOON)
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::OutOfStock {
            requested: 3,
            available: 2,
            ..
        }
    ));
    assert_eq!(stock_of(&storage, "p-1"), 2);
    assert!(storage.pending_order_ids_created_before(i64::MAX).unwrap().is_empty());
}

#[test]
fn test_late_item_failure_releases_earlier_reservations() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    storage.upsert_product(&product("p-2", "s-1", 10_000, 1)).unwrap();

    let err = manager
        .create_order_at("c-1", input(&[("p-1", 2), ("p-2", 2)]), NOON)
        .unwrap_err();
    assert!(matches!(err, OrderError::OutOfStock { .. }));
    assert_eq!(stock_of(&storage, "p-1"), 5);
    assert_eq!(stock_of(&storage, "p-2"), 1);
}

#[test]
fn test_same_product_twice_counts_both_lines() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 3)).unwrap();

    let err = manager
        .create_order_at("c-1", input(&[("p-1", 2), ("p-1", 2)]), NOON)
        .unwrap_err();
    assert!(matches!(err, OrderError::OutOfStock { available: 1, .. }));
    assert_eq!(stock_of(&storage, "p-1"), 3);
}

#[test]
fn test_unknown_product_and_empty_cart() {
    let (_storage, manager) = setup();
    assert!(matches!(
        manager.create_order_at("c-1", input(&[("nope", 1)]), NOON),
        Err(OrderError::ProductNotFound(_))
    ));
    assert!(matches!(
        manager.create_order_at("c-1", input(&[]), NOON),
        Err(OrderError::EmptyCart)
    ));
}

#[test]
fn test_required_fields_are_validated() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 3)).unwrap();

    let mut missing_phone = input(&[("p-1", 1)]);
    missing_phone.phone = "  ".into();
    assert!(matches!(
        manager.create_order_at("c-1", missing_phone, NOON),
        Err(OrderError::Validation(_))
    ));

    let mut zero_qty = input(&[("p-1", 0)]);
    zero_qty.phone = "0901234567".into();
    assert!(matches!(
        manager.create_order_at("c-1", zero_qty, NOON),
        Err(OrderError::Validation(_))
    ));

    let mut bad_location = input(&[("p-1", 1)]);
    bad_location.shipping_location = GeoPoint::new(f64::NAN, 106.0);
    assert!(matches!(
        manager.create_order_at("c-1", bad_location, NOON),
        Err(OrderError::Validation(_))
    ));
    assert_eq!(stock_of(&storage, "p-1"), 3);
}

#[test]
fn test_total_tolerance() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();

    let mut off_by_one = input(&[("p-1", 1)]);
    off_by_one.total = Some(25_001);
    assert_eq!(manager.create_order_at("c-1", off_by_one, NOON).unwrap().total, 25_000);

    let mut off_by_two = input(&[("p-1", 1)]);
    off_by_two.total = Some(24_998);
    assert!(matches!(
        manager.create_order_at("c-1", off_by_two, NOON),
        Err(OrderError::TotalMismatch {
            computed: 25_000,
            ..
        })
    ));
}

#[test]
fn test_negative_client_total_is_rejected() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();

    for total in [i64::MIN, -1] {
        let mut bad = input(&[("p-1", 1)]);
        bad.total = Some(total);
        assert!(matches!(
            manager.create_order_at("c-1", bad, NOON),
            Err(OrderError::Validation(_))
        ));
    }

    let mut far_off = input(&[("p-1", 1)]);
    far_off.total = Some(i64::MAX);
    assert!(matches!(
        manager.create_order_at("c-1", far_off, NOON),
        Err(OrderError::TotalMismatch { .. })
    ));
    assert_eq!(stock_of(&storage, "p-1"), 5);
}

#[test]
fn test_amounts_out_of_range_are_rejected() {
    let (storage, manager) = setup();
    storage
        .upsert_product(&product("p-1", "s-1", i64::MAX / 2, 10))
        .unwrap();

    assert!(matches!(
        manager.create_order_at("c-1", input(&[("p-1", 3)]), NOON),
        Err(OrderError::Validation(_))
    ));
    assert_eq!(stock_of(&storage, "p-1"), 10);

    let mut big_fee = input(&[("p-1", 1)]);
    big_fee.shipping_fee.customer_paid = i64::MAX;
    assert!(matches!(
        manager.create_order_at("c-1", big_fee, NOON),
        Err(OrderError::Validation(_))
    ));
    assert_eq!(stock_of(&storage, "p-1"), 10);
}

#[test]
fn test_voucher_and_surcharge_in_total() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 40_000, 5)).unwrap();

    let mut order_input = input(&[("p-1", 1)]);
    order_input.surcharge = 5_000;
    order_input.voucher_discount = 15_000;
    order_input.shipping_fee.customer_paid = 0;
    let order = manager.create_order_at("c-1", order_input, NOON).unwrap();
    assert_eq!(order.total, 30_000);
    assert_eq!(order.shipping_fee.actual, 20_000);
}

#[test]
fn test_wrapping_sale_window() {
    let window = SaleWindow::new("22:00", "06:00");
    let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
    assert!(validate_sale_time(&window, at(23, 30)));
    assert!(validate_sale_time(&window, at(5, 59)));
    assert!(!validate_sale_time(&window, at(12, 0)));

    let day = SaleWindow::new("08:00", "20:00");
    assert!(validate_sale_time(&day, at(12, 0)));
    assert!(!validate_sale_time(&day, at(21, 0)));

    assert!(validate_sale_time(&SaleWindow::new("07:00", "07:00"), at(3, 0)));
    assert!(validate_sale_time(&SaleWindow::new("late", "06:00"), at(12, 0)));
}

#[test]
fn test_sale_window_applies_business_timezone() {
    let (storage, manager) = setup();
    let mut night_food = product("p-1", "s-1", 30_000, 5);
    night_food.sale_window = Some(SaleWindow::new("22:00", "06:00"));
    storage.upsert_product(&night_food).unwrap();

    assert!(matches!(
        manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON),
        Err(OrderError::SaleWindowClosed { .. })
    ));
    assert_eq!(stock_of(&storage, "p-1"), 5);
    assert!(manager
        .create_order_at("c-1", input(&[("p-1", 1)]), LATE_NIGHT)
        .is_ok());
}

// ========================================================================
// Cancellation
// ========================================================================

#[test]
fn test_customer_cancels_own_pending_order() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 2)]), NOON).unwrap();
    offer(&storage, &order.id, "sh-1");

    let canceled = manager
        .cancel_order(&order.id, &customer("c-1"), Some("changed my mind".into()))
        .unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(canceled.cancel_reason.as_deref(), Some("changed my mind"));
    assert!(canceled.timestamps.canceled_at.is_some());
    assert_eq!(stock_of(&storage, "p-1"), 5);

    let record = storage.get_pending_delivery(&order.id).unwrap().unwrap();
    assert_eq!(record.status, PendingDeliveryStatus::Failed);
    assert!(storage.pending_order_ids_created_before(i64::MAX).unwrap().is_empty());
}

#[test]
fn test_cancel_only_from_pending_confirmation() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();
    offer(&storage, &order.id, "sh-1");
    manager.accept_order_at(&order.id, &shipper("sh-1"), NOON).unwrap();

    for actor in [customer("c-1"), admin()] {
        let err = manager.cancel_order(&order.id, &actor, None).unwrap_err();
        assert!(matches!(err, OrderError::NotCancelable(OrderStatus::Processing)));
    }
    let stored = storage.get_order(&order.id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Processing);
}

#[test]
fn test_cancel_requires_owner_or_staff() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();

    assert!(matches!(
        manager.cancel_order(&order.id, &customer("c-2"), None),
        Err(OrderError::Forbidden(_))
    ));
    assert!(matches!(
        manager.cancel_order(&order.id, &shipper("sh-1"), None),
        Err(OrderError::Forbidden(_))
    ));
    assert!(manager.cancel_order(&order.id, &admin(), None).is_ok());
}

// ========================================================================
// Transitions
// ========================================================================

#[test]
fn test_accept_requires_offer() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();

    assert!(matches!(
        manager.accept_order_at(&order.id, &shipper("sh-1"), NOON),
        Err(OrderError::NotOffered)
    ));

    offer(&storage, &order.id, "sh-1");
    let mut events = manager.subscribe();
    let accepted = manager
        .update_status(&order.id, OrderStatus::Processing, &shipper("sh-1"))
        .unwrap();
    assert_eq!(accepted.shipper_id.as_deref(), Some("sh-1"));
    assert!(accepted.timestamps.accepted_at.is_some());
    assert!(matches!(
        events.try_recv().unwrap().kind,
        OrderEventKind::ShipperAssigned { .. }
    ));

    let record = storage.get_pending_delivery(&order.id).unwrap().unwrap();
    assert_eq!(record.status, PendingDeliveryStatus::Assigned);
    assert_eq!(storage.orders_for_shipper("sh-1").unwrap().len(), 1);

    assert!(matches!(
        manager.accept_order_at(&order.id, &shipper("sh-2"), NOON),
        Err(OrderError::AlreadyAssigned)
    ));
}

#[test]
fn test_seller_cannot_take_order_out_of_assignment() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();
    offer(&storage, &order.id, "sh-1");

    assert!(matches!(
        manager.update_status(
            &order.id,
            OrderStatus::Processing,
            &Actor::new("s-1", ActorRole::Seller)
        ),
        Err(OrderError::TransitionForbidden { .. })
    ));
    let stored = storage.get_order(&order.id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::PendingConfirmation);
    assert!(stored.shipper_id.is_none());

    let accepted = manager.accept_order_at(&order.id, &shipper("sh-1"), NOON).unwrap();
    assert_eq!(accepted.shipper_id.as_deref(), Some("sh-1"));
    manager
        .update_status(&order.id, OrderStatus::Delivering, &shipper("sh-1"))
        .unwrap();
}

#[test]
fn test_illegal_transitions_are_rejected() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();

    assert!(matches!(
        manager.update_status(&order.id, OrderStatus::Delivered, &admin()),
        Err(OrderError::InvalidTransition { .. })
    ));
    assert!(matches!(
        manager.update_status(&order.id, OrderStatus::Delivering, &customer("c-1")),
        Err(OrderError::InvalidTransition { .. })
    ));
    let stored = storage.get_order(&order.id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::PendingConfirmation);
}

#[test]
fn test_only_assigned_shipper_advances_delivery() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();
    offer(&storage, &order.id, "sh-1");
    manager.accept_order_at(&order.id, &shipper("sh-1"), NOON).unwrap();

    assert!(matches!(
        manager.update_status(&order.id, OrderStatus::Delivering, &shipper("sh-2")),
        Err(OrderError::Forbidden(_))
    ));
    let delivering = manager
        .update_status(&order.id, OrderStatus::Delivering, &shipper("sh-1"))
        .unwrap();
    assert!(delivering.timestamps.delivering_at.is_some());
}

#[test]
fn test_delivery_queues_ledger_job_and_reversal_debits() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 100_000, 5)).unwrap();
    let order = delivered_order(&storage, &manager);
    assert!(order.timestamps.delivered_at.is_some());

    let jobs = storage.pending_ledger_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].order_id, order.id);

    let ledger = LedgerEngine::new(storage.clone());
    ledger.post_order_completion(&order.id).unwrap();
    assert_eq!(ledger.get_balance("s-1").unwrap().balance, 90_000);
    assert!(storage.pending_ledger_jobs().unwrap().is_empty());

    assert!(matches!(
        manager.update_status(&order.id, OrderStatus::Canceled, &customer("c-1")),
        Err(OrderError::TransitionForbidden { .. })
    ));
    let canceled = manager
        .update_status(&order.id, OrderStatus::Canceled, &admin())
        .unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(ledger.get_balance("s-1").unwrap().balance, 0);
    // Delivered goods are not returned to stock
    assert_eq!(stock_of(&storage, "p-1"), 4);
}

#[test]
fn test_reversal_failure_keeps_order_delivered() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 100_000, 5)).unwrap();
    let order = delivered_order(&storage, &manager);

    let ledger = LedgerEngine::new(storage.clone());
    ledger.post_order_completion(&order.id).unwrap();
    ledger.request_payout("s-1").unwrap();

    let err = manager
        .update_status(&order.id, OrderStatus::Canceled, &admin())
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Ledger(LedgerError::InsufficientBalance { .. })
    ));
    let stored = storage.get_order(&order.id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
}

#[test]
fn test_cancel_before_credit_drops_the_job() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 100_000, 5)).unwrap();
    let order = delivered_order(&storage, &manager);

    manager
        .update_status(&order.id, OrderStatus::Canceled, &admin())
        .unwrap();
    assert!(storage.pending_ledger_jobs().unwrap().is_empty());
    let ledger = LedgerEngine::new(storage.clone());
    assert!(ledger.post_order_completion(&order.id).unwrap().is_empty());
    assert_eq!(ledger.get_balance("s-1").unwrap().balance, 0);
}

// ========================================================================
// Consultation
// ========================================================================

#[test]
fn test_consultation_flow() {
    let (storage, manager) = setup();
    let mut custom_cake = product("p-1", "s-1", 1, 5);
    custom_cake.requires_consultation = true;
    storage.upsert_product(&custom_cake).unwrap();

    let order = manager.create_order_at("c-1", input(&[("p-1", 2)]), NOON).unwrap();
    assert_eq!(order.status, OrderStatus::PendingConsultation);
    assert!(order.is_consultation);
    assert!(storage.pending_order_ids_created_before(i64::MAX).unwrap().is_empty());

    let seller = Actor::new("s-1", ActorRole::Seller);
    manager
        .update_status(&order.id, OrderStatus::InConsultation, &seller)
        .unwrap();

    assert!(matches!(
        manager.submit_quote(
            &order.id,
            &Actor::new("s-2", ActorRole::Seller),
            OrderQuote {
                lines: vec![QuoteLine {
                    product_id: "p-1".into(),
                    unit_price: 200_000,
                }],
            },
        ),
        Err(OrderError::Forbidden(_))
    ));

    let quoted = manager
        .submit_quote(
            &order.id,
            &seller,
            OrderQuote {
                lines: vec![QuoteLine {
                    product_id: "p-1".into(),
                    unit_price: 200_000,
                }],
            },
        )
        .unwrap();
    assert_eq!(quoted.status, OrderStatus::PendingCustomerConfirmation);
    assert_eq!(quoted.items[0].unit_price, 200_000);
    assert_eq!(quoted.items[0].commission_amount, 40_000);
    assert_eq!(quoted.total, 400_000 + 15_000);

    assert!(matches!(
        manager.update_status(&order.id, OrderStatus::PendingConfirmation, &seller),
        Err(OrderError::TransitionForbidden { .. })
    ));
    let confirmed = manager
        .update_status(&order.id, OrderStatus::PendingConfirmation, &customer("c-1"))
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::PendingConfirmation);
    // Confirmed consultation orders wait for a shipper without a reaper deadline
    assert!(storage.pending_order_ids_created_before(i64::MAX).unwrap().is_empty());
}

#[test]
fn test_quote_price_above_cap_is_rejected() {
    let (storage, manager) = setup();
    let mut custom = product("p-1", "s-1", 1, 5);
    custom.requires_consultation = true;
    storage.upsert_product(&custom).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 3)]), NOON).unwrap();
    let seller = Actor::new("s-1", ActorRole::Seller);
    manager
        .update_status(&order.id, OrderStatus::InConsultation, &seller)
        .unwrap();

    let quote = |unit_price| OrderQuote {
        lines: vec![QuoteLine {
            product_id: "p-1".into(),
            unit_price,
        }],
    };
    for unit_price in [MAX_UNIT_PRICE + 1, i64::MAX / 2] {
        assert!(matches!(
            manager.submit_quote(&order.id, &seller, quote(unit_price)),
            Err(OrderError::Validation(_))
        ));
    }
    let stored = storage.get_order(&order.id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::InConsultation);

    let quoted = manager
        .submit_quote(&order.id, &seller, quote(MAX_UNIT_PRICE))
        .unwrap();
    assert_eq!(quoted.total, MAX_UNIT_PRICE * 3 + 15_000);
}

#[test]
fn test_quote_through_update_status_is_refused() {
    let (storage, manager) = setup();
    let mut custom = product("p-1", "s-1", 1, 5);
    custom.requires_consultation = true;
    storage.upsert_product(&custom).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();

    assert!(matches!(
        manager.update_status(
            &order.id,
            OrderStatus::PendingCustomerConfirmation,
            &admin()
        ),
        Err(OrderError::Validation(_))
    ));
}

// ========================================================================
// Queries and system cancellation
// ========================================================================

#[test]
fn test_order_visibility() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let order = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();
    offer(&storage, &order.id, "sh-1");

    assert!(manager.get_order(&order.id, &customer("c-1")).is_ok());
    assert!(manager.get_order(&order.id, &Actor::new("s-1", ActorRole::Seller)).is_ok());
    assert!(manager.get_order(&order.id, &shipper("sh-1")).is_ok());
    assert!(manager.get_order(&order.id, &admin()).is_ok());

    assert!(matches!(
        manager.get_order(&order.id, &customer("c-2")),
        Err(OrderError::Forbidden(_))
    ));
    assert!(matches!(
        manager.get_order(&order.id, &shipper("sh-9")),
        Err(OrderError::Forbidden(_))
    ));
    assert!(matches!(
        manager.get_order("missing", &admin()),
        Err(OrderError::NotFound(_))
    ));
}

#[test]
fn test_system_cancel_skips_orders_that_moved_on() {
    let (storage, manager) = setup();
    storage.upsert_product(&product("p-1", "s-1", 10_000, 5)).unwrap();
    let taken = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();
    offer(&storage, &taken.id, "sh-1");
    manager.accept_order_at(&taken.id, &shipper("sh-1"), NOON).unwrap();

    assert!(manager
        .cancel_unassigned_at(&taken.id, "timeout", NOON + 1)
        .unwrap()
        .is_none());

    let stuck = manager.create_order_at("c-1", input(&[("p-1", 1)]), NOON).unwrap();
    let mut events = manager.subscribe();
    let canceled = manager
        .cancel_unassigned_at(&stuck.id, "timeout", NOON + 1)
        .unwrap()
        .unwrap();
    assert_eq!(canceled.cancel_reason.as_deref(), Some("timeout"));
    assert_eq!(canceled.timestamps.canceled_at, Some(NOON + 1));
    assert!(matches!(
        events.try_recv().unwrap().kind,
        OrderEventKind::Canceled { by_system: true, .. }
    ));
}
