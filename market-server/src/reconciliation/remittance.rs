//! Shipper cash remittance
//!
//! Shippers collect cash for COD orders and hand it over to the platform.
//! Debt is bucketed by the business day the order was delivered. Approving
//! a remittance request pays the oldest outstanding days first, inside the
//! same write transaction that marks the request processed.

use super::error::{ReconciliationError, ReconciliationResult};
use crate::storage::MarketStorage;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use chrono_tz::Tz;
use shared::models::{
    DebtDay, Order, OrderStatus, Remittance, RemittanceAction, RemittanceProcess,
    RemittanceRequest, RemittanceRequestCreate, RemittanceRequestStatus, RemittanceTransaction,
    ShipperDebt,
};
use shared::util::{business_date, new_id, now_millis};
use std::collections::BTreeMap;

#[derive(Clone)]
pub struct RemittanceService {
    storage: MarketStorage,
    timezone: Tz,
}

impl RemittanceService {
    pub fn new(storage: MarketStorage, timezone: Tz) -> Self {
        Self { storage, timezone }
    }

    /// Cash the shipper still owes, per delivery day
    pub fn shipper_debt(&self, shipper_id: &str) -> ReconciliationResult<ShipperDebt> {
        let orders = self.storage.orders_for_shipper(shipper_id)?;
        let remittances = self.storage.remittances_for_shipper(shipper_id)?;
        Ok(compute_debt(shipper_id, &orders, &remittances, self.timezone))
    }

    pub fn create_remittance_request(
        &self,
        shipper_id: &str,
        input: RemittanceRequestCreate,
    ) -> ReconciliationResult<RemittanceRequest> {
        self.create_remittance_request_at(shipper_id, input, now_millis())
    }

    pub fn create_remittance_request_at(
        &self,
        shipper_id: &str,
        input: RemittanceRequestCreate,
        now: i64,
    ) -> ReconciliationResult<RemittanceRequest> {
        if input.amount <= 0 {
            return Err(ReconciliationError::InvalidAmount(input.amount));
        }
        validate_optional_text(&input.note, "note", MAX_NOTE_LEN)
            .map_err(|e| ReconciliationError::Validation(e.message))?;

        let txn = self.storage.begin_write()?;
        if let Some(open) = self.storage.pending_remittance_request_txn(&txn, shipper_id)? {
            return Err(ReconciliationError::AlreadyPending(open));
        }

        let request = RemittanceRequest {
            id: new_id(),
            shipper_id: shipper_id.to_string(),
            amount: input.amount,
            note: input.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            status: RemittanceRequestStatus::Pending,
            admin_notes: None,
            allocated_amount: 0,
            created_at: now,
            processed_at: None,
            processed_by: None,
        };
        self.storage.put_remittance_request_txn(&txn, &request)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            request_id = %request.id,
            shipper_id = %shipper_id,
            amount = request.amount,
            "Remittance request created"
        );
        Ok(request)
    }

    pub fn process_remittance_request(
        &self,
        request_id: &str,
        input: RemittanceProcess,
        admin_id: &str,
    ) -> ReconciliationResult<RemittanceRequest> {
        self.process_remittance_request_at(request_id, input, admin_id, now_millis())
    }

    /// Approve or reject a pending request
    ///
    /// Allocation, per-day documents and the status flip commit together or
    /// not at all.
    pub fn process_remittance_request_at(
        &self,
        request_id: &str,
        input: RemittanceProcess,
        admin_id: &str,
        now: i64,
    ) -> ReconciliationResult<RemittanceRequest> {
        validate_optional_text(&input.admin_notes, "admin_notes", MAX_NOTE_LEN)
            .map_err(|e| ReconciliationError::Validation(e.message))?;

        let txn = self.storage.begin_write()?;
        let mut request = self
            .storage
            .get_remittance_request_txn(&txn, request_id)?
            .ok_or_else(|| ReconciliationError::RequestNotFound(request_id.to_string()))?;
        if request.status != RemittanceRequestStatus::Pending {
            return Err(ReconciliationError::AlreadyProcessed(
                request.id,
                request.status,
            ));
        }

        match input.action {
            RemittanceAction::Approve => {
                let orders = self.storage.orders_for_shipper_txn(&txn, &request.shipper_id)?;
                let remittances = self
                    .storage
                    .remittances_for_shipper_txn(&txn, &request.shipper_id)?;
                let debt = compute_debt(&request.shipper_id, &orders, &remittances, self.timezone);

                let mut remaining = request.amount;
                for day in debt.days.iter().filter(|d| d.outstanding > 0) {
                    if remaining == 0 {
                        break;
                    }
                    let applied = remaining.min(day.outstanding);
                    let mut remittance = self
                        .storage
                        .get_remittance_txn(&txn, &request.shipper_id, &day.date)?
                        .unwrap_or_else(|| Remittance {
                            shipper_id: request.shipper_id.clone(),
                            date: day.date.clone(),
                            amount: 0,
                            transactions: Vec::new(),
                            created_at: now,
                            updated_at: now,
                        });
                    remittance.amount += applied;
                    remittance.transactions.push(RemittanceTransaction {
                        request_id: request.id.clone(),
                        amount: applied,
                        created_at: now,
                    });
                    remittance.updated_at = now;
                    self.storage.put_remittance_txn(&txn, &remittance)?;
                    remaining -= applied;
                }

                request.allocated_amount = request.amount - remaining;
                request.status = RemittanceRequestStatus::Approved;
                if remaining > 0 {
                    tracing::warn!(
                        request_id = %request.id,
                        shipper_id = %request.shipper_id,
                        unallocated = remaining,
                        "Remittance exceeds outstanding debt"
                    );
                }
            }
            RemittanceAction::Reject => {
                request.status = RemittanceRequestStatus::Rejected;
            }
        }

        request.admin_notes = input
            .admin_notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        request.processed_at = Some(now);
        request.processed_by = Some(admin_id.to_string());
        self.storage.put_remittance_request_txn(&txn, &request)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            request_id = %request.id,
            shipper_id = %request.shipper_id,
            status = ?request.status,
            allocated = request.allocated_amount,
            admin_id = %admin_id,
            "Remittance request processed"
        );
        Ok(request)
    }

    pub fn list_remittance_requests(
        &self,
        status: Option<RemittanceRequestStatus>,
    ) -> ReconciliationResult<Vec<RemittanceRequest>> {
        Ok(self.storage.list_remittance_requests(status)?)
    }
}

/// Debt per business day from delivered COD orders and remitted amounts
pub fn compute_debt(
    shipper_id: &str,
    orders: &[Order],
    remittances: &[Remittance],
    tz: Tz,
) -> ShipperDebt {
    // date -> (cod, remitted); ISO dates sort chronologically
    let mut days: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for order in orders {
        if order.status != OrderStatus::Delivered
            || !order.is_cod()
            || order.shipper_id.as_deref() != Some(shipper_id)
        {
            continue;
        }
        let delivered_at = order.timestamps.delivered_at.unwrap_or(order.updated_at);
        let date = business_date(delivered_at, tz).format("%Y-%m-%d").to_string();
        days.entry(date).or_default().0 += order.total;
    }
    for remittance in remittances {
        days.entry(remittance.date.clone()).or_default().1 += remittance.amount;
    }

    let days: Vec<DebtDay> = days
        .into_iter()
        .map(|(date, (cod, remitted))| DebtDay {
            date,
            cod,
            remitted,
            outstanding: (cod - remitted).max(0),
        })
        .collect();

    let total_cod: i64 = days.iter().map(|d| d.cod).sum();
    let total_remitted: i64 = days.iter().map(|d| d.remitted).sum();
    ShipperDebt {
        shipper_id: shipper_id.to_string(),
        total_cod,
        total_remitted,
        outstanding: (total_cod - total_remitted).max(0),
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{GeoPoint, OrderTimestamps, PaymentMethod, ShippingFee};

    const TZ: Tz = chrono_tz::Asia::Ho_Chi_Minh;
    /// 2024-05-01 10:00 in Ho Chi Minh City
    const MAY_1: i64 = 1_714_532_400_000;
    const DAY: i64 = 86_400_000;

    fn delivered(id: &str, shipper: &str, total: i64, at: i64, method: PaymentMethod) -> Order {
        Order {
            id: id.into(),
            customer_id: "c-1".into(),
            customer_name: "An".into(),
            phone: "0900000000".into(),
            shipping_address: "1 Lê Lợi".into(),
            shipping_location: GeoPoint::new(10.77, 106.70),
            items: vec![],
            shipping_fee: ShippingFee::default(),
            surcharge: 0,
            voucher_discount: 0,
            total,
            payment_method: method,
            status: OrderStatus::Delivered,
            is_consultation: false,
            shipper_id: Some(shipper.into()),
            cancel_reason: None,
            note: None,
            timestamps: OrderTimestamps {
                created_at: at - 3_600_000,
                delivered_at: Some(at),
                ..Default::default()
            },
            updated_at: at,
        }
    }

    fn setup(orders: &[Order]) -> (MarketStorage, RemittanceService) {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for order in orders {
            storage.put_order_txn(&txn, order).unwrap();
        }
        txn.commit().unwrap();
        let service = RemittanceService::new(storage.clone(), TZ);
        (storage, service)
    }

    fn request(amount: i64) -> RemittanceRequestCreate {
        RemittanceRequestCreate { amount, note: None }
    }

    fn approve() -> RemittanceProcess {
        RemittanceProcess {
            action: RemittanceAction::Approve,
            admin_notes: Some("ok".into()),
        }
    }

    #[test]
    fn test_debt_buckets_by_delivery_day() {
        let (_storage, service) = setup(&[
            delivered("o-1", "sh-1", 100_000, MAY_1, PaymentMethod::Cod),
            delivered("o-2", "sh-1", 50_000, MAY_1 + 3_600_000, PaymentMethod::Cod),
            delivered("o-3", "sh-1", 70_000, MAY_1 + DAY, PaymentMethod::Cod),
            delivered("o-4", "sh-1", 90_000, MAY_1 + DAY, PaymentMethod::BankTransfer),
            delivered("o-5", "sh-2", 40_000, MAY_1, PaymentMethod::Cod),
        ]);

        let debt = service.shipper_debt("sh-1").unwrap();
        assert_eq!(debt.total_cod, 220_000);
        assert_eq!(debt.total_remitted, 0);
        assert_eq!(debt.outstanding, 220_000);
        assert_eq!(debt.days.len(), 2);
        assert_eq!(debt.days[0].date, "2024-05-01");
        assert_eq!(debt.days[0].cod, 150_000);
        assert_eq!(debt.days[1].date, "2024-05-02");
        assert_eq!(debt.days[1].cod, 70_000);
    }

    #[test]
    fn test_late_delivery_counts_on_local_day() {
        // 2024-05-02 01:00 local, still 2024-05-01 in UTC
        let (_storage, service) = setup(&[delivered(
            "o-1",
            "sh-1",
            10_000,
            1_714_586_400_000,
            PaymentMethod::Cod,
        )]);
        let debt = service.shipper_debt("sh-1").unwrap();
        assert_eq!(debt.days[0].date, "2024-05-02");
    }

    #[test]
    fn test_approval_allocates_oldest_first() {
        let (storage, service) = setup(&[
            delivered("o-1", "sh-1", 100_000, MAY_1, PaymentMethod::Cod),
            delivered("o-2", "sh-1", 70_000, MAY_1 + DAY, PaymentMethod::Cod),
        ]);

        let req = service.create_remittance_request_at("sh-1", request(130_000), MAY_1 + 2 * DAY).unwrap();
        let processed = service
            .process_remittance_request_at(&req.id, approve(), "admin-1", MAY_1 + 2 * DAY)
            .unwrap();
        assert_eq!(processed.status, RemittanceRequestStatus::Approved);
        assert_eq!(processed.allocated_amount, 130_000);
        assert_eq!(processed.processed_by.as_deref(), Some("admin-1"));

        let remittances = storage.remittances_for_shipper("sh-1").unwrap();
        assert_eq!(remittances.len(), 2);
        assert_eq!(remittances[0].date, "2024-05-01");
        assert_eq!(remittances[0].amount, 100_000);
        assert_eq!(remittances[1].amount, 30_000);
        assert_eq!(remittances[1].transactions[0].request_id, req.id);

        let debt = service.shipper_debt("sh-1").unwrap();
        assert_eq!(debt.outstanding, 40_000);
        assert_eq!(debt.days[0].outstanding, 0);
        assert_eq!(debt.days[1].outstanding, 40_000);

        // A second request tops up the existing day document
        let req = service.create_remittance_request_at("sh-1", request(40_000), MAY_1 + 3 * DAY).unwrap();
        service
            .process_remittance_request_at(&req.id, approve(), "admin-1", MAY_1 + 3 * DAY)
            .unwrap();
        let remittances = storage.remittances_for_shipper("sh-1").unwrap();
        assert_eq!(remittances[1].amount, 70_000);
        assert_eq!(remittances[1].transactions.len(), 2);
        assert_eq!(service.shipper_debt("sh-1").unwrap().outstanding, 0);
    }

    #[test]
    fn test_overpayment_is_partially_allocated() {
        let (_storage, service) =
            setup(&[delivered("o-1", "sh-1", 20_000, MAY_1, PaymentMethod::Cod)]);
        let req = service.create_remittance_request_at("sh-1", request(50_000), MAY_1).unwrap();
        let processed = service
            .process_remittance_request_at(&req.id, approve(), "admin-1", MAY_1)
            .unwrap();
        assert_eq!(processed.allocated_amount, 20_000);

        let debt = service.shipper_debt("sh-1").unwrap();
        assert_eq!(debt.outstanding, 0);
        assert_eq!(debt.total_remitted, 20_000);
    }

    #[test]
    fn test_rejection_only_flips_status() {
        let (storage, service) =
            setup(&[delivered("o-1", "sh-1", 20_000, MAY_1, PaymentMethod::Cod)]);
        let req = service.create_remittance_request_at("sh-1", request(20_000), MAY_1).unwrap();
        let processed = service
            .process_remittance_request_at(
                &req.id,
                RemittanceProcess {
                    action: RemittanceAction::Reject,
                    admin_notes: Some("cash not received".into()),
                },
                "admin-1",
                MAY_1,
            )
            .unwrap();
        assert_eq!(processed.status, RemittanceRequestStatus::Rejected);
        assert_eq!(processed.allocated_amount, 0);
        assert!(storage.remittances_for_shipper("sh-1").unwrap().is_empty());

        // Processed requests stay processed
        assert!(matches!(
            service.process_remittance_request_at(&req.id, approve(), "admin-1", MAY_1),
            Err(ReconciliationError::AlreadyProcessed(_, RemittanceRequestStatus::Rejected))
        ));
    }

    #[test]
    fn test_one_pending_request_per_shipper() {
        let (_storage, service) = setup(&[]);
        let first = service.create_remittance_request_at("sh-1", request(10_000), MAY_1).unwrap();
        assert!(matches!(
            service.create_remittance_request_at("sh-1", request(5_000), MAY_1),
            Err(ReconciliationError::AlreadyPending(id)) if id == first.id
        ));
        // Other shippers are unaffected
        service.create_remittance_request_at("sh-2", request(5_000), MAY_1).unwrap();

        service
            .process_remittance_request_at(&first.id, approve(), "admin-1", MAY_1)
            .unwrap();
        service.create_remittance_request_at("sh-1", request(5_000), MAY_1 + 1).unwrap();

        let pending = service
            .list_remittance_requests(Some(RemittanceRequestStatus::Pending))
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(service.list_remittance_requests(None).unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_requests() {
        let (_storage, service) = setup(&[]);
        assert!(matches!(
            service.create_remittance_request_at("sh-1", request(0), MAY_1),
            Err(ReconciliationError::InvalidAmount(0))
        ));
        assert!(matches!(
            service.process_remittance_request_at("missing", approve(), "admin-1", MAY_1),
            Err(ReconciliationError::RequestNotFound(_))
        ));
    }
}
