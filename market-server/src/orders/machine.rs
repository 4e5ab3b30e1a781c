//! Order transition table
//!
//! Every status change goes through [`check_transition`]; nothing else may
//! write `Order::status`. Ownership (own order, involved seller, assigned
//! shipper) is checked by the manager on top of the role check here.

use super::error::OrderError;
use crate::auth::CurrentUser;
use shared::models::{OrderStatus, Role};

/// Role as far as transitions are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Customer,
    Seller,
    Shipper,
    /// Admins and regional managers
    Staff,
    /// Background processes (reaper)
    System,
}

impl From<Role> for ActorRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Customer => ActorRole::Customer,
            Role::Seller => ActorRole::Seller,
            Role::Shipper => ActorRole::Shipper,
            Role::Admin | Role::Manager => ActorRole::Staff,
        }
    }
}

/// Who asks for a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn system() -> Self {
        Self::new("system", ActorRole::System)
    }
}

impl From<&CurrentUser> for Actor {
    fn from(user: &CurrentUser) -> Self {
        Self::new(user.id.clone(), user.role.into())
    }
}

use ActorRole::{Customer, Seller, Shipper, Staff, System};
use OrderStatus::*;

/// `(from, to, roles allowed)`
pub const TRANSITIONS: &[(OrderStatus, OrderStatus, &[ActorRole])] = &[
    (PendingConsultation, InConsultation, &[Seller, Staff]),
    (InConsultation, PendingCustomerConfirmation, &[Seller, Staff]),
    (PendingCustomerConfirmation, PendingConfirmation, &[Customer, Staff]),
    (PendingConsultation, Canceled, &[Customer, Seller, Staff]),
    (InConsultation, Canceled, &[Customer, Seller, Staff]),
    (PendingCustomerConfirmation, Canceled, &[Customer, Seller, Staff]),
    // Shippers only through accept_order, which sets the shipper
    (PendingConfirmation, Processing, &[Shipper, Staff]),
    (PendingConfirmation, Canceled, &[Customer, Staff, System]),
    (Processing, Delivering, &[Shipper, Staff]),
    (Delivering, Delivered, &[Shipper, Staff]),
    (Delivered, Canceled, &[Staff]),
];

/// Roles allowed to move an order from `from` to `to`; `None` when the
/// edge does not exist at all
pub fn allowed_roles(from: OrderStatus, to: OrderStatus) -> Option<&'static [ActorRole]> {
    TRANSITIONS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, roles)| *roles)
}

pub fn is_allowed(from: OrderStatus, to: OrderStatus, role: ActorRole) -> bool {
    allowed_roles(from, to).is_some_and(|roles| roles.contains(&role))
}

/// Role-level legality of a transition
pub fn check_transition(
    from: OrderStatus,
    to: OrderStatus,
    role: ActorRole,
) -> Result<(), OrderError> {
    match allowed_roles(from, to) {
        None => Err(OrderError::InvalidTransition { from, to }),
        Some(roles) if roles.contains(&role) => Ok(()),
        Some(_) => Err(OrderError::TransitionForbidden { from, to }),
    }
}
