//! Stock ledger rules.
//!
//! Every change to a medication's stock count is expressed as a signed delta
//! paired with a movement row. Persistence locks the medication row, asks
//! [`apply_delta`] for the new count and writes both in one transaction.

use thiserror::Error;
use uuid::Uuid;

use crate::models::medication::{
    MovementType, NewStockMovement, StockChangeRequest, UpdateStockRequest,
};

/// Reason recorded when a stock change arrives without one.
pub const DEFAULT_IN_REASON: &str = "Stock received";
pub const DEFAULT_OUT_REASON: &str = "Stock dispensed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockRuleError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("quantity_change must not be zero")]
    ZeroAdjustment,
    #[error("Insufficient stock: {available} available, {requested} requested")]
    Insufficient { available: i32, requested: i32 },
    #[error("Stock change of {delta} would exceed the maximum stock count")]
    Overflow { delta: i32 },
}

/// Stock count after applying `delta`.
///
/// Fails with `Insufficient` when the count would go negative and with
/// `Overflow` when it would not fit the column.
pub fn apply_delta(current: i32, delta: i32) -> Result<i32, StockRuleError> {
    let next = current
        .checked_add(delta)
        .ok_or(StockRuleError::Overflow { delta })?;
    if next < 0 {
        return Err(StockRuleError::Insufficient {
            available: current,
            requested: delta.saturating_neg(),
        });
    }
    Ok(next)
}

fn movement(
    medication_id: Uuid,
    movement_type: MovementType,
    quantity_change: i32,
    reason: String,
    unit_cost: Option<f64>,
    reference_id: Option<Uuid>,
    performed_by: Option<Uuid>,
) -> NewStockMovement {
    NewStockMovement {
        medication_id,
        movement_type,
        quantity_change,
        unit_cost,
        reason: Some(reason),
        reference_id,
        performed_by,
    }
}

/// Ledger entry for a stock receipt.
pub fn stock_in(
    request: &StockChangeRequest,
    actor: Option<Uuid>,
) -> Result<NewStockMovement, StockRuleError> {
    if request.quantity <= 0 {
        return Err(StockRuleError::NonPositiveQuantity);
    }
    Ok(movement(
        request.medication_id,
        MovementType::In,
        request.quantity,
        reason_or(request.reason.as_deref(), DEFAULT_IN_REASON),
        request.unit_cost,
        request.reference_id,
        actor.or(request.user_id),
    ))
}

/// Ledger entry for stock leaving the shelf.
pub fn stock_out(
    request: &StockChangeRequest,
    actor: Option<Uuid>,
) -> Result<NewStockMovement, StockRuleError> {
    if request.quantity <= 0 {
        return Err(StockRuleError::NonPositiveQuantity);
    }
    Ok(movement(
        request.medication_id,
        MovementType::Out,
        -request.quantity,
        reason_or(request.reason.as_deref(), DEFAULT_OUT_REASON),
        request.unit_cost,
        request.reference_id,
        actor.or(request.user_id),
    ))
}

/// Ledger entry for a manual correction in either direction.
pub fn adjustment(
    request: &UpdateStockRequest,
    actor: Option<Uuid>,
) -> Result<NewStockMovement, StockRuleError> {
    if request.quantity_change == 0 {
        return Err(StockRuleError::ZeroAdjustment);
    }
    Ok(movement(
        request.medication_id,
        MovementType::Adjustment,
        request.quantity_change,
        request.reason.trim().to_string(),
        None,
        None,
        actor.or(request.user_id),
    ))
}

fn reason_or(reason: Option<&str>, fallback: &str) -> String {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => fallback.to_string(),
    }
}
