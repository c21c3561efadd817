//! Order submission, status transitions and cancellation.
//!
//! Submission is one transaction: every cart line is re-checked against
//! current stock, stock is decremented, the order and its details are
//! written with frozen unit prices, and the cart is cleared. Status changes
//! are linear guards from `pending`; rejection and cancellation put the
//! reserved stock back.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::AuthAccount;
use crate::db::models::{Order, OrderLine, OrderStatus, Role};
use crate::error::ApiError;

#[derive(Serialize, Debug)]
pub struct OrderView {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(sqlx::FromRow)]
struct SubmitLine {
    drug_id: Uuid,
    pharmacy_id: Uuid,
    drug_name: String,
    quantity: i32,
    price_cents: i64,
    quantity_available: i32,
}

/// Approve, reject and cancel are only legal from `pending`.
fn transition_allowed(from: OrderStatus) -> bool {
    matches!(from, OrderStatus::Pending)
}

fn status_of(order: &Order) -> Result<OrderStatus, ApiError> {
    OrderStatus::parse(&order.status).ok_or_else(|| {
        ApiError::Internal(format!(
            "Order {} has unknown status {}",
            order.id, order.status
        ))
    })
}

pub async fn submit_order(pool: &PgPool, patient_id: Uuid) -> Result<OrderView, ApiError> {
    let mut tx = pool.begin().await?;

    // Cart items whose listing was delisted are cascade-deleted with the
    // listing, so the join is total.
    let cart: Vec<SubmitLine> = sqlx::query_as(
        "SELECT ci.drug_id, ci.pharmacy_id, d.name AS drug_name, ci.quantity, \
                pp.price_cents, pp.quantity_available \
         FROM cart_items ci \
         JOIN pharmacy_products pp \
           ON pp.pharmacy_id = ci.pharmacy_id AND pp.drug_id = ci.drug_id \
         JOIN drugs d ON d.id = ci.drug_id \
         WHERE ci.patient_id = $1 \
         ORDER BY ci.added_at",
    )
    .bind(patient_id)
    .fetch_all(&mut *tx)
    .await?;

    if cart.is_empty() {
        return Err(ApiError::Validation("Cart is empty".to_string()));
    }
    let pharmacy_id = cart[0].pharmacy_id;

    for line in &cart {
        if line.quantity > line.quantity_available {
            return Err(ApiError::Conflict(format!(
                "Insufficient stock for {}: {} requested, {} available",
                line.drug_name, line.quantity, line.quantity_available
            )));
        }
    }

    for line in &cart {
        let updated = sqlx::query(
            "UPDATE pharmacy_products \
             SET quantity_available = quantity_available - $3 \
             WHERE pharmacy_id = $1 AND drug_id = $2 AND quantity_available >= $3",
        )
        .bind(pharmacy_id)
        .bind(line.drug_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::Conflict(format!(
                "Insufficient stock for {}",
                line.drug_name
            )));
        }
    }

    let total_cents: i64 = cart
        .iter()
        .map(|line| i64::from(line.quantity) * line.price_cents)
        .sum();

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, patient_id, pharmacy_id, status, total_cents) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(pharmacy_id)
    .bind(OrderStatus::Pending.as_str())
    .bind(total_cents)
    .fetch_one(&mut *tx)
    .await?;

    for line in &cart {
        sqlx::query(
            "INSERT INTO order_details (order_id, drug_id, quantity, unit_price_cents) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id)
        .bind(line.drug_id)
        .bind(line.quantity)
        .bind(line.price_cents)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE patient_id = $1")
        .bind(patient_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!(
        "Order {} submitted by patient {} to pharmacy {} ({} cents)",
        order.id,
        patient_id,
        pharmacy_id,
        total_cents
    );

    let lines = cart
        .into_iter()
        .map(|line| OrderLine {
            drug_id: line.drug_id,
            drug_name: line.drug_name,
            quantity: line.quantity,
            unit_price_cents: line.price_cents,
        })
        .collect();

    Ok(OrderView { order, lines })
}

/// Patients see their own orders, pharmacies the ones addressed to them,
/// admin sees all.
pub async fn list_orders(pool: &PgPool, caller: &AuthAccount) -> Result<Vec<Order>, ApiError> {
    let orders = match caller.role {
        Role::Patient => {
            sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE patient_id = $1 ORDER BY created_at DESC",
            )
            .bind(caller.account_id)
            .fetch_all(pool)
            .await?
        }
        Role::Pharmacy => {
            sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE pharmacy_id = $1 ORDER BY created_at DESC",
            )
            .bind(caller.account_id)
            .fetch_all(pool)
            .await?
        }
        Role::Admin => {
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(orders)
}

pub async fn get_order(
    pool: &PgPool,
    caller: &AuthAccount,
    order_id: Uuid,
) -> Result<OrderView, ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    let owned = match caller.role {
        Role::Patient => order.patient_id == caller.account_id,
        Role::Pharmacy => order.pharmacy_id == caller.account_id,
        Role::Admin => true,
    };
    if !owned {
        return Err(ApiError::Forbidden);
    }

    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT od.drug_id, d.name AS drug_name, od.quantity, od.unit_price_cents \
         FROM order_details od \
         JOIN drugs d ON d.id = od.drug_id \
         WHERE od.order_id = $1",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(OrderView { order, lines })
}

/// Pharmacy decision on a pending order: approve keeps the stock reserved,
/// reject puts it back.
pub async fn decide(
    pool: &PgPool,
    pharmacy_id: Uuid,
    order_id: Uuid,
    approve: bool,
) -> Result<Order, ApiError> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if order.pharmacy_id != pharmacy_id {
        return Err(ApiError::Forbidden);
    }
    if !transition_allowed(status_of(&order)?) {
        return Err(ApiError::Conflict(format!("Order is already {}", order.status)));
    }

    let new_status = if approve {
        OrderStatus::Approved
    } else {
        restore_stock(&mut tx, order.pharmacy_id, order_id).await?;
        OrderStatus::Rejected
    };

    let updated = finish_transition(&mut tx, order_id, new_status).await?;
    tx.commit().await?;

    log::info!("Order {} {}", order_id, updated.status);
    Ok(updated)
}

/// Patient cancellation of a pending order; restores the reserved stock.
pub async fn cancel(pool: &PgPool, patient_id: Uuid, order_id: Uuid) -> Result<Order, ApiError> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if order.patient_id != patient_id {
        return Err(ApiError::Forbidden);
    }
    if !transition_allowed(status_of(&order)?) {
        return Err(ApiError::Conflict(format!("Order is already {}", order.status)));
    }

    restore_stock(&mut tx, order.pharmacy_id, order_id).await?;
    let updated = finish_transition(&mut tx, order_id, OrderStatus::Cancelled).await?;
    tx.commit().await?;

    log::info!("Order {} cancelled by patient {}", order_id, patient_id);
    Ok(updated)
}

/// Marks the order tied to a checkout session as paid. Returns `None` when
/// no approved order matches the session (unknown or already settled).
pub async fn mark_paid(pool: &PgPool, session_id: &str) -> Result<Option<Order>, ApiError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = now() \
         WHERE stripe_session_id = $1 AND status = $3 \
         RETURNING *",
    )
    .bind(session_id)
    .bind(OrderStatus::Paid.as_str())
    .bind(OrderStatus::Approved.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(order)
}

async fn finish_transition(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<Order, ApiError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .bind(status.as_str())
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

async fn restore_stock(
    conn: &mut PgConnection,
    pharmacy_id: Uuid,
    order_id: Uuid,
) -> Result<(), ApiError> {
    // A listing delisted since submission has no row to restore into; the
    // update is a no-op for that line.
    sqlx::query(
        "UPDATE pharmacy_products pp \
         SET quantity_available = pp.quantity_available + od.quantity \
         FROM order_details od \
         WHERE od.order_id = $1 \
           AND pp.pharmacy_id = $2 \
           AND pp.drug_id = od.drug_id",
    )
    .bind(order_id)
    .bind(pharmacy_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_orders_accept_transitions() {
        assert!(transition_allowed(OrderStatus::Pending));
        for terminal in [
            OrderStatus::Approved,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
            OrderStatus::Paid,
        ] {
            assert!(!transition_allowed(terminal));
        }
    }

    #[test]
    fn unknown_status_string_is_an_internal_error() {
        let order = Order {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            pharmacy_id: Uuid::new_v4(),
            status: "shipped".to_string(),
            total_cents: 100,
            stripe_session_id: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(matches!(
            status_of(&order),
            Err(ApiError::Internal(_))
        ));
    }
}
