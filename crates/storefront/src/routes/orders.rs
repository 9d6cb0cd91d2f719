//! Order workflow handlers.

use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;

use plateshop_core::OrderId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{OptionalAuth, RequireOperator, SessionCaller, caller_or_new_guest};
use crate::models::{
    Caller, CreateOrderRequest, Order, OrderCreated, PayOrderRequest, PaymentDetails,
    UpdateStatusRequest,
};
use crate::services::orders::OrderDraft;
use crate::state::AppState;

/// `POST /api/orders`
///
/// Anonymous callers get a guest owner id stored in their session.
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreated>)> {
    // Validate before touching the session so bad carts leave no guest id behind.
    let draft = OrderDraft::parse(&req)?;
    let caller = caller_or_new_guest(&session, user.as_ref()).await?;

    let order = state.orders().create_order(caller, draft).await?;
    let payment_url = state.payment_url(order.id);

    Ok((StatusCode::CREATED, Json(OrderCreated { order, payment_url })))
}

/// `GET /api/orders`
pub async fn list_mine(
    State(state): State<AppState>,
    SessionCaller(caller): SessionCaller,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        state.orders().list_orders_for_owner(caller.owner_id).await?,
    ))
}

/// `GET /api/orders/admin`
pub async fn list_all(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        state.orders().list_all_orders(Caller::user(&user)).await?,
    ))
}

/// `GET /api/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    SessionCaller(caller): SessionCaller,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get_order(caller, id).await?))
}

/// `PUT /api/orders/{id}/pay`
pub async fn pay(
    State(state): State<AppState>,
    SessionCaller(caller): SessionCaller,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<PayOrderRequest>,
) -> Result<Json<Order>> {
    let payment = PaymentDetails {
        method: req.payment_method,
        reference: req.payment_reference,
    };
    Ok(Json(state.orders().mark_paid(caller, id, payment).await?))
}

/// `PUT /api/orders/{id}/status`
pub async fn set_status(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(
        state
            .orders()
            .set_status(Caller::user(&user), id, req.status)
            .await?,
    ))
}
