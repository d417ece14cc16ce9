//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use payment_types::{
    CreateWalletRequest, EventDispatcher, InitiatePaymentRequest, OrderId, PaymentError,
    PaymentId, PaymentRepository, PaymentResponse, ProcessPaymentResponse, UserId,
    WalletResponse,
};

use crate::PaymentService;

/// Application state shared across handlers.
pub struct AppState<R: PaymentRepository, D: EventDispatcher> {
    pub service: PaymentService<R, D>,
}

/// Error response carrying an HTTP status (orphan rule workaround for
/// `PaymentError`).
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let status = match &err {
            PaymentError::InvalidAmount(_) | PaymentError::Domain(_) => StatusCode::BAD_REQUEST,
            PaymentError::WalletNotFound(_) | PaymentError::PaymentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PaymentError::AlreadyProcessed(_) | PaymentError::WalletAlreadyExists(_) => {
                StatusCode::CONFLICT
            }
            PaymentError::Store { .. }
            | PaymentError::Dispatch { .. }
            | PaymentError::SettlementIncomplete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "code": self.status.as_u16()
        });

        (self.status, Json(body)).into_response()
    }
}

fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {} ID", what)))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Wallets
// ─────────────────────────────────────────────────────────────────────────────

/// Open a wallet.
#[tracing::instrument(skip(state), fields(user_id = %req.user_id))]
pub async fn create_wallet<R: PaymentRepository, D: EventDispatcher>(
    State(state): State<Arc<AppState<R, D>>>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .service
        .create_wallet(req.user_id, req.initial_balance)
        .await?;
    let wallet = state.service.get_wallet(req.user_id).await?;
    Ok((StatusCode::CREATED, Json(WalletResponse::from(wallet))))
}

/// Get the wallet owned by a user.
#[tracing::instrument(skip(state), fields(user_id = %user_id))]
pub async fn get_wallet<R: PaymentRepository, D: EventDispatcher>(
    State(state): State<Arc<AppState<R, D>>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = parse_id(&user_id, "user")?;

    let wallet = state.service.get_wallet(user_id).await?;
    Ok(Json(WalletResponse::from(wallet)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

/// Initiate a payment for an order.
#[tracing::instrument(skip(state), fields(order_id = %req.order_id, user_id = %req.user_id, amount = req.amount))]
pub async fn initiate_payment<R: PaymentRepository, D: EventDispatcher>(
    State(state): State<Arc<AppState<R, D>>>,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_id = state
        .service
        .initiate_payment(req.order_id, req.user_id, req.amount)
        .await?;
    let payment = state.service.get_payment(payment_id).await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

/// Get payment by ID.
#[tracing::instrument(skip(state), fields(payment_id = %id))]
pub async fn get_payment<R: PaymentRepository, D: EventDispatcher>(
    State(state): State<Arc<AppState<R, D>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_id: PaymentId = parse_id(&id, "payment")?;

    let payment = state.service.get_payment(payment_id).await?;
    Ok(Json(PaymentResponse::from(payment)))
}

/// Settle a pending payment.
#[tracing::instrument(skip(state), fields(payment_id = %id))]
pub async fn process_payment<R: PaymentRepository, D: EventDispatcher>(
    State(state): State<Arc<AppState<R, D>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_id: PaymentId = parse_id(&id, "payment")?;

    let status = state.service.process_payment(payment_id).await?;
    Ok(Json(ProcessPaymentResponse { payment_id, status }))
}

/// List payments recorded for an order.
#[tracing::instrument(skip(state), fields(order_id = %id))]
pub async fn list_order_payments<R: PaymentRepository, D: EventDispatcher>(
    State(state): State<Arc<AppState<R, D>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;

    let payments = state.service.list_payments_for_order(order_id).await?;
    let response: Vec<PaymentResponse> = payments.into_iter().map(Into::into).collect();
    Ok(Json(response))
}
