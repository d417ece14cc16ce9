//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use payment_types::domain::{OrderId, PaymentId, PaymentStatus, UserId, WalletId};
use payment_types::dto::{
    CreateWalletRequest, InitiatePaymentRequest, PaymentResponse, ProcessPaymentResponse,
    WalletResponse,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Open a wallet for a user
#[utoipa::path(
    post,
    path = "/api/wallets",
    tag = "wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = WalletResponse),
        (status = 400, description = "Negative opening balance"),
        (status = 409, description = "User already has a wallet")
    )
)]
async fn create_wallet() {}

/// Get a user's wallet
#[utoipa::path(
    get,
    path = "/api/wallets/{user_id}",
    tag = "wallets",
    params(
        ("user_id" = UserId, Path, description = "Owning user ID (UUID)")
    ),
    responses(
        (status = 200, description = "Wallet details", body = WalletResponse),
        (status = 404, description = "Wallet not found")
    )
)]
async fn get_wallet() {}

/// Initiate a payment
///
/// Records a PENDING payment. Funds are checked at settlement, not here.
#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "payments",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded as PENDING", body = PaymentResponse),
        (status = 400, description = "Amount is not positive"),
        (status = 404, description = "Payer has no wallet")
    )
)]
async fn initiate_payment() {}

/// Get payment by ID
#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    tag = "payments",
    params(
        ("id" = PaymentId, Path, description = "Payment ID (UUID)")
    ),
    responses(
        (status = 200, description = "Payment details", body = PaymentResponse),
        (status = 404, description = "Payment not found")
    )
)]
async fn get_payment() {}

/// Settle a pending payment
///
/// A `FAILED` status in a 200 response means the payer lacked funds.
#[utoipa::path(
    post,
    path = "/api/payments/{id}/process",
    tag = "payments",
    params(
        ("id" = PaymentId, Path, description = "Payment ID (UUID)")
    ),
    responses(
        (status = 200, description = "Payment settled", body = ProcessPaymentResponse),
        (status = 404, description = "Payment or wallet not found"),
        (status = 409, description = "Payment already processed")
    )
)]
async fn process_payment() {}

/// List payments for an order
#[utoipa::path(
    get,
    path = "/api/orders/{id}/payments",
    tag = "payments",
    params(
        ("id" = OrderId, Path, description = "Order ID (UUID)")
    ),
    responses(
        (status = 200, description = "Payments for the order, newest first", body = Vec<PaymentResponse>)
    )
)]
async fn list_order_payments() {}

/// OpenAPI documentation for the Payment API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payment Settlement Service API",
        version = "1.0.0",
        description = "Wallets, payment initiation and at-most-once settlement.\n\nAmounts are integers in minor units (cents): `9999` is `99.99`.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_wallet,
        get_wallet,
        initiate_payment,
        get_payment,
        process_payment,
        list_order_payments,
    ),
    components(
        schemas(
            CreateWalletRequest,
            WalletResponse,
            InitiatePaymentRequest,
            PaymentResponse,
            ProcessPaymentResponse,
            PaymentStatus,
            PaymentId,
            WalletId,
            UserId,
            OrderId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "wallets", description = "Wallet management"),
        (name = "payments", description = "Payment initiation and settlement"),
    )
)]
pub struct ApiDoc;
