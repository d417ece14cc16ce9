//! # Payment Client SDK
//!
//! A typed Rust client for the payment settlement API.

use payment_types::{
    CreateWalletRequest, InitiatePaymentRequest, OrderId, PaymentId, PaymentResponse,
    ProcessPaymentResponse, UserId, WalletResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status returned by the API, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Payment API client.
pub struct PaymentsClient {
    base_url: String,
    http: Client,
}

impl PaymentsClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Wallets
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a wallet with `initial_balance` minor units.
    pub async fn create_wallet(
        &self,
        user_id: UserId,
        initial_balance: i64,
    ) -> Result<WalletResponse, ClientError> {
        let req = CreateWalletRequest {
            user_id,
            initial_balance,
        };
        self.post("/api/wallets", &req).await
    }

    /// Gets the wallet owned by a user.
    pub async fn get_wallet(&self, user_id: UserId) -> Result<WalletResponse, ClientError> {
        self.get(&format!("/api/wallets/{}", user_id)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    /// Initiates a payment of `amount` minor units.
    pub async fn initiate_payment(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: i64,
    ) -> Result<PaymentResponse, ClientError> {
        let req = InitiatePaymentRequest {
            order_id,
            user_id,
            amount,
        };
        self.post("/api/payments", &req).await
    }

    /// Settles a pending payment.
    pub async fn process_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<ProcessPaymentResponse, ClientError> {
        self.post(
            &format!("/api/payments/{}/process", payment_id),
            &serde_json::Value::Null,
        )
        .await
    }

    /// Gets a payment by ID.
    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<PaymentResponse, ClientError> {
        self.get(&format!("/api/payments/{}", payment_id)).await
    }

    /// Lists payments for an order, newest first.
    pub async fn list_order_payments(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<PaymentResponse>, ClientError> {
        self.get(&format!("/api/orders/{}/payments", order_id)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use payment_hex::{PaymentService, inbound::HttpServer};
    use payment_repo::InMemoryRepo;
    use payment_types::PaymentStatus;

    use super::*;

    async fn spawn_server() -> PaymentsClient {
        let repo = Arc::new(InMemoryRepo::new());
        let router = HttpServer::new(PaymentService::new(repo.clone(), repo)).router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        PaymentsClient::new(format!("http://{}", addr))
    }

    #[test]
    fn test_client_creation() {
        let client = PaymentsClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = PaymentsClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_full_flow_against_live_server() {
        let client = spawn_server().await;
        let (user, order) = (UserId::new(), OrderId::new());

        assert!(client.health().await.unwrap());

        let wallet = client.create_wallet(user, 20000).await.unwrap();
        assert_eq!(wallet.balance, 20000);

        let payment = client.initiate_payment(order, user, 9999).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        let outcome = client.process_payment(payment.id).await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::Completed);

        let err = client.process_payment(payment.id).await.unwrap_err();
        assert_eq!(err.status(), Some(409));

        assert_eq!(client.get_wallet(user).await.unwrap().balance, 10001);
        assert_eq!(
            client.get_payment(payment.id).await.unwrap().status,
            PaymentStatus::Completed
        );
        assert_eq!(client.list_order_payments(order).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_api_errors_carry_status_and_message() {
        let client = spawn_server().await;

        let err = client.get_wallet(UserId::new()).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("Wallet not found"));
    }
}
