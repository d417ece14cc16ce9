//! Walks through wallet creation, settlement and rejection against a live
//! server backed by a temporary SQLite database.
//!
//! Run with: cargo run -p payment-app --example payment_flow

use std::net::SocketAddr;
use std::sync::Arc;

use payment_client::PaymentsClient;
use payment_hex::{PaymentService, inbound::HttpServer};
use payment_repo::build_repo;
use payment_types::{Money, OrderId, UserId};
use tempfile::tempdir;
use tokio::net::TcpListener;

fn show(minor: i64) -> String {
    Money::from_minor(minor)
        .map(|m| m.to_string())
        .unwrap_or_else(|_| minor.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("payments.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("Starting server on {addr}...");
    println!("   Database: {db_url}");

    let repo = Arc::new(build_repo(&db_url).await?);
    let router = HttpServer::new(PaymentService::new(repo.clone(), repo.clone())).router();
    tokio::spawn(async move { axum::serve(listener, router).await });

    let client = PaymentsClient::new(format!("http://{addr}"));
    println!("Server healthy: {}", client.health().await?);

    // ─────────────────────────────────────────────────────────────────────────
    // Successful settlement
    // ─────────────────────────────────────────────────────────────────────────

    let alice = UserId::new();
    let wallet = client.create_wallet(alice, 20000).await?;
    println!("Opened wallet {} with {}", wallet.id, show(wallet.balance));

    let order = OrderId::new();
    let payment = client.initiate_payment(order, alice, 9999).await?;
    println!("Initiated payment {} for {} ({:?})", payment.id, show(payment.amount), payment.status);

    let outcome = client.process_payment(payment.id).await?;
    println!("Processed: {:?}", outcome.status);
    println!("   Balance now {}", show(client.get_wallet(alice).await?.balance));

    match client.process_payment(payment.id).await {
        Err(e) => println!("Reprocessing rejected: {e}"),
        Ok(_) => anyhow::bail!("reprocessing a settled payment must fail"),
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Insufficient funds
    // ─────────────────────────────────────────────────────────────────────────

    let bob = UserId::new();
    client.create_wallet(bob, 5000).await?;
    let payment = client.initiate_payment(OrderId::new(), bob, 9999).await?;
    let outcome = client.process_payment(payment.id).await?;
    let payment = client.get_payment(payment.id).await?;
    println!(
        "Bob's payment: {:?} ({})",
        outcome.status,
        payment.failure_reason.unwrap_or_default()
    );

    // ─────────────────────────────────────────────────────────────────────────
    // Outbox
    // ─────────────────────────────────────────────────────────────────────────

    println!("\nEvents waiting in the outbox:");
    for event in repo.pending_events(100).await? {
        println!("   - {} {}", event.event_type, event.payload);
    }

    Ok(())
}
