//! Payment CLI
//!
//! Command-line interface for the payment settlement API. Amounts are given
//! as decimals (`99.99`) and sent as minor units.

use anyhow::Result;
use clap::{Parser, Subcommand};

use payment_client::PaymentsClient;
use payment_types::{Money, OrderId, PaymentId, PaymentStatus, UserId};

#[derive(Parser)]
#[command(name = "payment")]
#[command(author, version, about = "Payment settlement API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the payment API
    #[arg(long, env = "PAYMENT_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },
    /// Payment operations
    Payment {
        #[command(subcommand)]
        action: PaymentCommands,
    },
    /// Start a local listener for outbox events
    Listen {
        /// Port to listen on
        #[arg(long, default_value = "4000")]
        port: u16,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Open a wallet for a user
    Create {
        /// Owning user ID (UUID); generated when omitted
        #[arg(long, value_parser = parse_id::<UserId>)]
        user: Option<UserId>,
        /// Opening balance, e.g. 200.00
        #[arg(long, default_value = "0", value_parser = parse_amount)]
        balance: Money,
    },
    /// Get a user's wallet
    Get {
        /// User ID (UUID)
        #[arg(value_parser = parse_id::<UserId>)]
        user: UserId,
    },
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Initiate a payment for an order
    Initiate {
        /// Order ID (UUID); generated when omitted
        #[arg(long, value_parser = parse_id::<OrderId>)]
        order: Option<OrderId>,
        /// Paying user ID (UUID)
        #[arg(long, value_parser = parse_id::<UserId>)]
        user: UserId,
        /// Amount, e.g. 99.99
        #[arg(long, value_parser = parse_amount)]
        amount: Money,
    },
    /// Settle a pending payment
    Process {
        /// Payment ID (UUID)
        #[arg(value_parser = parse_id::<PaymentId>)]
        id: PaymentId,
    },
    /// Get payment details
    Get {
        /// Payment ID (UUID)
        #[arg(value_parser = parse_id::<PaymentId>)]
        id: PaymentId,
    },
    /// List payments for an order
    List {
        /// Order ID (UUID)
        #[arg(long, value_parser = parse_id::<OrderId>)]
        order: OrderId,
    },
}

fn parse_id<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("Invalid ID: {}", s))
}

fn parse_amount(s: &str) -> Result<Money, String> {
    s.parse::<Money>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let client = PaymentsClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Wallet { action } => match action {
            WalletCommands::Create { user, balance } => {
                let user_id = user.unwrap_or_default();
                let wallet = client
                    .create_wallet(user_id, balance.minor_units())
                    .await?;
                println!("{}", serde_json::to_string_pretty(&wallet)?);
            }
            WalletCommands::Get { user } => {
                let wallet = client.get_wallet(user).await?;
                println!("{}", serde_json::to_string_pretty(&wallet)?);
            }
        },

        Commands::Payment { action } => match action {
            PaymentCommands::Initiate {
                order,
                user,
                amount,
            } => {
                let order_id = order.unwrap_or_default();
                let payment = client
                    .initiate_payment(order_id, user, amount.minor_units())
                    .await?;
                println!("{}", serde_json::to_string_pretty(&payment)?);
            }
            PaymentCommands::Process { id } => {
                let outcome = client.process_payment(id).await?;
                match outcome.status {
                    PaymentStatus::Completed => println!("✓ Payment {} completed", id),
                    PaymentStatus::Failed => {
                        let payment = client.get_payment(id).await?;
                        println!(
                            "✗ Payment {} failed: {}",
                            id,
                            payment.failure_reason.unwrap_or_default()
                        );
                    }
                    PaymentStatus::Pending => println!("Payment {} is still pending", id),
                }
            }
            PaymentCommands::Get { id } => {
                let payment = client.get_payment(id).await?;
                println!("{}", serde_json::to_string_pretty(&payment)?);
            }
            PaymentCommands::List { order } => {
                let payments = client.list_order_payments(order).await?;
                println!("{}", serde_json::to_string_pretty(&payments)?);
            }
        },

        Commands::Listen { port } => {
            let app = axum::Router::new().route("/webhook", axum::routing::post(handle_event));
            let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
            println!("Listening for payment events on http://{}/webhook", addr);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn handle_event(
    headers: axum::http::HeaderMap,
    body: String,
) -> impl axum::response::IntoResponse {
    let event_type = headers
        .get("X-Event-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    println!("── {} ──", event_type);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or(body)
        ),
        Err(_) => println!("{}", body),
    }
    axum::http::StatusCode::OK
}
