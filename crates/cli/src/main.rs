//! Maison CLI - terminal storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! maison products list --category dresses
//! maison products show 12
//!
//! # Cart (requires MAISON_USER_ID and MAISON_ACCESS_TOKEN)
//! maison cart show
//! maison cart add 12 --quantity 2
//! maison cart set 40 3
//! maison cart remove 40
//!
//! # Engagement and reviews
//! maison like 12
//! maison reviews show 12
//! maison reviews post 12 --rating 5 --comment "Beautiful fabric"
//! ```
//!
//! # Environment Variables
//!
//! - `MAISON_GATEWAY_URL` / `MAISON_GATEWAY_KEY` - gateway connection
//! - `MAISON_USER_ID` / `MAISON_ACCESS_TOKEN` - identity issued by the
//!   session provider; omit both to browse anonymously

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "maison")]
#[command(author, version, about = "Maison Rose storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Inspect and mutate the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show or post product reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewsAction,
    },
    /// Toggle a like on a product
    Like {
        /// Product ID
        product_id: i64,
    },
    /// Record a product view
    View {
        /// Product ID
        product_id: i64,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        /// Restrict to one category
        #[arg(short, long)]
        category: Option<String>,

        /// Only discounted products
        #[arg(short, long)]
        discounted: bool,
    },
    /// Show one product in detail
    Show {
        /// Product ID
        product_id: i64,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with totals
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: i64,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a cart line's quantity (0 removes the line)
    Set {
        /// Cart item ID (see `cart show`)
        item_id: i64,

        /// New quantity
        quantity: u32,
    },
    /// Remove a cart line
    Remove {
        /// Cart item ID (see `cart show`)
        item_id: i64,
    },
}

#[derive(Subcommand)]
enum ReviewsAction {
    /// Show a product's review thread
    Show {
        /// Product ID
        product_id: i64,
    },
    /// Post a review (created pending, visible after moderation)
    Post {
        /// Product ID
        product_id: i64,

        /// Star rating, 1-5
        #[arg(short, long)]
        rating: u8,

        /// Review text
        #[arg(short, long)]
        comment: String,
    },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "maison=info,maison_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
