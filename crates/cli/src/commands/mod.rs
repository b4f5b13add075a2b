//! Command implementations for the Maison CLI.
//!
//! One module per storefront area. Commands report through `tracing` and
//! bubble failures up as [`CliError`] for a nonzero exit.

pub mod cart;
pub mod catalog;
pub mod engagement;
pub mod reviews;

use secrecy::SecretString;
use thiserror::Error;

use maison_core::UserId;
use maison_storefront::config::{ConfigError, StorefrontConfig};
use maison_storefront::error::StoreError;
use maison_storefront::gateway::GatewayError;
use maison_storefront::session::AuthSession;
use maison_storefront::state::StoreContext;

use crate::{CartAction, Commands, ProductsAction, ReviewsAction};

/// Errors that can occur while running a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Gateway client could not be built.
    #[error("Gateway client error: {0}")]
    Gateway(#[from] GatewayError),

    /// A storefront operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identity environment variables are malformed.
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

/// Build the context, establish identity from the environment, and run one
/// command.
pub async fn run(command: Commands) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let config = StorefrontConfig::from_env()?;
    let ctx = StoreContext::new(config)?;
    sign_in_from_env(&ctx).await?;

    match command {
        Commands::Products { action } => match action {
            ProductsAction::List {
                category,
                discounted,
            } => catalog::list(&ctx, category, discounted).await,
            ProductsAction::Show { product_id } => catalog::show(&ctx, product_id).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => cart::show(&ctx).await,
            CartAction::Add {
                product_id,
                quantity,
            } => cart::add(&ctx, product_id, quantity).await,
            CartAction::Set { item_id, quantity } => cart::set(&ctx, item_id, quantity).await,
            CartAction::Remove { item_id } => cart::remove(&ctx, item_id).await,
        },
        Commands::Reviews { action } => match action {
            ReviewsAction::Show { product_id } => reviews::show(&ctx, product_id).await,
            ReviewsAction::Post {
                product_id,
                rating,
                comment,
            } => reviews::post(&ctx, product_id, rating, &comment).await,
        },
        Commands::Like { product_id } => engagement::like(&ctx, product_id).await,
        Commands::View { product_id } => engagement::view(&ctx, product_id).await,
    }
}

/// Sign in from `MAISON_USER_ID`/`MAISON_ACCESS_TOKEN` when both are set.
///
/// Session issuance itself is the identity provider's business; the CLI
/// just consumes an already-issued identity and token.
async fn sign_in_from_env(ctx: &StoreContext) -> Result<(), CliError> {
    let (Ok(user_raw), Ok(token)) = (
        std::env::var("MAISON_USER_ID"),
        std::env::var("MAISON_ACCESS_TOKEN"),
    ) else {
        tracing::debug!("MAISON_USER_ID/MAISON_ACCESS_TOKEN not set; browsing anonymously");
        return Ok(());
    };

    let user_id: UserId = user_raw
        .parse()
        .map_err(|e: uuid::Error| CliError::InvalidEnvVar("MAISON_USER_ID", e.to_string()))?;

    ctx.session()
        .sign_in(AuthSession::new(user_id, SecretString::from(token)));

    // Establish the cart projection for the signed-in user
    ctx.session_changed().await?;
    Ok(())
}
