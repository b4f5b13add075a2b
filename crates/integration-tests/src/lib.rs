//! Integration tests for Maison Rose.
//!
//! The storefront client is exercised end to end against an in-process mock
//! gateway: an axum server on an ephemeral port speaking the gateway's
//! protocol (named remote procedures under `/rest/v1/rpc/{function}`, table
//! reads under `/rest/v1/{table}`) over an in-memory database.
//!
//! The mock supports per-procedure failure injection ([`MockGateway::fail_rpc`])
//! and latency injection ([`MockGateway::delay_rpc`]) so tests can pin down
//! the busy-guard and fail-closed behavior of the real client.
//!
//! # Test Categories
//!
//! - `cart_sync` - cart projection consistency and busy guards
//! - `reviews` - review forest materialization and submission
//! - `engagement` - like toggling and view recording

#![cfg_attr(not(test), forbid(unsafe_code))]
// Allow: this crate is test support; expect() failures abort the test run,
// which is the behavior we want.
#![allow(clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use maison_core::{CartItemId, Price, ProductId, ReviewId, ReviewStatus, UserId};
use maison_storefront::config::{GatewayConfig, StorefrontConfig};
use maison_storefront::gateway::types::{CartLine, Product, ReviewRecord};
use maison_storefront::reviews::tree::OrphanPolicy;
use maison_storefront::session::AuthSession;
use maison_storefront::state::StoreContext;

/// Well-formed but meaningless key for the mock gateway.
const TEST_GATEWAY_KEY: &str = "zq8vj3kx9mwl5trn2hfy7bcp4dgs6aqe";

const TEST_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Mock Database
// =============================================================================

/// In-memory tables behind the mock gateway.
#[derive(Debug, Default)]
pub struct MockDb {
    pub products: Vec<Product>,
    pub carts: HashMap<Uuid, Vec<CartLine>>,
    pub reviews: Vec<ReviewRecord>,
    /// (user, product) pairs with an active like.
    pub likes: HashSet<(Uuid, i64)>,
    /// (user, product) pairs whose view has been counted.
    pub views: HashSet<(Uuid, i64)>,
    next_item_id: i64,
    next_review_id: i64,
}

impl MockDb {
    fn next_item_id(&mut self) -> i64 {
        self.next_item_id += 1;
        self.next_item_id
    }

    fn next_review_id(&mut self) -> i64 {
        self.next_review_id += 1;
        self.next_review_id
    }

    fn product(&self, id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id.as_i64() == id)
    }

    fn product_mut(&mut self, id: i64) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id.as_i64() == id)
    }

    /// Set a product's aggregate like count, simulating other shoppers.
    pub fn set_likes_count(&mut self, product_id: i64, likes: i64) {
        if let Some(product) = self.product_mut(product_id) {
            product.likes_count = likes;
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    db: Mutex<MockDb>,
    fail_rpcs: Mutex<HashSet<String>>,
    rpc_delays: Mutex<HashMap<String, Duration>>,
}

// =============================================================================
// Mock Gateway
// =============================================================================

/// An in-process gateway speaking the storefront client's wire protocol.
pub struct MockGateway {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockGateway {
    /// Bind an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/rest/v1/rpc/{function}", post(handle_rpc))
            .route("/rest/v1/{table}", get(handle_select).post(handle_insert))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock gateway");
        let addr = listener.local_addr().expect("mock gateway addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock gateway");
        });

        Self { addr, state }
    }

    /// Base URL of the running mock.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("mock gateway url")
    }

    /// Direct access to the in-memory database for seeding and asserts.
    ///
    /// Do not hold the guard across an await.
    pub fn db(&self) -> MutexGuard<'_, MockDb> {
        self.state.db.lock().expect("mock db lock")
    }

    /// Make the named remote procedure fail with HTTP 500 until cleared.
    pub fn fail_rpc(&self, function: &str) {
        self.state
            .fail_rpcs
            .lock()
            .expect("fail set lock")
            .insert(function.to_string());
    }

    /// Clear all injected failures.
    pub fn clear_failures(&self) {
        self.state.fail_rpcs.lock().expect("fail set lock").clear();
    }

    /// Delay the named remote procedure before processing.
    pub fn delay_rpc(&self, function: &str, delay: Duration) {
        self.state
            .rpc_delays
            .lock()
            .expect("delay map lock")
            .insert(function.to_string(), delay);
    }

    /// Seed a product with sensible defaults.
    pub fn seed_product(&self, id: i64, name: &str, price: i64, category: &str) -> ProductId {
        let product = Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: format!("{name} from the atelier"),
            price: Price::from_minor(price),
            image_url: format!("https://img.example/{id}.jpg"),
            category: category.to_string(),
            is_discounted: false,
            likes_count: 0,
            view_count: 0,
            stock_quantity: 10,
            material: None,
            size_guide: None,
            shipping_info: None,
        };
        self.db().products.push(product);
        ProductId::new(id)
    }

    /// Seed a review row. `ts_offset` orders rows within the batch.
    pub fn seed_review(
        &self,
        id: i64,
        product_id: i64,
        parent_id: Option<i64>,
        status: ReviewStatus,
        comment: &str,
        ts_offset: i64,
    ) {
        let record = ReviewRecord {
            id: ReviewId::new(id),
            product_id: ProductId::new(product_id),
            author_id: UserId::new(Uuid::nil()),
            rating: parent_id.is_none().then_some(4),
            comment: comment.to_string(),
            status,
            parent_id: parent_id.map(ReviewId::new),
            created_at: base_timestamp(ts_offset),
        };
        let mut db = self.db();
        db.reviews.push(record);
        db.next_review_id = db.next_review_id.max(id);
    }
}

fn base_timestamp(offset: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + offset, 0).expect("timestamp")
}

/// Extract the acting user from a `Bearer user-{uuid}` token.
fn bearer_user(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.strip_prefix("user-")?).ok()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn eq_value(raw: &str) -> &str {
    raw.strip_prefix("eq.").unwrap_or(raw)
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_rpc(
    State(state): State<Arc<MockState>>,
    Path(function): Path<String>,
    headers: HeaderMap,
    Json(params): Json<Value>,
) -> Response {
    let delay = state
        .rpc_delays
        .lock()
        .expect("delay map lock")
        .get(&function)
        .copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if state
        .fail_rpcs
        .lock()
        .expect("fail set lock")
        .contains(&function)
    {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }

    let Some(user) = bearer_user(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "missing bearer token");
    };

    let mut db = state.db.lock().expect("mock db lock");
    match function.as_str() {
        "get_cart_for_user" => {
            Json(db.carts.get(&user).cloned().unwrap_or_default()).into_response()
        }

        "add_to_cart" => {
            let Some(product_id) = params["product_id_to_add"].as_i64() else {
                return error_response(StatusCode::BAD_REQUEST, "missing product_id_to_add");
            };
            let quantity =
                u32::try_from(params["quantity_to_add"].as_i64().unwrap_or(1)).unwrap_or(1);

            let Some(product) = db.product(product_id).cloned() else {
                return error_response(StatusCode::BAD_REQUEST, "product not found");
            };

            let item_id = db.next_item_id();
            let cart = db.carts.entry(user).or_default();
            // The gateway collapses repeat adds into the existing line
            if let Some(line) = cart
                .iter_mut()
                .find(|line| line.product_id.as_i64() == product_id)
            {
                line.quantity += quantity;
            } else {
                cart.push(CartLine {
                    item_id: CartItemId::new(item_id),
                    product_id: product.id,
                    name: product.name,
                    image_url: product.image_url,
                    unit_price: product.price,
                    quantity,
                });
            }
            StatusCode::NO_CONTENT.into_response()
        }

        "update_cart_quantity" => {
            let Some(item_id) = params["item_id_to_update"].as_i64() else {
                return error_response(StatusCode::BAD_REQUEST, "missing item_id_to_update");
            };
            let new_quantity =
                u32::try_from(params["new_quantity"].as_i64().unwrap_or(0)).unwrap_or(0);

            let cart = db.carts.entry(user).or_default();
            let Some(index) = cart
                .iter()
                .position(|line| line.item_id.as_i64() == item_id)
            else {
                return error_response(StatusCode::BAD_REQUEST, "cart item not found");
            };
            if new_quantity == 0 {
                cart.remove(index);
            } else if let Some(line) = cart.get_mut(index) {
                line.quantity = new_quantity;
            }
            StatusCode::NO_CONTENT.into_response()
        }

        "remove_from_cart" => {
            let Some(item_id) = params["item_id_to_remove"].as_i64() else {
                return error_response(StatusCode::BAD_REQUEST, "missing item_id_to_remove");
            };
            let cart = db.carts.entry(user).or_default();
            cart.retain(|line| line.item_id.as_i64() != item_id);
            StatusCode::NO_CONTENT.into_response()
        }

        "toggle_like" => {
            let Some(product_id) = params["product_id_to_toggle"].as_i64() else {
                return error_response(StatusCode::BAD_REQUEST, "missing product_id_to_toggle");
            };
            let key = (user, product_id);
            let is_liked = if db.likes.remove(&key) {
                false
            } else {
                db.likes.insert(key);
                true
            };
            let Some(product) = db.product_mut(product_id) else {
                return error_response(StatusCode::BAD_REQUEST, "product not found");
            };
            product.likes_count += if is_liked { 1 } else { -1 };
            let new_like_count = product.likes_count;
            Json(json!([{ "is_liked": is_liked, "new_like_count": new_like_count }]))
                .into_response()
        }

        "get_like_status" => {
            let Some(product_id) = params["product_id_to_check"].as_i64() else {
                return error_response(StatusCode::BAD_REQUEST, "missing product_id_to_check");
            };
            let is_liked = db.likes.contains(&(user, product_id));
            Json(json!([{ "is_liked": is_liked }])).into_response()
        }

        "add_view_if_not_exists" => {
            let Some(product_id) = params["product_id_to_view"].as_i64() else {
                return error_response(StatusCode::BAD_REQUEST, "missing product_id_to_view");
            };
            // Deduplicate repeat views from the same user
            if db.views.insert((user, product_id))
                && let Some(product) = db.product_mut(product_id)
            {
                product.view_count += 1;
            }
            StatusCode::NO_CONTENT.into_response()
        }

        _ => error_response(StatusCode::NOT_FOUND, "unknown function"),
    }
}

async fn handle_select(
    State(state): State<Arc<MockState>>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let db = state.db.lock().expect("mock db lock");
    match table.as_str() {
        "products" => {
            let mut rows = db.products.clone();
            for (name, value) in &params {
                match name.as_str() {
                    "id" => {
                        let id = eq_value(value).parse::<i64>().unwrap_or(-1);
                        rows.retain(|p| p.id.as_i64() == id);
                    }
                    "category" => {
                        let category = eq_value(value).to_string();
                        rows.retain(|p| p.category == category);
                    }
                    "is_discounted" => {
                        let discounted = eq_value(value) == "true";
                        rows.retain(|p| p.is_discounted == discounted);
                    }
                    "order" if value == "name.asc" => rows.sort_by(|a, b| a.name.cmp(&b.name)),
                    _ => {}
                }
            }
            Json(rows).into_response()
        }

        "reviews" => {
            let mut rows = db.reviews.clone();
            for (name, value) in &params {
                match name.as_str() {
                    "product_id" => {
                        let id = eq_value(value).parse::<i64>().unwrap_or(-1);
                        rows.retain(|r| r.product_id.as_i64() == id);
                    }
                    "status" => {
                        let status = eq_value(value).parse::<ReviewStatus>().ok();
                        rows.retain(|r| Some(r.status) == status);
                    }
                    "order" if value == "created_at.asc" => {
                        rows.sort_by_key(|r| r.created_at);
                    }
                    _ => {}
                }
            }
            Json(rows).into_response()
        }

        _ => error_response(StatusCode::NOT_FOUND, "unknown table"),
    }
}

async fn handle_insert(
    State(state): State<Arc<MockState>>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(row): Json<Value>,
) -> Response {
    if bearer_user(&headers).is_none() {
        return error_response(StatusCode::UNAUTHORIZED, "missing bearer token");
    }

    let mut db = state.db.lock().expect("mock db lock");
    match table.as_str() {
        "reviews" => {
            let Some(product_id) = row["product_id"].as_i64() else {
                return error_response(StatusCode::BAD_REQUEST, "missing product_id");
            };
            let Some(author) = row["author_id"].as_str().and_then(|s| Uuid::parse_str(s).ok())
            else {
                return error_response(StatusCode::BAD_REQUEST, "missing author_id");
            };
            let status = row["status"]
                .as_str()
                .and_then(|s| s.parse::<ReviewStatus>().ok())
                .unwrap_or_default();

            let id = db.next_review_id();
            let offset = i64::try_from(db.reviews.len()).unwrap_or(0);
            db.reviews.push(ReviewRecord {
                id: ReviewId::new(id),
                product_id: ProductId::new(product_id),
                author_id: UserId::new(author),
                rating: row["rating"].as_u64().and_then(|r| u8::try_from(r).ok()),
                comment: row["comment"].as_str().unwrap_or_default().to_string(),
                status,
                parent_id: row["parent_id"].as_i64().map(ReviewId::new),
                created_at: base_timestamp(1_000 + offset),
            });
            StatusCode::CREATED.into_response()
        }

        _ => error_response(StatusCode::NOT_FOUND, "unknown table"),
    }
}

// =============================================================================
// TestContext
// =============================================================================

/// A real [`StoreContext`] wired to a fresh mock gateway.
pub struct TestContext {
    pub gateway: MockGateway,
    pub ctx: StoreContext,
}

impl TestContext {
    /// Spawn a mock gateway and a client with the default orphan policy.
    pub async fn new() -> Self {
        Self::with_policy(OrphanPolicy::Drop).await
    }

    /// Spawn a mock gateway and a client with the given orphan policy.
    pub async fn with_policy(policy: OrphanPolicy) -> Self {
        let gateway = MockGateway::spawn().await;
        let config = StorefrontConfig {
            gateway: GatewayConfig {
                url: gateway.url(),
                key: SecretString::from(TEST_GATEWAY_KEY.to_string()),
                timeout: Duration::from_secs(TEST_TIMEOUT_SECS),
            },
            orphan_policy: policy,
        };
        let ctx = StoreContext::new(config).expect("store context");
        Self { gateway, ctx }
    }

    /// Sign in a fresh user and establish their (empty) cart projection.
    pub async fn sign_in(&self) -> UserId {
        let raw = Uuid::new_v4();
        let user_id = UserId::new(raw);
        self.ctx.session().sign_in(AuthSession::new(
            user_id,
            SecretString::from(format!("user-{raw}")),
        ));
        self.ctx
            .session_changed()
            .await
            .expect("projection reset after sign-in");
        user_id
    }
}
