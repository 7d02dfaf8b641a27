//! Stand-in order acceptance endpoint
//!
//! Implements the contract the pipeline submits against: 201 on first
//! acceptance of a key, 200 on idempotent replay, 400 for malformed
//! requests, 422 for a bad amount. Accepted orders persist to a JSON
//! store file. The integration tests mount this same router in-process.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;

const REQUIRED_FIELDS: [&str; 6] = [
    "OrderID",
    "BusinessDate",
    "Amount",
    "Currency",
    "Email",
    "CustomerID",
];

pub struct AcceptanceState {
    store_path: Option<PathBuf>,
    orders: Mutex<BTreeMap<String, Value>>,
}

impl AcceptanceState {
    /// In-memory state, used by tests
    pub fn ephemeral() -> Arc<Self> {
        Arc::new(Self {
            store_path: None,
            orders: Mutex::new(BTreeMap::new()),
        })
    }

    /// File-backed state, loading any previously accepted orders
    pub fn with_store(path: PathBuf) -> Result<Arc<Self>> {
        let orders = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Arc::new(Self {
            store_path: Some(path),
            orders: Mutex::new(orders),
        }))
    }

    fn persist(&self, orders: &BTreeMap<String, Value>) {
        if let Some(path) = &self.store_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(orders) {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::error!("failed to persist order store: {}", e);
                }
            }
        }
    }
}

pub fn router(state: Arc<AcceptanceState>) -> Router {
    Router::new()
        .route("/api/orders", post(accept_order))
        .route("/api/orders/{order_id}", get(fetch_order))
        .with_state(state)
}

/// Bind and serve the acceptance endpoint until the process is stopped
pub async fn run(config: &PipelineConfig, store_path: PathBuf) -> Result<()> {
    let state = AcceptanceState::with_store(store_path)?;
    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("acceptance endpoint listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state))
        .await
        .map_err(crate::error::Error::Io)
}

async fn accept_order(
    State(state): State<Arc<AcceptanceState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Ok(Json(order)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid JSON");
    };

    if !REQUIRED_FIELDS.iter().all(|f| order.get(f).is_some()) {
        return error_response(StatusCode::BAD_REQUEST, "Missing required fields");
    }

    let amount = match &order["Amount"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match amount {
        None => return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid amount format"),
        Some(amount) if amount <= 0.0 => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Amount must be greater than 0",
            )
        }
        Some(_) => {}
    }

    let key = format!(
        "{}_{}",
        order["OrderID"].as_str().unwrap_or_default(),
        order["BusinessDate"].as_str().unwrap_or_default()
    );

    let mut orders = state.orders.lock().unwrap();
    if let Some(existing) = orders.get(&key) {
        return (
            StatusCode::OK,
            Json(json!({"status": "exists", "order": existing})),
        );
    }

    orders.insert(key, order.clone());
    state.persist(&orders);

    (
        StatusCode::CREATED,
        Json(json!({"status": "created", "order": order})),
    )
}

async fn fetch_order(
    State(state): State<Arc<AcceptanceState>>,
    Path(order_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let orders = state.orders.lock().unwrap();
    let found = orders
        .values()
        .filter(|o| o["OrderID"].as_str() == Some(order_id.as_str()))
        .next_back();

    match found {
        Some(order) => (StatusCode::OK, Json(order.clone())),
        None => error_response(StatusCode::NOT_FOUND, "Order not found"),
    }
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"error": message})))
}
