//! # Invoice API Envelope
//!
//! Binds `invoice.create`, `invoice.get` and `invoice.list` to the
//! coordinator and renders every outcome as a status plus JSON body. The
//! HTTP layer that routes to these handlers lives outside this crate.
//!
//! ## Bodies
//! ```text
//! create  201  { "invoice": { ...Invoice, "items": [...] } }
//! get     200  { "invoice": { ...Invoice, "items": [...] } }
//! list    200  { "invoices": [...], "total", "totalPage", "currentPage" }
//!
//! error   4xx/5xx
//!   { "errors": [ { "kind": "INSUFFICIENT_STOCK", "message": "...",
//!                   "fields": ["items[0].quantity"] } ] }
//! ```
//! `fields` only appears on `INVALID_PARAMETERS`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use stockbook_core::{InvoiceRequest, InvoiceWithItems};
use tracing::{debug, error};
use ts_rs::TS;

use crate::coordinator::{InvoicePage, InvoiceTransactionCoordinator, ListQuery};
use crate::error::{ErrorKind, InvoiceError, InvoiceResult};

/// One entry of an error body.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub fields: Option<Vec<String>>,
}

impl From<&InvoiceError> for ApiError {
    fn from(err: &InvoiceError) -> Self {
        ApiError {
            kind: err.kind(),
            message: err.to_string(),
            fields: err.fields().map(<[String]>::to_vec),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    errors: Vec<ApiError>,
}

#[derive(Serialize)]
struct InvoiceBody<'a> {
    invoice: &'a InvoiceWithItems,
}

/// Status and JSON body of one handled call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn ok<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => ApiResponse { status, body },
            Err(e) => {
                error!("Failed to serialize response body: {}", e);
                Self::error(&InvoiceError::Storage)
            }
        }
    }

    fn error(err: &InvoiceError) -> Self {
        let status = err.kind().status();
        let body = ErrorBody {
            errors: vec![ApiError::from(err)],
        };

        match serde_json::to_value(&body) {
            Ok(body) => ApiResponse { status, body },
            Err(_) => ApiResponse {
                status: 500,
                body: storage_failure_body(),
            },
        }
    }

    fn from_result<T: Serialize>(status: u16, result: &InvoiceResult<T>) -> Self {
        match result {
            Ok(body) => Self::ok(status, body),
            Err(e) => {
                debug!(kind = ?e.kind(), error = %e, "Invoice call rejected");
                Self::error(e)
            }
        }
    }
}

fn storage_failure_body() -> Value {
    let mut entry = Map::new();
    entry.insert("kind".to_string(), Value::from("STORAGE"));
    entry.insert("message".to_string(), Value::from("Storage failure"));

    let mut body = Map::new();
    body.insert("errors".to_string(), Value::Array(vec![Value::Object(entry)]));
    Value::Object(body)
}

/// Request handlers over a shared coordinator.
#[derive(Clone)]
pub struct InvoiceApi {
    coordinator: Arc<InvoiceTransactionCoordinator>,
}

impl InvoiceApi {
    pub fn new(coordinator: Arc<InvoiceTransactionCoordinator>) -> Self {
        InvoiceApi { coordinator }
    }

    pub fn coordinator(&self) -> &InvoiceTransactionCoordinator {
        &self.coordinator
    }

    /// `invoice.create` with the raw JSON body.
    pub async fn create(&self, shop_id: &str, body: &str) -> ApiResponse {
        let request: InvoiceRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => {
                return ApiResponse::error(&InvoiceError::invalid(format!(
                    "Malformed request body: {}",
                    e
                )))
            }
        };

        self.create_parsed(shop_id, &request).await
    }

    /// `invoice.create` with an already parsed body.
    pub async fn create_parsed(&self, shop_id: &str, request: &InvoiceRequest) -> ApiResponse {
        let result = self.coordinator.create_invoice(shop_id, request).await;
        let result = result.as_ref().map(|invoice| InvoiceBody { invoice });
        ApiResponse::from_result(201, &result.map_err(Clone::clone))
    }

    /// `invoice.get`.
    pub async fn get(&self, shop_id: &str, invoice_id: &str) -> ApiResponse {
        let result = self.coordinator.get_invoice(shop_id, invoice_id).await;
        let result = result.as_ref().map(|invoice| InvoiceBody { invoice });
        ApiResponse::from_result(200, &result.map_err(Clone::clone))
    }

    /// `invoice.list`.
    pub async fn list(&self, shop_id: &str, query: &ListQuery) -> ApiResponse {
        let result: InvoiceResult<InvoicePage> = self.coordinator.list_invoices(shop_id, query).await;
        ApiResponse::from_result(200, &result)
    }
}
