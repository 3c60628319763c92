//! # Sale Request Payloads
//!
//! The JSON shapes the transport layer hands to the sale service.
//!
//! ## Shape-Shifting Service Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Detailed form                      Simplified form                     │
//! │  ──────────────────────────────     ─────────────────────────────────  │
//! │  "services": [                      "serviceIds": ["id-1", "id-2"]     │
//! │    { "serviceId": "id-1",                                              │
//! │      "quantity": 2,                 expands to quantity 1, adult,      │
//! │      "isChild": true,               no addon                           │
//! │      "addShampoo": true }                                              │
//! │  ]                                                                     │
//! │                                                                         │
//! │  Both normalize to Vec<ServiceSelection> before any pricing runs.      │
//! │  When both are present the detailed form wins.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On update, `None` consistently means "leave this part of the sale
//! untouched", while an empty vec means "remove all of them".

use serde::Deserialize;

use salon_core::PaymentInput;

fn default_quantity() -> i64 {
    1
}

/// One requested service line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSelection {
    pub service_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub is_child: bool,
    #[serde(default)]
    pub add_shampoo: bool,
}

impl ServiceSelection {
    /// The simplified form: quantity 1, adult, no addon.
    pub fn bare(service_id: impl Into<String>) -> Self {
        ServiceSelection {
            service_id: service_id.into(),
            quantity: 1,
            is_child: false,
            add_shampoo: false,
        }
    }
}

/// One requested product line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSelection {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Staff attribution: a known staff member or a free-text name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSelection {
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub custom_name: Option<String>,
}

/// Operator-entered adjustment: amount plus a mandatory reason.
///
/// A blank reason silently voids the adjustment (the discount engine owns
/// that gate); it is never a hard error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentInput {
    pub amount: i64,
    #[serde(default)]
    pub reason: String,
}

/// Request to record a new sale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub customer_id: String,

    /// Defaults to now when omitted.
    #[serde(default)]
    pub sale_date: Option<chrono::DateTime<chrono::Utc>>,

    /// Detailed service selections; wins over `service_ids`.
    #[serde(default)]
    pub services: Vec<ServiceSelection>,

    /// Simplified service selection by bare id.
    #[serde(default)]
    pub service_ids: Vec<String>,

    #[serde(default)]
    pub products: Vec<ProductSelection>,

    #[serde(default)]
    pub staff: Vec<StaffSelection>,

    /// Explicit split payments. Empty means a single legacy payment of the
    /// full final amount using `payment_method`.
    #[serde(default)]
    pub payments: Vec<PaymentInput>,

    /// Legacy single payment-method string.
    #[serde(default)]
    pub payment_method: Option<String>,

    #[serde(default)]
    pub manual_discount: Option<AdjustmentInput>,

    #[serde(default)]
    pub manual_increment: Option<AdjustmentInput>,

    #[serde(default)]
    pub bring_own_product: bool,

    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateSaleRequest {
    /// Normalizes the two service-selection shapes into one canonical list.
    pub fn service_selections(&self) -> Vec<ServiceSelection> {
        if !self.services.is_empty() {
            self.services.clone()
        } else {
            self.service_ids
                .iter()
                .map(ServiceSelection::bare)
                .collect()
        }
    }
}

/// Request to edit an existing sale.
///
/// Every field is optional: `None` preserves the stored state. Automatic
/// discounts are always preserved regardless of what changes here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSaleRequest {
    #[serde(default)]
    pub sale_date: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(default)]
    pub services: Option<Vec<ServiceSelection>>,

    #[serde(default)]
    pub service_ids: Option<Vec<String>>,

    #[serde(default)]
    pub products: Option<Vec<ProductSelection>>,

    #[serde(default)]
    pub staff: Option<Vec<StaffSelection>>,

    #[serde(default)]
    pub payments: Option<Vec<PaymentInput>>,

    #[serde(default)]
    pub payment_method: Option<String>,

    /// `Some` replaces the stored manual discount (subject to the reason
    /// gate); `None` keeps it.
    #[serde(default)]
    pub manual_discount: Option<AdjustmentInput>,

    #[serde(default)]
    pub manual_increment: Option<AdjustmentInput>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateSaleRequest {
    /// Normalized service selections, or `None` to leave lines untouched.
    pub fn service_selections(&self) -> Option<Vec<ServiceSelection>> {
        if let Some(services) = &self.services {
            return Some(services.clone());
        }

        self.service_ids
            .as_ref()
            .map(|ids| ids.iter().map(ServiceSelection::bare).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_shapes() {
        // Detailed form
        let req: CreateSaleRequest = serde_json::from_value(serde_json::json!({
            "customerId": "c-1",
            "services": [
                { "serviceId": "s-1", "quantity": 2, "isChild": true, "addShampoo": true }
            ]
        }))
        .unwrap();

        let selections = req.service_selections();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].quantity, 2);
        assert!(selections[0].is_child);
        assert!(selections[0].add_shampoo);

        // Simplified form expands to defaults
        let req: CreateSaleRequest = serde_json::from_value(serde_json::json!({
            "customerId": "c-1",
            "serviceIds": ["s-1", "s-2"]
        }))
        .unwrap();

        let selections = req.service_selections();
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[0].quantity, 1);
        assert!(!selections[0].is_child);
        assert!(!selections[0].add_shampoo);
    }

    #[test]
    fn test_detailed_form_wins_over_simplified() {
        let req: CreateSaleRequest = serde_json::from_value(serde_json::json!({
            "customerId": "c-1",
            "services": [{ "serviceId": "s-1" }],
            "serviceIds": ["s-2", "s-3"]
        }))
        .unwrap();

        let selections = req.service_selections();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].service_id, "s-1");
    }

    #[test]
    fn test_update_request_none_vs_empty() {
        // Omitted: leave untouched
        let req: UpdateSaleRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(req.service_selections().is_none());
        assert!(req.products.is_none());

        // Empty list: remove everything
        let req: UpdateSaleRequest = serde_json::from_value(serde_json::json!({
            "serviceIds": []
        }))
        .unwrap();
        assert_eq!(req.service_selections().unwrap().len(), 0);
    }
}
