use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Resource, ResourceData};
use crate::{definitions::ResourceKind, presentation::PresentationDefinition};

/// A currency pair the PFI is willing to trade, and on which terms
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingData {
    pub description: String,
    pub payout_units_per_payin_unit: String,
    pub payin_currency: CurrencyDetails,
    pub payout_currency: CurrencyDetails,
    pub payin_methods: Vec<PaymentMethod>,
    pub payout_methods: Vec<PaymentMethod>,
    /// Credentials Alice has to present in her RFQ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_claims: Option<PresentationDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyDetails {
    pub currency_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    /// JSON Schema the selected method's `paymentDetails` must satisfy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_payment_details: Option<Value>,
}

impl OfferingData {
    /// All payin methods of the given kind; several may share a kind
    pub fn payin_method<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a PaymentMethod> {
        self.payin_methods.iter().filter(move |method| method.kind == kind)
    }

    pub fn payout_method<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a PaymentMethod> {
        self.payout_methods.iter().filter(move |method| method.kind == kind)
    }
}

impl ResourceData for OfferingData {
    const KIND: ResourceKind = ResourceKind::Offering;
}

pub type Offering = Resource<OfferingData>;
