use serde::{Deserialize, Serialize};

use super::{Resource, ResourceData};
use crate::definitions::ResourceKind;

/// Funds a PFI holds on behalf of the requester
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceData {
    pub currency_code: String,
    /// Decimal amount; may be negative
    pub available: String,
}

impl ResourceData for BalanceData {
    const KIND: ResourceKind = ResourceKind::Balance;
}

pub type Balance = Resource<BalanceData>;
