use crate::{crypto::SignatureError, presentation::PresentationError, schema::SchemaError};

/// Why an RFQ does not satisfy the offering it references
#[derive(thiserror::Error, Debug)]
pub enum OfferingRequirementError {
    #[error("offering id mismatch: RFQ references '{rfq}', offering is '{offering}'")]
    OfferingIdMismatch { rfq: String, offering: String },
    #[error("{field} '{value}' is not a decimal amount")]
    InvalidAmount { field: &'static str, value: String },
    #[error("payinAmount {amount} exceeds offering's maxAmount {max}")]
    AmountExceedsMax { amount: String, max: String },
    #[error("payinAmount {amount} is below offering's minAmount {min}")]
    AmountBelowMin { amount: String, min: String },
    #[error("{direction} method kind '{kind}' is not accepted by the offering")]
    PaymentMethodNotAccepted { direction: &'static str, kind: String },
    #[error(
        "{direction} paymentDetails do not match the requiredPaymentDetails of any '{kind}' method: {source}"
    )]
    PaymentDetailsMismatch {
        direction: &'static str,
        kind: String,
        source: SchemaError,
    },
    #[error("claims do not satisfy the offering's requiredClaims: {0}")]
    ClaimsNotSatisfied(#[source] PresentationError),
    #[error("selected claim failed verification: {0}")]
    InvalidClaim(#[source] SignatureError),
    #[error("selected claim was issued by '{iss}' but signed by '{signer}'")]
    ClaimIssuerMismatch { iss: String, signer: String },
}
