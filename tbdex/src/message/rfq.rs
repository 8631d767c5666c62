use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use super::{Message, MessageData, OfferingRequirementError};
use crate::{
    crypto::jws,
    definitions::MessageKind,
    did::DidResolver,
    presentation::PresentationExchange,
    resource::{Offering, PaymentMethod},
    schema,
};

/// Alice asks a PFI for a quote against one of its offerings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RfqData {
    pub offering_id: String,
    pub payin_amount: String,
    pub payin_method: SelectedPaymentMethod,
    pub payout_method: SelectedPaymentMethod,
    /// VC-JWTs presented to satisfy the offering's required claims
    pub claims: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPaymentMethod {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<Map<String, Value>>,
}

impl MessageData for RfqData {
    const KIND: MessageKind = MessageKind::Rfq;
}

pub type Rfq = Message<RfqData>;

impl Message<RfqData> {
    /// Check this RFQ against the offering it references. Fails on the first
    /// requirement that is not met.
    pub async fn verify_offering_requirements(
        &self,
        offering: &Offering,
        presentation_exchange: &dyn PresentationExchange,
        resolver: &dyn DidResolver,
    ) -> Result<(), OfferingRequirementError> {
        let data = self.data();
        let terms = offering.data();

        if data.offering_id != offering.metadata().id {
            return Err(OfferingRequirementError::OfferingIdMismatch {
                rfq: data.offering_id.clone(),
                offering: offering.metadata().id.clone(),
            });
        }

        let amount = parse_amount("payinAmount", &data.payin_amount)?;

        if let Some(max) = &terms.payin_currency.max_amount {
            if amount > parse_amount("maxAmount", max)? {
                return Err(OfferingRequirementError::AmountExceedsMax {
                    amount: data.payin_amount.clone(),
                    max: max.clone(),
                });
            }
        }

        if let Some(min) = &terms.payin_currency.min_amount {
            if amount < parse_amount("minAmount", min)? {
                return Err(OfferingRequirementError::AmountBelowMin {
                    amount: data.payin_amount.clone(),
                    min: min.clone(),
                });
            }
        }

        check_payment_method(
            "payin",
            &data.payin_method,
            terms.payin_method(&data.payin_method.kind),
        )?;
        check_payment_method(
            "payout",
            &data.payout_method,
            terms.payout_method(&data.payout_method.kind),
        )?;

        if let Some(definition) = &terms.required_claims {
            let selected = presentation_exchange
                .select_credentials(&data.claims, definition)
                .map_err(OfferingRequirementError::ClaimsNotSatisfied)?;

            for vc_jwt in &selected {
                verify_claim(vc_jwt, resolver).await?;
            }
        }

        tracing::debug!(
            "rfq {} satisfies offering {}",
            self.metadata().id,
            offering.metadata().id
        );

        Ok(())
    }
}

fn parse_amount(field: &'static str, value: &str) -> Result<Decimal, OfferingRequirementError> {
    Decimal::from_str(value).map_err(|_| OfferingRequirementError::InvalidAmount {
        field,
        value: value.to_string(),
    })
}

/// The selected method passes when its details satisfy the schema of at
/// least one offered method of the same kind
fn check_payment_method<'a>(
    direction: &'static str,
    selected: &SelectedPaymentMethod,
    candidates: impl Iterator<Item = &'a PaymentMethod>,
) -> Result<(), OfferingRequirementError> {
    let details = Value::Object(selected.payment_details.clone().unwrap_or_default());
    let mut first_error = None;

    for method in candidates {
        let Some(required) = &method.required_payment_details else {
            return Ok(());
        };

        match schema::validate_with(required, &details, "paymentDetails") {
            Ok(()) => return Ok(()),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(source) => Err(OfferingRequirementError::PaymentDetailsMismatch {
            direction,
            kind: selected.kind.clone(),
            source,
        }),
        None => Err(OfferingRequirementError::PaymentMethodNotAccepted {
            direction,
            kind: selected.kind.clone(),
        }),
    }
}

/// Re-verify a selected VC-JWT and require that its issuer signed it
async fn verify_claim(
    vc_jwt: &str,
    resolver: &dyn DidResolver,
) -> Result<(), OfferingRequirementError> {
    let signer = jws::verify(vc_jwt, None, resolver)
        .await
        .map_err(OfferingRequirementError::InvalidClaim)?;

    let payload = jws::decode(vc_jwt)
        .and_then(|decoded| decoded.payload())
        .map_err(OfferingRequirementError::InvalidClaim)?;

    let iss = serde_json::from_slice::<Value>(&payload)
        .ok()
        .and_then(|claims| claims.get("iss")?.as_str().map(str::to_string))
        .unwrap_or_default();

    if iss != signer {
        return Err(OfferingRequirementError::ClaimIssuerMismatch { iss, signer });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::Algorithm,
        dev_tools::{self, REQUIRED_COUNTRY, generate_party},
        did::{BearerDid, UniversalResolver},
        presentation::{FieldPathEvaluator, PresentationError},
    };
    use serde_json::json;

    struct Setup {
        alice: BearerDid,
        issuer: BearerDid,
        offering: Offering,
        resolver: UniversalResolver,
    }

    fn setup() -> Setup {
        let pfi = generate_party(Algorithm::Es256k).unwrap();

        Setup {
            alice: generate_party(Algorithm::EdDsa).unwrap(),
            issuer: generate_party(Algorithm::EdDsa).unwrap(),
            offering: dev_tools::create_offering(&pfi).unwrap(),
            resolver: UniversalResolver::default(),
        }
    }

    impl Setup {
        fn rfq(&self, claims: Vec<String>) -> Rfq {
            dev_tools::create_rfq(&self.alice, &self.offering, claims).unwrap()
        }

        fn credential(&self, country: &str) -> String {
            dev_tools::create_credential(&self.issuer, self.alice.uri(), country).unwrap()
        }

        async fn check(&self, rfq: &Rfq) -> Result<(), OfferingRequirementError> {
            rfq.verify_offering_requirements(&self.offering, &FieldPathEvaluator, &self.resolver)
                .await
        }
    }

    #[tokio::test]
    async fn satisfied() {
        let setup = setup();
        let rfq = setup.rfq(vec![setup.credential(REQUIRED_COUNTRY)]);

        setup.check(&rfq).await.unwrap();
    }

    #[tokio::test]
    async fn offering_id_mismatch() {
        let setup = setup();
        let mut rfq = setup.rfq(vec![setup.credential(REQUIRED_COUNTRY)]);
        rfq.data_mut().offering_id = "offering_somethingelse".to_string();

        assert!(matches!(
            setup.check(&rfq).await,
            Err(OfferingRequirementError::OfferingIdMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn amount_above_max() {
        let mut setup = setup();
        setup.offering.data_mut().payin_currency.max_amount = Some("0.01".to_string());
        let mut rfq = setup.rfq(vec![]);
        rfq.data_mut().payin_amount = "99999999999999999.0".to_string();

        let err = setup.check(&rfq).await.unwrap_err();
        assert!(err.to_string().contains("exceeds offering's maxAmount"));
    }

    #[tokio::test]
    async fn amount_compared_as_decimal() {
        let mut setup = setup();
        setup.offering.data_mut().required_claims = None;
        setup.offering.data_mut().payin_currency.max_amount = Some("100.10".to_string());
        setup.offering.data_mut().payin_currency.min_amount = Some("100.0".to_string());

        let mut rfq = setup.rfq(vec![]);
        rfq.data_mut().payin_amount = "100.1".to_string();
        setup.check(&rfq).await.unwrap();

        rfq.data_mut().payin_amount = "100.100000001".to_string();
        assert!(matches!(
            setup.check(&rfq).await,
            Err(OfferingRequirementError::AmountExceedsMax { .. })
        ));

        rfq.data_mut().payin_amount = "99.99".to_string();
        assert!(matches!(
            setup.check(&rfq).await,
            Err(OfferingRequirementError::AmountBelowMin { .. })
        ));
    }

    #[tokio::test]
    async fn payment_method_kind_not_offered() {
        let mut setup = setup();
        setup.offering.data_mut().required_claims = None;

        let mut rfq = setup.rfq(vec![]);
        rfq.data_mut().payout_method.kind = "SEPA".to_string();

        assert!(matches!(
            setup.check(&rfq).await,
            Err(OfferingRequirementError::PaymentMethodNotAccepted { direction: "payout", kind })
                if kind == "SEPA"
        ));
    }

    #[tokio::test]
    async fn payment_details_must_match_a_schema() {
        let mut setup = setup();
        setup.offering.data_mut().required_claims = None;

        let mut rfq = setup.rfq(vec![]);
        rfq.data_mut().payin_method.payment_details = None;

        assert!(matches!(
            setup.check(&rfq).await,
            Err(OfferingRequirementError::PaymentDetailsMismatch { direction: "payin", .. })
        ));
    }

    #[tokio::test]
    async fn any_schema_of_the_same_kind_suffices() {
        let mut setup = setup();
        let data = setup.offering.data_mut();
        data.required_claims = None;
        data.payin_methods = vec![
            PaymentMethod {
                kind: "card".to_string(),
                name: None,
                description: None,
                fee: None,
                required_payment_details: Some(json!({
                    "type": "object",
                    "properties": {"cardNumber": {"type": "string"}, "pin": {"type": "string"}},
                    "required": ["cardNumber", "pin"]
                })),
            },
            PaymentMethod {
                kind: "card".to_string(),
                name: None,
                description: None,
                fee: None,
                required_payment_details: Some(json!({
                    "type": "object",
                    "properties": {"cardNumber": {"type": "string"}},
                    "required": ["cardNumber"]
                })),
            },
        ];

        let mut rfq = setup.rfq(vec![]);
        rfq.data_mut().payin_method = SelectedPaymentMethod {
            kind: "card".to_string(),
            payment_details: serde_json::from_value(json!({"cardNumber": "1234"})).unwrap(),
        };
        setup.check(&rfq).await.unwrap();

        rfq.data_mut().payin_method.payment_details =
            serde_json::from_value(json!({"pin": "1234"})).unwrap();
        assert!(matches!(
            setup.check(&rfq).await,
            Err(OfferingRequirementError::PaymentDetailsMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn claims_required() {
        let setup = setup();

        assert!(matches!(
            setup.check(&setup.rfq(vec![])).await,
            Err(OfferingRequirementError::ClaimsNotSatisfied(PresentationError::Unsatisfied(_)))
        ));
        assert!(matches!(
            setup.check(&setup.rfq(vec![setup.credential("MX")])).await,
            Err(OfferingRequirementError::ClaimsNotSatisfied(_))
        ));
    }

    #[tokio::test]
    async fn selected_claims_are_verified() {
        let setup = setup();

        // alter the first signature byte
        let credential = setup.credential(REQUIRED_COUNTRY);
        let (head, signature) = credential.rsplit_once('.').unwrap();
        let first = if signature.starts_with('A') { 'B' } else { 'A' };
        let signature = format!("{first}{}", &signature[1..]);
        let forged = format!("{head}.{signature}");

        assert!(matches!(
            setup.check(&setup.rfq(vec![forged])).await,
            Err(OfferingRequirementError::InvalidClaim(_))
        ));
    }

    #[tokio::test]
    async fn claim_issuer_must_sign() {
        let setup = setup();
        let impostor = generate_party(Algorithm::Es256k).unwrap();

        let payload = json!({
            "iss": setup.issuer.uri(),
            "vc": {"credentialSubject": {"countryOfResidence": REQUIRED_COUNTRY}}
        });
        let credential = jws::sign(payload.to_string().as_bytes(), &impostor, false).unwrap();

        assert!(matches!(
            setup.check(&setup.rfq(vec![credential])).await,
            Err(OfferingRequirementError::ClaimIssuerMismatch { signer, .. }) if signer == impostor.uri()
        ));
    }
}
