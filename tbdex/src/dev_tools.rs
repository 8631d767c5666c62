//! Ready-made parties, resources, messages and credentials for tests.

use serde_json::{Value, json};

use crate::{
    Error,
    crypto::{Algorithm, jws},
    did::BearerDid,
    message::{
        Close, CloseData, CreateMetadata, Order, OrderData, OrderStatus, OrderStatusData,
        PaymentInstruction, Quote, QuoteData, QuoteDetails, Rfq, RfqData, SelectedPaymentMethod,
        UnsignedMessage,
    },
    presentation::PresentationDefinition,
    resource::{
        Balance, BalanceData, CreateResourceMetadata, CurrencyDetails, Offering, OfferingData,
        PaymentMethod, UnsignedResource,
    },
};

/// The country a credential from [create_credential] has to attest for
/// [create_offering]'s required claims to be satisfied
pub const REQUIRED_COUNTRY: &str = "US";

pub fn generate_party(algorithm: Algorithm) -> Result<BearerDid, Error> {
    Ok(BearerDid::generate(algorithm)?)
}

/// A USD to BTC offering, paid in by debit card and out to a BTC address
pub fn create_offering(pfi: &BearerDid) -> Result<Offering, Error> {
    let required_claims: PresentationDefinition = serde_json::from_value(json!({
        "id": "7ce4004c-3c38-4853-968b-e411bafcd945",
        "input_descriptors": [{
            "id": "bbdb9b7c-5754-4f46-b63b-590bada959e0",
            "constraints": {
                "fields": [{
                    "path": ["$.vc.credentialSubject.countryOfResidence"],
                    "filter": {"type": "string", "const": REQUIRED_COUNTRY}
                }]
            }
        }]
    }))?;

    let data = OfferingData {
        description: "Selling BTC for USD".to_string(),
        payout_units_per_payin_unit: "0.00003826".to_string(),
        payin_currency: CurrencyDetails {
            currency_code: "USD".to_string(),
            min_amount: Some("0.0".to_string()),
            max_amount: Some("999999.99".to_string()),
        },
        payout_currency: CurrencyDetails {
            currency_code: "BTC".to_string(),
            min_amount: None,
            max_amount: Some("999526.11".to_string()),
        },
        payin_methods: vec![PaymentMethod {
            kind: "DEBIT_CARD".to_string(),
            name: None,
            description: None,
            fee: None,
            required_payment_details: Some(json!({
                "type": "object",
                "properties": {
                    "cardNumber": {"type": "string"},
                    "expiryDate": {"type": "string", "pattern": "^\\d{2}/\\d{2}$"},
                    "cardHolderName": {"type": "string"},
                    "cvv": {"type": "string"}
                },
                "required": ["cardNumber", "expiryDate", "cardHolderName", "cvv"],
                "additionalProperties": false
            })),
        }],
        payout_methods: vec![PaymentMethod {
            kind: "BTC_ADDRESS".to_string(),
            name: None,
            description: None,
            fee: None,
            required_payment_details: Some(json!({
                "type": "object",
                "properties": {
                    "btcAddress": {"type": "string"}
                },
                "required": ["btcAddress"],
                "additionalProperties": false
            })),
        }],
        required_claims: Some(required_claims),
    };

    UnsignedResource::create(
        CreateResourceMetadata {
            from: pfi.uri().to_string(),
            protocol: None,
        },
        data,
    )?
    .sign(pfi)
}

pub fn create_balance(pfi: &BearerDid, currency_code: &str, available: &str) -> Result<Balance, Error> {
    UnsignedResource::create(
        CreateResourceMetadata {
            from: pfi.uri().to_string(),
            protocol: None,
        },
        BalanceData {
            currency_code: currency_code.to_string(),
            available: available.to_string(),
        },
    )?
    .sign(pfi)
}

/// An RFQ from `sender` against `offering` that satisfies its payment
/// method requirements
pub fn create_rfq(sender: &BearerDid, offering: &Offering, claims: Vec<String>) -> Result<Rfq, Error> {
    let data = RfqData {
        offering_id: offering.metadata().id.clone(),
        payin_amount: "20000.00".to_string(),
        payin_method: SelectedPaymentMethod {
            kind: "DEBIT_CARD".to_string(),
            payment_details: Some(object(json!({
                "cardNumber": "1234567890123456",
                "expiryDate": "12/22",
                "cardHolderName": "Ephraim Bartholomew Winthrop",
                "cvv": "123"
            }))),
        },
        payout_method: SelectedPaymentMethod {
            kind: "BTC_ADDRESS".to_string(),
            payment_details: Some(object(json!({
                "btcAddress": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"
            }))),
        },
        claims,
    };

    UnsignedMessage::create(
        CreateMetadata {
            from: sender.uri().to_string(),
            to: offering.metadata().from.clone(),
            ..Default::default()
        },
        data,
    )?
    .sign(sender)
}

pub fn create_quote(pfi: &BearerDid, rfq: &Rfq) -> Result<Quote, Error> {
    let data = QuoteData {
        expires_at: "2099-01-01T00:00:00.000Z".to_string(),
        payin: QuoteDetails {
            currency_code: "USD".to_string(),
            amount: "20000.00".to_string(),
            fee: Some("1.00".to_string()),
            payment_instruction: Some(PaymentInstruction {
                link: Some("https://pfi.example.com/pay".to_string()),
                instruction: None,
            }),
        },
        payout: QuoteDetails {
            currency_code: "BTC".to_string(),
            amount: "0.7652".to_string(),
            fee: None,
            payment_instruction: None,
        },
    };

    UnsignedMessage::create(reply_to(pfi, rfq), data)?.sign(pfi)
}

pub fn create_order(sender: &BearerDid, rfq: &Rfq) -> Result<Order, Error> {
    UnsignedMessage::create(
        CreateMetadata {
            from: sender.uri().to_string(),
            to: rfq.metadata().to.clone(),
            exchange_id: Some(rfq.metadata().exchange_id.clone()),
            ..Default::default()
        },
        OrderData {},
    )?
    .sign(sender)
}

pub fn create_order_status(pfi: &BearerDid, rfq: &Rfq, status: &str) -> Result<OrderStatus, Error> {
    UnsignedMessage::create(
        reply_to(pfi, rfq),
        OrderStatusData {
            order_status: status.to_string(),
        },
    )?
    .sign(pfi)
}

pub fn create_close(pfi: &BearerDid, rfq: &Rfq, reason: Option<&str>) -> Result<Close, Error> {
    UnsignedMessage::create(
        reply_to(pfi, rfq),
        CloseData {
            reason: reason.map(str::to_string),
            success: None,
        },
    )?
    .sign(pfi)
}

/// A VC-JWT issued by `issuer` to `subject`, attesting `countryOfResidence`
pub fn create_credential(issuer: &BearerDid, subject: &str, country: &str) -> Result<String, Error> {
    let payload = json!({
        "iss": issuer.uri(),
        "sub": subject,
        "vc": {
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "SanctionCredential"],
            "issuer": issuer.uri(),
            "credentialSubject": {
                "id": subject,
                "countryOfResidence": country
            }
        }
    });

    Ok(jws::sign(&serde_json::to_vec(&payload)?, issuer, false)?)
}

fn reply_to(pfi: &BearerDid, rfq: &Rfq) -> CreateMetadata {
    CreateMetadata {
        from: pfi.uri().to_string(),
        to: rfq.metadata().from.clone(),
        exchange_id: Some(rfq.metadata().exchange_id.clone()),
        ..Default::default()
    }
}

fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}
