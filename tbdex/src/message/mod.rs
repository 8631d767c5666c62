//! The five message kinds exchanged between Alice and a PFI.
//!
//! A message starts life as an [UnsignedMessage] draft. Signing consumes
//! the draft and yields a [Message], which is the only form that can be
//! serialized for the wire, parsed, or added to an [Exchange](crate::Exchange).

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{borrow::Cow, fmt::Debug};

use crate::{
    Error,
    crypto::{Digest, Signer},
    definitions::{DEFAULT_PROTOCOL_VERSION, MessageKind, generate_id, now_timestamp},
    did::DidResolver,
    envelope::{self, ParseError},
    schema::{self, SchemaName},
};

mod close;
mod error;
mod order;
mod order_status;
mod quote;
mod rfq;

pub use close::{Close, CloseData};
pub use error::OfferingRequirementError;
pub use order::{Order, OrderData};
pub use order_status::{OrderStatus, OrderStatusData};
pub use quote::{PaymentInstruction, Quote, QuoteData, QuoteDetails};
pub use rfq::{Rfq, RfqData, SelectedPaymentMethod};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// The sender's DID
    pub from: String,
    /// The recipient's DID
    pub to: String,
    pub kind: MessageKind,
    pub id: String,
    /// Id of the RFQ that started the exchange
    pub exchange_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub created_at: String,
    pub protocol: String,
}

/// Caller-provided part of a message's metadata; the rest is generated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateMetadata {
    pub from: String,
    pub to: String,
    /// Ignored for RFQs, which start a new exchange named after themselves
    pub exchange_id: Option<String>,
    pub external_id: Option<String>,
    /// Defaults to [DEFAULT_PROTOCOL_VERSION]
    pub protocol: Option<String>,
}

/// Kind-specific `data` of a message
pub trait MessageData:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync
{
    const KIND: MessageKind;
}

/// A message that has been created but not yet signed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsignedMessage<D> {
    metadata: MessageMetadata,
    data: D,
}

impl<D: MessageData> UnsignedMessage<D> {
    /// Create a draft, generating its id and timestamp. The data is checked
    /// against the kind's schema immediately.
    pub fn create(metadata: CreateMetadata, data: D) -> Result<Self, Error> {
        let id = generate_id(D::KIND.as_str());
        let exchange_id = match D::KIND {
            MessageKind::Rfq => id.clone(),
            kind => metadata
                .exchange_id
                .ok_or(Error::MissingExchangeId(kind))?,
        };

        let message = Self {
            metadata: MessageMetadata {
                from: metadata.from,
                to: metadata.to,
                kind: D::KIND,
                id,
                exchange_id,
                external_id: metadata.external_id,
                created_at: now_timestamp(),
                protocol: metadata
                    .protocol
                    .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
            },
            data,
        };

        message.validate_data()?;

        Ok(message)
    }

    /// Check `data` against the kind's schema; no signature is needed
    pub fn validate_data(&self) -> Result<(), Error> {
        validate_data::<D>(&self.data)
    }

    pub fn metadata(&self) -> &MessageMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn digest(&self) -> Result<Digest, Error> {
        envelope::digest(&self.metadata, &self.data)
    }

    /// Sign the draft, producing a wire-ready message
    pub fn sign(self, signer: &dyn Signer) -> Result<Message<D>, Error> {
        let signature = envelope::sign(&self.metadata, &self.data, signer)?;

        tracing::trace!("signed {} {}", self.metadata.kind, self.metadata.id);

        Ok(Message {
            metadata: self.metadata,
            data: self.data,
            signature,
            received: None,
        })
    }
}

/// A signed message
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message<D> {
    metadata: MessageMetadata,
    data: D,
    signature: String,
    /// The JSON this message was parsed from. The signature covers this
    /// form, not the re-serialized fields.
    #[serde(skip)]
    received: Option<Value>,
}

impl<D: PartialEq> PartialEq for Message<D> {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata && self.data == other.data && self.signature == other.signature
    }
}

impl<D: MessageData> Message<D> {
    /// Parse a message from JSON text or bytes and verify it
    pub async fn parse(raw: impl AsRef<[u8]>, resolver: &dyn DidResolver) -> Result<Self, Error> {
        let value = envelope::parse_json(raw.as_ref())?;

        Self::parse_value(value, resolver).await
    }

    /// Parse a message from an already deserialized JSON value and verify it
    pub async fn parse_value(value: Value, resolver: &dyn DidResolver) -> Result<Self, Error> {
        let message = Self::decode(value)?;
        message.verify(resolver).await?;

        Ok(message)
    }

    pub(crate) fn decode(value: Value) -> Result<Self, Error> {
        let kind = envelope::read_kind(&value)?;
        if kind != D::KIND.as_str() {
            return Err(ParseError::UnexpectedKind {
                expected: D::KIND.to_string(),
                found: kind.to_string(),
            }
            .into());
        }

        let mut message: Self =
            envelope::decode(value.clone(), SchemaName::Message, D::KIND.schema())?;

        let metadata = &message.metadata;
        if D::KIND == MessageKind::Rfq && metadata.exchange_id != metadata.id {
            return Err(ParseError::RfqExchangeId {
                id: metadata.id.clone(),
                exchange_id: metadata.exchange_id.clone(),
            }
            .into());
        }

        message.received = Some(value);

        Ok(message)
    }

    /// Validate the envelope and data schemas, then verify that the signature
    /// covers this exact content and was made by `metadata.from`.
    /// Returns the signer's DID.
    pub async fn verify(&self, resolver: &dyn DidResolver) -> Result<String, Error> {
        let value = self.signed_value()?;
        envelope::validate(&value, SchemaName::Message, D::KIND.schema())?;

        let digest = envelope::digest(&value["metadata"], &value["data"])?;
        envelope::verify_signature(&self.signature, &digest, &self.metadata.from, resolver).await
    }

    fn signed_value(&self) -> Result<Cow<'_, Value>, Error> {
        Ok(match &self.received {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(serde_json::to_value(self)?),
        })
    }

    pub fn validate_data(&self) -> Result<(), Error> {
        validate_data::<D>(&self.data)
    }

    pub fn metadata(&self) -> &MessageMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Digest of `{metadata, data}` as received, or as built for local messages
    pub fn digest(&self) -> Result<Digest, Error> {
        match &self.received {
            Some(value) => envelope::digest(&value["metadata"], &value["data"]),
            None => envelope::digest(&self.metadata, &self.data),
        }
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_value(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }
}

fn validate_data<D: MessageData>(data: &D) -> Result<(), Error> {
    schema::validate(D::KIND.schema(), &serde_json::to_value(data)?)?;

    Ok(())
}

/// Any signed message, for callers that do not know the kind up front
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyMessage {
    Rfq(Rfq),
    Quote(Quote),
    Order(Order),
    OrderStatus(OrderStatus),
    Close(Close),
}

impl AnyMessage {
    /// Parse a message of any kind, dispatching on `metadata.kind`, and verify it
    pub async fn parse(raw: impl AsRef<[u8]>, resolver: &dyn DidResolver) -> Result<Self, Error> {
        let value = envelope::parse_json(raw.as_ref())?;

        Self::parse_value(value, resolver).await
    }

    pub async fn parse_value(value: Value, resolver: &dyn DidResolver) -> Result<Self, Error> {
        let message = Self::decode(value)?;
        message.verify(resolver).await?;

        Ok(message)
    }

    pub(crate) fn decode(value: Value) -> Result<Self, Error> {
        let kind = envelope::read_kind(&value)?
            .parse::<MessageKind>()
            .map_err(ParseError::UnknownKind)?;

        Ok(match kind {
            MessageKind::Rfq => AnyMessage::Rfq(Message::decode(value)?),
            MessageKind::Quote => AnyMessage::Quote(Message::decode(value)?),
            MessageKind::Order => AnyMessage::Order(Message::decode(value)?),
            MessageKind::OrderStatus => AnyMessage::OrderStatus(Message::decode(value)?),
            MessageKind::Close => AnyMessage::Close(Message::decode(value)?),
        })
    }

    pub async fn verify(&self, resolver: &dyn DidResolver) -> Result<String, Error> {
        match self {
            AnyMessage::Rfq(message) => message.verify(resolver).await,
            AnyMessage::Quote(message) => message.verify(resolver).await,
            AnyMessage::Order(message) => message.verify(resolver).await,
            AnyMessage::OrderStatus(message) => message.verify(resolver).await,
            AnyMessage::Close(message) => message.verify(resolver).await,
        }
    }

    pub fn metadata(&self) -> &MessageMetadata {
        match self {
            AnyMessage::Rfq(message) => message.metadata(),
            AnyMessage::Quote(message) => message.metadata(),
            AnyMessage::Order(message) => message.metadata(),
            AnyMessage::OrderStatus(message) => message.metadata(),
            AnyMessage::Close(message) => message.metadata(),
        }
    }

    pub fn signature(&self) -> &str {
        match self {
            AnyMessage::Rfq(message) => message.signature(),
            AnyMessage::Quote(message) => message.signature(),
            AnyMessage::Order(message) => message.signature(),
            AnyMessage::OrderStatus(message) => message.signature(),
            AnyMessage::Close(message) => message.signature(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.metadata().kind
    }

    pub fn id(&self) -> &str {
        &self.metadata().id
    }

    pub fn exchange_id(&self) -> &str {
        &self.metadata().exchange_id
    }

    pub fn valid_next(&self) -> &'static [MessageKind] {
        self.kind().valid_next()
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Rfq> for AnyMessage {
    fn from(message: Rfq) -> Self {
        AnyMessage::Rfq(message)
    }
}

impl From<Quote> for AnyMessage {
    fn from(message: Quote) -> Self {
        AnyMessage::Quote(message)
    }
}

impl From<Order> for AnyMessage {
    fn from(message: Order) -> Self {
        AnyMessage::Order(message)
    }
}

impl From<OrderStatus> for AnyMessage {
    fn from(message: OrderStatus) -> Self {
        AnyMessage::OrderStatus(message)
    }
}

impl From<Close> for AnyMessage {
    fn from(message: Close) -> Self {
        AnyMessage::Close(message)
    }
}

/// Decode a message without verifying its signature; only for fuzzing
#[cfg(feature = "fuzzing")]
pub fn decode_unverified(raw: &[u8]) -> Result<AnyMessage, Error> {
    AnyMessage::decode(envelope::parse_json(raw)?)
}

#[cfg(test)]
impl<D> Message<D> {
    pub(crate) fn metadata_mut(&mut self) -> &mut MessageMetadata {
        self.received = None;
        &mut self.metadata
    }

    pub(crate) fn data_mut(&mut self) -> &mut D {
        self.received = None;
        &mut self.data
    }

    pub(crate) fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        SignatureError,
        crypto::{Algorithm, jws},
        dev_tools::{self, generate_party},
        did::{BearerDid, UniversalResolver},
        schema::SchemaError,
    };
    use serde_json::json;

    fn rfq(alice: &BearerDid, pfi: &BearerDid) -> Rfq {
        let offering = dev_tools::create_offering(pfi).unwrap();
        dev_tools::create_rfq(alice, &offering, vec![]).unwrap()
    }

    #[test]
    fn create_fills_metadata() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();

        let rfq = rfq(&alice, &pfi);
        let metadata = rfq.metadata();
        assert!(metadata.id.starts_with("rfq_"));
        assert_eq!(metadata.exchange_id, metadata.id);
        assert_eq!(metadata.protocol, DEFAULT_PROTOCOL_VERSION);
        assert_eq!(metadata.from, alice.uri());
        assert_eq!(metadata.to, pfi.uri());
        assert!(crate::definitions::parse_timestamp(&metadata.created_at).is_ok());

        let quote = dev_tools::create_quote(&pfi, &rfq).unwrap();
        assert!(quote.metadata().id.starts_with("quote_"));
        assert_eq!(quote.metadata().exchange_id, metadata.id);

        // the signature is detached
        let decoded = jws::decode(quote.signature()).unwrap();
        assert!(decoded.is_detached());
    }

    #[test]
    fn metadata_overrides() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();

        let order = UnsignedMessage::create(
            CreateMetadata {
                from: alice.uri().to_string(),
                to: alice.uri().to_string(),
                protocol: Some("2.0".to_string()),
                ..Default::default()
            },
            OrderData {},
        );
        assert!(matches!(
            order,
            Err(Error::MissingExchangeId(MessageKind::Order))
        ));

        let close = UnsignedMessage::create(
            CreateMetadata {
                from: alice.uri().to_string(),
                to: alice.uri().to_string(),
                exchange_id: Some("rfq_0123".to_string()),
                protocol: Some("2.0".to_string()),
                ..Default::default()
            },
            CloseData::default(),
        )
        .unwrap();
        assert_eq!(close.metadata().protocol, "2.0");
        assert_eq!(close.metadata().exchange_id, "rfq_0123");
    }

    #[test]
    fn create_rejects_invalid_data() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();

        let result = UnsignedMessage::create(
            CreateMetadata {
                from: alice.uri().to_string(),
                to: alice.uri().to_string(),
                exchange_id: Some("rfq_0123".to_string()),
                ..Default::default()
            },
            OrderStatusData {
                order_status: String::new(),
            },
        );

        let Err(Error::Schema(SchemaError::Invalid { violations, .. })) = result else {
            panic!("empty orderStatus was accepted");
        };
        assert_eq!(violations[0].path, "message.orderStatus");
    }

    #[tokio::test]
    async fn round_trip() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();
        let resolver = UniversalResolver::default();

        let rfq = rfq(&alice, &pfi);
        let quote = dev_tools::create_quote(&pfi, &rfq).unwrap();
        let order = dev_tools::create_order(&alice, &rfq).unwrap();
        let order_status = dev_tools::create_order_status(&pfi, &rfq, "PAYIN_PENDING").unwrap();
        let close = dev_tools::create_close(&pfi, &rfq, Some("done")).unwrap();

        let json = rfq.to_json_string().unwrap();
        let parsed = Rfq::parse(&json, &resolver).await.unwrap();
        assert_eq!(parsed, rfq);
        assert_eq!(parsed.to_json_string().unwrap(), json);

        let messages: Vec<AnyMessage> = vec![
            rfq.into(),
            quote.into(),
            order.into(),
            order_status.into(),
            close.into(),
        ];
        for message in messages {
            let json = message.to_json_string().unwrap();
            let parsed = AnyMessage::parse(json.as_bytes(), &resolver).await.unwrap();

            assert_eq!(parsed, message);
            assert_eq!(parsed.to_json_string().unwrap(), json);
        }
    }

    #[tokio::test]
    async fn signer_must_be_sender() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();
        let mallory = generate_party(Algorithm::EdDsa).unwrap();
        let resolver = UniversalResolver::default();

        // mallory signs a message claiming to be alice
        let mut rfq = rfq(&alice, &pfi);
        let signature = envelope::sign(rfq.metadata(), rfq.data(), &mallory).unwrap();
        rfq.set_signature(signature);

        assert!(matches!(
            rfq.verify(&resolver).await,
            Err(Error::Signature(SignatureError::SignerMismatch { signer, from }))
                if signer == mallory.uri() && from == alice.uri()
        ));
    }

    #[tokio::test]
    async fn altered_sender_fails() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();
        let resolver = UniversalResolver::default();

        let mut rfq = rfq(&alice, &pfi);
        rfq.metadata_mut().from = pfi.uri().to_string();

        assert!(matches!(
            rfq.verify(&resolver).await,
            Err(Error::Signature(SignatureError::SignerMismatch { signer, from }))
                if signer == alice.uri() && from == pfi.uri()
        ));
    }

    #[tokio::test]
    async fn tampered_data_fails() {
        let alice = generate_party(Algorithm::Es256k).unwrap();
        let pfi = generate_party(Algorithm::EdDsa).unwrap();
        let resolver = UniversalResolver::default();

        let mut rfq = rfq(&alice, &pfi);
        rfq.data_mut().payin_amount = "1.00".to_string();

        // still well-formed, so decoding alone accepts it
        let json = rfq.to_json_value().unwrap();
        assert!(Rfq::decode(json.clone()).is_ok());

        assert!(matches!(
            Rfq::parse_value(json, &resolver).await,
            Err(Error::Signature(SignatureError::Verification { .. }))
        ));
    }

    #[tokio::test]
    async fn rfq_exchange_id_is_its_own_id() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();
        let resolver = UniversalResolver::default();

        // correctly signed, but claiming someone else's exchange
        let mut rfq = rfq(&alice, &pfi);
        rfq.metadata_mut().exchange_id = "rfq_someoneelse".to_string();
        let signature = envelope::sign(rfq.metadata(), rfq.data(), &alice).unwrap();
        rfq.set_signature(signature);
        let json = rfq.to_json_string().unwrap();

        assert!(matches!(
            Rfq::parse(&json, &resolver).await,
            Err(Error::Parse(ParseError::RfqExchangeId { exchange_id, .. }))
                if exchange_id == "rfq_someoneelse"
        ));
        assert!(matches!(
            AnyMessage::parse(&json, &resolver).await,
            Err(Error::Parse(ParseError::RfqExchangeId { .. }))
        ));
    }

    #[tokio::test]
    async fn parsed_message_keeps_received_digest() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();
        let resolver = UniversalResolver::default();

        let value = rfq(&alice, &pfi).to_json_value().unwrap();
        let digest = crate::crypto::digest(&value["metadata"], &value["data"]).unwrap();

        let parsed = Rfq::parse_value(value, &resolver).await.unwrap();
        assert_eq!(parsed.digest().unwrap(), digest);
        assert_eq!(parsed.verify(&resolver).await.unwrap(), alice.uri());

        // edits after parsing are still caught
        let mut edited = parsed.clone();
        edited.data_mut().payin_amount = "1.00".to_string();
        assert!(matches!(
            edited.verify(&resolver).await,
            Err(Error::Signature(SignatureError::Verification { .. }))
        ));
    }

    #[tokio::test]
    async fn missing_signature() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();

        let mut rfq = rfq(&alice, &pfi);
        rfq.set_signature(String::new());

        assert!(matches!(
            rfq.verify(&UniversalResolver::default()).await,
            Err(Error::Signature(SignatureError::MissingSignature))
        ));
    }

    #[tokio::test]
    async fn parse_errors() {
        let resolver = UniversalResolver::default();

        assert!(matches!(
            AnyMessage::parse("{not json", &resolver).await,
            Err(Error::Parse(ParseError::InvalidJson(_)))
        ));
        assert!(matches!(
            AnyMessage::parse("[1, 2]", &resolver).await,
            Err(Error::Parse(ParseError::InvalidShape(_)))
        ));
        assert!(matches!(
            AnyMessage::parse(r#"{"data": {}}"#, &resolver).await,
            Err(Error::Parse(ParseError::InvalidShape(_)))
        ));
        assert!(matches!(
            AnyMessage::parse(r#"{"metadata": {"kind": "invoice"}}"#, &resolver).await,
            Err(Error::Parse(ParseError::UnknownKind(kind))) if kind == "invoice"
        ));
        assert!(matches!(
            AnyMessage::parse(r#"{"metadata": {"kind": "quote"}, "data": {}}"#, &resolver).await,
            Err(Error::Schema(_))
        ));
    }

    #[tokio::test]
    async fn typed_parse_checks_kind() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();
        let resolver = UniversalResolver::default();

        let json = rfq(&alice, &pfi).to_json_string().unwrap();

        assert!(matches!(
            Quote::parse(&json, &resolver).await,
            Err(Error::Parse(ParseError::UnexpectedKind { expected, found }))
                if expected == "quote" && found == "rfq"
        ));
    }

    #[test]
    fn order_data_is_empty_object() {
        assert_eq!(serde_json::to_value(OrderData {}).unwrap(), json!({}));
        assert_eq!(serde_json::to_value(CloseData::default()).unwrap(), json!({}));
    }

    #[test]
    fn quote_expiry() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();

        let mut quote = dev_tools::create_quote(&pfi, &rfq(&alice, &pfi)).unwrap();
        assert!(!quote.is_expired(chrono::Utc::now()));

        quote.data_mut().expires_at = "2001-01-01T00:00:00Z".to_string();
        assert!(quote.is_expired(chrono::Utc::now()));

        quote.data_mut().expires_at = "soon".to_string();
        assert!(quote.expires_at().is_err());
        assert!(quote.is_expired(chrono::Utc::now()));
    }

    #[test]
    fn valid_next_per_kind() {
        let alice = generate_party(Algorithm::EdDsa).unwrap();
        let pfi = generate_party(Algorithm::Es256k).unwrap();
        let rfq = rfq(&alice, &pfi);
        let close = dev_tools::create_close(&pfi, &rfq, None).unwrap();

        assert_eq!(
            AnyMessage::from(rfq).valid_next(),
            &[MessageKind::Quote, MessageKind::Close]
        );
        assert!(AnyMessage::from(close).valid_next().is_empty());
    }
}
