#![deny(rustdoc::broken_intra_doc_links)]

//! # tbDEX
//!
//! tbDEX is a protocol for negotiating currency exchanges between a
//! requester (Alice) and a Participating Financial Institution (PFI).
//!
//! A PFI publishes signed [resources](resource), most importantly
//! [Offering]s. Alice starts an [Exchange] by sending an [Rfq] against an
//! offering; the PFI answers with a [Quote], Alice places an [Order], the
//! PFI reports [OrderStatus] updates and either side ends the exchange
//! with a [Close].
//!
//! Every message and resource is a `{metadata, data, signature}` envelope.
//! The signature is a detached compact JWS over the SHA-256 digest of the
//! canonical JSON form of `{metadata, data}`, made with a key of the DID in
//! `metadata.from`.
//!
//! ## Features
//!
//! - `resolve` (default): resolve `did:web` documents over HTTPS.
//!   `did:key` always resolves offline.
//! - `test-utils`: expose the `dev_tools` fixtures.
//! - `fuzzing`: expose decode entry points that skip verification.
//!
//! ## Example
//!
//! ```rust
//! use tbdex::{
//!     Algorithm, AnyMessage, BearerDid, CreateMetadata, Error, Exchange, OrderData, UniversalResolver,
//!     UnsignedMessage,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Error> {
//! let alice = BearerDid::generate(Algorithm::EdDsa)?;
//! let pfi = BearerDid::generate(Algorithm::Es256k)?;
//! let resolver = UniversalResolver::default();
//!
//! // an order is only valid after an rfq and a quote
//! let order = UnsignedMessage::create(
//!     CreateMetadata {
//!         from: alice.uri().to_string(),
//!         to: pfi.uri().to_string(),
//!         exchange_id: Some("rfq_01h8yq3vbsf5y9q4r3kzq5zw2n".to_string()),
//!         ..Default::default()
//!     },
//!     OrderData {},
//! )?
//! .sign(&alice)?;
//!
//! let json = order.to_json_string()?;
//! let parsed = AnyMessage::parse(&json, &resolver).await?;
//! assert_eq!(parsed.to_json_string()?, json);
//!
//! let mut exchange = Exchange::new();
//! assert!(exchange.add_next_message(parsed).is_err());
//! # Ok(())
//! # }
//! ```

/// Canonical digests, JWK keys and compact JWS signatures
pub mod crypto;

/// Message and resource kinds, id generation and timestamps
pub mod definitions;

/// DID documents and resolution of `did:key` and `did:web`
pub mod did;

/// Test fixtures: parties, offerings, messages and credentials
#[cfg(any(test, feature = "test-utils"))]
pub mod dev_tools;

mod envelope;
mod error;
pub mod exchange;
pub mod message;
pub mod presentation;
pub mod resource;
pub mod schema;


pub use crypto::{Algorithm, Curve, PrivateJwk, PublicJwk, SignatureError, Signer};
pub use definitions::{DEFAULT_PROTOCOL_VERSION, MessageKind, ResourceKind};
pub use did::{BearerDid, DidDocument, DidResolver, UniversalResolver};
pub use envelope::ParseError;
pub use error::Error;
pub use exchange::{Exchange, ExchangeError};
pub use message::{
    AnyMessage, Close, CloseData, CreateMetadata, Message, MessageMetadata, OfferingRequirementError,
    Order, OrderData, OrderStatus, OrderStatusData, Quote, QuoteData, Rfq, RfqData, UnsignedMessage,
};
pub use presentation::{FieldPathEvaluator, PresentationDefinition, PresentationExchange};
pub use resource::{
    AnyResource, Balance, BalanceData, CreateResourceMetadata, Offering, OfferingData, Resource,
    ResourceMetadata, UnsignedResource,
};
pub use schema::SchemaError;
