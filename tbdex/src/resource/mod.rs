//! Resources a PFI publishes outside of any exchange.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{borrow::Cow, fmt::Debug};

use crate::{
    Error,
    crypto::{Digest, Signer},
    definitions::{DEFAULT_PROTOCOL_VERSION, ResourceKind, generate_id, now_timestamp},
    did::DidResolver,
    envelope::{self, ParseError},
    schema::{self, SchemaName},
};

mod balance;
mod offering;

pub use balance::{Balance, BalanceData};
pub use offering::{CurrencyDetails, Offering, OfferingData, PaymentMethod};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    /// The PFI's DID
    pub from: String,
    pub kind: ResourceKind,
    pub id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateResourceMetadata {
    pub from: String,
    /// Defaults to [DEFAULT_PROTOCOL_VERSION]
    pub protocol: Option<String>,
}

pub trait ResourceData:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync
{
    const KIND: ResourceKind;
}

/// A resource that has been created but not yet signed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsignedResource<D> {
    metadata: ResourceMetadata,
    data: D,
}

impl<D: ResourceData> UnsignedResource<D> {
    pub fn create(metadata: CreateResourceMetadata, data: D) -> Result<Self, Error> {
        let resource = Self {
            metadata: ResourceMetadata {
                from: metadata.from,
                kind: D::KIND,
                id: generate_id(D::KIND.as_str()),
                created_at: now_timestamp(),
                updated_at: None,
                protocol: metadata
                    .protocol
                    .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
            },
            data,
        };

        resource.validate_data()?;

        Ok(resource)
    }

    pub fn validate_data(&self) -> Result<(), Error> {
        validate_data::<D>(&self.data)
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn sign(self, signer: &dyn Signer) -> Result<Resource<D>, Error> {
        let signature = envelope::sign(&self.metadata, &self.data, signer)?;

        tracing::trace!("signed {} {}", self.metadata.kind, self.metadata.id);

        Ok(Resource {
            metadata: self.metadata,
            data: self.data,
            signature,
            received: None,
        })
    }
}

/// A signed resource
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Resource<D> {
    metadata: ResourceMetadata,
    data: D,
    signature: String,
    /// The JSON this resource was parsed from, which the signature covers
    #[serde(skip)]
    received: Option<Value>,
}

impl<D: PartialEq> PartialEq for Resource<D> {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata && self.data == other.data && self.signature == other.signature
    }
}

impl<D: ResourceData> Resource<D> {
    /// Parse a resource from JSON text or bytes and verify it
    pub async fn parse(raw: impl AsRef<[u8]>, resolver: &dyn DidResolver) -> Result<Self, Error> {
        let value = envelope::parse_json(raw.as_ref())?;

        Self::parse_value(value, resolver).await
    }

    pub async fn parse_value(value: Value, resolver: &dyn DidResolver) -> Result<Self, Error> {
        let resource = Self::decode(value)?;
        resource.verify(resolver).await?;

        Ok(resource)
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

        let mut resource: Self =
            envelope::decode(value.clone(), SchemaName::Resource, D::KIND.schema())?;
        resource.received = Some(value);

        Ok(resource)
    }

    /// Validate both schemas and the signature; returns the signer's DID
    pub async fn verify(&self, resolver: &dyn DidResolver) -> Result<String, Error> {
        let value = match &self.received {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(serde_json::to_value(self)?),
        };
        envelope::validate(&value, SchemaName::Resource, D::KIND.schema())?;

        let digest = envelope::digest(&value["metadata"], &value["data"])?;
        envelope::verify_signature(&self.signature, &digest, &self.metadata.from, resolver).await
    }

    pub fn validate_data(&self) -> Result<(), Error> {
        validate_data::<D>(&self.data)
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn digest(&self) -> Result<Digest, Error> {
        match &self.received {
            Some(value) => envelope::digest(&value["metadata"], &value["data"]),
            None => envelope::digest(&self.metadata, &self.data),
        }
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

fn validate_data<D: ResourceData>(data: &D) -> Result<(), Error> {
    schema::validate(D::KIND.schema(), &serde_json::to_value(data)?)?;

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyResource {
    Offering(Offering),
    Balance(Balance),
}

impl AnyResource {
    pub async fn parse(raw: impl AsRef<[u8]>, resolver: &dyn DidResolver) -> Result<Self, Error> {
        let value = envelope::parse_json(raw.as_ref())?;
        let kind = envelope::read_kind(&value)?
            .parse::<ResourceKind>()
            .map_err(ParseError::UnknownKind)?;

        let resource = match kind {
            ResourceKind::Offering => AnyResource::Offering(Resource::decode(value)?),
            ResourceKind::Balance => AnyResource::Balance(Resource::decode(value)?),
        };
        resource.verify(resolver).await?;

        Ok(resource)
    }

    pub async fn verify(&self, resolver: &dyn DidResolver) -> Result<String, Error> {
        match self {
            AnyResource::Offering(resource) => resource.verify(resolver).await,
            AnyResource::Balance(resource) => resource.verify(resolver).await,
        }
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        match self {
            AnyResource::Offering(resource) => resource.metadata(),
            AnyResource::Balance(resource) => resource.metadata(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.metadata().kind
    }

    pub fn id(&self) -> &str {
        &self.metadata().id
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Offering> for AnyResource {
    fn from(resource: Offering) -> Self {
        AnyResource::Offering(resource)
    }
}

impl From<Balance> for AnyResource {
    fn from(resource: Balance) -> Self {
        AnyResource::Balance(resource)
    }
}

#[cfg(test)]
impl<D> Resource<D> {
    pub(crate) fn metadata_mut(&mut self) -> &mut ResourceMetadata {
        self.received = None;
        &mut self.metadata
    }

    pub(crate) fn data_mut(&mut self) -> &mut D {
        self.received = None;
        &mut self.data
    }
}
