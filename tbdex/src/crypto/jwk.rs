use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::Signer as _;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;

const ED25519_KEY_SIZE: usize = 32;
const SECP256K1_COORDINATE_SIZE: usize = 32;

/// JWS signature algorithms understood by this crate
#[derive(Copy, Clone, Debug, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub enum Algorithm {
    #[serde(rename = "EdDSA")]
    EdDsa,
    #[serde(rename = "ES256K")]
    Es256k,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::EdDsa => "EdDSA",
            Algorithm::Es256k => "ES256K",
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            Algorithm::EdDsa => Curve::Ed25519,
            Algorithm::Es256k => Curve::Secp256k1,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Curves backing the supported algorithms
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Curve {
    Ed25519,
    Secp256k1,
}

impl Curve {
    /// Look up the curve for a JWK `(kty, crv)` pair
    pub fn from_jwk(kty: &str, crv: &str) -> Result<Curve, CryptoError> {
        match (kty, crv) {
            ("OKP", "Ed25519") => Ok(Curve::Ed25519),
            ("EC", "secp256k1") => Ok(Curve::Secp256k1),
            _ => Err(CryptoError::UnsupportedKey {
                kty: kty.to_string(),
                crv: crv.to_string(),
            }),
        }
    }

    pub fn key_type(&self) -> &'static str {
        match self {
            Curve::Ed25519 => "OKP",
            Curve::Secp256k1 => "EC",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Curve::Ed25519 => "Ed25519",
            Curve::Secp256k1 => "secp256k1",
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Curve::Ed25519 => Algorithm::EdDsa,
            Curve::Secp256k1 => Algorithm::Es256k,
        }
    }
}

/// Public key in JSON Web Key form, as found in DID documents
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PublicJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl PublicJwk {
    pub fn curve(&self) -> Result<Curve, CryptoError> {
        Curve::from_jwk(&self.kty, &self.crv)
    }

    /// Whether both JWKs hold the same key material, ignoring `alg` and `kid`
    pub fn same_key(&self, other: &PublicJwk) -> bool {
        self.kty == other.kty && self.crv == other.crv && self.x == other.x && self.y == other.y
    }

    pub fn from_ed25519_bytes(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != ED25519_KEY_SIZE {
            return Err(CryptoError::InvalidKey("Ed25519 public key must be 32 bytes"));
        }

        Ok(Self::new(Curve::Ed25519, key, None))
    }

    /// Accepts both compressed and uncompressed SEC1 encodings
    pub fn from_secp256k1_sec1(key: &[u8]) -> Result<Self, CryptoError> {
        let public = k256::PublicKey::from_sec1_bytes(key)
            .map_err(|_| CryptoError::InvalidKey("invalid secp256k1 public key"))?;

        Self::from_secp256k1(&public)
    }

    fn from_secp256k1(public: &k256::PublicKey) -> Result<Self, CryptoError> {
        let point = public.to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(CryptoError::InvalidKey("secp256k1 public key is the identity"));
        };

        Ok(Self::new(Curve::Secp256k1, x, Some(y)))
    }

    fn new(curve: Curve, x: &[u8], y: Option<&[u8]>) -> Self {
        Self {
            kty: curve.key_type().to_string(),
            crv: curve.name().to_string(),
            x: Base64UrlUnpadded::encode_string(x),
            y: y.map(Base64UrlUnpadded::encode_string),
            alg: None,
            kid: None,
        }
    }

    /// Compressed SEC1 encoding for secp256k1 keys, raw bytes for Ed25519
    pub fn to_key_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        match self.curve()? {
            Curve::Ed25519 => Ok(decode_fixed::<ED25519_KEY_SIZE>(&self.x)?.to_vec()),
            Curve::Secp256k1 => Ok(self
                .secp256k1_key()?
                .to_encoded_point(true)
                .as_bytes()
                .to_vec()),
        }
    }

    fn secp256k1_key(&self) -> Result<k256::PublicKey, CryptoError> {
        let x = decode_fixed::<SECP256K1_COORDINATE_SIZE>(&self.x)?;
        let y = decode_fixed::<SECP256K1_COORDINATE_SIZE>(
            self.y
                .as_deref()
                .ok_or(CryptoError::InvalidKey("secp256k1 key is missing 'y'"))?,
        )?;

        let mut sec1 = Vec::with_capacity(1 + 2 * SECP256K1_COORDINATE_SIZE);
        sec1.push(0x04);
        sec1.extend_from_slice(&x);
        sec1.extend_from_slice(&y);

        k256::PublicKey::from_sec1_bytes(&sec1)
            .map_err(|_| CryptoError::InvalidKey("secp256k1 point is not on the curve"))
    }

    /// Check `signature` over `message` using the algorithm implied by this key's curve
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        match self.curve()? {
            Curve::Ed25519 => {
                let key = decode_fixed::<ED25519_KEY_SIZE>(&self.x)?;
                let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&key)
                    .map_err(|err| CryptoError::Verify(err.to_string()))?;
                let signature = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|err| CryptoError::Verify(err.to_string()))?;

                verifying_key
                    .verify_strict(message, &signature)
                    .map_err(|err| CryptoError::Verify(err.to_string()))
            }
            Curve::Secp256k1 => {
                let verifying_key = k256::ecdsa::VerifyingKey::from(self.secp256k1_key()?);
                let signature = k256::ecdsa::Signature::from_slice(signature)
                    .map_err(|err| CryptoError::Verify(err.to_string()))?;
                let signature = signature.normalize_s().unwrap_or(signature);

                k256::ecdsa::signature::Verifier::verify(&verifying_key, message, &signature)
                    .map_err(|err| CryptoError::Verify(err.to_string()))
            }
        }
    }
}

/// Private key in JSON Web Key form
#[derive(Clone, Zeroize, ZeroizeOnDrop, Deserialize, Serialize)]
pub struct PrivateJwk {
    kty: String,
    crv: String,
    x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<String>,
    d: String,
}

/// A custom implementation of Debug for PrivateJwk to avoid key material from leaking during panics.
impl fmt::Debug for PrivateJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateJwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("d", &"<secret>")
            .finish()
    }
}

impl PrivateJwk {
    /// Generate a new key on `curve`
    pub fn generate(curve: Curve) -> Self {
        match curve {
            Curve::Ed25519 => {
                let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
                let public =
                    PublicJwk::new(curve, signing_key.verifying_key().as_bytes(), None);

                Self::from_parts(public, &signing_key.to_bytes())
            }
            Curve::Secp256k1 => {
                let secret = k256::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false);
                // a freshly generated key is never the identity point
                let public = PublicJwk::new(
                    curve,
                    point.x().map(|x| x.as_slice()).unwrap_or_default(),
                    point.y().map(|y| y.as_slice()),
                );

                Self::from_parts(public, &secret.to_bytes())
            }
        }
    }

    fn from_parts(public: PublicJwk, secret: &[u8]) -> Self {
        Self {
            kty: public.kty,
            crv: public.crv,
            x: public.x,
            y: public.y,
            d: Base64UrlUnpadded::encode_string(secret),
        }
    }

    pub fn curve(&self) -> Result<Curve, CryptoError> {
        Curve::from_jwk(&self.kty, &self.crv)
    }

    pub fn public(&self) -> PublicJwk {
        PublicJwk {
            kty: self.kty.clone(),
            crv: self.crv.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            alg: None,
            kid: None,
        }
    }

    /// Sign `message` using the algorithm implied by this key's curve
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.curve()? {
            Curve::Ed25519 => {
                let secret = decode_fixed::<ED25519_KEY_SIZE>(&self.d)?;
                let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);

                Ok(signing_key.sign(message).to_bytes().to_vec())
            }
            Curve::Secp256k1 => {
                let secret = decode_fixed::<SECP256K1_COORDINATE_SIZE>(&self.d)?;
                let signing_key = k256::ecdsa::SigningKey::from_slice(&secret)
                    .map_err(|_| CryptoError::InvalidKey("invalid secp256k1 private key"))?;
                let signature: k256::ecdsa::Signature =
                    k256::ecdsa::signature::Signer::sign(&signing_key, message);

                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

fn decode_fixed<const N: usize>(encoded: &str) -> Result<[u8; N], CryptoError> {
    Base64UrlUnpadded::decode_vec(encoded)?
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("unexpected key length"))
}
