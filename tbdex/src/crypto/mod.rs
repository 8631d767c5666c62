pub use digest::{Digest, canonicalize, digest, sha256};
pub use error::{CryptoError, SignatureError};
pub use jwk::{Algorithm, Curve, PrivateJwk, PublicJwk};

mod digest;
pub mod error;
mod jwk;
pub mod jws;

/// A key able to produce signatures on behalf of a DID
pub trait Signer: Send + Sync {
    /// The DID URL (`did#fragment`) of the verification method holding the public key
    fn key_id(&self) -> &str;

    /// The algorithm the signature is produced with
    fn algorithm(&self) -> Algorithm;

    /// Sign arbitrary bytes
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Generate a new signing key pair on `curve`
pub fn gen_sign_keypair(curve: Curve) -> (PrivateJwk, PublicJwk) {
    let private = PrivateJwk::generate(curve);
    let public = private.public();

    (private, public)
}
