use cognate_types::ContentHash;

/// Boundary to an external signer.
///
/// The ledger does not manage keys. A signer is handed an entry's content
/// hash after it is computed and returns a hex signature that the recorder
/// stores alongside `key_id` in the entry's crypto seal.
pub trait EntrySigner: Send + Sync {
    /// Identifier of the key used, stored as `keyId`.
    fn key_id(&self) -> &str;

    /// Sign a content hash, returning a hex-encoded signature.
    fn sign(&self, content_hash: &ContentHash) -> Result<String, SignatureError>;
}

/// [`EntrySigner`] backed by an Ed25519 key supplied by the caller.
pub struct Ed25519EntrySigner {
    key: ed25519_dalek::SigningKey,
    key_id: String,
}

impl Ed25519EntrySigner {
    /// Create from a raw 32-byte secret provisioned elsewhere.
    pub fn from_bytes(secret: [u8; 32], key_id: impl Into<String>) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(&secret),
            key_id: key_id.into(),
        }
    }

    /// Generate a random key, for tests and local demos.
    pub fn generate(key_id: impl Into<String>) -> Self {
        let mut csprng = rand::thread_rng();
        Self {
            key: ed25519_dalek::SigningKey::generate(&mut csprng),
            key_id: key_id.into(),
        }
    }

    /// Raw public key bytes for [`verify_signature`].
    pub fn verifying_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }
}

impl EntrySigner for Ed25519EntrySigner {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn sign(&self, content_hash: &ContentHash) -> Result<String, SignatureError> {
        use ed25519_dalek::Signer;
        Ok(hex::encode(self.key.sign(content_hash.as_bytes()).to_bytes()))
    }
}

impl std::fmt::Debug for Ed25519EntrySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519EntrySigner({}, <redacted>)", self.key_id)
    }
}

/// Check a hex Ed25519 signature over a content hash.
pub fn verify_signature(
    public_key: &[u8; 32],
    content_hash: &ContentHash,
    signature_hex: &str,
) -> Result<(), SignatureError> {
    use ed25519_dalek::Verifier;

    let key = ed25519_dalek::VerifyingKey::from_bytes(public_key)
        .map_err(|_| SignatureError::InvalidKey)?;
    let bytes = hex::decode(signature_hex).map_err(|_| SignatureError::MalformedSignature)?;
    let arr: [u8; 64] = bytes
        .try_into()
        .map_err(|_| SignatureError::MalformedSignature)?;
    key.verify(
        content_hash.as_bytes(),
        &ed25519_dalek::Signature::from_bytes(&arr),
    )
    .map_err(|_| SignatureError::InvalidSignature)
}

/// Errors from signing operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed signature encoding")]
    MalformedSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("external signer failed: {0}")]
    Signer(String),
}
