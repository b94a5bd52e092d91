//! Instance identity
//!
//! Every installation owns one Ed25519 key pair. Only the public half is used
//! here: its DER encoding, base64-encoded, is the fingerprint that the webhook
//! endpoint hands back to URL probes so that a candidate hook URL can be tied to
//! this exact installation rather than to whatever answers on that address.

use std::fs;
use std::io::Write;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Error, Result};

/// Provider of this installation's public identity key
pub trait InstanceIdentity: Send + Sync {
    /// DER-encoded (SubjectPublicKeyInfo) public key
    fn public_key_der(&self) -> &[u8];

    /// Base64 of the DER public key, as carried in `X-Instance-Identity`
    fn fingerprint(&self) -> String {
        STANDARD.encode(self.public_key_der())
    }

    /// Short hex digest of the public key for log lines
    fn short_digest(&self) -> String {
        let digest = Sha256::digest(self.public_key_der());
        hex::encode(&digest[..8])
    }
}

/// Ed25519-backed identity, persisted as a PKCS#8 PEM file
pub struct Ed25519Identity {
    signing_key: SigningKey,
    public_der: Vec<u8>,
}

impl Ed25519Identity {
    /// Generate a fresh, unpersisted identity
    pub fn generate() -> Result<Self> {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Parse an identity from a PKCS#8 PEM private key
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| Error::IdentityError(format!("Invalid PKCS#8 key: {e}")))?;
        Self::from_signing_key(signing_key)
    }

    /// Load the identity key at `path`, creating it on first start
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        if path.exists() {
            let pem = fs::read_to_string(path)?;
            let identity = Self::from_pkcs8_pem(&pem)?;
            info!(
                "Loaded instance identity {} from {}",
                identity.short_digest(),
                path.display()
            );
            return Ok(identity);
        }

        let identity = Self::generate()?;
        identity.write_pem(path)?;
        info!(
            "Generated new instance identity {} at {}",
            identity.short_digest(),
            path.display()
        );
        Ok(identity)
    }

    fn from_signing_key(signing_key: SigningKey) -> Result<Self> {
        let public_der = signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| Error::IdentityError(format!("Failed to encode public key: {e}")))?
            .as_bytes()
            .to_vec();
        Ok(Self {
            signing_key,
            public_der,
        })
    }

    fn write_pem(&self, path: &Path) -> Result<()> {
        let pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::IdentityError(format!("Failed to encode private key: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(pem.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

impl InstanceIdentity for Ed25519Identity {
    fn public_key_der(&self) -> &[u8] {
        &self.public_der
    }
}

impl std::fmt::Debug for Ed25519Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Identity")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_base64_of_der() {
        let identity = Ed25519Identity::generate().unwrap();
        let decoded = STANDARD.decode(identity.fingerprint()).unwrap();
        assert_eq!(decoded, identity.public_key_der());
        // Ed25519 SubjectPublicKeyInfo is 12 bytes of header plus the 32-byte key
        assert_eq!(decoded.len(), 44);
    }

    #[test]
    fn test_distinct_installations_have_distinct_fingerprints() {
        let a = Ed25519Identity::generate().unwrap();
        let b = Ed25519Identity::generate().unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_load_or_generate_is_stable_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("identity.pem");

        let first = Ed25519Identity::load_or_generate(&path).unwrap();
        assert!(path.exists());
        let second = Ed25519Identity::load_or_generate(&path).unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.short_digest(), second.short_digest());
        assert_eq!(first.short_digest().len(), 16);
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.pem");
        Ed25519Identity::load_or_generate(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_invalid_pem_is_rejected() {
        let err = Ed25519Identity::from_pkcs8_pem("not a key").unwrap_err();
        assert!(matches!(err, Error::IdentityError(_)));
    }

    #[test]
    fn test_debug_does_not_expose_private_key() {
        let identity = Ed25519Identity::generate().unwrap();
        let rendered = format!("{identity:?}");
        assert!(rendered.contains("fingerprint"));
        assert!(!rendered.contains("signing_key"));
    }
}
