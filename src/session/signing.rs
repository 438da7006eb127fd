//! Signed session cookie values.
//!
//! A cookie value has the form `s:<session id>.<signature>` where the
//! signature is the unpadded base64 HMAC-SHA256 of the session id under the
//! configured secret.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "s:";

/// Signs and verifies session ids.
#[derive(Clone)]
pub struct CookieSigner {
    keyed: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &str) -> Self {
        let keyed = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        Self { keyed }
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    pub fn sign(&self, id: &Uuid) -> String {
        let id = id.to_string();
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        let signature = STANDARD_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}{}.{}", PREFIX, id, signature)
    }

    /// Returns the session id when the value carries a valid signature.
    pub fn verify(&self, value: &str) -> Option<Uuid> {
        let signed = value.strip_prefix(PREFIX)?;
        let (id, signature) = signed.rsplit_once('.')?;
        let signature = STANDARD_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Uuid::parse_str(id).ok()
    }
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}
