use russh::client::Handler;
use russh::keys::PublicKeyBase64;
use tracing::{info, warn};

pub(crate) struct Client {
    pub allowed_fingerprints: Option<Vec<String>>, // OpenSSH SHA256 or raw base64 keys
}

impl Client {
    fn accepts(&self, fp_sha256: &str, key_b64: &str) -> bool {
        match &self.allowed_fingerprints {
            Some(allowed) => allowed.iter().any(|s| s == fp_sha256 || s == key_b64),
            None => true,
        }
    }
}

impl Handler for Client {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let fp_sha256 = server_public_key
            .fingerprint(russh::keys::HashAlg::Sha256)
            .to_string();
        let key_b64 = server_public_key.public_key_base64();
        let ok = self.accepts(&fp_sha256, &key_b64);
        if self.allowed_fingerprints.is_none() {
            info!("accepting server key {} (no allow-list)", fp_sha256);
        } else if !ok {
            warn!("server key {} not in allow-list", fp_sha256);
        }
        Ok(ok)
    }
}
