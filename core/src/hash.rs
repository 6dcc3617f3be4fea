//! Hash related utils.

use hmac::Hmac;
use hmac::Mac;
use sha2::Digest;
use sha2::Sha256;

/// Calculate SHA256 digest of the input, returned as a lowercase hex string.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content).as_slice())
}

/// Calculate HMAC-SHA256 of the content with the given key.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> Vec<u8> {
    let mut h = Hmac::<Sha256>::new_from_slice(key)
        .expect("HMAC can take key of any size, should never fail");
    h.update(content);
    h.finalize().into_bytes().to_vec()
}

/// Calculate HMAC-SHA256 of the content with the given key, returned as a
/// lowercase hex string.
pub fn hex_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    hex::encode(hmac_sha256(key, content))
}
