// src/signing.rs
//
// Signature helpers for inbound payment notifications. Two schemes:
// - checkout provider: HMAC-SHA256 over the raw webhook body, hex encoded,
//   shared webhook secret;
// - redirect-pay provider: MD5 over lexicographically sorted parameters with
//   the merchant key appended (the provider's legacy scheme).

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;
use std::collections::HashMap;

pub fn hmac_sha256_hex(secret: &str, data: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_hmac_sha256_hex(secret: &str, data: &[u8], signature: &str) -> bool {
    hmac_sha256_hex(secret, data).eq_ignore_ascii_case(signature.trim())
}

/// `sign` = md5(k1=v1&k2=v2&...&<key>) over non-empty params sorted by key,
/// excluding `sign` and `sign_type`. Lowercase hex.
pub fn redirect_pay_sign(params: &HashMap<String, String>, key: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, v)| k.as_str() != "sign" && k.as_str() != "sign_type" && !v.is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut data = String::new();
    for (k, v) in pairs {
        data.push_str(k);
        data.push('=');
        data.push_str(v);
        data.push('&');
    }
    data.push_str(key);

    let mut hasher = Md5::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_redirect_pay_sign(params: &HashMap<String, String>, key: &str) -> bool {
    let Some(sign) = params.get("sign") else {
        return false;
    };
    redirect_pay_sign(params, key).eq_ignore_ascii_case(sign.trim())
}
