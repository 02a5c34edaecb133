//! 紧凑序列化 JWE，`alg = RSA-OAEP-256`，`enc = A128CBC-HS256`。
//!
//! 客户端在会话设置里登记 RSA 公钥 (JWK)，日记列表用它加密后下发。

use aes::Aes128;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{Hmac, Mac};
use rsa::rand_core::{OsRng, RngCore};
use rsa::{BigUint, Oaep, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const PROTECTED_HEADER: &str = r#"{"alg":"RSA-OAEP-256","enc":"A128CBC-HS256"}"#;
const CEK_LEN: usize = 32;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("rsa error: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("cipher initialisation failed")]
    Cipher,
}

/// RSA 公钥 (JWK)，其余成员忽略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicJwk {
    pub kty: String,
    pub n: String,
    pub e: String,
}

impl PublicJwk {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CryptoError> {
        let jwk: PublicJwk = serde_json::from_value(value.clone())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        jwk.to_rsa()?;
        Ok(jwk)
    }

    fn to_rsa(&self) -> Result<RsaPublicKey, CryptoError> {
        if self.kty != "RSA" {
            return Err(CryptoError::InvalidKey(format!(
                "unsupported key type {}",
                self.kty
            )));
        }
        let n = decode_part(&self.n)?;
        let e = decode_part(&self.e)?;
        Ok(RsaPublicKey::new(
            BigUint::from_bytes_be(&n),
            BigUint::from_bytes_be(&e),
        )?)
    }
}

fn decode_part(part: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(part.trim_end_matches('='))
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// 加密为 `header.encrypted_key.iv.ciphertext.tag`
pub fn encrypt_compact(plaintext: &[u8], jwk: &PublicJwk) -> Result<String, CryptoError> {
    let public_key = jwk.to_rsa()?;

    let mut cek = [0u8; CEK_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut cek);
    OsRng.fill_bytes(&mut iv);

    let encrypted_key = public_key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek)?;

    let header = URL_SAFE_NO_PAD.encode(PROTECTED_HEADER);
    let (ciphertext, tag) = seal(&cek, &iv, header.as_bytes(), plaintext)?;

    Ok(format!(
        "{}.{}.{}.{}.{}",
        header,
        URL_SAFE_NO_PAD.encode(encrypted_key),
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

/// A128CBC-HS256：CEK 前半为 MAC 密钥，后半为 AES 密钥，返回 (密文, 认证标签)
fn seal(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    if cek.len() != CEK_LEN {
        return Err(CryptoError::Cipher);
    }
    let (mac_key, enc_key) = cek.split_at(CEK_LEN / 2);

    let ciphertext = cbc::Encryptor::<Aes128>::new_from_slices(enc_key, iv)
        .map_err(|_| CryptoError::Cipher)?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    // HMAC-SHA256(AAD || IV || 密文 || AL)，取前 16 字节
    let mut mac = Hmac::<Sha256>::new_from_slice(mac_key).map_err(|_| CryptoError::Cipher)?;
    mac.update(aad);
    mac.update(iv);
    mac.update(&ciphertext);
    mac.update(&((aad.len() as u64) * 8).to_be_bytes());
    let tag = mac.finalize().into_bytes()[..TAG_LEN].to_vec();

    Ok((ciphertext, tag))
}
