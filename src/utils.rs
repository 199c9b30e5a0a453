use crate::errors::PayError;
use base64::{engine::general_purpose, DecodeError, Engine as _};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, PKeyRef, Private, Public};
use openssl::sign::{Signer, Verifier};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fs;
use time::OffsetDateTime;

/// 金额币种，微信国内商户固定人民币
pub const CURRENCY: &str = "CNY";
/// 主单位(元)到最小单位(分)的倍数
pub const FEN_PER_YUAN: u32 = 100;

pub fn gen_nonce(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn now_ts() -> String {
    OffsetDateTime::now_utc().unix_timestamp().to_string()
}

/// 元转分，四舍五入(ROUND_HALF_UP)，不经过浮点
pub fn yuan_to_fen(amount: Decimal) -> Result<i64, PayError> {
    amount
        .checked_mul(Decimal::from(FEN_PER_YUAN))
        .map(|fen| fen.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|fen| fen.to_i64())
        .ok_or_else(|| PayError::Invalid(format!("amount out of range: {}", amount)))
}

/// 启动时一次性加载商户私钥，后续签名复用同一句柄
pub fn load_private_key(path: &str) -> Result<PKey<Private>, PayError> {
    let pem = fs::read(path)
        .map_err(|e| PayError::Config(format!("read private key {}: {}", path, e)))?;
    PKey::private_key_from_pem(&pem)
        .map_err(|e| PayError::Config(format!("parse private key {}: {}", path, e)))
}

/// SHA256withRSA 签名，结果base64编码
pub fn rsa_sign_sha256(key: &PKeyRef<Private>, data: &[u8]) -> Result<String, PayError> {
    let sign = || -> Result<Vec<u8>, openssl::error::ErrorStack> {
        let mut signer = Signer::new(MessageDigest::sha256(), key)?;
        signer.update(data)?;
        signer.sign_to_vec()
    };
    let sig = sign().map_err(|e| PayError::Crypto(e.to_string()))?;
    Ok(base64_encode(sig))
}

pub fn rsa_verify_sha256(
    key: &PKeyRef<Public>,
    data: &[u8],
    signature_b64: &str,
) -> Result<bool, PayError> {
    let sig = base64_decode(signature_b64).map_err(|e| PayError::Crypto(e.to_string()))?;
    let verify = || -> Result<bool, openssl::error::ErrorStack> {
        let mut verifier = Verifier::new(MessageDigest::sha256(), key)?;
        verifier.update(data)?;
        verifier.verify(&sig)
    };
    verify().map_err(|e| PayError::Crypto(e.to_string()))
}

pub fn base64_encode<T>(input: T) -> String
where
    T: AsRef<[u8]>,
{
    general_purpose::STANDARD.encode(input)
}

pub fn base64_decode<T>(input: T) -> Result<Vec<u8>, DecodeError>
where
    T: AsRef<[u8]>,
{
    general_purpose::STANDARD.decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::rsa::Rsa;
    use std::collections::HashSet;

    fn yuan(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn yuan_to_fen_rounds_half_up() {
        assert_eq!(yuan_to_fen(yuan("19.99")).unwrap(), 1999);
        assert_eq!(yuan_to_fen(yuan("19.995")).unwrap(), 2000);
        assert_eq!(yuan_to_fen(yuan("0.01")).unwrap(), 1);
        assert_eq!(yuan_to_fen(yuan("88.80")).unwrap(), 8880);
        assert_eq!(yuan_to_fen(yuan("0.004")).unwrap(), 0);
        assert_eq!(yuan_to_fen(yuan("0.005")).unwrap(), 1);
    }

    #[test]
    fn yuan_to_fen_extreme_amount_is_invalid_not_panic() {
        let err = yuan_to_fen(Decimal::MAX).unwrap_err();
        assert!(matches!(err, PayError::Invalid(_)));
    }

    #[test]
    fn nonce_is_32_alphanumeric_and_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let n = gen_nonce(32);
            assert_eq!(n.len(), 32);
            assert!(n.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(seen.insert(n));
        }
    }

    #[test]
    fn missing_key_file_is_config_error() {
        let err = load_private_key("/no/such/key.pem").unwrap_err();
        assert!(matches!(err, PayError::Config(_)));
    }

    #[test]
    fn sign_then_verify_roundtrip() {
        let rsa = Rsa::generate(2048).unwrap();
        let key = PKey::from_rsa(rsa).unwrap();
        let pub_key = PKey::public_key_from_pem(&key.public_key_to_pem().unwrap()).unwrap();

        let sig = rsa_sign_sha256(&key, b"hello\n").unwrap();
        assert!(rsa_verify_sha256(&pub_key, b"hello\n", &sig).unwrap());
        assert!(!rsa_verify_sha256(&pub_key, b"tampered\n", &sig).unwrap());
    }
}
