//! RSA public key reconstruction from JWK `n` and `e` fields.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::DecodingKey;

use crate::error::Error;
use crate::error::Result;
use crate::key_directory::SigningKey;

/// Modulus and exponent of an RSA public key, as unsigned integers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaComponents {
    /// Big-endian magnitude without leading zero bytes
    pub modulus: Vec<u8>,
    pub exponent: u32,
}

impl RsaComponents {
    /// Decode `n` and `e` of `key`.
    ///
    /// Both are base64url big-endian integers. The exponent has to fit in 32 bits.
    pub fn from_signing_key(key: &SigningKey) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidSigningKey {
            kid: key.kid.clone(),
            reason,
        };

        let modulus = decode_unsigned(&key.n).map_err(|e| invalid(format!("modulus: {e}")))?;
        let exponent = decode_unsigned(&key.e).map_err(|e| invalid(format!("exponent: {e}")))?;

        if exponent.len() > 4 {
            return Err(invalid(format!(
                "exponent is {} bytes, expected at most 4",
                exponent.len()
            )));
        }

        let exponent = exponent
            .iter()
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));

        Ok(Self { modulus, exponent })
    }

    pub fn to_decoding_key(&self) -> DecodingKey {
        let exponent = self.exponent.to_be_bytes();
        let skip = exponent.iter().take_while(|b| **b == 0).count();

        DecodingKey::from_rsa_raw_components(&self.modulus, &exponent[skip..])
    }
}

/// Build the verification key for `key`.
pub fn decoding_key(key: &SigningKey) -> Result<DecodingKey> {
    RsaComponents::from_signing_key(key).map(|components| components.to_decoding_key())
}

fn decode_unsigned(field: &str) -> std::result::Result<Vec<u8>, String> {
    let bytes = URL_SAFE_NO_PAD.decode(field).map_err(|e| e.to_string())?;

    let magnitude: Vec<u8> = bytes.into_iter().skip_while(|b| *b == 0).collect();
    if magnitude.is_empty() {
        return Err("value is zero or missing".to_string());
    }

    Ok(magnitude)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn key(n: &str, e: &str) -> SigningKey {
        SigningKey {
            kty: "RSA".to_string(),
            alg: "RS256".to_string(),
            usage: "sig".to_string(),
            kid: "K1".to_string(),
            n: n.to_string(),
            e: e.to_string(),
        }
    }

    #[test]
    fn decodes_standard_exponent() {
        let components = RsaComponents::from_signing_key(&key("AQID", "AQAB")).unwrap();

        assert_eq!(components.modulus, vec![1, 2, 3]);
        assert_eq!(components.exponent, 65537);
    }

    #[test]
    fn strips_leading_zero_bytes() {
        // A leading 0x00 keeps a high-bit modulus positive in two's complement encodings.
        let components = RsaComponents::from_signing_key(&key("AP8B", "AAEAAQ")).unwrap();

        assert_eq!(components.modulus, vec![0xff, 0x01]);
        assert_eq!(components.exponent, 65537);
    }

    #[test]
    fn rejects_missing_fields() {
        for (n, e) in [("", "AQAB"), ("AQID", ""), ("AAAA", "AQAB")] {
            let error = RsaComponents::from_signing_key(&key(n, e)).unwrap_err();
            assert!(
                matches!(&error, Error::InvalidSigningKey { kid, .. } if kid == "K1"),
                "({n:?}, {e:?}) gave {error:?}"
            );
        }
    }

    #[test]
    fn rejects_invalid_encoding() {
        assert!(matches!(
            RsaComponents::from_signing_key(&key("AQ+/", "AQAB")),
            Err(Error::InvalidSigningKey { .. })
        ));
    }

    #[test]
    fn rejects_oversized_exponent() {
        // 5 significant bytes
        assert!(matches!(
            RsaComponents::from_signing_key(&key("AQID", "AQAAAAE")),
            Err(Error::InvalidSigningKey { .. })
        ));
        // 4 bytes is the limit
        let components = RsaComponents::from_signing_key(&key("AQID", "_____w")).unwrap();
        assert_eq!(components.exponent, u32::MAX);
    }

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_fields(n in ".{0,64}", e in ".{0,16}") {
            let _ = decoding_key(&key(&n, &e));
        }

        #[test]
        fn modulus_is_minimal_magnitude(
            zeros in 0usize..4,
            magnitude in proptest::collection::vec(any::<u8>(), 1..64)
                .prop_filter("non-zero leading byte", |m| m[0] != 0),
        ) {
            let mut raw = vec![0u8; zeros];
            raw.extend_from_slice(&magnitude);

            let n = URL_SAFE_NO_PAD.encode(&raw);
            let components = RsaComponents::from_signing_key(&key(&n, "AQAB")).unwrap();

            prop_assert_eq!(components.modulus, magnitude);
        }
    }
}
