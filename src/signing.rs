//! HTTP message signing for Intersight API requests.
//!
//! Every request carries a `Date`, a `Digest` of the body and an
//! `Authorization` header holding a signature over the request target,
//! host, date and digest. Legacy (v2) keys are RSA and sign with
//! `rsa-sha256`; current (v3) keys sign with `hs2019`.
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKey, Private};
use openssl::rsa::Padding;
use openssl::sha::sha256;
use openssl::sign::{RsaPssSaltlen, Signer};

use std::fmt::{self, Debug, Formatter};

use crate::types::{UtilError, UtilResult};

/// Names of the signed headers, in signing order.
pub const SIGNED_HEADERS: &str = "(request-target) host date digest";

/// Signature scheme selected from the key type and legacy flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// RSASSA-PKCS1-v1_5 over SHA-256, used by legacy keys.
    RsaSha256,
    /// ECDSA over SHA-256 (DER encoded signature).
    Hs2019Ecdsa,
    /// RSASSA-PSS over SHA-256.
    Hs2019Pss,
}

impl Scheme {
    /// Retrieves the algorithm name advertised in the `Authorization` header.
    pub fn algorithm(self) -> &'static str {
        match self {
            Scheme::RsaSha256 => "rsa-sha256",
            Scheme::Hs2019Ecdsa | Scheme::Hs2019Pss => "hs2019",
        }
    }
}

/// Private key material paired with its key identifier.
pub struct SigningKey {
    key_id: String,
    pkey: PKey<Private>,
    scheme: Scheme,
}

/// Set of headers to attach to an outgoing request.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedHeaders {
    pub date: String,
    pub digest: String,
    pub authorization: String,
}

impl SigningKey {
    /// Parses a PEM encoded private key and selects the signing scheme.
    pub fn from_pem(key_id: &str, pem: &[u8], legacy: bool) -> UtilResult<Self> {
        let pkey = PKey::private_key_from_pem(pem)
            .map_err(|_| UtilError::config("API key file does not contain a valid private key"))?;

        let scheme = match (pkey.id(), legacy) {
            (Id::RSA, true) => Scheme::RsaSha256,
            (Id::RSA, false) => {
                warn!("RSA key provided without --api-key-legacy, signing with RSASSA-PSS");
                Scheme::Hs2019Pss
            }
            (Id::EC, false) => Scheme::Hs2019Ecdsa,
            (Id::EC, true) => {
                return Err(UtilError::config(
                    "Legacy API keys must be RSA keys; drop --api-key-legacy for v3 keys",
                ))
            }
            _ => return Err(UtilError::config("Unsupported API private key type")),
        };

        Ok(Self {
            key_id: key_id.to_string(),
            pkey,
            scheme,
        })
    }

    /// Retrieves the API key identifier.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Retrieves the selected signing scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Retrieves the algorithm name used in the `Authorization` header.
    pub fn algorithm(&self) -> &'static str {
        self.scheme.algorithm()
    }

    /// Signs a request at the current time.
    pub fn sign(&self, method: &str, target: &str, host: &str, body: &[u8]) -> UtilResult<SignedHeaders> {
        self.sign_at(Utc::now(), method, target, host, body)
    }

    /// Signs a request using the provided timestamp for the `Date` header.
    pub fn sign_at(
        &self,
        now: DateTime<Utc>,
        method: &str,
        target: &str,
        host: &str,
        body: &[u8],
    ) -> UtilResult<SignedHeaders> {
        let date = http_date(now);
        let digest = body_digest(body);
        let message = string_to_sign(method, target, host, &date, &digest);

        let mut signer = Signer::new(MessageDigest::sha256(), &self.pkey)?;
        if self.scheme == Scheme::Hs2019Pss {
            signer.set_rsa_padding(Padding::PKCS1_PSS)?;
            signer.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
        }
        signer.update(message.as_bytes())?;
        let signature = STANDARD.encode(signer.sign_to_vec()?);

        let authorization = format!(
            r#"Signature keyId="{}",algorithm="{}",headers="{}",signature="{}""#,
            self.key_id,
            self.algorithm(),
            SIGNED_HEADERS,
            signature
        );

        Ok(SignedHeaders {
            date,
            digest,
            authorization,
        })
    }
}

/// Debug implementation for `SigningKey`, which never prints key material.
impl Debug for SigningKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Formats a timestamp as an RFC 7231 IMF-fixdate.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Computes the `Digest` header value of a request body.
pub fn body_digest(body: &[u8]) -> String {
    format!("SHA-256={}", STANDARD.encode(sha256(body)))
}

/// Builds the newline separated string covered by the signature.
pub fn string_to_sign(method: &str, target: &str, host: &str, date: &str, digest: &str) -> String {
    format!(
        "(request-target): {} {}\nhost: {}\ndate: {}\ndigest: {}",
        method.to_lowercase(),
        target,
        host,
        date,
        digest
    )
}

#[cfg(test)]
mod tests {
    use super::{Scheme, SigningKey};
    use crate::types::ErrorKind;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use chrono::{TimeZone, Utc};
    use openssl::ec::{EcGroup, EcKey};
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::pkey::PKey;
    use openssl::rsa::{Padding, Rsa};
    use openssl::sign::{RsaPssSaltlen, Verifier};

    const KEY_ID: &str = "5a3404ac3768393836093cab/5b5877e56c6730367acf46cd/5b5879a76c6730367acf4a3a";

    fn extract_signature(authorization: &str) -> Vec<u8> {
        let start = authorization.find("signature=\"").unwrap() + "signature=\"".len();
        let encoded = authorization[start..].trim_end_matches('"');
        STANDARD.decode(encoded).unwrap()
    }

    #[test]
    fn formatting_http_dates() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();

        assert_eq!(super::http_date(now), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn digesting_empty_bodies() {
        assert_eq!(
            super::body_digest(b""),
            "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn building_the_signing_string() {
        let message = super::string_to_sign(
            "GET",
            "/api/v1/equipment/Chasses?%24top=100",
            "intersight.com",
            "Tue, 05 Mar 2024 07:08:09 GMT",
            "SHA-256=abc=",
        );

        assert_eq!(
            message,
            "(request-target): get /api/v1/equipment/Chasses?%24top=100\n\
             host: intersight.com\n\
             date: Tue, 05 Mar 2024 07:08:09 GMT\n\
             digest: SHA-256=abc="
        );
    }

    #[test]
    fn signing_with_legacy_rsa_keys() {
        let rsa = Rsa::generate(2048).unwrap();
        let pem = rsa.private_key_to_pem().unwrap();
        let public = PKey::public_key_from_pem(&rsa.public_key_to_pem().unwrap()).unwrap();

        let key = SigningKey::from_pem(KEY_ID, &pem, true).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let headers = key
            .sign_at(now, "GET", "/api/v1/compute/Blades", "intersight.com", b"")
            .unwrap();

        assert_eq!(key.scheme(), Scheme::RsaSha256);
        assert!(headers.authorization.starts_with(&format!(
            r#"Signature keyId="{}",algorithm="rsa-sha256",headers="(request-target) host date digest","#,
            KEY_ID
        )));

        let message = super::string_to_sign(
            "GET",
            "/api/v1/compute/Blades",
            "intersight.com",
            &headers.date,
            &headers.digest,
        );

        let mut verifier = Verifier::new(MessageDigest::sha256(), &public).unwrap();
        verifier.update(message.as_bytes()).unwrap();
        assert!(verifier.verify(&extract_signature(&headers.authorization)).unwrap());
    }

    #[test]
    fn signing_with_v3_ec_keys() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let ec = EcKey::generate(&group).unwrap();
        let pem = ec.private_key_to_pem().unwrap();
        let public = PKey::public_key_from_pem(&ec.public_key_to_pem().unwrap()).unwrap();

        let key = SigningKey::from_pem(KEY_ID, &pem, false).unwrap();
        let headers = key
            .sign("GET", "/api/v1/equipment/Chasses", "intersight.com", b"")
            .unwrap();

        assert_eq!(key.scheme(), Scheme::Hs2019Ecdsa);
        assert!(headers.authorization.contains(r#"algorithm="hs2019""#));

        let message = super::string_to_sign(
            "GET",
            "/api/v1/equipment/Chasses",
            "intersight.com",
            &headers.date,
            &headers.digest,
        );

        let mut verifier = Verifier::new(MessageDigest::sha256(), &public).unwrap();
        verifier.update(message.as_bytes()).unwrap();
        assert!(verifier.verify(&extract_signature(&headers.authorization)).unwrap());
    }

    #[test]
    fn signing_rsa_keys_without_legacy_uses_pss() {
        let rsa = Rsa::generate(2048).unwrap();
        let pem = rsa.private_key_to_pem().unwrap();
        let public = PKey::public_key_from_pem(&rsa.public_key_to_pem().unwrap()).unwrap();

        let key = SigningKey::from_pem(KEY_ID, &pem, false).unwrap();
        let headers = key
            .sign("GET", "/api/v1/compute/Blades", "intersight.com", b"")
            .unwrap();

        assert_eq!(key.scheme(), Scheme::Hs2019Pss);

        let message = super::string_to_sign(
            "GET",
            "/api/v1/compute/Blades",
            "intersight.com",
            &headers.date,
            &headers.digest,
        );

        let mut verifier = Verifier::new(MessageDigest::sha256(), &public).unwrap();
        verifier.set_rsa_padding(Padding::PKCS1_PSS).unwrap();
        verifier.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH).unwrap();
        verifier.update(message.as_bytes()).unwrap();
        assert!(verifier.verify(&extract_signature(&headers.authorization)).unwrap());
    }

    #[test]
    fn legacy_flag_rejects_ec_keys() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let pem = EcKey::generate(&group).unwrap().private_key_to_pem().unwrap();

        let err = SigningKey::from_pem(KEY_ID, &pem, true).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
