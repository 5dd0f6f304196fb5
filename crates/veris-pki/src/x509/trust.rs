//! Single-hop trust validation against a fixed set of CA certificates.

use rsa::pkcs1v15::{Signature as RsaSignature, VerifyingKey as RsaVerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::sha2::{Sha256, Sha384, Sha512};
use rsa::RsaPublicKey;
use signature::Verifier;
use tracing::debug;
use veris_types::SigError;
use veris_utils::oid::known;

use super::certificate::Certificate;

/// A fixed set of trusted CA certificates, loaded once at startup.
///
/// Trust is a single hop: a certificate is accepted only when it is
/// directly signed by one of the loaded CAs. No chain building, no
/// revocation, no validity-window checks happen here.
#[derive(Debug, Clone)]
pub struct TrustStore {
    cas: Vec<Certificate>,
}

impl TrustStore {
    /// Load a trust store from PEM-encoded CA certificates. Every entry
    /// must contain at least one CERTIFICATE block; a store that silently
    /// dropped a configured CA would fail open later.
    pub fn from_pem_list(pems: &[String]) -> Result<Self, SigError> {
        let mut cas = Vec::new();
        for (i, pem) in pems.iter().enumerate() {
            let blocks = veris_utils::pem::parse(pem)
                .map_err(|e| SigError::from(e).context(&format!("trusted CA #{i}")))?;
            let mut found = false;
            for block in &blocks {
                if block.label == "CERTIFICATE" {
                    cas.push(
                        Certificate::from_der(&block.data)
                            .map_err(|e| e.context(&format!("trusted CA #{i}")))?,
                    );
                    found = true;
                }
            }
            if !found {
                return Err(SigError::format(format!(
                    "trusted CA #{i}: no CERTIFICATE block found"
                )));
            }
        }
        Ok(Self { cas })
    }

    pub fn len(&self) -> usize {
        self.cas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cas.is_empty()
    }

    /// Check whether `cert` is directly signed by any CA in the store.
    ///
    /// Per-CA failures (unsupported algorithm, undecodable key) count as
    /// a non-match for that CA and are logged, so one odd CA entry cannot
    /// mask a valid match against another.
    pub fn is_signed_by_trusted_ca(&self, cert: &Certificate) -> bool {
        for ca in &self.cas {
            match verify_signed_by(cert, ca) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    debug!(
                        ca = %ca.subject,
                        error = %e,
                        "CA signature check failed, treating as non-match"
                    );
                }
            }
        }
        false
    }
}

/// Verify that `cert`'s signature over its TBS bytes checks out against
/// `ca`'s public key. `Ok(false)` means the cryptography ran and did not
/// match; `Err` means it could not run at all.
fn verify_signed_by(cert: &Certificate, ca: &Certificate) -> Result<bool, SigError> {
    let sig_alg = &cert.signature_algorithm;

    if sig_alg == &known::sha256_with_rsa_encryption().to_der_value() {
        verify_rsa::<Sha256>(cert, ca)
    } else if sig_alg == &known::sha384_with_rsa_encryption().to_der_value() {
        verify_rsa::<Sha384>(cert, ca)
    } else if sig_alg == &known::sha512_with_rsa_encryption().to_der_value() {
        verify_rsa::<Sha512>(cert, ca)
    } else if sig_alg == &known::ecdsa_with_sha256().to_der_value() {
        verify_ecdsa_p256(cert, ca)
    } else if sig_alg == &known::ecdsa_with_sha384().to_der_value() {
        verify_ecdsa_p384(cert, ca)
    } else {
        let oid = veris_utils::oid::Oid::from_der_value(sig_alg)
            .map(|o| o.to_dot_string())
            .unwrap_or_else(|_| hex::encode(sig_alg));
        Err(SigError::validation(format!(
            "unsupported signature algorithm {oid}"
        )))
    }
}

fn verify_rsa<D>(cert: &Certificate, ca: &Certificate) -> Result<bool, SigError>
where
    D: rsa::sha2::Digest + rsa::pkcs8::der::oid::AssociatedOid,
{
    if ca.public_key.algorithm_oid != known::rsa_encryption().to_der_value() {
        return Ok(false);
    }
    let public_key = RsaPublicKey::from_public_key_der(&ca.public_key.raw)
        .map_err(|e| SigError::validation(format!("CA public key decode failed: {e}")))?;
    let verifying_key = RsaVerifyingKey::<D>::new(public_key);
    let signature = RsaSignature::try_from(cert.signature_value.as_slice())
        .map_err(|e| SigError::validation(format!("malformed RSA signature: {e}")))?;
    Ok(verifying_key.verify(&cert.tbs_raw, &signature).is_ok())
}

fn verify_ecdsa_p256(cert: &Certificate, ca: &Certificate) -> Result<bool, SigError> {
    if ca.public_key.algorithm_oid != known::ec_public_key().to_der_value() {
        return Ok(false);
    }
    let verifying_key = p256::ecdsa::VerifyingKey::from_public_key_der(&ca.public_key.raw)
        .map_err(|e| SigError::validation(format!("CA public key decode failed: {e}")))?;
    let signature = p256::ecdsa::Signature::from_der(&cert.signature_value)
        .map_err(|e| SigError::validation(format!("malformed ECDSA signature: {e}")))?;
    Ok(verifying_key.verify(&cert.tbs_raw, &signature).is_ok())
}

fn verify_ecdsa_p384(cert: &Certificate, ca: &Certificate) -> Result<bool, SigError> {
    if ca.public_key.algorithm_oid != known::ec_public_key().to_der_value() {
        return Ok(false);
    }
    let verifying_key = p384::ecdsa::VerifyingKey::from_public_key_der(&ca.public_key.raw)
        .map_err(|e| SigError::validation(format!("CA public key decode failed: {e}")))?;
    let signature = p384::ecdsa::Signature::from_der(&cert.signature_value)
        .map_err(|e| SigError::validation(format!("malformed ECDSA signature: {e}")))?;
    Ok(verifying_key.verify(&cert.tbs_raw, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUSTED_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIDsjCCApqgAwIBAgIUNA9FvdIwo900+0qZOT4UQ1e2iukwDQYJKoZIhvcNAQEL
BQAwYjELMAkGA1UEBhMCTFYxDzANBgNVBAoMBkxpcXVpbzEaMBgGA1UEYQwRTlRS
TFYtNDAxMDMwMDAwMDAxDTALBgNVBAcMBFJpZ2ExFzAVBgNVBAMMDkxpcXVpbyBU
ZXN0IENBMB4XDTI2MDgyOTE5MzI0MFoXDTQ2MDgyNDE5MzI0MFowYjELMAkGA1UE
BhMCTFYxDzANBgNVBAoMBkxpcXVpbzEaMBgGA1UEYQwRTlRSTFYtNDAxMDMwMDAw
MDAxDTALBgNVBAcMBFJpZ2ExFzAVBgNVBAMMDkxpcXVpbyBUZXN0IENBMIIBIjAN
BgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAs/7EkOivwJjOWvVK6UH/ft0XlHQh
SSKSlDf8/0z2ZBYkELV/STTSfbIG+F/QxTspTcSVzHbgpTKL5XWO9pdrv1H6fL49
w7hxxdX/jeD2x6dWl/D+pbdxwO6zLqyUJxpg7rkiEUom8oltq6gQJXALqKR0tu05
CmyRZ1+4x3SWf0rgLuKcfF9yYNcoUuwDIN5/zv+PF+QoyhjAZ3bB08UoJ413dY8M
Vyc1JsBgdH4hiDYH+nHub1yJ+3yc69LQNeVLSKJorhz8e3gX11oOIg/cMfPJbHaj
7DdPXa4yWD4wNfliP58Ux9fkB5cbwSXn2XYhK9nos+oeu0Bnd0WjWQTSqQIDAQAB
o2AwXjAdBgNVHQ4EFgQUUvzb6BCIIe2FUSd5cNbqtSaLcHkwHwYDVR0jBBgwFoAU
Uvzb6BCIIe2FUSd5cNbqtSaLcHkwDwYDVR0TAQH/BAUwAwEB/zALBgNVHQ8EBAMC
AQYwDQYJKoZIhvcNAQELBQADggEBAB1hSp72beNnxrkrf3j0+TMBAIMVh2GvW2H3
JWje6/LkN8dvwOjZgD/82vkRe10wW86U0nzbBwebR2wK4n+EebDhGE9ukj70qysR
kDGtaPWqTBnxDAjUkDA41ZDSTGiWToGcqWxZ/jJB3uXzbIXf6q3viaRGyTNfSCJS
ZBYhbHeBrvDMa+kkDrr+bS7RsjgFHSCGMbAPOmAX4GKtv6KlBeymZ+paKl7Ai63K
vVafIuB5mVo7B+qW+G2758z0LqVT/AMjffOE4faQlWHQTF1JGoNNS9v9OqJpQQX4
6uJv5nTH9uQmfUYG3XVNrE+D8zDZ7TsPfXtBBsQXXxs1OtQITVc=
-----END CERTIFICATE-----";

    const OTHER_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIDaDCCAlCgAwIBAgIUUcPPiGN58CCfKIeAVrjjdCMFCOwwDQYJKoZIhvcNAQEL
BQAwPTELMAkGA1UEBhMCTFYxEjAQBgNVBAoMCU90aGVyIE9yZzEaMBgGA1UEAwwR
VW50cnVzdGVkIFRlc3QgQ0EwHhcNMjYwODI5MTkzMjU1WhcNNDYwODI0MTkzMjU1
WjA9MQswCQYDVQQGEwJMVjESMBAGA1UECgwJT3RoZXIgT3JnMRowGAYDVQQDDBFV
bnRydXN0ZWQgVGVzdCBDQTCCASIwDQYJKoZIhvcNAQEBBQADggEPADCCAQoCggEB
AMO0zsLY6BLUIQKSUEqL5AZ60buPXldtk5X8rfqK2Qcce11ApHCer7NPIhDg8Yx8
r0VvHN1ZBdJx8pCVYphD4TMrDjvRRbBxN7/UBgVdxlmoLOeC2CYY+9Y00mci3oDb
gypZijwOWvglMVnphnR/HPydhcFU+NRj9UrSoEg+jzboLixnoDzkg9smWLsSvTcw
Nn2bBhcpcnJ2E12div00rcWzjna0SFOqcpwBraF7eaJxYbXEOWeU/UT9it/jtrte
I1fl5SRWs7oNAjl+rmHmjxAnySyfqPM9zOU7WqK7KQu5D1AA66IP5fsgKSmyEIj9
OJDY46qmtISucDA/Ommaur8CAwEAAaNgMF4wHQYDVR0OBBYEFI6Wj+nZettgtC4K
9cY/Qer6IcbAMB8GA1UdIwQYMBaAFI6Wj+nZettgtC4K9cY/Qer6IcbAMA8GA1Ud
EwEB/wQFMAMBAf8wCwYDVR0PBAQDAgEGMA0GCSqGSIb3DQEBCwUAA4IBAQAjevoi
KsS0Z8W2LBhdYlqcFuYfWcQxKaDQQPffsM+j31hFK/zCjy15AgXXYjWiwaWvuy4K
iou/4b5hEhPqYFa+lBxTEGURrNk20Ot1i14ZU/x5NhoECOxleFt+dvjd3GgYghAY
cB2JrpvOcPUlDfm4spqththYcPa59aM4vA70rMh3p+Vc9Ao3IuthhBMbsOp58Wps
0n+rZsLtxAeczS+I7vI/dh1LCcxjrBCIrToUQD/1zLcXpizlAwnWTGHJefHg8RAt
pmfoz5J63fiK7NBY1C8tMM2ZZpYM63iJV5gjKv0txyUzwshWtSTPeuBjCFcY1AMU
W+h90dNdqROR4KEn
-----END CERTIFICATE-----";

    const SIGNER_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIEFDCCAvygAwIBAgIUHdXj8Ia6cM/hRrW3b1a6A3MPvswwDQYJKoZIhvcNAQEL
BQAwYjELMAkGA1UEBhMCTFYxDzANBgNVBAoMBkxpcXVpbzEaMBgGA1UEYQwRTlRS
TFYtNDAxMDMwMDAwMDAxDTALBgNVBAcMBFJpZ2ExFzAVBgNVBAMMDkxpcXVpbyBU
ZXN0IENBMB4XDTI2MDgyOTE5MzI0N1oXDTM2MDgyNjE5MzI0N1owgcYxFjAUBgNV
BAMMDUFubmEgS293YWxza2kxETAPBgNVBAQMCEtvd2Fsc2tpMQ0wCwYDVQQqDARB
bm5hMQowCAYDVQQrDAFNMQ8wDQYDVQQKDAZMaXF1aW8xGjAYBgNVBGEMEU5UUkxW
LTQwMDAzMDAwMDAwMQswCQYDVQQGEwJMVjENMAsGA1UEBwwEUmlnYTEUMBIGA1UE
BRMLMzIwMTkwMTIzNDUxHzAdBgcEAIvsSQEBDBJQTk9MVi0wMTAxOTAtMTIzNDUw
ggEiMA0GCSqGSIb3DQEBAQUAA4IBDwAwggEKAoIBAQC3PNQujQTwJXv1O4mwkzYh
fMfprGJ0viI82WuSBN8dN29pbs04VheJQg4Dx2/SukjSeOR/rmGYu0X1zhIRTe8m
BdaDdrntAf4GsG6aA9/EKySfPkjwlaG7HaGUHudLm01iwOIDekZvAzwxbTNNvCUj
CBPoL4Q+iq3Qkw0jBPH6TSb/tYJUS7n8DESe4njTFpmMCkHp2BdosiPg/1c7PbI4
Nnw0fYU+s4kr3Vvn0a2PqwsX7JkQByvDInyR2Hc67Wym47MnzBZ3lnti9Omr34iL
1um4sLJDmziSX+2xgs8k4crovJenmHuLBMmgHqf/F7Dv70PxtdTnxXlVCyOMzVev
AgMBAAGjXTBbMAwGA1UdEwEB/wQCMAAwCwYDVR0PBAQDAgbAMB0GA1UdDgQWBBT6
Rd30k3B5/0vbZNXjlyVPwVID5jAfBgNVHSMEGDAWgBRS/NvoEIgh7YVRJ3lw1uq1
JotweTANBgkqhkiG9w0BAQsFAAOCAQEAVbbYlrHbuj2EGbt28/Vih5pI1+3BlZRd
s+IpuSQuYoMu7uDDwOgpSIMs+zsmcXENwcikGz7JTgNrhqp5TP56tkm9cONd5yFm
AJA/8bhgt1V1CssFztt1ecJNdyhgGKV4kXbJS+nZjejliFoiUnP0TSwY1FkRbt/p
OxUHIAVj1+lhELvdyCyyE4T9VvSVmII2tAyV2GkdoB9hWKyK9a8LcNOEdGXXBB4d
AD1Xp8+0LnlAdu//58slobYPjfzLOum/T/i/DVyhcjgx7gL4VgsFgtkch0D1ALCp
9Gz/THJQNVpQcWlSxRWjaeZys1KmBkRKBBez+1LZ/QVuCwt6IKLkLQ==
-----END CERTIFICATE-----";

    #[test]
    fn test_signer_trusted_by_issuing_ca() {
        let store = TrustStore::from_pem_list(&[TRUSTED_CA_PEM.to_string()]).unwrap();
        assert_eq!(store.len(), 1);
        let signer = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert!(store.is_signed_by_trusted_ca(&signer));
    }

    #[test]
    fn test_signer_rejected_by_unrelated_ca() {
        let store = TrustStore::from_pem_list(&[OTHER_CA_PEM.to_string()]).unwrap();
        let signer = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert!(!store.is_signed_by_trusted_ca(&signer));
    }

    #[test]
    fn test_match_found_among_multiple_cas() {
        let store = TrustStore::from_pem_list(&[
            OTHER_CA_PEM.to_string(),
            TRUSTED_CA_PEM.to_string(),
        ])
        .unwrap();
        let signer = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert!(store.is_signed_by_trusted_ca(&signer));
    }

    #[test]
    fn test_empty_store_trusts_nothing() {
        let store = TrustStore::from_pem_list(&[]).unwrap();
        assert!(store.is_empty());
        let signer = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert!(!store.is_signed_by_trusted_ca(&signer));
    }

    #[test]
    fn test_bad_pem_entry_fails_construction() {
        let result = TrustStore::from_pem_list(&["not a pem".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_self_signed_ca_verifies_itself() {
        let store = TrustStore::from_pem_list(&[TRUSTED_CA_PEM.to_string()]).unwrap();
        let ca = Certificate::from_pem(TRUSTED_CA_PEM).unwrap();
        assert!(store.is_signed_by_trusted_ca(&ca));
    }
}
