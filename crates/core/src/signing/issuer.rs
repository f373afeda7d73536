//! HMAC-SHA1 signed upload URLs for an S3-style object store.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use sha1::Sha1;

use filedock_shared::SigningConfig;

use super::error::SigningError;

type HmacSha1 = Hmac<Sha1>;

/// Characters left untouched by form encoding.
const FORM_UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A pre-authorized upload URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUpload {
    /// Public URL of the object once uploaded.
    pub url: String,
    /// URL to `PUT` the object to, carrying the signature.
    pub signed_request: String,
}

/// Issues time-limited upload URLs.
#[derive(Debug, Clone)]
pub struct SignedUrlIssuer {
    config: SigningConfig,
}

impl SignedUrlIssuer {
    /// Create an issuer. Credentials are checked when a URL is issued.
    #[must_use]
    pub fn new(config: SigningConfig) -> Self {
        Self { config }
    }

    /// Default validity window in seconds.
    #[must_use]
    pub fn default_expiry_secs(&self) -> u64 {
        self.config.expiry_secs
    }

    /// Issue an upload URL valid for `expiry_secs` from now.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the access key id or secret key is absent.
    pub fn issue_upload_url(
        &self,
        object_name: &str,
        mime_type: &str,
        expiry_secs: u64,
    ) -> Result<SignedUpload, SigningError> {
        self.issue_upload_url_at(Utc::now().timestamp(), object_name, mime_type, expiry_secs)
    }

    /// Issue an upload URL as if the current time were `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the access key id or secret key is absent.
    pub fn issue_upload_url_at(
        &self,
        now: i64,
        object_name: &str,
        mime_type: &str,
        expiry_secs: u64,
    ) -> Result<SignedUpload, SigningError> {
        let secret = self
            .config
            .secret_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SigningError::configuration("signing secret key is not set"))?;
        let access_key = self
            .config
            .access_key_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SigningError::configuration("signing access key id is not set"))?;

        let expiry = i64::try_from(expiry_secs)
            .map_err(|_| SigningError::configuration("expiry is out of range"))?;
        let expires = now.saturating_add(expiry);

        let object = quote_plus(object_name);
        let bucket = &self.config.bucket;
        let canonical = format!(
            "PUT\n\n{mime_type}\n{expires}\nx-amz-acl:public-read\n/{bucket}/{object}"
        );

        let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
            .map_err(|e| SigningError::configuration(e.to_string()))?;
        mac.update(canonical.as_bytes());
        let signature = quote_plus(&STANDARD.encode(mac.finalize().into_bytes()));

        let url = format!("https://{bucket}.{}/{object}", self.config.host);
        let signed_request =
            format!("{url}?AWSAccessKeyId={access_key}&Expires={expires}&Signature={signature}");

        Ok(SignedUpload {
            url,
            signed_request,
        })
    }
}

/// Form-encode a string: unreserved characters kept, space as `+`.
fn quote_plus(input: &str) -> String {
    utf8_percent_encode(input, FORM_UNRESERVED)
        .to_string()
        .replace("%20", "+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const NOW: i64 = 1_700_000_000;

    fn issuer(secret: Option<&str>) -> SignedUrlIssuer {
        SignedUrlIssuer::new(SigningConfig {
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_key: secret.map(String::from),
            ..SigningConfig::default()
        })
    }

    #[test]
    fn test_known_signature() {
        let signed = issuer(Some("test-secret"))
            .issue_upload_url_at(NOW, "a.png", "image/png", 86_400)
            .unwrap();

        assert_eq!(signed.url, "https://deepspace9.s3-us-west-2.amazonaws.com/a.png");
        assert_eq!(
            signed.signed_request,
            "https://deepspace9.s3-us-west-2.amazonaws.com/a.png\
             ?AWSAccessKeyId=AKIDEXAMPLE&Expires=1700086400\
             &Signature=sVvrcwFBfV3J79jBjum2HCKscZ4%3D"
        );
    }

    #[test]
    fn test_deterministic_for_fixed_time() {
        let issuer = issuer(Some("test-secret"));
        let first = issuer.issue_upload_url_at(NOW, "a.png", "image/png", 86_400).unwrap();
        let second = issuer.issue_upload_url_at(NOW, "a.png", "image/png", 86_400).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_secret_changes_signature() {
        let signed = issuer(Some("other-secret"))
            .issue_upload_url_at(NOW, "a.png", "image/png", 86_400)
            .unwrap();
        assert!(
            signed
                .signed_request
                .ends_with("&Signature=UJorYWsCdmi0fY8X3RiQYANP4Ns%3D")
        );
    }

    #[test]
    fn test_expiry_changes_signature() {
        let issuer = issuer(Some("test-secret"));
        let day = issuer.issue_upload_url_at(NOW, "a.png", "image/png", 86_400).unwrap();
        let hour = issuer.issue_upload_url_at(NOW, "a.png", "image/png", 3_600).unwrap();
        assert!(hour.signed_request.contains("Expires=1700003600"));
        assert_ne!(day.signed_request, hour.signed_request);
        assert_eq!(day.url, hour.url);
    }

    #[test]
    fn test_object_name_is_form_encoded() {
        let signed = issuer(Some("test-secret"))
            .issue_upload_url_at(NOW, "my report (1).png", "image/png", 86_400)
            .unwrap();
        assert_eq!(
            signed.url,
            "https://deepspace9.s3-us-west-2.amazonaws.com/my+report+%281%29.png"
        );
        assert!(
            signed
                .signed_request
                .ends_with("&Signature=VExHeYRtZMeWXL7%2Fh3H%2FWtVGBCc%3D")
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn test_missing_secret_is_configuration_error(#[case] secret: Option<&str>) {
        let err = issuer(secret)
            .issue_upload_url_at(NOW, "a.png", "image/png", 86_400)
            .unwrap_err();
        assert!(matches!(err, SigningError::Configuration(_)));
    }

    #[test]
    fn test_missing_access_key_is_configuration_error() {
        let issuer = SignedUrlIssuer::new(SigningConfig {
            secret_key: Some("test-secret".to_string()),
            ..SigningConfig::default()
        });
        assert!(issuer.issue_upload_url("a.png", "image/png", 60).is_err());
    }

    #[rstest]
    #[case("a.png", "a.png")]
    #[case("", "")]
    #[case("a b", "a+b")]
    #[case("x~y_z-1.txt", "x~y_z-1.txt")]
    #[case("a/b", "a%2Fb")]
    #[case("a+b", "a%2Bb")]
    fn test_quote_plus(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote_plus(input), expected);
    }
}
