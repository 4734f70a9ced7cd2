use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config;
use crate::types::push::VapidConfig;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub(crate) enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

pub(crate) fn load_vapid_config(config: &config::AppConfig) -> VapidConfigStatus {
    let private_key = config.vapid_private_key.as_ref();
    let subject = config.vapid_subject.as_ref();

    match (private_key, subject) {
        (Some(private_key), Some(subject)) => VapidConfigStatus::Ready(VapidConfig {
            private_key: private_key.clone(),
            subject: subject.clone(),
        }),
        (None, None) => VapidConfigStatus::Missing,
        _ => VapidConfigStatus::Incomplete,
    }
}

pub(crate) fn derive_public_key(private_key: &str) -> Result<String, web_push::WebPushError> {
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(private_key, URL_SAFE_NO_PAD)?
            .get_public_key();
    Ok(encode_config(public_key, URL_SAFE_NO_PAD))
}

pub fn generate_vapid_credentials() -> Result<VapidCredentials, web_push::WebPushError> {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, web_push::WebPushError> {
    let key_pair = generate_es256_keypair_with_rng(rng);
    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key = derive_public_key(&private_key)?;

    Ok(VapidCredentials {
        private_key,
        public_key,
    })
}

fn generate_es256_keypair_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> ES256KeyPair {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            return key_pair;
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generate_vapid_credentials_with_rng__should_return_expected_fixture() {
        // Given
        let seed = [7u8; 32];
        let mut rng = StdRng::from_seed(seed);

        // When
        let credentials =
            generate_vapid_credentials_with_rng(&mut rng).expect("credentials should generate");

        // Then
        assert_eq!(
            credentials.private_key,
            "9pKJeIXAyyCj5M0QagsVvDYHlPF-cymJCbB5iHPsdEE"
        );
        assert_eq!(
            credentials.public_key,
            "BCRweRf_U5iQM4pKNucGRzM6OuLp8Hisa8yX0N2ePIf1oxKitvFT6qvuGgYoTxlMatMDaytXbZR3rVClc2w_p6U"
        );
    }

    #[test]
    fn derive_public_key__should_match_the_generated_pair() {
        // Given
        let mut rng = StdRng::from_seed([3u8; 32]);
        let credentials = generate_vapid_credentials_with_rng(&mut rng).expect("credentials");

        // When
        let derived = derive_public_key(&credentials.private_key).expect("derive");

        // Then
        assert_eq!(derived, credentials.public_key);
    }

    #[test]
    fn load_vapid_config__should_report_missing_when_nothing_is_set() {
        // Given
        let config = config::AppConfig::default();

        // Then
        assert!(matches!(
            load_vapid_config(&config),
            VapidConfigStatus::Missing
        ));
    }

    #[test]
    fn load_vapid_config__should_report_incomplete_for_half_a_config() {
        // Given
        let config = config::AppConfig {
            vapid_subject: Some("mailto:admin@example.org".to_string()),
            ..config::AppConfig::default()
        };

        // Then
        assert!(matches!(
            load_vapid_config(&config),
            VapidConfigStatus::Incomplete
        ));
    }

    #[test]
    fn load_vapid_config__should_report_ready_with_both_halves() {
        // Given
        let config = config::AppConfig {
            vapid_private_key: Some("a-key".to_string()),
            vapid_subject: Some("mailto:admin@example.org".to_string()),
            ..config::AppConfig::default()
        };

        // When
        let status = load_vapid_config(&config);

        // Then
        let VapidConfigStatus::Ready(vapid) = status else {
            panic!("expected ready");
        };
        assert_eq!(vapid.private_key, "a-key");
        assert_eq!(vapid.subject, "mailto:admin@example.org");
    }
}
