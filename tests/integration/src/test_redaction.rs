//! Secret redaction integration tests.
//!
//! Every signing path runs under a capturing subscriber at `TRACE`, and the
//! captured output, error messages and `Debug` renderings are searched for
//! secret material.

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tradestack_auth::{
        AuthConfig, AuthError, Credential, RequestAuthority, SignerOptions, SigningContext,
    };

    use crate::{env_lookup, sec1_pem};

    const HMAC_SECRET: &str = "hmac-secret-value-0123456789";
    const PASSPHRASE: &str = "passphrase-value-9876";

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn with_captured_logs<F: FnOnce()>(f: F) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        capture.contents()
    }

    /// The base64 body lines of a PEM document.
    fn pem_body_lines(pem: &str) -> Vec<String> {
        pem.lines()
            .filter(|line| !line.starts_with("-----") && !line.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    #[test]
    fn test_should_not_log_hmac_secret_or_passphrase() {
        let mut rendered = String::new();
        let logs = with_captured_logs(|| {
            let config = AuthConfig::from_lookup(env_lookup(&[
                ("EXCHANGE_API_KEY", "organizations/org-1/apiKeys/key-1"),
                ("EXCHANGE_API_SECRET", HMAC_SECRET),
                ("EXCHANGE_API_PASSPHRASE", PASSPHRASE),
            ]));
            let authority = RequestAuthority::from_config(&config).unwrap();
            let headers = authority
                .authorize(&SigningContext::at("GET", "/accounts", "", 1_700_000_000))
                .unwrap();
            rendered = format!("{config:?}{authority:?}{headers:?}");
        });

        assert!(!logs.is_empty());
        assert!(!logs.contains("apiKeys/key-1"));
        for output in [&logs, &rendered] {
            assert!(!output.contains(HMAC_SECRET));
            assert!(!output.contains(PASSPHRASE));
        }
    }

    #[test]
    fn test_should_not_log_private_key_or_token() {
        let pem = sec1_pem(0x42);
        let mut token = String::new();
        let mut rendered = String::new();
        let logs = with_captured_logs(|| {
            let cred = Credential::new("key-1", pem.replace('\n', "\\n"));
            let authority = RequestAuthority::new(cred, &SignerOptions::default()).unwrap();
            let headers = authority
                .authorize(&SigningContext::at("GET", "/a", "", 1_000))
                .unwrap();
            token = headers.bearer_token().unwrap().to_owned();
            rendered = format!("{authority:?}{headers:?}{:?}", headers.token());
        });

        assert!(logs.contains("issued ES256 token"));
        for output in [&logs, &rendered] {
            assert!(!output.contains(&token));
            for line in pem_body_lines(&pem) {
                assert!(!output.contains(&line));
            }
        }
    }

    #[test]
    fn test_should_not_include_key_material_in_errors() {
        let pem = sec1_pem(0x42);
        // Overwrite the first body line so parsing fails while the markers stay intact.
        let first_line = pem_body_lines(&pem).remove(0);
        let corrupted = pem.replacen(&first_line, &"!".repeat(first_line.len()), 1);
        assert_ne!(corrupted, pem);

        let mut message = String::new();
        let logs = with_captured_logs(|| {
            let cred = Credential::new("key-1", corrupted.as_str());
            let err = RequestAuthority::new(cred, &SignerOptions::default()).unwrap_err();
            assert!(matches!(err, AuthError::MalformedKey(_)));
            message = format!("{err} {err:?}");
        });

        assert!(message.contains("Malformed private key"));
        for output in [&logs, &message] {
            for line in pem_body_lines(&pem) {
                assert!(!output.contains(&line));
            }
        }
    }
}
