//! HMAC scheme integration tests.

#[cfg(test)]
mod tests {
    use tradestack_auth::{AuthScheme, Credential, RequestAuthority, SignerOptions, SigningContext};

    use crate::{init_tracing, reference_hmac};

    fn authority(cred: Credential) -> RequestAuthority {
        RequestAuthority::new(cred, &SignerOptions::default()).unwrap()
    }

    #[test]
    fn test_should_match_reference_vector() {
        init_tracing();
        let authority = authority(Credential::new("key1", "abc123"));
        let ctx = SigningContext::at("GET", "/v2/accounts", "", 1_700_000_000);
        let headers = authority.authorize(&ctx).unwrap();

        assert_eq!(headers.scheme(), AuthScheme::Hmac);
        assert_eq!(headers.headers().len(), 3);
        assert_eq!(headers.get("access-key").unwrap(), "key1");
        assert_eq!(headers.get("access-timestamp").unwrap(), "1700000000");
        assert_eq!(
            headers.get("access-signature").unwrap(),
            reference_hmac("abc123", b"1700000000GET/v2/accounts").as_str()
        );
    }

    #[test]
    fn test_should_sign_body_and_lowercase_method() {
        init_tracing();
        let authority = authority(Credential::new("key1", "abc123"));
        let body = r#"{"product_id":"BTC-USD","side":"buy","size":"0.01"}"#;
        let ctx = SigningContext::at("post", "/orders", body, 1_700_000_123);
        let headers = authority.authorize(&ctx).unwrap();

        let message = format!("1700000123POST/orders{body}");
        assert_eq!(
            headers.get("access-signature").unwrap(),
            reference_hmac("abc123", message.as_bytes()).as_str()
        );
    }

    #[test]
    fn test_should_be_deterministic_across_authorities() {
        init_tracing();
        let ctx = SigningContext::at("DELETE", "/orders/42", "", 1_700_000_000);
        let a = authority(Credential::new("key1", "abc123")).authorize(&ctx).unwrap();
        let b = authority(Credential::new("key1", "abc123")).authorize(&ctx).unwrap();
        assert_eq!(a.headers(), b.headers());
    }

    #[test]
    fn test_should_include_passphrase_header() {
        init_tracing();
        let authority = authority(Credential::new("key1", "abc123").with_passphrase("pass"));
        let headers = authority
            .authorize(&SigningContext::at("GET", "/accounts", "", 1_700_000_000))
            .unwrap();
        assert_eq!(headers.headers().len(), 4);
        assert_eq!(headers.get("access-passphrase").unwrap(), "pass");
    }

    #[test]
    fn test_should_apply_onto_request_headers() {
        init_tracing();
        let authority = authority(Credential::new("key1", "abc123"));
        let mut request = http::Request::builder()
            .method("GET")
            .uri("https://api.exchange.example/v2/accounts")
            .header("accept", "application/json")
            .body(())
            .unwrap();

        let ctx = SigningContext::at(
            request.method().as_str(),
            request.uri().path(),
            "",
            1_700_000_000,
        );
        authority
            .authorize(&ctx)
            .unwrap()
            .apply_to(request.headers_mut());

        assert_eq!(request.headers().len(), 4);
        assert!(request.headers().contains_key("access-signature"));
    }
}
