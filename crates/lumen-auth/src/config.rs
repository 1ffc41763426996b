//! OAuth provider configuration and authorize URLs

use serde::{Deserialize, Serialize};

/// Hosted-UI OAuth2 configuration (implicit flow)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Base URL of the provider's hosted UI
    pub domain: String,
    /// App client id registered with the provider
    pub client_id: String,
    /// Where the provider redirects after login, fragment carrying tokens
    pub redirect_uri: String,
    /// Requested scopes
    pub scope: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            domain: "https://auth.example.com".to_string(),
            client_id: "lumen-wallet".to_string(),
            redirect_uri: "http://localhost:4000/login".to_string(),
            scope: "openid email".to_string(),
        }
    }
}

impl OAuthConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &std::path::Path) -> lumen_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &std::path::Path) -> lumen_core::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Authorize URL for login. The nonce binds the issued ID token to the
    /// ephemeral key that generated it; `response_type=token` selects the
    /// implicit flow so tokens come back in the URL fragment.
    pub fn authorize_url(&self, nonce: &str) -> String {
        format!(
            "{}/login/continue?{}",
            self.domain,
            self.query(nonce, None)
        )
    }

    /// Signup URL, optionally pre-filling the email field
    pub fn signup_url(&self, nonce: &str, login_hint: Option<&str>) -> String {
        format!("{}/signup?{}", self.domain, self.query(nonce, login_hint))
    }

    fn query(&self, nonce: &str, login_hint: Option<&str>) -> String {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("response_type", "token"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", self.scope.as_str()),
            ("nonce", nonce),
        ];
        if let Some(hint) = login_hint {
            params.push(("login_hint", hint));
        }
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Percent-encode a query component (RFC 3986 unreserved set)
pub(crate) fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
