//! Redirect-fragment extraction
//!
//! After the hosted UI redirects back, the URL fragment carries either
//! tokens (`#id_token=...&access_token=...`) or an error pair. Consuming
//! the fragment is destructive - the page rewrites its URL afterwards - so
//! extraction runs at most once per controller lifetime, even when the
//! surrounding UI invokes it repeatedly (duplicate mounts). A routing
//! framework can also strip the fragment before we ever see it; the caller
//! may hand us a snapshot captured earlier, and we fall back to it exactly
//! once.

use lumen_core::Error;
use tracing::debug;

/// Tokens delivered by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthTokens {
    pub id_token: String,
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub token_type: String,
}

/// Result of one extraction attempt. Both fields absent means "no callback
/// present" - not an error.
#[derive(Debug, Default)]
pub struct RedirectOutcome {
    pub tokens: Option<OAuthTokens>,
    pub error: Option<Error>,
}

/// Extraction lifecycle: one shot per page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    Idle,
    Consumed,
}

/// Session-scoped extraction controller
#[derive(Debug)]
pub struct RedirectController {
    state: ExtractionState,
}

impl RedirectController {
    pub fn new() -> Self {
        Self {
            state: ExtractionState::Idle,
        }
    }

    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Extract tokens from the live fragment, falling back to the snapshot
    /// when the live fragment is already empty. The first call consumes;
    /// every later call yields an empty outcome regardless of what the
    /// fragment still contains.
    pub fn extract_tokens(
        &mut self,
        fragment: Option<&str>,
        snapshot: Option<&str>,
    ) -> RedirectOutcome {
        if self.state == ExtractionState::Consumed {
            debug!("redirect fragment already consumed this page load");
            return RedirectOutcome::default();
        }
        self.state = ExtractionState::Consumed;

        let raw = match fragment.filter(|f| !trimmed(f).is_empty()) {
            Some(f) => f,
            None => match snapshot.filter(|f| !trimmed(f).is_empty()) {
                Some(s) => {
                    debug!("live fragment empty, using pre-routing snapshot");
                    s
                }
                None => return RedirectOutcome::default(),
            },
        };

        parse_fragment(raw)
    }
}

impl Default for RedirectController {
    fn default() -> Self {
        Self::new()
    }
}

fn trimmed(fragment: &str) -> &str {
    fragment.strip_prefix('#').unwrap_or(fragment)
}

/// Parse a redirect fragment into tokens or a structured error.
///
/// Malformed pairs are skipped rather than failed: a fragment that does not
/// contain a callback is "no callback present", unless the provider sent an
/// explicit `error` parameter.
pub fn parse_fragment(fragment: &str) -> RedirectOutcome {
    let mut id_token = None;
    let mut access_token = None;
    let mut expires_in = None;
    let mut token_type = None;
    let mut error = None;
    let mut error_description = None;

    for pair in trimmed(fragment).split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let Some(value) = decode_component(value) else {
            continue;
        };
        match key {
            "id_token" => id_token = Some(value),
            "access_token" => access_token = Some(value),
            "expires_in" => expires_in = value.parse::<u64>().ok(),
            "token_type" => token_type = Some(value),
            "error" => error = Some(value),
            "error_description" => error_description = Some(value),
            _ => {}
        }
    }

    if let Some(code) = error {
        let description = error_description.unwrap_or_else(|| "unknown error".to_string());
        return RedirectOutcome {
            tokens: None,
            error: Some(Error::OAuth(format!("{}: {}", code, description))),
        };
    }

    match (id_token, access_token) {
        (Some(id_token), Some(access_token)) => RedirectOutcome {
            tokens: Some(OAuthTokens {
                id_token,
                access_token,
                expires_in,
                token_type: token_type.unwrap_or_else(|| "Bearer".to_string()),
            }),
            error: None,
        },
        _ => RedirectOutcome::default(),
    }
}

/// Percent-decode a fragment value; `+` is a space in query encoding.
/// Returns None for truncated or non-UTF-8 escapes.
fn decode_component(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1)?;
                let lo = bytes.get(i + 2)?;
                let hex = [*hi, *lo];
                let hex = std::str::from_utf8(&hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALLBACK: &str = "#id_token=jwt-abc&access_token=at-def&expires_in=3600&token_type=Bearer";

    #[test]
    fn test_parse_token_callback() {
        let outcome = parse_fragment(CALLBACK);
        let tokens = outcome.tokens.unwrap();
        assert_eq!(tokens.id_token, "jwt-abc");
        assert_eq!(tokens.access_token, "at-def");
        assert_eq!(tokens.expires_in, Some(3600));
        assert_eq!(tokens.token_type, "Bearer");
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_error_callback_is_structured() {
        let outcome =
            parse_fragment("#error=access_denied&error_description=user%20cancelled");
        assert!(outcome.tokens.is_none());
        let err = outcome.error.unwrap();
        assert!(err.to_string().contains("access_denied: user cancelled"));
    }

    #[test]
    fn test_malformed_fragment_is_no_callback() {
        for fragment in ["#", "#garbage", "#a&b&c", "#id_token=only-one", "#%zz=1"] {
            let outcome = parse_fragment(fragment);
            assert!(outcome.tokens.is_none(), "{fragment}");
            assert!(outcome.error.is_none(), "{fragment}");
        }
    }

    #[test]
    fn test_unparseable_expires_in_is_absent() {
        let outcome =
            parse_fragment("#id_token=a&access_token=b&expires_in=soon");
        assert_eq!(outcome.tokens.unwrap().expires_in, None);
    }

    #[test]
    fn test_one_shot_consumption() {
        let mut controller = RedirectController::new();
        assert_eq!(controller.state(), ExtractionState::Idle);

        let first = controller.extract_tokens(Some(CALLBACK), None);
        assert!(first.tokens.is_some());
        assert_eq!(controller.state(), ExtractionState::Consumed);

        // Second call yields absent even though the fragment is still there
        let second = controller.extract_tokens(Some(CALLBACK), None);
        assert!(second.tokens.is_none());
        assert!(second.error.is_none());
    }

    #[test]
    fn test_snapshot_fallback_when_fragment_stripped() {
        let mut controller = RedirectController::new();
        let outcome = controller.extract_tokens(Some(""), Some(CALLBACK));
        assert!(outcome.tokens.is_some());
    }

    #[test]
    fn test_empty_everything_is_no_callback_but_still_consumes() {
        let mut controller = RedirectController::new();
        let outcome = controller.extract_tokens(None, None);
        assert!(outcome.tokens.is_none());
        assert!(outcome.error.is_none());
        assert_eq!(controller.state(), ExtractionState::Consumed);
    }
}
