use reqwest::{Client, Response};

use crate::error::AiError;

const DISABLE_SYSTEM_PROXY_ENV: &str = "TIMESCRIBE_DISABLE_SYSTEM_PROXY";

// Truncate error bodies to prevent leaking large or sensitive responses.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_http_client() -> Client {
    if should_disable_system_proxy() {
        Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new())
    } else {
        Client::new()
    }
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}

pub(crate) fn truncate_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &body[..cut])
}

pub(crate) async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    AiError::Api {
        provider: provider.to_string(),
        status,
        message: truncate_body(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("short".to_string()), "short");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = truncate_body(body);
        assert!(truncated.ends_with("... [truncated]"));
        assert!(truncated.len() <= MAX_ERROR_BODY + "... [truncated]".len());
    }
}
