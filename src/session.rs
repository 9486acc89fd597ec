use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::{log, Level};

pub const VIEWER_HEADER: &str = "X-Viewer-Id";
const MAX_VIEWER_ID_LEN: usize = 128;

/// Opaque viewer session taken from the `X-Viewer-Id` header. It only scopes
/// votes to a browser session and proves nothing about who the viewer is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSession(pub String);

impl ViewerSession {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_VIEWER_ID_LEN || raw.chars().any(char::is_control) {
            return None;
        }
        Some(Self(raw.to_string()))
    }
}

impl FromRequest for ViewerSession {
    type Error = actix_web::error::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req
            .headers()
            .get(VIEWER_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(ViewerSession::parse);

        ready(match session {
            Some(session) => Ok(session),
            None => {
                log!(Level::Debug, "Request without a usable {VIEWER_HEADER} header");
                Err(actix_web::error::ErrorBadRequest(format!(
                    "Missing or invalid {VIEWER_HEADER} header"
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn header_is_extracted() {
        let req = TestRequest::default()
            .insert_header((VIEWER_HEADER, " abc-123 "))
            .to_http_request();
        let session = ViewerSession::extract(&req).await.unwrap();
        assert_eq!(session, ViewerSession("abc-123".into()));
    }

    #[actix_web::test]
    async fn missing_header_is_rejected() {
        let req = TestRequest::default().to_http_request();
        assert!(ViewerSession::extract(&req).await.is_err());
    }

    #[test]
    fn overlong_ids_are_rejected() {
        assert!(ViewerSession::parse(&"x".repeat(129)).is_none());
        assert!(ViewerSession::parse("   ").is_none());
    }
}
