//! Fallback responses: themed deny page for browsers, JSON errors otherwise

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;

use crate::errors::ProxyError;

const DENY_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Access Denied</title>
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
      background: #000;
      color: #fff;
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
      overflow: hidden;
      user-select: none;
    }
    .scan {
      position: fixed;
      inset: 0;
      pointer-events: none;
      background-image: linear-gradient(180deg, rgba(0,255,0,0.15) 1px, transparent 1px);
      background-size: 2px 8px;
      opacity: 0.4;
      animation: rain 20s linear infinite;
    }
    @keyframes rain {
      from { transform: translateY(-100%); }
      to { transform: translateY(0); }
    }
    .container {
      position: relative;
      z-index: 2;
      min-height: 100vh;
      display: flex;
      flex-direction: column;
      align-items: center;
      justify-content: center;
      text-align: center;
      padding: 24px;
    }
    .code {
      font-size: 5rem;
      font-weight: 800;
      color: #ff3737;
      letter-spacing: 0.15em;
      animation: pulse 2.5s infinite;
    }
    @keyframes pulse {
      0%,100% { text-shadow: 0 0 12px rgba(255,55,55,0.9); opacity: 1; }
      50% { text-shadow: 0 0 30px rgba(255,0,0,1); opacity: 0.8; }
    }
    .title {
      margin-top: 8px;
      font-size: 1.1rem;
      letter-spacing: 0.3em;
      color: #f97316;
    }
    .subtitle {
      margin-top: 18px;
      font-size: 0.9rem;
      color: #e5e7eb;
      opacity: 0.8;
    }
    .dot {
      display: inline-block;
      width: 6px;
      height: 6px;
      border-radius: 999px;
      background: #22c55e;
      margin-right: 8px;
      animation: blink 1.4s infinite;
      vertical-align: middle;
    }
    @keyframes blink {
      0%,100% { opacity: 1; }
      50% { opacity: 0.2; }
    }
  </style>
</head>
<body>
  <div class="scan"></div>
  <div class="container">
    <div class="code">404</div>
    <div class="title">ACCESS DENIED</div>
    <div class="subtitle"><span class="dot"></span>This request has been logged</div>
  </div>
  <script>
    document.addEventListener("contextmenu", function(e) { e.preventDefault(); });
  </script>
</body>
</html>
"#;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    error: &'static str,
    message: &'a str,
}

/// Themed "access denied" page, always 404.
pub fn deny_page() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(DENY_PAGE)
}

/// Structured JSON error carrying the error's own status code.
pub fn error_response(err: &ProxyError) -> HttpResponse {
    HttpResponse::build(err.status_code()).json(ErrorBody {
        code: err.code(),
        error: err.error_type(),
        message: err.message(),
    })
}

/// Response for a host that cannot be served: the deny page for browsers,
/// a JSON 404 for everyone else.
pub fn not_configured(browser: bool, err: &ProxyError) -> HttpResponse {
    if browser {
        deny_page()
    } else {
        error_response(err)
    }
}

/// Plain-text banner for the control-plane root.
pub fn online_banner() -> HttpResponse {
    HttpResponse::build(StatusCode::OK)
        .content_type("text/plain; charset=utf-8")
        .body("online")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_deny_page() {
        let resp = deny_page();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("ACCESS DENIED"));
    }

    #[actix_web::test]
    async fn test_error_response_is_json() {
        let err = ProxyError::not_configured("no domain configured for a.example");
        let resp = error_response(&err);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "E001");
        assert_eq!(json["message"], "no domain configured for a.example");
    }

    #[test]
    fn test_not_configured_picks_body_by_client() {
        let err = ProxyError::not_configured("x");
        let browser = not_configured(true, &err);
        let api = not_configured(false, &err);
        assert_eq!(browser.status(), api.status());
        assert_ne!(
            browser.headers().get("content-type"),
            api.headers().get("content-type")
        );
    }

    #[test]
    fn test_malformed_url_is_500() {
        let resp = error_response(&ProxyError::malformed_upstream_url("bad"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
