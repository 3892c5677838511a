use crate::utils::error::{Result, TrackerError};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use reqwest::Client;
use std::time::Duration;

/// OAuth 憑證三件組，全部走環境變數（排程跑在 CI 上，secrets 不落地）
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl OAuthCredentials {
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            std::env::var(name).map_err(|_| TrackerError::MissingEnvError {
                name: name.to_string(),
            })
        };

        Ok(Self {
            client_id: read("GOOGLE_CLIENT_ID")?,
            client_secret: read("GOOGLE_CLIENT_SECRET")?,
            refresh_token: read("GOOGLE_REFRESH_TOKEN")?,
        })
    }
}

/// Gmail API 寄送客戶端：refresh token 換 access token，
/// 再把 raw MIME POST 到 messages.send。
pub struct GmailMailer {
    client: Client,
    token_url: String,
    send_url: String,
    timeout: Duration,
}

impl GmailMailer {
    pub fn new(token_url: String, send_url: String) -> Self {
        Self {
            client: Client::new(),
            token_url,
            send_url,
            timeout: Duration::from_secs(30),
        }
    }

    /// 用 refresh token 換 access token
    pub async fn access_token(&self, creds: &OAuthCredentials) -> Result<String> {
        let payload = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", creds.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::AuthError {
                message: format!("Token exchange failed: {} {}", status, body),
            });
        }

        let data: serde_json::Value = response.json().await?;
        match data.get("access_token").and_then(|t| t.as_str()) {
            Some(token) => Ok(token.to_string()),
            None => Err(TrackerError::AuthError {
                message: format!("No access_token in response: {}", data),
            }),
        }
    }

    /// 寄出 HTML 郵件，附上用 CID 內嵌的 PNG 圖表
    pub async fn send_html_with_inline_image(
        &self,
        creds: &OAuthCredentials,
        subject: &str,
        sender: &str,
        to: &str,
        html_body: &str,
        inline_png: Option<&[u8]>,
        inline_cid: &str,
    ) -> Result<serde_json::Value> {
        let raw = build_mime(subject, sender, to, html_body, inline_png, inline_cid)?;
        let raw_b64 = URL_SAFE.encode(&raw);

        let token = self.access_token(creds).await?;

        tracing::debug!("📧 Sending {} byte MIME message", raw.len());
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "raw": raw_b64 }))
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::MailError {
                message: format!("Send failed: {} {}", status, body),
            });
        }

        let body: serde_json::Value = response.json().await?;
        tracing::info!(
            "📧 Email accepted, message id: {}",
            body.get("id").and_then(|i| i.as_str()).unwrap_or("?")
        );
        Ok(body)
    }
}

fn mail_err<E: std::fmt::Display>(e: E) -> TrackerError {
    TrackerError::MailError {
        message: e.to_string(),
    }
}

/// 組 multipart/related MIME：alternative(html) + inline PNG。
/// 回傳完整的 RFC 5322 bytes，給 Gmail API 的 raw 欄位用。
pub fn build_mime(
    subject: &str,
    sender: &str,
    to: &str,
    html_body: &str,
    inline_png: Option<&[u8]>,
    inline_cid: &str,
) -> Result<Vec<u8>> {
    let from_mbox: Mailbox = sender.parse().map_err(mail_err)?;
    let to_mbox: Mailbox = to.parse().map_err(mail_err)?;

    let builder = Message::builder()
        .from(from_mbox)
        .to(to_mbox)
        .subject(subject);

    let alternative =
        MultiPart::alternative().singlepart(SinglePart::html(html_body.to_string()));

    let message = match inline_png {
        Some(png_bytes) => {
            let content_type = ContentType::parse("image/png").map_err(mail_err)?;
            let image_part =
                Attachment::new_inline(inline_cid.to_string()).body(png_bytes.to_vec(), content_type);

            builder
                .multipart(
                    MultiPart::related()
                        .multipart(alternative)
                        .singlepart(image_part),
                )
                .map_err(mail_err)?
        }
        None => builder.multipart(alternative).map_err(mail_err)?,
    };

    Ok(message.formatted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const PNG_STUB: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];

    fn creds() -> OAuthCredentials {
        OAuthCredentials {
            client_id: "cid".to_string(),
            client_secret: "csec".to_string(),
            refresh_token: "rtok".to_string(),
        }
    }

    #[test]
    fn test_build_mime_structure() {
        let raw = build_mime(
            "Quarterly Net Worth",
            "tracker@example.com",
            "family@example.com",
            "<html><body>hi</body></html>",
            Some(PNG_STUB),
            "chart",
        )
        .unwrap();

        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("Subject: Quarterly Net Worth"));
        assert!(text.contains("multipart/related"));
        assert!(text.contains("multipart/alternative"));
        assert!(text.contains("text/html"));
        assert!(text.contains("Content-ID: <chart>"));
        assert!(text.contains("Content-Disposition: inline"));
    }

    #[test]
    fn test_build_mime_without_image() {
        let raw = build_mime(
            "Quarterly Net Worth",
            "tracker@example.com",
            "family@example.com",
            "<p>hi</p>",
            None,
            "chart",
        )
        .unwrap();

        let text = String::from_utf8_lossy(&raw);
        assert!(!text.contains("multipart/related"));
        assert!(text.contains("multipart/alternative"));
    }

    #[test]
    fn test_build_mime_rejects_bad_address() {
        assert!(build_mime("s", "not an address", "x@example.com", "<p></p>", None, "c").is_err());
    }

    #[tokio::test]
    async fn test_token_exchange() {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .body_contains("grant_type=refresh_token")
                .body_contains("refresh_token=rtok");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"access_token": "at-123", "expires_in": 3599}));
        });

        let mailer = GmailMailer::new(server.url("/token"), server.url("/send"));
        let token = mailer.access_token(&creds()).await.unwrap();

        token_mock.assert();
        assert_eq!(token, "at-123");
    }

    #[tokio::test]
    async fn test_token_exchange_failure_surfaces_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400)
                .json_body(serde_json::json!({"error": "invalid_grant"}));
        });

        let mailer = GmailMailer::new(server.url("/token"), server.url("/send"));
        let err = mailer.access_token(&creds()).await.unwrap_err();

        match err {
            TrackerError::AuthError { message } => assert!(message.contains("invalid_grant")),
            other => panic!("expected AuthError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_posts_raw_with_bearer() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "at-123"}));
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/send")
                .header("authorization", "Bearer at-123")
                .body_contains("\"raw\"");
            then.status(200)
                .json_body(serde_json::json!({"id": "msg-1", "labelIds": ["SENT"]}));
        });

        let mailer = GmailMailer::new(server.url("/token"), server.url("/send"));
        let result = mailer
            .send_html_with_inline_image(
                &creds(),
                "Quarterly Net Worth",
                "tracker@example.com",
                "family@example.com",
                "<p>report</p>",
                Some(PNG_STUB),
                "chart",
            )
            .await
            .unwrap();

        send_mock.assert();
        assert_eq!(result.get("id").unwrap(), "msg-1");
    }

    #[tokio::test]
    async fn test_send_failure_is_mail_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "at-123"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/send");
            then.status(403).body("rate limited");
        });

        let mailer = GmailMailer::new(server.url("/token"), server.url("/send"));
        let err = mailer
            .send_html_with_inline_image(
                &creds(),
                "s",
                "tracker@example.com",
                "family@example.com",
                "<p></p>",
                None,
                "chart",
            )
            .await
            .unwrap_err();

        match err {
            TrackerError::MailError { message } => assert!(message.contains("rate limited")),
            other => panic!("expected MailError, got {:?}", other),
        }
    }
}
