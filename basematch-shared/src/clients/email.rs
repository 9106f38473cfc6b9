use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Outbound transactional mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a link the user clicks to prove they own `to`.
    async fn send_verification_link(&self, to: &str, url: &str) -> Result<(), String>;

    /// Sends a 6-digit code the user types back into the app.
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), String>;
}

/// Resend-backed mailer.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: [to],
            subject,
            html,
        };

        let response = self.client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error ({status}): {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailClient {
    async fn send_verification_link(&self, to: &str, url: &str) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #0052ff;">BaseMatch - Verify your email</h2>
            <p>Confirm this address to finish setting up your BaseMatch profile.</p>
            <p style="text-align: center; margin: 32px 0;"><a href="{url}" style="background: #0052ff; color: #fff; padding: 14px 28px; border-radius: 8px; text-decoration: none;">Verify email</a></p>
            <p style="color: #666;">This link expires in 24 hours. If you did not sign up for BaseMatch, ignore this email.</p>
            </div>"#
        );

        self.send_email(to, "BaseMatch - Verify your email", &html).await
    }

    async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #0052ff;">BaseMatch - Verification code</h2>
            <p>Your verification code is:</p>
            <div style="background: #0a0b0d; color: #0052ff; font-size: 32px; font-weight: bold; text-align: center; padding: 20px; border-radius: 8px; letter-spacing: 8px;">{code}</div>
            <p style="color: #666; margin-top: 20px;">This code expires in 15 minutes.</p>
            </div>"#
        );

        self.send_email(to, "BaseMatch - Your verification code", &html).await
    }
}
