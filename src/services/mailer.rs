// src/services/mailer.rs

//! Notification digest and SMTP submission.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::{Finding, MailConfig};

pub const SENDER_VAR: &str = "SENDER_EMAIL";
pub const PASSWORD_VAR: &str = "EMAIL_PASSWORD";
pub const RECIPIENT_VAR: &str = "RECEIVER_EMAIL";

/// Rule line closing each finding block.
const RULE_WIDTH: usize = 50;

/// Sender, password and recipient, read from the environment once.
#[derive(Clone)]
pub struct MailCredentials {
    pub sender: Mailbox,
    pub password: String,
    pub recipient: Mailbox,
}

impl MailCredentials {
    /// Read `SENDER_EMAIL`, `EMAIL_PASSWORD` and `RECEIVER_EMAIL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from any variable lookup. Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(AppError::MissingCredential(name))
        };

        let sender = get(SENDER_VAR)?;
        let password = get(PASSWORD_VAR)?;
        let recipient = get(RECIPIENT_VAR)?;

        Ok(Self {
            sender: sender.trim().parse()?,
            password,
            recipient: recipient.trim().parse()?,
        })
    }
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Plain-text notification ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub body: String,
}

/// Compose the notification for a run's new findings.
pub fn compose_digest(
    pipeline_name: &str,
    headline: &str,
    findings: &[Finding],
    at: NaiveDateTime,
) -> Digest {
    let subject = format!(
        "Nouveaux résultats {} - {}",
        pipeline_name,
        at.format("%Y-%m-%d %H:%M")
    );

    let mut body = format!("{headline}\n\n");
    for finding in findings {
        body.push_str(&finding.describe());
        body.push_str(&"-".repeat(RULE_WIDTH));
        body.push_str("\n\n");
    }

    Digest { subject, body }
}

/// Delivers digests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, digest: &Digest) -> Result<()>;
}

/// SMTP notifier: STARTTLS on the submission port, then LOGIN.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    credentials: MailCredentials,
}

impl EmailNotifier {
    pub fn new(config: &MailConfig, credentials: MailCredentials) -> Result<Self> {
        let login = Credentials::new(
            credentials.sender.email.to_string(),
            credentials.password.clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(login)
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            transport,
            credentials,
        })
    }
}

/// Build a multipart message with a single text/plain part.
pub fn build_message(credentials: &MailCredentials, digest: &Digest) -> Result<Message> {
    let message = Message::builder()
        .from(credentials.sender.clone())
        .to(credentials.recipient.clone())
        .subject(digest.subject.as_str())
        .multipart(MultiPart::mixed().singlepart(SinglePart::plain(digest.body.clone())))?;
    Ok(message)
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, digest: &Digest) -> Result<()> {
        let message = build_message(&self.credentials, digest)?;
        self.transport.send(message).await?;
        log::info!("Email sent to {}", self.credentials.recipient);
        Ok(())
    }
}

/// Stand-in used when credentials failed validation at startup.
#[derive(Debug)]
pub struct DisabledNotifier {
    reason: String,
}

impl DisabledNotifier {
    pub fn new(reason: impl fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _digest: &Digest) -> Result<()> {
        Err(AppError::NotifierDisabled(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::models::{PageMatch, ProjectRecord};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (SENDER_VAR, "veille@example.org"),
            (PASSWORD_VAR, "app-password"),
            (RECIPIENT_VAR, "alerte@example.org"),
        ]
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = MailCredentials::from_lookup(env(&full_env())).unwrap();
        assert_eq!(creds.sender.email.to_string(), "veille@example.org");
        assert_eq!(creds.recipient.email.to_string(), "alerte@example.org");
        assert_eq!(creds.password, "app-password");
    }

    #[test]
    fn test_missing_credential_names_variable() {
        for missing in [SENDER_VAR, PASSWORD_VAR, RECIPIENT_VAR] {
            let pairs: Vec<_> = full_env().into_iter().filter(|(k, _)| *k != missing).collect();
            match MailCredentials::from_lookup(env(&pairs)) {
                Err(AppError::MissingCredential(name)) => assert_eq!(name, missing),
                other => panic!("expected missing {missing}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let mut pairs = full_env();
        pairs[1] = (PASSWORD_VAR, "   ");
        assert!(matches!(
            MailCredentials::from_lookup(env(&pairs)),
            Err(AppError::MissingCredential(PASSWORD_VAR))
        ));
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let mut pairs = full_env();
        pairs[0] = (SENDER_VAR, "not an address");
        assert!(matches!(
            MailCredentials::from_lookup(env(&pairs)),
            Err(AppError::Address(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = MailCredentials::from_lookup(env(&full_env())).unwrap();
        let shown = format!("{creds:?}");
        assert!(!shown.contains("app-password"));
    }

    #[test]
    fn test_compose_page_digest() {
        let findings = vec![Finding::Page(PageMatch {
            text: "IEL ENR signs contract".into(),
            url: "https://example.org/a".into(),
            keyword: "IEL ENR".into(),
        })];

        let digest = compose_digest("Côtes-d'Armor", "Nouveaux résultats :", &findings, at());
        assert_eq!(digest.subject, "Nouveaux résultats Côtes-d'Armor - 2026-10-19 07:05");
        assert_eq!(
            digest.body,
            format!(
                "Nouveaux résultats :\n\n\
                 Mot-clé trouvé : IEL ENR\n\
                 Texte : IEL ENR signs contract\n\
                 URL : https://example.org/a\n\
                 {}\n\n",
                "-".repeat(50)
            )
        );
    }

    #[test]
    fn test_compose_project_digest_lists_every_finding() {
        let project = |title: &str| {
            Finding::Project(ProjectRecord {
                keyword: "Moalic".into(),
                title: title.into(),
                description: String::new(),
                commune: "Loudéac".into(),
                departement: "22".into(),
                url: "https://example.org/fiche".into(),
                record_id: "1".into(),
            })
        };

        let digest = compose_digest(
            "Projets-Environnement",
            "Nouveaux projets :",
            &[project("Premier"), project("Second")],
            at(),
        );
        assert_eq!(digest.body.matches(&"-".repeat(50)).count(), 2);
        assert!(digest.body.find("Titre : Premier").unwrap() < digest.body.find("Titre : Second").unwrap());
        assert!(digest.body.contains("Département : 22\n"));
    }

    #[test]
    fn test_build_message() {
        let creds = MailCredentials::from_lookup(env(&full_env())).unwrap();
        let digest = Digest {
            subject: "Nouveaux résultats".into(),
            body: "corps".into(),
        };

        let message = build_message(&creds, &digest).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: veille@example.org"));
        assert!(raw.contains("To: alerte@example.org"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("text/plain"));
    }

    #[tokio::test]
    async fn test_disabled_notifier_fails() {
        let notifier = DisabledNotifier::new("missing SENDER_EMAIL");
        let digest = Digest {
            subject: String::new(),
            body: String::new(),
        };
        assert!(matches!(
            notifier.send(&digest).await,
            Err(AppError::NotifierDisabled(_))
        ));
    }
}
