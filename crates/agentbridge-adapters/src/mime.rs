//! Outbound email encoder -- builds raw RFC 2822 messages for Gmail.
//!
//! The Gmail `messages.send` and `drafts.create` endpoints accept a complete
//! MIME message, base64url-encoded without padding.  Everything here is a
//! pure function of the [`OutboundEmail`] fields apart from the random
//! multipart boundary, which [`build_raw_message_with_boundary`] lets tests
//! pin down.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use regex::Regex;

use crate::error::{AdapterError, Result};

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("address pattern is valid")
});

/// Body representation of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Plain,
    Html,
    MultipartAlternative,
}

impl ContentType {
    fn mime_type(self) -> &'static str {
        match self {
            Self::Plain => "text/plain",
            Self::Html => "text/html",
            Self::MultipartAlternative => "multipart/alternative",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for ContentType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text/plain" | "plain" => Ok(Self::Plain),
            "text/html" | "html" => Ok(Self::Html),
            "multipart/alternative" | "multipart" => Ok(Self::MultipartAlternative),
            other => Err(AdapterError::invalid_params(
                "gmail_send_email",
                format!(
                    "unsupported content type `{other}`; expected text/plain, text/html or multipart/alternative"
                ),
            )),
        }
    }
}

/// Fields of a message to be sent or drafted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Sender.  When absent Gmail stamps the authenticated account.
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: Option<String>,
    pub html_body: Option<String>,
    pub content_type: Option<ContentType>,
    pub in_reply_to: Option<String>,
}

/// Check an address against the permissive `local@domain.tld` shape.
///
/// `Jane Doe <jane@example.com>` is checked on the bracketed part.
pub fn validate_address(address: &str) -> Result<()> {
    if has_line_break(address) {
        return Err(AdapterError::InvalidAddress(address.to_string()));
    }
    let trimmed = address.trim();
    let bare = match (trimmed.rfind('<'), trimmed.ends_with('>')) {
        (Some(start), true) => &trimmed[start + 1..trimmed.len() - 1],
        _ => trimmed,
    };
    if ADDRESS_RE.is_match(bare) {
        Ok(())
    } else {
        Err(AdapterError::InvalidAddress(address.to_string()))
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

/// Header values are written verbatim, so a line break would start a new header.
fn check_header(name: &str, value: &str) -> Result<()> {
    if has_line_break(value) {
        return Err(AdapterError::invalid_params(
            "gmail_send_email",
            format!("`{name}` must not contain line breaks"),
        ));
    }
    Ok(())
}

/// Split a comma-separated recipient string into trimmed, non-empty entries.
pub fn split_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 2047 "B" encoding, applied only when the subject is not pure ASCII.
pub fn encode_subject(subject: &str) -> String {
    if subject.is_ascii() {
        subject.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}

/// Pick the body representation: explicit override first, then whatever
/// the supplied bodies imply.
pub fn effective_content_type(email: &OutboundEmail) -> ContentType {
    if let Some(explicit) = email.content_type {
        return explicit;
    }
    match (email.body.is_some(), email.html_body.is_some()) {
        (true, true) => ContentType::MultipartAlternative,
        (false, true) => ContentType::Html,
        _ => ContentType::Plain,
    }
}

/// Generate a fresh multipart boundary token.
pub fn random_boundary() -> String {
    format!("agentbridge_{}", uuid::Uuid::new_v4().simple())
}

/// Build the raw message with a random multipart boundary.
pub fn build_raw_message(email: &OutboundEmail) -> Result<String> {
    build_raw_message_with_boundary(email, &random_boundary())
}

/// Build the raw CRLF-joined message using `boundary` for multipart bodies.
pub fn build_raw_message_with_boundary(email: &OutboundEmail, boundary: &str) -> Result<String> {
    for address in email.to.iter().chain(&email.cc).chain(&email.bcc) {
        validate_address(address)?;
    }
    if let Some(from) = &email.from {
        check_header("From", from)?;
    }
    check_header("Subject", &email.subject)?;
    if let Some(reply_to) = &email.in_reply_to {
        check_header("In-Reply-To", reply_to)?;
    }

    let content_type = effective_content_type(email);
    let mut lines: Vec<String> = Vec::with_capacity(16);

    if let Some(from) = &email.from {
        lines.push(format!("From: {from}"));
    }
    lines.push(format!("To: {}", email.to.join(", ")));
    if !email.cc.is_empty() {
        lines.push(format!("Cc: {}", email.cc.join(", ")));
    }
    if !email.bcc.is_empty() {
        lines.push(format!("Bcc: {}", email.bcc.join(", ")));
    }
    lines.push(format!("Subject: {}", encode_subject(&email.subject)));
    if let Some(reply_to) = &email.in_reply_to {
        lines.push(format!("In-Reply-To: {reply_to}"));
        lines.push(format!("References: {reply_to}"));
    }
    lines.push("MIME-Version: 1.0".to_string());

    let plain = email
        .body
        .as_deref()
        .or(email.html_body.as_deref())
        .unwrap_or_default();
    let html = email
        .html_body
        .as_deref()
        .or(email.body.as_deref())
        .unwrap_or_default();

    match content_type {
        ContentType::MultipartAlternative => {
            lines.push(format!(
                "Content-Type: multipart/alternative; boundary=\"{boundary}\""
            ));
            lines.push(String::new());
            for (mime, text) in [("text/plain", plain), ("text/html", html)] {
                lines.push(format!("--{boundary}"));
                lines.push(format!("Content-Type: {mime}; charset=\"UTF-8\""));
                lines.push("Content-Transfer-Encoding: 7bit".to_string());
                lines.push(String::new());
                lines.push(text.to_string());
            }
            lines.push(format!("--{boundary}--"));
        }
        ContentType::Html => {
            lines.push("Content-Type: text/html; charset=\"UTF-8\"".to_string());
            lines.push(String::new());
            lines.push(html.to_string());
        }
        ContentType::Plain => {
            lines.push("Content-Type: text/plain; charset=\"UTF-8\"".to_string());
            lines.push(String::new());
            lines.push(plain.to_string());
        }
    }

    Ok(lines.join("\r\n"))
}

/// Base64url (no padding) framing expected by the Gmail `raw` field.
pub fn encode_raw(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(body: Option<&str>, html: Option<&str>) -> OutboundEmail {
        OutboundEmail {
            to: vec!["user@example.com".into()],
            subject: "Hello".into(),
            body: body.map(str::to_string),
            html_body: html.map(str::to_string),
            ..OutboundEmail::default()
        }
    }

    // -- Address validation --

    #[test]
    fn accepts_plain_address() {
        assert!(validate_address("user@example.com").is_ok());
    }

    #[test]
    fn accepts_display_name_form() {
        assert!(validate_address("Jane Doe <jane@example.com>").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["user@", "@example.com", "user example.com", "a b@c.com"] {
            match validate_address(bad) {
                Err(AdapterError::InvalidAddress(addr)) => assert_eq!(addr, bad),
                other => panic!("expected InvalidAddress for `{bad}`, got {other:?}"),
            }
        }
    }

    #[test]
    fn split_addresses_trims_and_drops_empty() {
        assert_eq!(
            split_addresses(" a@x.com, ,b@y.org "),
            vec!["a@x.com".to_string(), "b@y.org".to_string()]
        );
    }

    // -- Subject encoding --

    #[test]
    fn ascii_subject_left_verbatim() {
        assert_eq!(encode_subject("Hello"), "Hello");
    }

    #[test]
    fn non_ascii_subject_is_b_encoded() {
        let encoded = encode_subject("Café");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
        let payload = &encoded["=?UTF-8?B?".len()..encoded.len() - 2];
        assert_eq!(STANDARD.decode(payload).unwrap(), "Café".as_bytes());
    }

    // -- Content type selection --

    #[test]
    fn content_type_selection() {
        assert_eq!(
            effective_content_type(&email(Some("Hi"), Some("<b>Hi</b>"))),
            ContentType::MultipartAlternative
        );
        assert_eq!(
            effective_content_type(&email(None, Some("<b>Hi</b>"))),
            ContentType::Html
        );
        assert_eq!(
            effective_content_type(&email(Some("Hi"), None)),
            ContentType::Plain
        );
        let mut forced = email(Some("Hi"), Some("<b>Hi</b>"));
        forced.content_type = Some(ContentType::Plain);
        assert_eq!(effective_content_type(&forced), ContentType::Plain);
    }

    #[test]
    fn content_type_parses_overrides() {
        assert_eq!("text/html".parse::<ContentType>().unwrap(), ContentType::Html);
        assert_eq!(
            "Multipart/Alternative".parse::<ContentType>().unwrap(),
            ContentType::MultipartAlternative
        );
        assert!("application/pdf".parse::<ContentType>().is_err());
    }

    // -- Message assembly --

    #[test]
    fn multipart_message_has_two_parts_and_terminator() {
        let raw =
            build_raw_message_with_boundary(&email(Some("Hi"), Some("<b>Hi</b>")), "BOUNDARY")
                .unwrap();
        assert!(raw.contains("Content-Type: multipart/alternative; boundary=\"BOUNDARY\""));
        assert_eq!(raw.matches("--BOUNDARY\r\n").count(), 2);
        assert_eq!(raw.matches("--BOUNDARY--").count(), 1);
        assert!(raw.ends_with("--BOUNDARY--"));
        assert_eq!(raw.matches("Content-Transfer-Encoding: 7bit").count(), 2);

        let plain_at = raw.find("text/plain; charset").unwrap();
        let html_at = raw.find("text/html; charset").unwrap();
        assert!(plain_at < html_at);
        assert!(raw.contains("\r\n\r\nHi\r\n--BOUNDARY"));
        assert!(raw.contains("\r\n\r\n<b>Hi</b>\r\n--BOUNDARY--"));
    }

    #[test]
    fn headers_emitted_in_fixed_order() {
        let msg = OutboundEmail {
            from: Some("me@example.com".into()),
            to: vec!["a@example.com".into(), "b@example.com".into()],
            cc: vec!["c@example.com".into()],
            bcc: vec!["d@example.com".into()],
            subject: "Re: plans".into(),
            body: Some("ok".into()),
            in_reply_to: Some("<abc@mail.gmail.com>".into()),
            ..OutboundEmail::default()
        };
        let raw = build_raw_message_with_boundary(&msg, "b").unwrap();
        let order = [
            "From: me@example.com",
            "To: a@example.com, b@example.com",
            "Cc: c@example.com",
            "Bcc: d@example.com",
            "Subject: Re: plans",
            "In-Reply-To: <abc@mail.gmail.com>",
            "References: <abc@mail.gmail.com>",
            "MIME-Version: 1.0",
        ];
        let positions: Vec<usize> = order.iter().map(|h| raw.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn optional_headers_are_omitted() {
        let raw = build_raw_message_with_boundary(&email(Some("Hi"), None), "b").unwrap();
        assert!(!raw.contains("From:"));
        assert!(!raw.contains("Cc:"));
        assert!(!raw.contains("Bcc:"));
        assert!(!raw.contains("In-Reply-To:"));
        assert!(!raw.contains("References:"));
        assert!(raw.contains("Content-Type: text/plain; charset=\"UTF-8\"\r\n\r\nHi"));
    }

    #[test]
    fn forced_multipart_reuses_html_as_plain_fallback() {
        let mut msg = email(None, Some("<p>Only HTML</p>"));
        msg.content_type = Some(ContentType::MultipartAlternative);
        let raw = build_raw_message_with_boundary(&msg, "X").unwrap();
        assert_eq!(raw.matches("<p>Only HTML</p>").count(), 2);
    }

    #[test]
    fn invalid_cc_fails_fast() {
        let mut msg = email(Some("Hi"), None);
        msg.cc = vec!["not-an-address".into()];
        match build_raw_message(&msg) {
            Err(AdapterError::InvalidAddress(addr)) => assert_eq!(addr, "not-an-address"),
            other => panic!("expected InvalidAddress, got {other:?}"),
        }
    }

    #[test]
    fn line_breaks_in_display_names_are_rejected() {
        let mut msg = email(Some("Hi"), None);
        msg.to = vec!["Eve\r\nBcc: victim@evil.com <a@b.com>".into()];
        assert!(matches!(
            build_raw_message(&msg),
            Err(AdapterError::InvalidAddress(_))
        ));
        assert!(validate_address("Eve\n <a@b.com>").is_err());
    }

    #[test]
    fn line_breaks_in_header_values_are_rejected() {
        let mut subject = email(Some("Hi"), None);
        subject.subject = "Hi\r\nBcc: spy@evil.com".into();

        let mut from = email(Some("Hi"), None);
        from.from = Some("me@example.com\nBcc: spy@evil.com".into());

        let mut reply = email(Some("Hi"), None);
        reply.in_reply_to = Some("<id@x>\r\nX-Injected: 1".into());

        for (msg, header) in [(subject, "Subject"), (from, "From"), (reply, "In-Reply-To")] {
            match build_raw_message(&msg) {
                Err(AdapterError::InvalidParams { reason, .. }) => {
                    assert!(reason.contains(header), "{reason}")
                }
                other => panic!("expected InvalidParams for {header}, got {other:?}"),
            }
        }
    }

    #[test]
    fn line_breaks_in_body_are_kept() {
        let raw = build_raw_message_with_boundary(&email(Some("line one\r\nline two"), None), "b")
            .unwrap();
        assert!(raw.ends_with("line one\r\nline two"));
    }

    #[test]
    fn empty_recipients_are_left_to_the_provider() {
        let mut msg = email(Some("Hi"), None);
        msg.to.clear();
        assert!(build_raw_message(&msg).is_ok());
    }

    #[test]
    fn raw_encoding_is_url_safe_without_padding() {
        let encoded = encode_raw("Subject: ??>>\r\n\r\nbody?");
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(
            URL_SAFE_NO_PAD.decode(&encoded).unwrap(),
            b"Subject: ??>>\r\n\r\nbody?"
        );
    }

    #[test]
    fn random_boundaries_differ() {
        assert_ne!(random_boundary(), random_boundary());
    }
}
