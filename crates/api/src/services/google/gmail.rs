//! Gmail API: listing, reading, sending and labelling messages.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use domain::models::gmail::{
    AttachmentInfo, EmailMessage, GmailMessage, ListMessagesQuery, MessageList, MessagePart,
    MessageRef, ModifyLabelsRequest, SendEmailRequest,
};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Method;
use serde_json::json;

use super::{endpoint, GoogleApiError, Session};

pub const MAX_MESSAGES: u32 = 100;
const UNREAD_LABEL: &str = "UNREAD";
const MIME_LINE_LENGTH: usize = 76;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

pub struct GmailApi {
    session: Session,
    base_url: String,
}

impl GmailApi {
    pub(crate) fn new(session: Session, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }

    fn messages_url(&self, extra: &[&str]) -> Result<reqwest::Url, GoogleApiError> {
        let mut segments = vec!["users", "me", "messages"];
        segments.extend_from_slice(extra);
        endpoint(&self.base_url, &segments)
    }

    pub async fn list_messages(&self, query: &ListMessagesQuery) -> Result<MessageList, GoogleApiError> {
        let mut params: Vec<(&str, String)> = vec![(
            "maxResults",
            query.max_results.unwrap_or(20).min(MAX_MESSAGES).to_string(),
        )];
        if let Some(q) = &query.q {
            params.push(("q", q.clone()));
        }
        if let Some(token) = &query.page_token {
            params.push(("pageToken", token.clone()));
        }

        let request = self
            .session
            .request(Method::GET, self.messages_url(&[])?)
            .query(&params);
        self.session.json(request).await
    }

    pub async fn get_message(&self, message_id: &str) -> Result<GmailMessage, GoogleApiError> {
        let request = self
            .session
            .request(Method::GET, self.messages_url(&[message_id])?)
            .query(&[("format", "full")]);
        self.session.json(request).await
    }

    /// Lists and fetches every message matching `q`, flattened.
    pub async fn search(&self, q: &str, max_results: u32) -> Result<Vec<EmailMessage>, GoogleApiError> {
        let list = self
            .list_messages(&ListMessagesQuery {
                q: Some(q.to_string()),
                max_results: Some(max_results),
                page_token: None,
            })
            .await?;

        let mut messages = Vec::with_capacity(list.messages.len());
        for reference in &list.messages {
            messages.push(flatten_message(&self.get_message(&reference.id).await?));
        }
        Ok(messages)
    }

    pub async fn send(&self, email: &SendEmailRequest) -> Result<MessageRef, GoogleApiError> {
        let raw = URL_SAFE_NO_PAD.encode(build_mime_message(email)?);
        let request = self
            .session
            .request(Method::POST, self.messages_url(&["send"])?)
            .json(&json!({ "raw": raw }));
        self.session.json(request).await
    }

    pub async fn modify_labels(
        &self,
        message_id: &str,
        labels: &ModifyLabelsRequest,
    ) -> Result<MessageRef, GoogleApiError> {
        let request = self
            .session
            .request(Method::POST, self.messages_url(&[message_id, "modify"])?)
            .json(labels);
        self.session.json(request).await
    }

    pub async fn mark_read(&self, message_id: &str) -> Result<MessageRef, GoogleApiError> {
        self.modify_labels(
            message_id,
            &ModifyLabelsRequest {
                add_label_ids: vec![],
                remove_label_ids: vec![UNREAD_LABEL.to_string()],
            },
        )
        .await
    }

    pub async fn trash(&self, message_id: &str) -> Result<MessageRef, GoogleApiError> {
        let request = self
            .session
            .request(Method::POST, self.messages_url(&[message_id, "trash"])?);
        self.session.json(request).await
    }
}

fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn find_body(part: &MessagePart, mime_type: &str) -> Option<String> {
    if part.mime_type.eq_ignore_ascii_case(mime_type) && part.filename.is_empty() {
        if let Some(text) = part.body.data.as_deref().and_then(decode_body) {
            return Some(text);
        }
    }
    part.parts.iter().find_map(|p| find_body(p, mime_type))
}

fn strip_html(html: &str) -> String {
    let text = HTML_TAG.replace_all(html, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    BLANK_LINES.replace_all(text.trim(), "\n\n").into_owned()
}

fn collect_attachments(part: &MessagePart, out: &mut Vec<AttachmentInfo>) {
    if !part.filename.is_empty() {
        out.push(AttachmentInfo {
            filename: part.filename.clone(),
            mime_type: part.mime_type.clone(),
            size: part.body.size,
            attachment_id: part.body.attachment_id.clone(),
        });
    }
    for child in &part.parts {
        collect_attachments(child, out);
    }
}

/// Flattens a full message into headers, a plain-text body and attachments.
///
/// Prefers the `text/plain` part; falls back to tag-stripped `text/html`.
pub fn flatten_message(message: &GmailMessage) -> EmailMessage {
    let payload = message.payload.as_ref();
    let header = |name: &str| payload.and_then(|p| p.header(name)).map(str::to_string);

    let body = payload.and_then(|p| {
        find_body(p, "text/plain").or_else(|| find_body(p, "text/html").map(|h| strip_html(&h)))
    });

    let mut attachments = Vec::new();
    if let Some(p) = payload {
        collect_attachments(p, &mut attachments);
    }

    EmailMessage {
        id: message.id.clone(),
        thread_id: message.thread_id.clone(),
        from: header("From"),
        to: header("To"),
        subject: header("Subject"),
        date: header("Date"),
        snippet: message.snippet.clone(),
        body,
        label_ids: message.label_ids.clone(),
        attachments,
    }
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

fn wrap_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    encoded
        .as_bytes()
        .chunks(MIME_LINE_LENGTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn reject_line_breaks(name: &str, value: &str) -> Result<(), GoogleApiError> {
    if value.contains('\r') || value.contains('\n') {
        return Err(GoogleApiError::InvalidRequest(format!(
            "{} must not contain line breaks",
            name
        )));
    }
    Ok(())
}

/// Renders an outgoing message as RFC 2822 text.
///
/// Messages with attachments become `multipart/mixed`; attachment data is
/// expected as standard base64 and is rejected when it does not decode.
pub fn build_mime_message(email: &SendEmailRequest) -> Result<Vec<u8>, GoogleApiError> {
    reject_line_breaks("Recipient", &email.to)?;
    reject_line_breaks("Subject", &email.subject)?;

    let mut headers = vec![format!("To: {}", email.to)];
    if let Some(cc) = email.cc.as_deref().filter(|c| !c.trim().is_empty()) {
        reject_line_breaks("Cc", cc)?;
        headers.push(format!("Cc: {}", cc));
    }
    headers.push(format!("Subject: {}", encode_header(&email.subject)));
    headers.push("MIME-Version: 1.0".to_string());

    let body_type = if email.is_html { "text/html" } else { "text/plain" };
    let body_part = format!(
        "Content-Type: {}; charset=\"UTF-8\"\r\nContent-Transfer-Encoding: base64\r\n\r\n{}",
        body_type,
        wrap_base64(email.body.as_bytes())
    );

    let mut message = headers.join("\r\n");
    if email.attachments.is_empty() {
        message.push_str("\r\n");
        message.push_str(&body_part);
        return Ok(message.into_bytes());
    }

    let boundary = format!("----=_Part_{}", uuid::Uuid::new_v4().simple());
    message.push_str(&format!(
        "\r\nContent-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n--{}\r\n{}",
        boundary, boundary, body_part
    ));

    for attachment in &email.attachments {
        reject_line_breaks("Attachment filename", &attachment.filename)?;
        let data = STANDARD.decode(attachment.data.trim()).map_err(|_| {
            GoogleApiError::InvalidRequest(format!(
                "Attachment {} is not valid base64",
                attachment.filename
            ))
        })?;
        let filename = encode_header(&attachment.filename);
        message.push_str(&format!(
            "\r\n--{}\r\nContent-Type: {}; name=\"{}\"\r\nContent-Disposition: attachment; filename=\"{}\"\r\nContent-Transfer-Encoding: base64\r\n\r\n{}",
            boundary,
            attachment.mime_type,
            filename,
            filename,
            wrap_base64(&data)
        ));
    }
    message.push_str(&format!("\r\n--{}--\r\n", boundary));

    Ok(message.into_bytes())
}
