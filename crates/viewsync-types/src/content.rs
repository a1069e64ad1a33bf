//! Message content payloads held in the content store.
//!
//! Every sub-structure is optional; the view projection derives its
//! component flags purely from which of these are present.

use serde::{Deserialize, Serialize};

/// Legal-value metadata attached to certified messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalData {
    pub has_attachment: bool,
}

/// Payment request attached to the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub notice_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

/// Certificate reference attached to the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateData {
    pub auth_code: String,
}

/// Reference to content held by a third party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyData {
    pub third_party_id: String,
}

/// Externally stored message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_data: Option<LegalData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party: Option<ThirdPartyData>,
}

impl Content {
    /// Content with a subject and no optional sub-structures.
    #[must_use]
    pub fn bare(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            certificate: None,
            legal_data: None,
            payment: None,
            third_party: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_content_has_no_components() {
        let content = Content::bare("hello");
        assert_eq!(content.subject, "hello");
        assert!(content.certificate.is_none());
        assert!(content.legal_data.is_none());
        assert!(content.payment.is_none());
        assert!(content.third_party.is_none());
    }

    #[test]
    fn optional_fields_omitted_in_json() {
        let json = serde_json::to_value(Content::bare("s")).unwrap();
        assert_eq!(json, serde_json::json!({"subject": "s"}));
    }

    #[test]
    fn payment_roundtrip() {
        let mut content = Content::bare("pay me");
        content.payment = Some(PaymentData {
            notice_number: "302001".into(),
            amount: Some(1500),
        });
        let json = serde_json::to_string(&content).unwrap();
        let back: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(content, back);
    }
}
