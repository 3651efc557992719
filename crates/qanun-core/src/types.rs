use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// The author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed by the account owner.
    User,
    /// A reply produced by the answer pipeline.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// The classified purpose of the user's latest message.
///
/// Serialized labels match the classifier's one-word output exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// A specific legal question answerable with cited sources.
    LegalQuestion,
    /// A vague mention of a legal issue that needs follow-up details.
    VagueLegalInquiry,
    /// Greetings, small talk, or anything non-legal.
    CasualConversation,
}

impl Intent {
    /// Map raw classifier output onto a variant.
    ///
    /// Only the two exact labels select their variants; anything else,
    /// including empty or malformed output, is casual conversation.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "LegalQuestion" => Intent::LegalQuestion,
            "VagueLegalInquiry" => Intent::VagueLegalInquiry,
            _ => Intent::CasualConversation,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::LegalQuestion => write!(f, "LegalQuestion"),
            Intent::VagueLegalInquiry => write!(f, "VagueLegalInquiry"),
            Intent::CasualConversation => write!(f, "CasualConversation"),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A single chat message.
///
/// Immutable once appended. `id` is unique within the owning chat and
/// assigned sequentially (1-based, as a string) at append time. The language
/// fields are set only on assistant messages produced by the legal-answer
/// path, recording the language the text was generated in vs. the language
/// requested for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_language: Option<String>,
}

/// A titled, ordered conversation owned by exactly one user.
///
/// Messages are append-only and chronological. `updated_at` is refreshed on
/// every mutation (append, rename).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered account as persisted by the store.
///
/// Carries the password hash. Never hand this struct to callers outside the
/// store; convert with [`User::profile`] first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub password_hash: String,
}

impl User {
    /// The sanitized view safe to expose in any response.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            surname: self.surname.clone(),
        }
    }
}

/// Account fields safe to expose. No credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: String,
}

/// Facts inferred from conversation history.
///
/// Recomputed from scratch on every answer-generation call; a read-side
/// projection over message history, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryContext {
    /// Self-reported first name.
    pub name: Option<String>,
    /// Self-reported age in years.
    pub age: Option<u32>,
    /// Self-reported or mentioned home city.
    pub location: Option<String>,
    /// Legal-topic keywords seen in the history, in keyword-table order.
    pub topics: Vec<String>,
}

impl MemoryContext {
    /// True when no fact was extracted.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.location.is_none() && self.topics.is_empty()
    }

    /// Render the Azerbaijani memory block fed to the model, one line per
    /// known fact. Empty string when nothing is known.
    pub fn to_prompt(&self) -> String {
        let mut prompt = String::new();
        if let Some(ref name) = self.name {
            prompt.push_str(&format!("İstifadəçinin adı: {}\n", name));
        }
        if let Some(age) = self.age {
            prompt.push_str(&format!("İstifadəçinin yaşı: {}\n", age));
        }
        if let Some(ref location) = self.location {
            prompt.push_str(&format!("İstifadəçinin yaşadığı yer: {}\n", location));
        }
        if !self.topics.is_empty() {
            prompt.push_str(&format!(
                "Müzakirə edilən hüquqi mövzular: {}\n",
                self.topics.join(", ")
            ));
        }
        prompt
    }
}

/// One trusted web-search result used as citable evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message(id: &str, role: Role, content: &str) -> Message {
        Message {
            id: id.to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            original_language: None,
            display_language: None,
        }
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );

        let parsed: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(parsed, Role::Assistant);
    }

    #[test]
    fn test_role_rejects_unknown_label() {
        let result: std::result::Result<Role, _> = serde_json::from_str("\"bot\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_intent_parse_exact_labels() {
        assert_eq!(Intent::parse("LegalQuestion"), Intent::LegalQuestion);
        assert_eq!(Intent::parse("VagueLegalInquiry"), Intent::VagueLegalInquiry);
        assert_eq!(
            Intent::parse("CasualConversation"),
            Intent::CasualConversation
        );
    }

    #[test]
    fn test_intent_parse_trims_whitespace() {
        assert_eq!(Intent::parse("  LegalQuestion\n"), Intent::LegalQuestion);
    }

    #[test]
    fn test_intent_parse_defaults_to_casual() {
        assert_eq!(Intent::parse(""), Intent::CasualConversation);
        assert_eq!(Intent::parse("legalquestion"), Intent::CasualConversation);
        assert_eq!(Intent::parse("Legal Question"), Intent::CasualConversation);
        assert_eq!(
            Intent::parse("I think this is a LegalQuestion"),
            Intent::CasualConversation
        );
    }

    #[test]
    fn test_intent_display_matches_classifier_labels() {
        assert_eq!(Intent::LegalQuestion.to_string(), "LegalQuestion");
        assert_eq!(Intent::VagueLegalInquiry.to_string(), "VagueLegalInquiry");
        assert_eq!(Intent::CasualConversation.to_string(), "CasualConversation");
    }

    #[test]
    fn test_message_serialization_skips_absent_languages() {
        let msg = make_message("1", Role::User, "Salam");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("originalLanguage"));
        assert!(!json.contains("displayLanguage"));
    }

    #[test]
    fn test_message_serialization_camel_case_languages() {
        let mut msg = make_message("2", Role::Assistant, "Cavab");
        msg.original_language = Some("az".to_string());
        msg.display_language = Some("en".to_string());

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"originalLanguage\":\"az\""));
        assert!(json.contains("\"displayLanguage\":\"en\""));
    }

    #[test]
    fn test_message_round_trip() {
        let msg = make_message("3", Role::User, "Sualım var");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_chat_serialization_camel_case_keys() {
        let now = Utc::now();
        let chat = Chat {
            id: "1724500000000".to_string(),
            user_id: "1".to_string(),
            title: "New Chat".to_string(),
            messages: vec![make_message("1", Role::User, "Salam")],
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&chat).unwrap();
        assert!(json.contains("\"userId\":\"1\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));

        let parsed: Chat = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, chat);
    }

    #[test]
    fn test_user_profile_has_no_password_hash() {
        let user = User {
            id: "1".to_string(),
            username: "aysel".to_string(),
            email: "aysel@example.az".to_string(),
            name: "Aysel".to_string(),
            surname: "Məmmədova".to_string(),
            password_hash: "$argon2$fake".to_string(),
        };

        let profile = user.profile();
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("passwordHash"));
        assert!(!json.contains("$argon2$fake"));
        assert_eq!(profile.username, "aysel");
        assert_eq!(profile.surname, "Məmmədova");
    }

    #[test]
    fn test_memory_context_is_empty() {
        assert!(MemoryContext::default().is_empty());

        let ctx = MemoryContext {
            age: Some(30),
            ..Default::default()
        };
        assert!(!ctx.is_empty());
    }

    #[test]
    fn test_memory_context_prompt_lines() {
        let ctx = MemoryContext {
            name: Some("Elvin".to_string()),
            age: Some(45),
            location: Some("Bakı".to_string()),
            topics: vec!["miras".to_string(), "mülk".to_string()],
        };

        let prompt = ctx.to_prompt();
        assert!(prompt.contains("İstifadəçinin adı: Elvin\n"));
        assert!(prompt.contains("İstifadəçinin yaşı: 45\n"));
        assert!(prompt.contains("İstifadəçinin yaşadığı yer: Bakı\n"));
        assert!(prompt.contains("Müzakirə edilən hüquqi mövzular: miras, mülk\n"));
    }

    #[test]
    fn test_memory_context_prompt_omits_absent_fields() {
        let ctx = MemoryContext {
            age: Some(30),
            ..Default::default()
        };

        let prompt = ctx.to_prompt();
        assert_eq!(prompt, "İstifadəçinin yaşı: 30\n");
    }

    #[test]
    fn test_memory_context_empty_prompt() {
        assert_eq!(MemoryContext::default().to_prompt(), "");
    }

    #[test]
    fn test_source_hit_round_trip() {
        let hit = SourceHit {
            title: "Mülki Məcəllə".to_string(),
            link: "https://e-qanun.az/framework/46944".to_string(),
            snippet: "Mülkiyyət hüququ haqqında".to_string(),
        };

        let json = serde_json::to_string(&hit).unwrap();
        let parsed: SourceHit = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hit);
    }
}
