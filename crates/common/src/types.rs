use serde::{Deserialize, Serialize};

/// Opaque supplier-assigned identifier for a sellable product listing.
///
/// The kiosk token is the primary key for every product-level cache and for
/// the persistent fallback row, so it is kept distinct from other strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KioskToken(String);

impl KioskToken {
    /// Creates a kiosk token from a string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KioskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for KioskToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for KioskToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for KioskToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Supplier-assigned order identifier returned by a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the order ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Caller credential sent with purchases and key retrieval.
///
/// `Debug` never prints the token itself.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserToken(String);

impl UserToken {
    /// Creates a user token from a string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for UserToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UserToken(***)")
    }
}

impl From<String> for UserToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kiosk_token_preserves_value() {
        let token = KioskToken::new("KIOSK-ABC");
        assert_eq!(token.as_str(), "KIOSK-ABC");
        assert_eq!(token.to_string(), "KIOSK-ABC");
    }

    #[test]
    fn kiosk_token_serializes_transparently() {
        let token = KioskToken::from("KIOSK-ABC");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"KIOSK-ABC\"");
        let deserialized: KioskToken = serde_json::from_str(&json).unwrap();
        assert_eq!(token, deserialized);
    }

    #[test]
    fn order_id_from_string() {
        let id = OrderId::from("ORD-1".to_string());
        assert_eq!(id.as_str(), "ORD-1");
    }

    #[test]
    fn user_token_debug_is_redacted() {
        let token = UserToken::new("secret-value");
        assert_eq!(format!("{token:?}"), "UserToken(***)");
        assert_eq!(token.as_str(), "secret-value");
    }

    #[test]
    fn user_token_blank_detection() {
        assert!(UserToken::new("   ").is_blank());
        assert!(!UserToken::new("abc").is_blank());
    }
}
