pub use crate::constants::network::{
    MAX_CHAT_MESSAGE_LENGTH, MAX_PACKET_SIZE, MAX_USERNAME_LENGTH, PROTOCOL_VERSION, TELEPORT_ID,
};

/// Protocol handler
pub struct Protocol;

impl Protocol {
    /// Validate username
    pub fn validate_username(username: &str) -> Result<(), String> {
        if username.is_empty() {
            return Err("Username cannot be empty".to_string());
        }

        if username.len() > MAX_USERNAME_LENGTH {
            return Err(format!("Username too long (max {} characters)", MAX_USERNAME_LENGTH));
        }

        // Check for valid characters (alphanumeric and underscore)
        if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err("Username can only contain letters, numbers, and underscores".to_string());
        }

        Ok(())
    }

    /// Validate chat message
    pub fn validate_chat_message(message: &str) -> Result<(), String> {
        if message.trim().is_empty() {
            return Err("Message cannot be empty".to_string());
        }

        if message.chars().count() > MAX_CHAT_MESSAGE_LENGTH {
            return Err(format!("Message too long (max {} characters)", MAX_CHAT_MESSAGE_LENGTH));
        }

        Ok(())
    }

    /// Check the version a client logs in with
    pub fn validate_version(version: u32) -> Result<(), String> {
        if version != PROTOCOL_VERSION {
            return Err(format!(
                "Outdated protocol (server speaks {}, client sent {})",
                PROTOCOL_VERSION, version
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(Protocol::validate_username("Borges_1899").is_ok());
        assert!(Protocol::validate_username("").is_err());
        assert!(Protocol::validate_username("a".repeat(17).as_str()).is_err());
        assert!(Protocol::validate_username("bad name").is_err());
    }

    #[test]
    fn test_validate_chat_message() {
        assert!(Protocol::validate_chat_message("hello").is_ok());
        assert!(Protocol::validate_chat_message("   ").is_err());
        assert!(Protocol::validate_chat_message(&"x".repeat(257)).is_err());
    }
}
