//! Structured chat text
//!
//! Messages are sent as a list of styled parts so clients can colour them and attach click
//! actions. Viewers that turned chat colours off receive the same parts with styling removed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatColor {
    White,
    Gray,
    DarkGray,
    Red,
    Yellow,
    Green,
    Aqua,
    Blue,
    LightPurple,
}

/// What happens when a part is clicked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickAction {
    RunCommand(String),
    SuggestCommand(String),
    OpenUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPart {
    pub text: String,
    pub color: Option<ChatColor>,
    pub bold: bool,
    pub italic: bool,
    pub click: Option<ClickAction>,
}

impl ChatPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: false,
            italic: false,
            click: None,
        }
    }

    pub fn color(mut self, color: ChatColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn on_click(mut self, action: ClickAction) -> Self {
        self.click = Some(action);
        self
    }
}

/// One chat line (or several, separated by `\n` inside parts)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub parts: Vec<ChatPart>,
}

impl ChatMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new().text(text)
    }

    pub fn push(mut self, part: ChatPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Unstyled text
    pub fn text(self, text: impl Into<String>) -> Self {
        self.push(ChatPart::new(text).color(ChatColor::White))
    }

    pub fn colored(self, text: impl Into<String>, color: ChatColor) -> Self {
        self.push(ChatPart::new(text).color(color))
    }

    /// Bold coloured text
    pub fn highlighted(self, text: impl Into<String>, color: ChatColor) -> Self {
        self.push(ChatPart::new(text).color(color).bold())
    }

    /// Clickable aqua text
    pub fn action(self, text: impl Into<String>, action: ClickAction) -> Self {
        self.push(ChatPart::new(text).color(ChatColor::Aqua).on_click(action))
    }

    /// Link that opens in the browser
    pub fn link(self, url: &str) -> Self {
        self.action(url, ClickAction::OpenUrl(url.to_string()))
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::new()
            .highlighted("[NOTICE] ", ChatColor::Red)
            .text(message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new()
            .highlighted("[ERROR] ", ChatColor::Red)
            .text(message)
    }

    /// Same text and click actions with every colour and emphasis removed
    pub fn without_colors(&self) -> Self {
        Self {
            parts: self
                .parts
                .iter()
                .map(|part| ChatPart {
                    text: part.text.clone(),
                    color: None,
                    bold: false,
                    italic: false,
                    click: part.click.clone(),
                })
                .collect(),
        }
    }

    /// Concatenated text of every part
    pub fn plain_text(&self) -> String {
        self.parts.iter().map(|part| part.text.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_colors_keeps_text_and_actions() {
        let message = ChatMessage::new()
            .highlighted("Shelf 3", ChatColor::Yellow)
            .action(" [stop]", ClickAction::SuggestCommand("/highlight stop".to_string()));
        let stripped = message.without_colors();

        assert_eq!(stripped.plain_text(), "Shelf 3 [stop]");
        assert!(stripped.parts.iter().all(|part| part.color.is_none() && !part.bold));
        assert_eq!(stripped.parts[1].click, message.parts[1].click);
    }

    #[test]
    fn test_error_prefix() {
        assert_eq!(ChatMessage::error("Invalid coordinates.").plain_text(), "[ERROR] Invalid coordinates.");
    }
}
