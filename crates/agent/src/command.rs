//! Chat command parsing.

use relaybot_core::channel::ChannelMessage;

/// What an inbound message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask the LLM. The prompt may be empty and is validated by the handler.
    Ask(String),
    /// Clear the sender's conversation history.
    Forget,
    /// Not for us.
    Ignore,
}

impl Command {
    /// Classify `message`.
    ///
    /// Automated accounts are always ignored. The forget command is matched
    /// before the ask prefix; both must appear at the very start of the
    /// content. The prefix is stripped once and the prompt trimmed, so
    /// `"!ask   what is 2+2 "` asks `"what is 2+2"`.
    pub fn parse(message: &ChannelMessage, command_prefix: &str, forget_command: &str) -> Self {
        if message.from_bot {
            return Self::Ignore;
        }

        let content = message.content.as_str();
        if content.starts_with(forget_command) {
            return Self::Forget;
        }

        match content.strip_prefix(command_prefix) {
            Some(rest) => Self::Ask(rest.trim().to_string()),
            None => Self::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_core::channel::ChannelId;

    fn message(content: &str, from_bot: bool) -> ChannelMessage {
        ChannelMessage {
            channel_id: ChannelId("test".into()),
            message_id: "1".into(),
            sender_id: "u1".into(),
            sender_name: None,
            from_bot,
            content: content.into(),
            chat_id: "c1".into(),
            metadata: serde_json::Map::new(),
        }
    }

    fn parse(content: &str) -> Command {
        Command::parse(&message(content, false), "!ask", "!forget")
    }

    #[test]
    fn ask_strips_prefix_and_trims() {
        assert_eq!(parse("!ask what is 2+2"), Command::Ask("what is 2+2".into()));
        assert_eq!(parse("!ask    spaced out   "), Command::Ask("spaced out".into()));
    }

    #[test]
    fn bare_prefix_is_an_empty_ask() {
        assert_eq!(parse("!ask "), Command::Ask(String::new()));
        assert_eq!(parse("!ask"), Command::Ask(String::new()));
    }

    #[test]
    fn prefix_is_stripped_only_once() {
        assert_eq!(parse("!ask !ask twice"), Command::Ask("!ask twice".into()));
    }

    #[test]
    fn glued_prefix_still_asks() {
        assert_eq!(parse("!askfoo"), Command::Ask("foo".into()));
    }

    #[test]
    fn forget_must_start_the_message() {
        assert_eq!(parse("!forget"), Command::Forget);
        assert_eq!(parse("!forget everything"), Command::Forget);
        assert_eq!(parse("please !forget"), Command::Ignore);
    }

    #[test]
    fn other_messages_are_ignored() {
        assert_eq!(parse("hello there"), Command::Ignore);
        assert_eq!(parse(" !ask leading space"), Command::Ignore);
        assert_eq!(parse(""), Command::Ignore);
    }

    #[test]
    fn bots_are_ignored() {
        let msg = message("!ask hi", true);
        assert_eq!(Command::parse(&msg, "!ask", "!forget"), Command::Ignore);
    }

    #[test]
    fn custom_prefixes() {
        let msg = message("?q hello", false);
        assert_eq!(Command::parse(&msg, "?q", "?reset"), Command::Ask("hello".into()));
    }
}
