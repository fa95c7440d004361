/// Text of the transient "typing" entry shown while a cycle is in flight.
pub const PLACEHOLDER_TEXT: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub is_from_user: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: true,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        !self.is_from_user && self.text == PLACEHOLDER_TEXT
    }
}

/// Append-only conversation log.
///
/// The only mutation besides appending is swapping a trailing placeholder for
/// a terminal message; entries are never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn push_placeholder(&mut self) {
        self.entries.push(Message::assistant(PLACEHOLDER_TEXT));
    }

    /// Pops the trailing placeholder (if it is one) and appends `terminal`.
    ///
    /// Returns whether a placeholder was replaced.
    pub fn replace_placeholder(&mut self, terminal: Message) -> bool {
        let replaced = matches!(self.entries.last(), Some(last) if last.is_placeholder());
        if replaced {
            self.entries.pop();
        }
        self.entries.push(terminal);
        replaced
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }
}
