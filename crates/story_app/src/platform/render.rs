use story_core::{ConversationViewModel, Message};

/// Turns successive view models into terminal lines, printing only what changed.
///
/// A terminal cannot rewrite earlier lines, so a replaced placeholder shows up
/// as a new line below it.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    printed: Vec<Message>,
    status: Option<String>,
    video_url: Option<String>,
    playback_error: Option<String>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &ConversationViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        let common = self
            .printed
            .iter()
            .zip(&view.messages)
            .take_while(|(printed, current)| printed == current)
            .count();
        for message in &view.messages[common..] {
            lines.push(format_message(message));
        }
        self.printed = view.messages.clone();

        if let Some(line) = changed(&mut self.status, &view.status_text) {
            lines.push(format!("  [{line}]"));
        }
        if let Some(url) = changed(&mut self.video_url, &view.video_url) {
            lines.push(format!("  video: {url}"));
        }
        if let Some(error) = changed(&mut self.playback_error, &view.playback_error) {
            lines.push(format!("  [{error}]"));
        }

        lines
    }
}

fn format_message(message: &Message) -> String {
    if message.is_from_user {
        format!("you> {}", message.text)
    } else {
        format!("story> {}", message.text)
    }
}

/// Records `current` and returns it when it is a new, non-empty value.
fn changed(last: &mut Option<String>, current: &Option<String>) -> Option<String> {
    if last == current {
        return None;
    }
    last.clone_from(current);
    current.clone()
}
