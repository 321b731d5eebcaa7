use native_windows_gui::{message, MessageButtons, MessageIcons, MessageParams};

/// Shows an error message to the user, blocking until it is dismissed.
///
/// ## Arguments
/// * `title` - The title for the dialog
/// * `text`  - The text for the dialog
pub fn error_message(title: &str, text: &str) {
    message(&MessageParams {
        title,
        content: text,
        buttons: MessageButtons::Ok,
        icons: MessageIcons::Error,
    });
}
