pub mod banner;
pub mod tui;

pub use tui::{TuiCredentialPrompt, TuiInputPort};

/// Prints the welcome banner and applies the matching prompt theme for all subsequent inquire prompts.
/// Call once at startup (e.g. in main after tracing init).
pub fn init_ui() {
    banner::print_welcome();
    tui::apply_theme();
}
