/// The screens of the front-end. Controllers return one of these when an
/// action should navigate away from the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Login form.
    Entry,
    /// Registration form.
    Register,
    /// The QR code dashboard.
    Dashboard,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Entry => "Sign in",
            Screen::Register => "Create account",
            Screen::Dashboard => "QR Tracker",
        }
    }
}
