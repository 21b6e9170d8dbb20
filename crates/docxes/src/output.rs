//! Styled status lines on stderr.

use console::{Style, Term};

pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(&Style::new(), msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&Style::new().green(), msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&Style::new().yellow(), msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&Style::new().red().bold(), msg);
    }

    /// Indented secondary line under a warning or error.
    pub(crate) fn detail(&self, msg: &str) {
        self.line(&Style::new().dim(), &format!("  {msg}"));
    }

    fn line(&self, style: &Style, msg: &str) {
        // Nothing useful to do if stderr is gone.
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}
