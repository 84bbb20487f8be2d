use crate::span::Span;

/// A compiler diagnostic (error or warning).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        if self.span.is_dummy() {
            self.render_plain();
            return;
        }

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let start = (self.span.start as usize).min(source.len());
        let end = (self.span.end as usize).clamp(start, source.len());

        let mut report = Report::build(kind, filename, start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        if report
            .finish()
            .eprint((filename, Source::from(source)))
            .is_err()
        {
            self.render_plain();
        }
    }

    /// Render without source context: `error: message` plus notes.
    pub fn render_plain(&self) {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{}: {}", label, self.message);
        for note in &self.notes {
            eprintln!("  note: {}", note);
        }
        if let Some(help) = &self.help {
            eprintln!("  help: {}", help);
        }
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

// ─── Sinks ────────────────────────────────────────────────────────

/// Where the compiler reports diagnostics as it works.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Prints every diagnostic to stderr as it arrives.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.render_plain();
    }
}
