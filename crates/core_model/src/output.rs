use std::fmt;

/// How tailed events are rendered. Chosen once when a stream starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// One JSON record per line, payload only.
    Structured,
    /// Formatted timestamp, a tab, then the payload as JSON.
    #[default]
    HumanReadable,
}

impl OutputMode {
    /// Name of the matching `--format` value.
    pub fn format_name(self) -> &'static str {
        match self {
            OutputMode::Structured => "json",
            OutputMode::HumanReadable => "table",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format_name())
    }
}
