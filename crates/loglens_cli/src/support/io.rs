use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};

/// Interactive questions asked on a terminal.
pub trait Prompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String>;

    /// Returns the index of the chosen option.
    fn select(&mut self, message: &str, options: &[String], default: usize) -> Result<usize>;
}

/// Line-based prompter. Questions go to `output` so stdout stays free for
/// command results.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").context("Failed to write prompt")?;
        self.output.flush().context("Failed to flush prompt")?;
        let mut buffer = String::new();
        let read = self
            .input
            .read_line(&mut buffer)
            .context("Failed to read response")?;
        if read == 0 {
            anyhow::bail!("input closed while waiting for an answer");
        }
        Ok(buffer.trim().to_owned())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("{message} {hint} "))?.to_ascii_lowercase();
        Ok(match answer.as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        let prompt = match default {
            Some(value) if !value.is_empty() => format!("{message} [{value}]: "),
            _ => format!("{message}: "),
        };
        let answer = self.ask(&prompt)?;
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_owned());
        }
        Ok(answer)
    }

    fn select(&mut self, message: &str, options: &[String], default: usize) -> Result<usize> {
        if options.is_empty() {
            anyhow::bail!("nothing to choose from");
        }
        let default = default.min(options.len() - 1);
        writeln!(self.output, "{message}").context("Failed to write prompt")?;
        for (idx, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", idx + 1, option).context("Failed to write prompt")?;
        }

        loop {
            let answer = self.ask(&format!("Choose 1-{} [{}]: ", options.len(), default + 1))?;
            if answer.is_empty() {
                return Ok(default);
            }
            if let Ok(choice) = answer.parse::<usize>() {
                if (1..=options.len()).contains(&choice) {
                    return Ok(choice - 1);
                }
            }
            if let Some(idx) = options.iter().position(|option| option == &answer) {
                return Ok(idx);
            }
            writeln!(self.output, "`{answer}` is not one of the options.")
                .context("Failed to write prompt")?;
        }
    }
}

pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

pub fn stdout_is_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Reads a single secret from piped input, e.g. `echo $TOKEN | loglens auth login`.
pub fn read_secret_line<R: BufRead>(mut reader: R) -> Result<String> {
    let mut buffer = String::new();
    reader
        .read_line(&mut buffer)
        .context("Failed to read token from stdin")?;
    let secret = buffer.trim().to_owned();
    if secret.is_empty() {
        anyhow::bail!("no token provided on stdin");
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn prompter(input: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn confirm_uses_default_on_empty_answer() {
        assert!(prompter("\n").confirm("Open?", true).unwrap());
        assert!(!prompter("\n").confirm("Open?", false).unwrap());
        assert!(prompter("YES\n").confirm("Open?", false).unwrap());
        assert!(!prompter("nope\n").confirm("Open?", true).unwrap());
    }

    #[test]
    fn input_falls_back_to_default() {
        assert_eq!(
            prompter("\n").input("Url", Some("https://a")).unwrap(),
            "https://a"
        );
        assert_eq!(prompter("  b  \n").input("Url", None).unwrap(), "b");
    }

    #[test]
    fn select_accepts_number_or_name_and_retries_garbage() {
        let options = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        assert_eq!(prompter("2\n").select("Pick", &options, 0).unwrap(), 1);
        assert_eq!(prompter("gamma\n").select("Pick", &options, 0).unwrap(), 2);
        assert_eq!(prompter("\n").select("Pick", &options, 1).unwrap(), 1);
        assert_eq!(prompter("9\nalpha\n").select("Pick", &options, 2).unwrap(), 0);
    }

    #[test]
    fn closed_input_is_an_error() {
        assert!(prompter("").input("Url", None).is_err());
    }

    #[test]
    fn reads_secret_from_pipe() {
        assert_eq!(read_secret_line(Cursor::new("tok-123\n")).unwrap(), "tok-123");
        assert!(read_secret_line(Cursor::new("\n")).is_err());
    }
}
