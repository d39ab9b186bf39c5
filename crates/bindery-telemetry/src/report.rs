//! Rendering of error cause chains.

use std::error::Error;
use std::fmt;

/// Displays an error together with its source chain.
///
/// The plain form joins the chain with `": "`, skipping causes whose text
/// already appears in what was rendered so far. The alternate form (`{:#}`)
/// lists every cause on its own line.
///
/// # Example
///
/// ```rust
/// use bindery_telemetry::Report;
/// use std::io;
///
/// let inner = io::Error::new(io::ErrorKind::Other, "disk full");
/// let outer = io::Error::new(io::ErrorKind::Other, inner);
/// assert_eq!(Report::new(&outer).to_string(), "disk full");
/// ```
#[derive(Clone, Copy)]
pub struct Report<'a> {
    error: &'a (dyn Error + 'static),
}

impl<'a> Report<'a> {
    /// Wraps an error for display.
    #[must_use]
    pub fn new(error: &'a (dyn Error + 'static)) -> Self {
        Self { error }
    }

    /// Iterates the error and its sources, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
        std::iter::successors(Some(self.error), |&error| error.source())
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}", self.error)?;
            let mut causes = self.chain().skip(1).peekable();
            if causes.peek().is_some() {
                write!(f, "\n\nCaused by:")?;
                for (index, cause) in causes.enumerate() {
                    write!(f, "\n    {index}: {cause}")?;
                }
            }
            return Ok(());
        }

        let mut rendered = String::new();
        for cause in self.chain() {
            let text = cause.to_string();
            if rendered.contains(&text) {
                continue;
            }
            if !rendered.is_empty() {
                rendered.push_str(": ");
            }
            rendered.push_str(&text);
        }
        f.write_str(&rendered)
    }
}

impl fmt::Debug for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:#}")
    }
}
