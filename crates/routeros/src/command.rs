//! Command sentences sent to the router.

use std::fmt;

/// A single API command, such as `/log/print`, with optional attribute
/// and query words.
///
/// Words are assembled in the order the API expects: the command path
/// first, then attributes (`=name=value`), then queries (`?name=value`).
///
/// # Examples
///
/// ```
/// use routewatch_routeros::Command;
///
/// let cmd = Command::new("/log/print").query("topics", "system,error,critical");
/// assert_eq!(cmd.path(), "/log/print");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    path: String,
    attributes: Vec<String>,
    queries: Vec<String>,
}

impl Command {
    /// Create a command for the given path, e.g. `/login` or `/log/print`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attributes: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// Add an attribute word (`=name=value`).
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push(format!("={name}={value}"));
        self
    }

    /// Add a query word (`?name=value`), used by `print`-style commands
    /// to filter replies on the router side.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.queries.push(format!("?{name}={value}"));
        self
    }

    /// The command path word.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All words of the sentence, in wire order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str())
            .chain(self.attributes.iter().map(String::as_str))
            .chain(self.queries.iter().map(String::as_str))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for word in self.words() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{word}")?;
            first = false;
        }
        Ok(())
    }
}
