//! SQL extraction from completion text.
//!
//! Models answer in markdown, so the statement is taken from the first
//! ```` ```sql ```` fenced block. The search is positional only; nothing here
//! looks at the SQL itself.

/// Opening fence marker for a SQL block.
pub const OPEN_FENCE: &str = "```sql";

/// Closing fence marker.
pub const CLOSE_FENCE: &str = "```";

/// Outcome of searching a completion for a SQL block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Opening and closing fence found; body trimmed
    Fenced(String),

    /// Opening fence found but no closing fence after it; trimmed remainder
    Unterminated(String),

    /// No opening fence anywhere in the completion
    MissingOpenFence,
}

impl Extraction {
    /// Statement text to hand to the executor.
    ///
    /// `MissingOpenFence` yields an empty statement, which the executor rejects.
    pub fn statement(&self) -> &str {
        match self {
            Self::Fenced(sql) | Self::Unterminated(sql) => sql,
            Self::MissingOpenFence => "",
        }
    }

    /// Check if a complete fenced block was found.
    pub fn is_fenced(&self) -> bool {
        matches!(self, Self::Fenced(_))
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fenced(_) => "fenced",
            Self::Unterminated(_) => "unterminated",
            Self::MissingOpenFence => "missing_open_fence",
        }
    }
}

/// Extract the first SQL block from completion text.
///
/// # Arguments
///
/// * `completion` - Raw model output
///
/// # Returns
///
/// `Extraction` describing what was found. Never panics.
///
/// # Examples
///
/// ```
/// use text2sql::llm::{extract_sql, Extraction};
///
/// let completion = "Here you go:\n```sql\nSELECT * FROM sensors;\n```\nEnjoy.";
/// assert_eq!(
///     extract_sql(completion),
///     Extraction::Fenced("SELECT * FROM sensors;".to_string())
/// );
/// ```
pub fn extract_sql(completion: &str) -> Extraction {
    let Some(open) = completion.find(OPEN_FENCE) else {
        return Extraction::MissingOpenFence;
    };

    let rest = &completion[open + OPEN_FENCE.len()..];
    match rest.find(CLOSE_FENCE) {
        Some(close) => Extraction::Fenced(rest[..close].trim().to_string()),
        None => Extraction::Unterminated(rest.trim().to_string()),
    }
}
