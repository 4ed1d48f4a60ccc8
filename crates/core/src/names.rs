//! Name allow-lists
//!
//! Dataset base names end up in filenames and are restricted to ASCII
//! letters, digits and underscores. Variable and parameter names may also
//! contain spaces. Directory names may additionally contain hyphens.

use crate::error::{Error, NameKind, Result};

fn allowed(kind: NameKind, c: char) -> bool {
    if c.is_ascii_alphanumeric() || c == '_' {
        return true;
    }
    match kind {
        NameKind::Dataset => false,
        NameKind::Variable | NameKind::Parameter => c == ' ',
        NameKind::Directory => c == ' ' || c == '-',
    }
}

/// Remove every character outside the allow-list for `kind`
pub fn sanitize(kind: NameKind, name: &str) -> String {
    name.chars().filter(|c| allowed(kind, *c)).collect()
}

/// Validate `name` against the allow-list for `kind`
///
/// The error carries the sanitized name as a suggestion.
pub fn validate(kind: NameKind, name: &str) -> Result<()> {
    let suggestion = sanitize(kind, name);
    if name.is_empty() || suggestion != name || name.trim().is_empty() {
        return Err(Error::InvalidName {
            kind,
            name: name.to_string(),
            suggestion,
        });
    }
    Ok(())
}
