//! Sibling name de-duplication.

/// Title and filename of an existing sibling.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SiblingName {
    /// Sibling title.
    pub title: String,
    /// Sibling filename (files only).
    pub filename: Option<String>,
}

impl SiblingName {
    /// Create a sibling name entry.
    pub fn new(title: impl Into<String>, filename: Option<&str>) -> Self {
        Self {
            title: title.into(),
            filename: filename.map(str::to_string),
        }
    }
}

/// Build the filename of an item titled `title`.
pub fn filename_for(title: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{title}.{ext}"),
        _ => title.to_string(),
    }
}

/// Return `title`, or `title_NN` when it collides with a sibling.
///
/// A candidate collides when a sibling carries the same title, or when the
/// filename derived from the candidate is already used by a sibling. Suffixes
/// start at `_01`.
pub fn unique_title(title: &str, extension: Option<&str>, siblings: &[SiblingName]) -> String {
    let taken = |candidate: &str| {
        let filename = filename_for(candidate, extension);
        siblings.iter().any(|sibling| {
            sibling.title == candidate || sibling.filename.as_deref() == Some(filename.as_str())
        })
    };

    if !taken(title) {
        return title.to_string();
    }

    let mut counter = 1u32;
    loop {
        let candidate = format!("{title}_{counter:02}");
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
