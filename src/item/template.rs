//! Blank document templates used to instantiate new files.

/// A blank document of a given format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTemplate {
    /// File extension, without the dot.
    pub extension: &'static str,
    /// MIME type of the document.
    pub mimetype: &'static str,
    /// Document bytes.
    pub content: &'static [u8],
}

impl DocumentTemplate {
    /// Size of the blank document in bytes.
    pub fn size(&self) -> i64 {
        self.content.len() as i64
    }
}

/// Available templates, in the order they are offered.
pub const TEMPLATES: &[DocumentTemplate] = &[
    DocumentTemplate {
        extension: "odt",
        mimetype: "application/vnd.oasis.opendocument.text",
        content: include_bytes!("../../templates/empty.odt"),
    },
    DocumentTemplate {
        extension: "ods",
        mimetype: "application/vnd.oasis.opendocument.spreadsheet",
        content: include_bytes!("../../templates/empty.ods"),
    },
    DocumentTemplate {
        extension: "odp",
        mimetype: "application/vnd.oasis.opendocument.presentation",
        content: include_bytes!("../../templates/empty.odp"),
    },
];

/// Find the template for an extension.
pub fn find_template(extension: &str) -> Option<&'static DocumentTemplate> {
    TEMPLATES.iter().find(|t| t.extension == extension)
}

/// Extensions accepted for template instantiation.
pub fn allowed_extensions() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|t| t.extension)
}
