/// One student's billing-relevant data
///
/// Records are created by the roster loader from a single row of the input
/// table and never change afterwards. Name and identifier are guaranteed to be
/// non-empty, the phone number may be empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentRecord {
    name: String,
    identifier: String,
    phone: String,
}

impl StudentRecord {
    /// Creates a record from raw cell values
    ///
    /// All values are trimmed. Returns `None` if the name or the identifier is
    /// blank.
    pub fn new(name: &str, identifier: &str, phone: &str) -> Option<Self> {
        let name = name.trim();
        let identifier = identifier.trim();
        if name.is_empty() || identifier.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_owned(),
            identifier: identifier.to_owned(),
            phone: phone.trim().to_owned(),
        })
    }

    /// The student's full name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The student id, as it appears in the input
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The phone number, possibly empty
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// The identifier in a form that is safe to use inside a file name
    ///
    /// Spaces and path separators become underscores.
    pub fn file_stem(&self) -> String {
        self.identifier
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                c => c,
            })
            .collect()
    }

    /// The file name of this student's invoice document
    pub fn invoice_file_name(&self) -> String {
        format!("Invoice_{}.pdf", self.file_stem())
    }

    /// The file name of this student's verification image
    pub fn verification_file_name(&self) -> String {
        format!("QR_{}.png", self.file_stem())
    }
}
