use serde::{Deserialize, Serialize};

/// Identifier of a registered student
pub type StudentId = u32;

/// A student allowed to borrow books
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Student {
    /// Registration id
    pub id: StudentId,
    /// Full name as entered at the desk
    pub name: String,
}

impl Student {
    /// Create a student record
    #[must_use]
    pub fn new(id: StudentId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}
