use crate::models::Record;

/// Everything the study model, the template catalog and the store can refuse.
///
/// None of these are fatal: callers report them and keep the last good
/// in-memory state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a course named '{0}' already exists")]
    DuplicateName(String),

    #[error("course name must not be blank")]
    EmptyName,

    #[error("course '{0}' not found")]
    NotFound(String),

    #[error("note is empty, nothing saved")]
    EmptyContent,

    #[error("task description is required")]
    EmptyDescription,

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{template}' has no field '{label}'")]
    UnknownField { template: String, label: String },

    #[error("index {index} out of range ({len} item(s))")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("please enter a search term")]
    EmptyQuery,

    #[error("{record} data could not be read: {reason}")]
    CorruptData { record: Record, reason: String },

    #[error("failed to save {record}: {source}")]
    WriteFailed {
        record: Record,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check `index` against a sequence of `len` items.
pub fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { index, len })
    }
}
