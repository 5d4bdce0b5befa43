use crate::opcode::Opcode;

#[derive(thiserror::Error, Debug)]
pub enum ChunkError {
    #[error("invalid header: {what} is {found}, expected {expected}")]
    InvalidHeader {
        what: &'static str,
        found: String,
        expected: String,
    },

    #[error("unexpected end of input reading `{field}` at offset 0x{offset:X}: needed {needed} bytes, {available} left")]
    Truncated {
        field: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed length {length} for `{field}` at offset 0x{offset:X}")]
    MalformedLength {
        field: String,
        offset: usize,
        length: i32,
    },

    #[error("malformed string `{field}` at offset 0x{offset:X}: {reason}")]
    MalformedString {
        field: String,
        offset: usize,
        reason: &'static str,
    },

    #[error("self-check mismatch: {what} is {found}, this reader expects {expected}")]
    SelfCheckMismatch {
        what: &'static str,
        found: String,
        expected: String,
    },

    #[error("unknown opcode {opcode} in word 0x{word:08X} at {chunk} pc={pc}")]
    UnknownOpcode {
        chunk: String,
        pc: usize,
        opcode: u8,
        word: u32,
    },

    #[error("{chunk} pc={pc}: {opcode} references {table}[{index}], but only {len} entries exist")]
    OperandIndexOutOfRange {
        chunk: String,
        pc: usize,
        opcode: Opcode,
        table: &'static str,
        index: u32,
        len: usize,
    },

    #[error("function nesting exceeds the limit of {limit} at `{path}`")]
    TooDeeplyNested { path: String, limit: usize },

    #[error("input is {len} bytes, over the limit of {limit}")]
    InputTooLarge { len: usize, limit: usize },

    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("formatting failed")]
    Fmt(#[from] std::fmt::Error),
}

impl ChunkError {
    /// Prefix the field path of a decode error with an enclosing segment.
    ///
    /// Parse errors start out naming the innermost field (`start_pc`) and are
    /// qualified on the way up (`main.local_vars[0].start_pc`).
    pub fn within(self, segment: &str) -> Self {
        match self {
            ChunkError::Truncated {
                field,
                offset,
                needed,
                available,
            } => ChunkError::Truncated {
                field: join_path(segment, &field),
                offset,
                needed,
                available,
            },
            ChunkError::MalformedLength {
                field,
                offset,
                length,
            } => ChunkError::MalformedLength {
                field: join_path(segment, &field),
                offset,
                length,
            },
            ChunkError::MalformedString {
                field,
                offset,
                reason,
            } => ChunkError::MalformedString {
                field: join_path(segment, &field),
                offset,
                reason,
            },
            ChunkError::TooDeeplyNested { path, limit } => ChunkError::TooDeeplyNested {
                path: join_path(segment, &path),
                limit,
            },
            other => other,
        }
    }

    /// The fully qualified field a decode error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ChunkError::Truncated { field, .. }
            | ChunkError::MalformedLength { field, .. }
            | ChunkError::MalformedString { field, .. } => Some(field),
            ChunkError::TooDeeplyNested { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn join_path(segment: &str, rest: &str) -> String {
    if rest.is_empty() {
        segment.to_string()
    } else if rest.starts_with('[') {
        format!("{}{}", segment, rest)
    } else {
        format!("{}.{}", segment, rest)
    }
}

pub type Result<T, E = ChunkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_builds_dotted_paths() {
        let err = ChunkError::Truncated {
            field: "start_pc".to_string(),
            offset: 12,
            needed: 4,
            available: 3,
        };
        let err = err.within("[0]").within("local_vars").within("main");
        assert_eq!(err.field(), Some("main.local_vars[0].start_pc"));
    }

    #[test]
    fn within_leaves_other_errors_alone() {
        let err = ChunkError::InputTooLarge { len: 10, limit: 5 }.within("main");
        assert!(matches!(err, ChunkError::InputTooLarge { len: 10, limit: 5 }));
        assert_eq!(err.field(), None);
    }
}
