use serde::{Deserialize, Serialize};

pub mod document;
pub mod embedding;
pub mod generation;
pub mod speech;
pub mod transcription;
pub mod vision;

pub use document::*;
pub use embedding::*;
pub use generation::*;
pub use speech::*;
pub use transcription::*;
pub use vision::*;

/// A field that accepts either a single value or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::One(_) => false,
            OneOrMany::Many(values) => values.is_empty(),
        }
    }

    /// Re-wraps `values` with the same shape as `self`.
    pub fn reshape<U>(&self, mut values: Vec<U>) -> Option<OneOrMany<U>> {
        match self {
            OneOrMany::One(_) if values.len() == 1 => values.pop().map(OneOrMany::One),
            OneOrMany::One(_) => None,
            OneOrMany::Many(_) => Some(OneOrMany::Many(values)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OneOrMany;

    #[test]
    fn accepts_scalar_and_list() {
        let one: OneOrMany<String> = serde_json::from_str("\"a\"").unwrap();
        let many: OneOrMany<String> = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert!(!one.is_many());
        assert_eq!(many.into_vec(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn reshape_keeps_request_shape() {
        let one = OneOrMany::One("q".to_string());
        assert_eq!(one.reshape(vec![1]), Some(OneOrMany::One(1)));
        assert_eq!(one.reshape(vec![1, 2]), None);
        let many = OneOrMany::Many(vec!["q".to_string()]);
        assert_eq!(many.reshape(vec![1]), Some(OneOrMany::Many(vec![1])));
    }
}
