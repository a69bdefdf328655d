//! Built-in Lessons
//!
//! Each module declares one teaching module as a [`LessonSpec`]: its
//! constant tensor bank, its derivation steps with catalog text, and its
//! seed set.
//!
//! - **self_attention**: single-head attention over a five-token sentence
//! - **multi_head**: three heads, concatenation and output projection
//! - **network**: a 2→4→4→2 network, forward pass, loss and full backprop
//! - **word2vec**: one CBOW forward/backward pass and a weight update
//!
//! All numbers are chosen so every intermediate value can be checked by
//! hand. Nothing is random and nothing is read from disk.

pub mod multi_head;
pub mod network;
pub mod self_attention;
pub mod word2vec;

use crate::error::TutorError;
use crate::lesson::LessonSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which teaching module a lesson implements
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LessonKind {
    #[serde(rename = "self-attention")]
    SelfAttention,
    #[serde(rename = "multi-head-attention")]
    MultiHeadAttention,
    #[serde(rename = "neural-network")]
    NeuralNetwork,
    #[serde(rename = "word2vec")]
    Word2Vec,
}

impl LessonKind {
    pub const ALL: [LessonKind; 4] = [
        LessonKind::SelfAttention,
        LessonKind::MultiHeadAttention,
        LessonKind::NeuralNetwork,
        LessonKind::Word2Vec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LessonKind::SelfAttention => "self-attention",
            LessonKind::MultiHeadAttention => "multi-head-attention",
            LessonKind::NeuralNetwork => "neural-network",
            LessonKind::Word2Vec => "word2vec",
        }
    }

    /// The lesson's declaration
    pub fn spec(&self) -> LessonSpec {
        match self {
            LessonKind::SelfAttention => self_attention::spec(),
            LessonKind::MultiHeadAttention => multi_head::spec(),
            LessonKind::NeuralNetwork => network::spec(),
            LessonKind::Word2Vec => word2vec::spec(),
        }
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LessonKind {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LessonKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| {
                TutorError::InvalidConfig(format!(
                    "unknown lesson {:?} (expected one of: {})",
                    s,
                    LessonKind::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_kind_text_forms_agree() {
        for kind in LessonKind::ALL {
            assert_eq!(kind.to_string().parse::<LessonKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_display_pads_to_width() {
        assert_eq!(format!("{:<16}|", LessonKind::Word2Vec), "word2vec        |");
    }

    #[test]
    fn test_unknown_lesson_name() {
        assert!("transformer".parse::<LessonKind>().is_err());
    }
}
