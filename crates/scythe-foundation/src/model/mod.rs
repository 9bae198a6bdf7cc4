//! Model types for inspections and their findings.

mod git_repo;
mod inspection;

pub use git_repo::GitRepo;
pub use inspection::{Inspection, InspectionState};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScytheError;

/// Symbol category reported by the external analysis tool.
///
/// This enum doubles as the parser allow-list: report lines whose kind
/// field does not parse into one of these variants are discarded as tool
/// noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadCodeKind {
    #[serde(rename = "Parameter")]
    Parameter,
    #[serde(rename = "Private Method")]
    PrivateMethod,
    #[serde(rename = "Private Static Generic Method")]
    PrivateStaticGenericMethod,
    #[serde(rename = "Private Static Method")]
    PrivateStaticMethod,
    #[serde(rename = "Variable")]
    Variable,
    #[serde(rename = "Private Variable")]
    PrivateVariable,
}

impl DeadCodeKind {
    /// Label used by the external tool's report format
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parameter => "Parameter",
            Self::PrivateMethod => "Private Method",
            Self::PrivateStaticGenericMethod => "Private Static Generic Method",
            Self::PrivateStaticMethod => "Private Static Method",
            Self::Variable => "Variable",
            Self::PrivateVariable => "Private Variable",
        }
    }
}

impl FromStr for DeadCodeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Parameter" => Ok(Self::Parameter),
            "Private Method" => Ok(Self::PrivateMethod),
            "Private Static Generic Method" => Ok(Self::PrivateStaticGenericMethod),
            "Private Static Method" => Ok(Self::PrivateStaticMethod),
            "Variable" => Ok(Self::Variable),
            "Private Variable" => Ok(Self::PrivateVariable),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DeadCodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single unused-code location accepted by the report filters.
///
/// Immutable once produced; identity is positional and repeated identical
/// occurrences in the source report yield repeated records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadCodeOccurrence {
    /// Symbol category reported by the tool
    pub kind: DeadCodeKind,
    /// Fully qualified symbol name
    pub name: String,
    /// File path relative to the repository root
    pub file: String,
    /// 1-based line of the occurrence
    pub line: u32,
    /// 1-based column of the occurrence; 0 when the tool omitted it
    pub column: u32,
}

/// Languages the analysis database can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedLanguage {
    Java,
    Cpp,
    CSharp,
    Python,
}

impl SupportedLanguage {
    /// Language tag understood by the external tool's `-languages` flag
    pub fn analyzer_name(&self) -> &'static str {
        match self {
            Self::Java => "Java",
            Self::Cpp => "C++",
            Self::CSharp => "C#",
            Self::Python => "Python",
        }
    }
}

impl FromStr for SupportedLanguage {
    type Err = ScytheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "cpp" | "c++" => Ok(Self::Cpp),
            "csharp" | "c#" => Ok(Self::CSharp),
            "python" => Ok(Self::Python),
            other => Err(ScytheError::malformed(format!(
                "Unsupported language: {other}"
            ))),
        }
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.analyzer_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kind_round_trips_through_tool_labels() {
        for kind in [
            DeadCodeKind::Parameter,
            DeadCodeKind::PrivateMethod,
            DeadCodeKind::PrivateStaticGenericMethod,
            DeadCodeKind::PrivateStaticMethod,
            DeadCodeKind::Variable,
            DeadCodeKind::PrivateVariable,
        ] {
            assert_eq!(kind.label().parse::<DeadCodeKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("Public Method".parse::<DeadCodeKind>().is_err());
        assert!("".parse::<DeadCodeKind>().is_err());
    }

    #[test]
    fn occurrence_serializes_with_tool_labels() {
        let occurrence = DeadCodeOccurrence {
            kind: DeadCodeKind::PrivateMethod,
            name: "foo".to_string(),
            file: "src/A.java".to_string(),
            line: 10,
            column: 3,
        };
        let json = serde_json::to_value(&occurrence).unwrap();
        assert_eq!(json["kind"], "Private Method");
    }

    #[test]
    fn language_parses_common_spellings() {
        assert_eq!("Java".parse::<SupportedLanguage>().unwrap(), SupportedLanguage::Java);
        assert_eq!("c++".parse::<SupportedLanguage>().unwrap(), SupportedLanguage::Cpp);
        assert_eq!("csharp".parse::<SupportedLanguage>().unwrap(), SupportedLanguage::CSharp);
        assert!("cobol".parse::<SupportedLanguage>().is_err());
    }
}
