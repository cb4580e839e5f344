// src/headline.rs

use std::fmt;

use serde::{Serialize, Serializer};

use crate::types::{Verdict, VerdictRecord};

/// One-line summary of a sample's QC outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Headline {
    Passed,
    /// At least one metric warned or failed. The two are not told apart here.
    Warning,
}

impl Headline {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "QC results passed thresholds",
            Self::Warning => "Warning: Check QC results before use",
        }
    }
}

impl fmt::Display for Headline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Headline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// `Warning` if any verdict is `Fail` or `Warn`, else `Passed`.
/// `NA` verdicts do not raise the warning on their own.
pub fn headline<'a, I>(verdicts: I) -> Headline
where
    I: IntoIterator<Item = &'a Verdict>,
{
    if verdicts
        .into_iter()
        .any(|v| matches!(v, Verdict::Fail | Verdict::Warn))
    {
        Headline::Warning
    } else {
        Headline::Passed
    }
}

pub fn headline_for(record: &VerdictRecord) -> Headline {
    headline(record.verdicts().values())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pass_is_passed() {
        let verdicts = [Verdict::Pass; 6];
        assert_eq!(headline(&verdicts), Headline::Passed);
        assert_eq!(headline(&verdicts).to_string(), "QC results passed thresholds");
    }

    #[test]
    fn single_warn_anywhere_warns() {
        for position in 0..4 {
            let mut verdicts = [Verdict::Pass; 4];
            verdicts[position] = Verdict::Warn;
            assert_eq!(headline(&verdicts), Headline::Warning);
        }
    }

    #[test]
    fn fail_warns() {
        let verdicts = [Verdict::Pass, Verdict::Fail];
        assert_eq!(
            headline(&verdicts).as_str(),
            "Warning: Check QC results before use"
        );
    }

    #[test]
    fn na_alone_does_not_warn() {
        assert_eq!(headline(&[Verdict::Pass, Verdict::NotApplicable]), Headline::Passed);
    }

    #[test]
    fn empty_is_passed() {
        assert_eq!(headline(std::iter::empty::<&Verdict>()), Headline::Passed);
    }

    #[test]
    fn serializes_as_message() {
        assert_eq!(
            serde_json::to_string(&Headline::Warning).unwrap(),
            "\"Warning: Check QC results before use\""
        );
    }
}
