//! Assessment catalog
//!
//! The product ships a fixed set of psychometric tests. Test IDs are stable
//! database keys; every one of them is required for a comprehensive report.

use serde::{Deserialize, Serialize};

/// One of the fixed assessments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKind {
    Mbti,
    BigFive,
    Disc,
    Enneagram,
    Gardner,
    Riasec,
    Vark,
}

impl TestKind {
    /// Catalog order (also the order users are prompted in)
    pub const ALL: [TestKind; 7] = [
        TestKind::Mbti,
        TestKind::BigFive,
        TestKind::Disc,
        TestKind::Enneagram,
        TestKind::Gardner,
        TestKind::Riasec,
        TestKind::Vark,
    ];

    pub fn id(self) -> i64 {
        match self {
            TestKind::Mbti => 1,
            TestKind::BigFive => 2,
            TestKind::Disc => 3,
            TestKind::Enneagram => 4,
            TestKind::Gardner => 5,
            TestKind::Riasec => 6,
            TestKind::Vark => 7,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            TestKind::Mbti => "MBTI",
            TestKind::BigFive => "BIG_FIVE",
            TestKind::Disc => "DISC",
            TestKind::Enneagram => "ENNEAGRAM",
            TestKind::Gardner => "GARDNER",
            TestKind::Riasec => "RIASEC",
            TestKind::Vark => "VARK",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TestKind::Mbti => "Myers-Briggs Type Indicator",
            TestKind::BigFive => "Big Five Personality",
            TestKind::Disc => "DISC Behavioural Profile",
            TestKind::Enneagram => "Enneagram",
            TestKind::Gardner => "Multiple Intelligences",
            TestKind::Riasec => "Holland Career Interests",
            TestKind::Vark => "Learning Styles",
        }
    }

    /// Dimension codes in canonical order
    ///
    /// Canonical order is also the tie-break order used by scoring.
    pub fn dimension_codes(self) -> &'static [&'static str] {
        match self {
            TestKind::Mbti => &["E", "I", "S", "N", "T", "F", "J", "P"],
            TestKind::BigFive => &["O", "C", "E", "A", "N"],
            TestKind::Disc => &["D", "I", "S", "C"],
            TestKind::Enneagram => &["1", "2", "3", "4", "5", "6", "7", "8", "9"],
            TestKind::Gardner => &["LIN", "LOG", "SPA", "MUS", "BOD", "INTER", "INTRA", "NAT"],
            TestKind::Riasec => &["R", "I", "A", "S", "E", "C"],
            TestKind::Vark => &["V", "A", "R", "K"],
        }
    }

    /// Result codes to try, most specific first, when looking up an
    /// interpretation
    pub fn interpretation_keys(self, result_code: &str) -> Vec<String> {
        let mut keys = vec![result_code.to_string()];
        let broader = match self {
            TestKind::Enneagram => result_code.split('w').next(),
            TestKind::Riasec | TestKind::Vark if result_code.len() > 1 => result_code.get(..1),
            _ => None,
        };
        if let Some(broader) = broader {
            if !broader.is_empty() && broader != result_code {
                keys.push(broader.to_string());
            }
        }
        keys
    }

    pub fn from_id(id: i64) -> Option<TestKind> {
        TestKind::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn from_code(code: &str) -> Option<TestKind> {
        TestKind::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// IDs of every test a user must complete for a comprehensive report
pub fn required_test_ids() -> Vec<i64> {
    TestKind::ALL.iter().map(|kind| kind.id()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_sequential() {
        let ids = required_test_ids();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_interpretation_keys_fallbacks() {
        assert_eq!(
            TestKind::Enneagram.interpretation_keys("4w5"),
            vec!["4w5".to_string(), "4".to_string()]
        );
        assert_eq!(
            TestKind::Riasec.interpretation_keys("RIA"),
            vec!["RIA".to_string(), "R".to_string()]
        );
        assert_eq!(TestKind::Vark.interpretation_keys("K"), vec!["K".to_string()]);
        assert_eq!(TestKind::Mbti.interpretation_keys("INTJ"), vec!["INTJ".to_string()]);
    }

    #[test]
    fn test_lookup_by_id_and_code() {
        for kind in TestKind::ALL {
            assert_eq!(TestKind::from_id(kind.id()), Some(kind));
            assert_eq!(TestKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(TestKind::from_code("big_five"), Some(TestKind::BigFive));
        assert_eq!(TestKind::from_id(0), None);
        assert_eq!(TestKind::from_code("ASTROLOGY"), None);
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&TestKind::BigFive).unwrap();
        assert_eq!(json, "\"BIG_FIVE\"");
        let kind: TestKind = serde_json::from_str("\"RIASEC\"").unwrap();
        assert_eq!(kind, TestKind::Riasec);
    }

    #[test]
    fn test_mbti_dimensions_are_pairs() {
        assert_eq!(TestKind::Mbti.dimension_codes().len() % 2, 0);
    }
}
