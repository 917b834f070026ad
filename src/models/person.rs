//! People, groups and the structured assignee identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RotationError;

/// A person's display name, used as their identity within a group.
///
/// Leading and trailing whitespace is trimmed on construction. Use
/// [`PersonId::matches`] for lookups that tolerate spacing, case and
/// punctuation differences.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    /// Creates a person id from a name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self(name.trim().to_string())
    }

    /// The name as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalized lookup key (see [`normalize_name`]).
    pub fn normalized(&self) -> String {
        normalize_name(&self.0)
    }

    /// Whether `name` refers to this person after normalization.
    pub fn matches(&self, name: &str) -> bool {
        self.normalized() == normalize_name(name)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PersonId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Normalizes a person name for matching.
///
/// Lowercases, drops punctuation and collapses whitespace runs, so
/// `"  O'Brien,  Pat "` and `"obrien pat"` compare equal.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A duty group identifier (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GroupId(u8);

impl GroupId {
    /// Highest supported group number.
    pub const MAX: u8 = 4;

    /// All groups in ascending order.
    pub const ALL: [GroupId; 4] = [GroupId(1), GroupId(2), GroupId(3), GroupId(4)];

    /// Creates a group id, validating the range.
    pub fn new(id: u8) -> Result<Self, RotationError> {
        if (1..=Self::MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(RotationError::InvalidGroup(id))
        }
    }

    /// Numeric value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for GroupId {
    type Error = RotationError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<GroupId> for u8 {
    fn from(group: GroupId) -> u8 {
        group.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person within a specific group.
///
/// `Display` renders the `"Name (Group N)"` form used at storage and UI
/// boundaries; `FromStr` parses it back.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignee {
    /// The person.
    pub person: PersonId,
    /// The group they serve in.
    pub group: GroupId,
}

impl Assignee {
    /// Creates an assignee.
    pub fn new(person: impl Into<PersonId>, group: GroupId) -> Self {
        Self {
            person: person.into(),
            group,
        }
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Group {})", self.person, self.group)
    }
}

impl FromStr for Assignee {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RotationError::InvalidAssignee(s.to_string());
        let trimmed = s.trim();
        let open = trimmed.rfind('(').ok_or_else(invalid)?;
        let inner = trimmed[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
        let number = inner.trim().strip_prefix("Group").ok_or_else(invalid)?;
        let id: u8 = number.trim().parse().map_err(|_| invalid())?;
        let name = trimmed[..open].trim();
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            person: PersonId::new(name),
            group: GroupId::new(id).map_err(|_| invalid())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  O'Brien,  Pat "), "obrien pat");
        assert_eq!(normalize_name("Pat\tO'Brien"), "pat obrien");
        assert_eq!(normalize_name("..."), "");
    }

    #[test]
    fn test_person_matches() {
        let p = PersonId::new(" Maria  Papadopoulou ");
        assert_eq!(p.as_str(), "Maria  Papadopoulou");
        assert!(p.matches("maria papadopoulou"));
        assert!(p.matches("Maria Papadopoulou."));
        assert!(!p.matches("Maria Papadopoulos"));
    }

    #[test]
    fn test_group_range() {
        assert!(GroupId::new(0).is_err());
        assert_eq!(GroupId::new(4).unwrap().get(), 4);
        assert_eq!(GroupId::new(5), Err(RotationError::InvalidGroup(5)));
        assert_eq!(GroupId::ALL.len(), usize::from(GroupId::MAX));
    }

    #[test]
    fn test_group_serde_validates() {
        let g: GroupId = serde_json::from_str("3").unwrap();
        assert_eq!(g.get(), 3);
        assert!(serde_json::from_str::<GroupId>("9").is_err());
    }

    #[test]
    fn test_assignee_boundary_format() {
        let a = Assignee::new("Nikos K.", GroupId::new(2).unwrap());
        assert_eq!(a.to_string(), "Nikos K. (Group 2)");
        let back: Assignee = "Nikos K. (Group 2)".parse().unwrap();
        assert_eq!(back, a);

        let nested: Assignee = "Anna (Deputy) (Group 1)".parse().unwrap();
        assert_eq!(nested.person.as_str(), "Anna (Deputy)");

        assert!("Nikos".parse::<Assignee>().is_err());
        assert!("Nikos (Group 9)".parse::<Assignee>().is_err());
        assert!(" (Group 1)".parse::<Assignee>().is_err());
    }
}
