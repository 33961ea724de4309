use std::fmt;

/// Separator between file names in a pipeline input/output list
pub const INOUT_SEPARATOR: &str = ",";

/// Ordered list of file names a step consumes from, or produces for, the
/// rest of the pipeline.
///
/// Every way in (a delimited string, a sequence, another list) normalizes to
/// the same representation: entries split on [`INOUT_SEPARATOR`], trimmed,
/// and empty entries dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactList(Vec<String>);

impl ArtifactList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Self {
        let mut list = Self::new();
        list.push_delimited(raw);
        list
    }

    /// Append entries, no de-duplication
    pub fn extend(&mut self, other: impl Into<ArtifactList>) {
        self.0.extend(other.into().0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn push_delimited(&mut self, raw: &str) {
        self.0.extend(
            raw.split(INOUT_SEPARATOR)
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from),
        );
    }
}

/// Comma-joined, the form the bootstrapper receives
impl fmt::Display for ArtifactList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(INOUT_SEPARATOR))
    }
}

impl From<&str> for ArtifactList {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for ArtifactList {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&String> for ArtifactList {
    fn from(raw: &String) -> Self {
        Self::parse(raw)
    }
}

impl<S: AsRef<str>> From<Vec<S>> for ArtifactList {
    fn from(entries: Vec<S>) -> Self {
        entries.iter().map(|entry| entry.as_ref()).collect()
    }
}

impl<S: AsRef<str>> From<&[S]> for ArtifactList {
    fn from(entries: &[S]) -> Self {
        entries.iter().map(|entry| entry.as_ref()).collect()
    }
}

impl<'a> FromIterator<&'a str> for ArtifactList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = Self::new();
        for entry in iter {
            list.push_delimited(entry);
        }
        list
    }
}

impl PartialEq<str> for ArtifactList {
    fn eq(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

impl PartialEq<&str> for ArtifactList {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_string_is_split_and_trimmed() {
        let list = ArtifactList::parse(" a.txt , b.txt,,  ");
        assert_eq!(list.as_slice(), ["a.txt", "b.txt"]);
        assert_eq!(list.to_string(), "a.txt,b.txt");
    }

    #[test]
    fn sequence_entries_are_normalized_too() {
        let list = ArtifactList::from(vec![" a.txt", "b.txt,c.txt", ""]);
        assert_eq!(list.as_slice(), ["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn extend_keeps_order_and_duplicates() {
        let mut list = ArtifactList::parse("a.txt");
        list.extend("b.txt,a.txt");
        assert_eq!(list, "a.txt,b.txt,a.txt");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn empty_list_displays_as_empty_string() {
        assert!(ArtifactList::parse("").is_empty());
        assert_eq!(ArtifactList::new().to_string(), "");
    }
}
