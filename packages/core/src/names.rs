//! Comma-separated name lists.

/// Split a comma-separated list, trimming whitespace and dropping empty
/// entries.
///
/// ```rust
/// use pagekit_core::split_list;
///
/// assert_eq!(split_list(" Apiv2 , Menu,,"), vec!["Apiv2", "Menu"]);
/// assert!(split_list("  ").is_empty());
/// ```
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// An ordered set of module names.
///
/// Built from a comma-separated string or from a collection of names.
/// Duplicates are dropped, keeping the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList {
    names: Vec<String>,
}

impl NameList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(list: &str) -> Self {
        Self::from_names(split_list(list))
    }

    fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim();
            if !name.is_empty() && !list.contains(name) {
                list.names.push(name.to_string());
            }
        }
        list
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl From<&str> for NameList {
    fn from(list: &str) -> Self {
        Self::parse(list)
    }
}

impl From<&String> for NameList {
    fn from(list: &String) -> Self {
        Self::parse(list)
    }
}

impl From<Vec<String>> for NameList {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl From<&[&str]> for NameList {
    fn from(names: &[&str]) -> Self {
        Self::from_names(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for NameList {
    fn from(names: [&str; N]) -> Self {
        Self::from_names(names)
    }
}

impl std::fmt::Display for NameList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.names.join(","))
    }
}
