//! Property path selectors
//!
//! A selector identifies a column, possibly through one or more relation
//! hops. It is either an explicit structurally-typed path (`["photos",
//! "url"]`) resolved against the alias table, or a raw `"alias.column"`
//! string passed through unchanged.

/// A dotted sequence of field/relation tokens, without the entity root.
///
/// `PropertyPath::field("name")` addresses a column on the root entity;
/// `PropertyPath::relation("photos").field("url")` addresses `url` through
/// the `photos` relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Path consisting of a single column on the root entity
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Start a path at a relation hop
    pub fn relation(name: impl Into<String>) -> PathThroughRelation {
        PathThroughRelation {
            segments: vec![name.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final segment: the column (or relation, for join selectors)
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Segment before the final one, when the path traverses a relation
    pub fn second_to_last(&self) -> Option<&str> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(&self.segments[self.segments.len() - 2])
    }
}

/// Intermediate builder state after one or more relation hops
#[derive(Debug, Clone)]
pub struct PathThroughRelation {
    segments: Vec<String>,
}

impl PathThroughRelation {
    /// Traverse a further relation
    pub fn relation(mut self, name: impl Into<String>) -> Self {
        self.segments.push(name.into());
        self
    }

    /// Terminate the path at a column of the last relation target
    pub fn field(mut self, name: impl Into<String>) -> PropertyPath {
        self.segments.push(name.into());
        PropertyPath {
            segments: self.segments,
        }
    }

    /// Terminate the path at the relation itself (join selectors)
    pub fn into_path(self) -> PropertyPath {
        PropertyPath {
            segments: self.segments,
        }
    }
}

/// Column selector accepted by the fluent API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Structured path resolved through the alias table
    Path(PropertyPath),
    /// Raw `"alias.column"` reference, passed through unchanged
    Raw(String),
}

impl Selector {
    pub fn field(name: impl Into<String>) -> Self {
        Selector::Path(PropertyPath::field(name))
    }

    pub fn raw(reference: impl Into<String>) -> Self {
        Selector::Raw(reference.into())
    }

    /// Key used for duplicate detection in selector lists
    pub(crate) fn dedup_key(&self) -> String {
        match self {
            Selector::Raw(s) => s.clone(),
            Selector::Path(p) => p.segments().join("."),
        }
    }
}

impl From<PropertyPath> for Selector {
    fn from(path: PropertyPath) -> Self {
        Selector::Path(path)
    }
}

impl From<PathThroughRelation> for Selector {
    fn from(path: PathThroughRelation) -> Self {
        Selector::Path(path.into_path())
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Selector::Raw(raw.to_string())
    }
}

impl From<String> for Selector {
    fn from(raw: String) -> Self {
        Selector::Raw(raw)
    }
}

/// Case-fold a camelCase property name to its snake_case column name
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;

    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_folding() {
        assert_eq!(snake_case("createDateTime"), "create_date_time");
        assert_eq!(snake_case("isDeleted"), "is_deleted");
        assert_eq!(snake_case("name"), "name");
        assert_eq!(snake_case("branch_name"), "branch_name");
    }

    #[test]
    fn path_building() {
        let path = PropertyPath::relation("user").relation("photos").field("url");
        assert_eq!(path.segments(), &["user", "photos", "url"]);
        assert_eq!(path.last(), Some("url"));
        assert_eq!(path.second_to_last(), Some("photos"));
    }

    #[test]
    fn single_field_path() {
        let path = PropertyPath::field("name");
        assert_eq!(path.last(), Some("name"));
        assert_eq!(path.second_to_last(), None);
    }

    #[test]
    fn raw_selector_from_str() {
        let selector: Selector = "t1.name".into();
        assert_eq!(selector, Selector::Raw("t1.name".to_string()));
    }
}
