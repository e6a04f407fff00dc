use crate::error::SpawnError;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Hierarchical actor address.
///
/// Paths form a tree rooted at the system: `local://system/user/worker/child`.
/// A path identifies a position in the hierarchy, not an incarnation; the
/// incarnation uid lives on the reference.
#[derive(Clone)]
pub struct ActorPath {
    inner: Arc<PathInner>,
}

struct PathInner {
    parent: Option<ActorPath>,
    name: String,
    // Cached rendering, computed once at construction.
    rendered: String,
}

impl ActorPath {
    /// Creates the root path for a named system.
    pub fn root(system_name: &str) -> Self {
        Self {
            inner: Arc::new(PathInner {
                parent: None,
                name: system_name.to_string(),
                rendered: format!("local://{system_name}"),
            }),
        }
    }

    /// Returns the path of a child of this path.
    pub fn child(&self, name: &str) -> Self {
        let rendered = format!("{}/{}", self.inner.rendered, name);
        Self {
            inner: Arc::new(PathInner {
                parent: Some(self.clone()),
                name: name.to_string(),
                rendered,
            }),
        }
    }

    /// The last path segment.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&ActorPath> {
        self.inner.parent.as_ref()
    }

    /// Full rendering, e.g. `local://system/user/worker`.
    pub fn as_str(&self) -> &str {
        &self.inner.rendered
    }
}

impl PartialEq for ActorPath {
    fn eq(&self, other: &Self) -> bool {
        self.inner.rendered == other.inner.rendered
    }
}

impl Eq for ActorPath {}

impl Hash for ActorPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.rendered.hash(state);
    }
}

impl Display for ActorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.rendered)
    }
}

impl Debug for ActorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorPath({})", self.inner.rendered)
    }
}

/// Validates a child name at the call site.
///
/// Names are non-empty and restricted to URL-safe characters so every path
/// renders unambiguously.
pub fn validate_name(name: &str) -> Result<(), SpawnError> {
    if name.is_empty() {
        return Err(SpawnError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty".to_string(),
        });
    }
    for c in name.chars() {
        if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SpawnError::InvalidName {
                name: name.to_string(),
                reason: format!("illegal character {c:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_hierarchy() {
        let root = ActorPath::root("test");
        let user = root.child("user");
        let worker = user.child("worker");

        assert_eq!(root.as_str(), "local://test");
        assert_eq!(worker.as_str(), "local://test/user/worker");
        assert_eq!(worker.name(), "worker");
        assert_eq!(worker.parent().unwrap(), &user);
    }

    #[test]
    fn rejects_bad_names() {
        assert!(validate_name("worker-1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("white space").is_err());
    }
}
