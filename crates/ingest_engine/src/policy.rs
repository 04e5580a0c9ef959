/// Which tags the sanitizer drops, keeps, or flattens, and which attributes
/// survive on kept tags. Tag names are lowercase.
pub trait TagPolicy: Send + Sync {
    /// Dropped with their whole subtree, regardless of content.
    fn is_removed(&self, tag: &str) -> bool;
    /// Kept as markup; every other element is replaced by its children.
    fn is_meaningful(&self, tag: &str) -> bool;
    fn allowed_attributes(&self, tag: &str) -> &[&'static str];
    /// Carries its content in attributes, so it survives without text.
    fn is_self_contained(&self, tag: &str) -> bool;
    /// Written without a closing tag.
    fn is_void(&self, tag: &str) -> bool;
}

/// A tag policy as plain static tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagTable {
    pub removed: &'static [&'static str],
    pub meaningful: &'static [&'static str],
    pub attributes: &'static [(&'static str, &'static [&'static str])],
    pub self_contained: &'static [&'static str],
    pub void: &'static [&'static str],
}

pub const STANDARD_TAGS: TagTable = TagTable {
    removed: &["header", "footer", "nav", "script", "style"],
    meaningful: &[
        "h1", "h2", "h3", "h4", "h5", "h6", "p", "a", "ul", "ol", "li", "table", "tr", "th", "td",
        "blockquote", "pre", "img", "video", "audio",
    ],
    attributes: &[
        ("a", &["href", "title"]),
        ("img", &["src", "alt"]),
        ("video", &["src"]),
        ("audio", &["src"]),
    ],
    self_contained: &["img", "video", "audio"],
    void: &["img"],
};

impl Default for TagTable {
    fn default() -> Self {
        STANDARD_TAGS
    }
}

impl TagPolicy for TagTable {
    fn is_removed(&self, tag: &str) -> bool {
        self.removed.iter().any(|name| *name == tag)
    }

    fn is_meaningful(&self, tag: &str) -> bool {
        self.meaningful.iter().any(|name| *name == tag)
    }

    fn allowed_attributes(&self, tag: &str) -> &[&'static str] {
        self.attributes
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, attrs)| *attrs)
            .unwrap_or(&[])
    }

    fn is_self_contained(&self, tag: &str) -> bool {
        self.self_contained.iter().any(|name| *name == tag)
    }

    fn is_void(&self, tag: &str) -> bool {
        self.void.iter().any(|name| *name == tag)
    }
}
