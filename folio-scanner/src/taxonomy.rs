use std::collections::BTreeMap;

/// Category name to relevance keywords. Lookups are case-insensitive and a
/// category's own name always counts as one of its keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTaxonomy {
    categories: BTreeMap<String, Vec<String>>,
}

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "photography",
        &["photo", "photography", "photographer", "portrait", "wedding", "engagement", "headshot", "shoot", "session"],
    ),
    (
        "videography",
        &["video", "videography", "film", "cinematic", "wedding", "highlight", "footage"],
    ),
    (
        "catering",
        &["catering", "food", "menu", "buffet", "appetizer", "dessert", "cuisine", "chef", "dish", "plated"],
    ),
    (
        "florist",
        &["flower", "floral", "bouquet", "centerpiece", "arrangement", "rose", "boutonniere", "garland"],
    ),
    (
        "venue",
        &["venue", "ballroom", "hall", "garden", "ceremony", "reception", "estate", "barn", "event space"],
    ),
    (
        "music",
        &["dj", "band", "music", "musician", "performance", "dance floor", "live", "stage"],
    ),
    (
        "bakery",
        &["cake", "cupcake", "pastry", "dessert", "bakery", "wedding cake", "tier", "cookie"],
    ),
    (
        "planning",
        &["planner", "planning", "coordination", "event", "wedding", "design", "setup"],
    ),
    (
        "decor",
        &["decor", "decoration", "lighting", "draping", "table", "tablescape", "backdrop", "installation"],
    ),
    (
        "hair & makeup",
        &["makeup", "hair", "bridal", "beauty", "styling", "updo", "glam"],
    ),
    (
        "rentals",
        &["rental", "tent", "chair", "linen", "tableware", "furniture", "lounge"],
    ),
    (
        "officiant",
        &["officiant", "ceremony", "vows", "wedding", "elopement"],
    ),
];

impl Default for CategoryTaxonomy {
    fn default() -> Self {
        let mut taxonomy = Self::empty();
        for (name, keywords) in BUILTIN {
            taxonomy.insert(name, keywords.iter().map(|k| k.to_string()).collect());
        }
        taxonomy
    }
}

impl CategoryTaxonomy {
    pub fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    /// Adds or replaces a category's keyword list.
    pub fn insert(&mut self, category: &str, keywords: Vec<String>) {
        let keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self.categories
            .insert(category.trim().to_lowercase(), keywords);
    }

    pub fn merge(&mut self, other: CategoryTaxonomy) {
        for (name, keywords) in other.categories {
            self.insert(&name, keywords);
        }
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(&category.trim().to_lowercase())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Keywords of every requested category, merged; a match against any of them counts.
    pub fn keywords_for<S: AsRef<str>>(&self, categories: &[S]) -> KeywordSet {
        let mut set = KeywordSet::default();
        for category in categories {
            let name = category.as_ref().trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            if let Some(keywords) = self.categories.get(&name) {
                for keyword in keywords {
                    set.add(keyword);
                }
            }
            set.add(&name);
        }
        set
    }
}

/// Lowercased keywords matched as case-insensitive substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut set = Self::default();
        for keyword in keywords {
            set.add(keyword.as_ref());
        }
        set
    }

    fn add(&mut self, keyword: &str) {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !self.keywords.contains(&keyword) {
            self.keywords.push(keyword);
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }
}
