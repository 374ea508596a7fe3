//! Task search.
//!
//! Case-insensitive substring search over a task's title, content and tags.
//! Board search uses [`CompositeSearcher::all`], which matches when any field
//! does.

use crate::{Board, Task};

/// Trait for searching tasks by various criteria.
pub trait TaskSearcher {
    /// Returns true if the task matches the search criteria.
    fn matches(&self, task: &Task) -> bool;
}

/// Search tasks by title (case-insensitive).
pub struct TitleSearcher {
    query: String,
}

impl TitleSearcher {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into().to_lowercase(),
        }
    }
}

impl TaskSearcher for TitleSearcher {
    fn matches(&self, task: &Task) -> bool {
        task.title.to_lowercase().contains(&self.query)
    }
}

/// Search tasks by their free-text content (case-insensitive).
pub struct ContentSearcher {
    query: String,
}

impl ContentSearcher {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into().to_lowercase(),
        }
    }
}

impl TaskSearcher for ContentSearcher {
    fn matches(&self, task: &Task) -> bool {
        task.content
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(&self.query))
    }
}

/// Search tasks by tag; a tag matches if it contains the query (case-insensitive).
pub struct TagSearcher {
    query: String,
}

impl TagSearcher {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into().to_lowercase(),
        }
    }
}

impl TaskSearcher for TagSearcher {
    fn matches(&self, task: &Task) -> bool {
        task.tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&self.query))
    }
}

/// Enum dispatch for searching tasks by a specific field.
pub enum SearchBy {
    Title(TitleSearcher),
    Content(ContentSearcher),
    Tag(TagSearcher),
}

impl SearchBy {
    fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Title(s) => s.matches(task),
            Self::Content(s) => s.matches(task),
            Self::Tag(s) => s.matches(task),
        }
    }
}

/// Composite searcher that matches if any sub-searcher matches.
pub struct CompositeSearcher {
    searchers: Vec<SearchBy>,
}

impl CompositeSearcher {
    /// Create an empty composite searcher (matches all tasks).
    pub fn new() -> Self {
        Self {
            searchers: Vec::new(),
        }
    }

    /// Search title, content and tags. A blank query matches every task.
    pub fn all(query: impl Into<String>) -> Self {
        let query = query.into();
        if query.trim().is_empty() {
            return Self::new();
        }
        Self {
            searchers: vec![
                SearchBy::Title(TitleSearcher::new(query.clone())),
                SearchBy::Content(ContentSearcher::new(query.clone())),
                SearchBy::Tag(TagSearcher::new(query)),
            ],
        }
    }

    pub fn with_search(mut self, searcher: SearchBy) -> Self {
        self.searchers.push(searcher);
        self
    }
}

impl Default for CompositeSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSearcher for CompositeSearcher {
    fn matches(&self, task: &Task) -> bool {
        if self.searchers.is_empty() {
            return true;
        }
        self.searchers.iter().any(|searcher| searcher.matches(task))
    }
}

/// Tasks on `board` matching `term`, in board order. Does not touch the board.
pub fn search_board<'a>(board: &'a Board, term: &str) -> Vec<&'a Task> {
    let searcher = CompositeSearcher::all(term);
    board.tasks().filter(|t| searcher.matches(t)).collect()
}
