//! Query option token trees: `$orderby`, `$select`, `$expand` and the
//! scalar options

use crate::QueryToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

/// One `$orderby` item; items are applied in order (then-by)
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByToken {
    pub expression: QueryToken,
    pub direction: OrderDirection,
}

impl OrderByToken {
    pub fn asc(expression: QueryToken) -> Self {
        Self {
            expression,
            direction: OrderDirection::Ascending,
        }
    }

    pub fn desc(expression: QueryToken) -> Self {
        Self {
            expression,
            direction: OrderDirection::Descending,
        }
    }
}

/// One `$select` item: a `/`-separated path, `*` or `Ns.*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItemToken {
    pub path: Vec<String>,
}

impl SelectItemToken {
    /// Split `Address/City` into a select item
    pub fn parse(text: &str) -> Self {
        Self {
            path: text
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// One `$expand` item with its nested options
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandItemToken {
    /// Navigation path, possibly with type casts; `*` expands all
    pub path: Vec<String>,
    /// `Orders/$ref`
    pub is_ref: bool,
    pub options: QueryOptionsToken,
}

impl ExpandItemToken {
    pub fn parse(text: &str) -> Self {
        let mut path: Vec<String> = text
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let is_ref = path.last().is_some_and(|last| last == "$ref");
        if is_ref {
            path.pop();
        }
        Self {
            path,
            is_ref,
            options: QueryOptionsToken::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptionsToken) -> Self {
        self.options = options;
        self
    }
}

/// Query options of a request or of an expand item. Scalar options are kept
/// as raw text; the binder validates them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryOptionsToken {
    pub filter: Option<QueryToken>,
    pub order_by: Vec<OrderByToken>,
    pub select: Vec<SelectItemToken>,
    pub expand: Vec<ExpandItemToken>,
    pub top: Option<String>,
    pub skip: Option<String>,
    pub count: Option<String>,
    pub search: Option<String>,
    /// `$levels` (expand items only): a number or `max`
    pub levels: Option<String>,
}

impl QueryOptionsToken {
    pub fn filter(mut self, filter: QueryToken) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, item: OrderByToken) -> Self {
        self.order_by.push(item);
        self
    }

    pub fn select(mut self, text: &str) -> Self {
        self.select.push(SelectItemToken::parse(text));
        self
    }

    pub fn expand(mut self, item: ExpandItemToken) -> Self {
        self.expand.push(item);
        self
    }

    pub fn top(mut self, text: &str) -> Self {
        self.top = Some(text.to_string());
        self
    }

    pub fn skip(mut self, text: &str) -> Self {
        self.skip = Some(text.to_string());
        self
    }

    pub fn count(mut self, text: &str) -> Self {
        self.count = Some(text.to_string());
        self
    }

    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_string());
        self
    }

    pub fn levels(mut self, text: &str) -> Self {
        self.levels = Some(text.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
