use crate::catalog::CatalogSource;
use crate::error::Result;
use crate::models::BookSummary;
use actix_web::rt::time::sleep;
use std::time::Duration;

/// Pause between category fetches. The upstream API throttles bursts,
/// so the home shelves load sequentially rather than in parallel.
pub const CATEGORY_THROTTLE: Duration = Duration::from_millis(200);

/// A fixed home-screen category and its catalog query.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
    pub query: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category { key: "horror", label: "Horror", query: "subject:horror" },
    Category { key: "fiction", label: "Fiction", query: "subject:fiction" },
    Category { key: "romance", label: "Romance", query: "subject:romance" },
    Category { key: "mystery", label: "Mystery", query: "subject:mystery" },
    Category { key: "fantasy", label: "Fantasy", query: "subject:fantasy" },
    Category { key: "scifi", label: "Sci-Fi", query: "subject:science fiction" },
];

/// One labeled, independently-loading collection of summaries.
#[derive(Debug, Clone, Default)]
pub struct Shelf {
    pub key: String,
    pub label: String,
    pub query: String,
    pub loading: bool,
    pub error: Option<String>,
    pub items: Vec<BookSummary>,
}

impl Shelf {
    fn named(key: &str, label: &str, query: &str) -> Self {
        Shelf {
            key: key.to_string(),
            label: label.to_string(),
            query: query.to_string(),
            ..Shelf::default()
        }
    }
}

/// Everything the books screen renders: the fixed category shelves in
/// order, the ad-hoc search shelf, and the aggregate loading flag.
#[derive(Debug, Clone, Default)]
pub struct ShelfBoard {
    pub loading: bool,
    pub shelves: Vec<Shelf>,
    pub search: Shelf,
}

impl ShelfBoard {
    pub fn shelf(&self, key: &str) -> Option<&Shelf> {
        self.shelves.iter().find(|shelf| shelf.key == key)
    }
}

/// Handle for one submitted search. Applying a ticket whose generation
/// has been superseded is a no-op, so a slow response can never
/// overwrite a newer query's results.
#[derive(Debug)]
pub struct SearchTicket {
    generation: u64,
    pub query: String,
}

/// Handle for one in-flight category fetch, issued by
/// [`ShelfAggregator::begin_categories`].
#[derive(Debug)]
pub struct CategoryTicket {
    index: usize,
    pub query: String,
}

type Listener = Box<dyn Fn(&ShelfBoard)>;

/// View-model driving the category shelves and freeform search.
///
/// Subscribed listeners are invoked after every board mutation; the UI
/// re-renders from the board state it is handed. A screen leaving focus
/// does not cancel in-flight fetches, it just stops listening; stale
/// search responses are dropped by the ticket generation check.
///
/// Every mutation is a synchronous begin/apply step, so an embedding
/// UI holding the aggregator behind `Rc<RefCell<..>>` never keeps a
/// borrow across an await: category and search fetches run outside the
/// view-model and their outcomes are applied when they arrive. A
/// search submitted while shelves are still loading is therefore an
/// independent in-flight operation. The `load_categories` and `search`
/// conveniences drive the same steps for callers that own the
/// aggregator exclusively.
pub struct ShelfAggregator<C> {
    source: C,
    board: ShelfBoard,
    listeners: Vec<Listener>,
    search_generation: u64,
    categories_pending: usize,
}

impl<C: CatalogSource> ShelfAggregator<C> {
    pub fn new(source: C) -> Self {
        Self::with_categories(source, CATEGORIES)
    }

    pub fn with_categories(source: C, categories: &[Category]) -> Self {
        let shelves = categories
            .iter()
            .map(|category| Shelf::named(category.key, category.label, category.query))
            .collect();
        Self {
            source,
            board: ShelfBoard {
                loading: false,
                shelves,
                search: Shelf::named("search", "Search Results", ""),
            },
            listeners: Vec::new(),
            search_generation: 0,
            categories_pending: 0,
        }
    }

    pub fn board(&self) -> &ShelfBoard {
        &self.board
    }

    pub fn subscribe(&mut self, listener: impl Fn(&ShelfBoard) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.board);
        }
    }

    /// Marks every category shelf loading and hands back one ticket
    /// per shelf. The caller fetches each ticket's query (throttled)
    /// and feeds the outcome to [`apply_category`]; the aggregate flag
    /// stays set until every ticket has been applied.
    ///
    /// [`apply_category`]: ShelfAggregator::apply_category
    pub fn begin_categories(&mut self) -> Vec<CategoryTicket> {
        let tickets: Vec<CategoryTicket> = self
            .board
            .shelves
            .iter_mut()
            .enumerate()
            .map(|(index, shelf)| {
                shelf.loading = true;
                CategoryTicket {
                    index,
                    query: shelf.query.clone(),
                }
            })
            .collect();

        self.categories_pending = tickets.len();
        self.board.loading = !tickets.is_empty();
        self.notify();
        tickets
    }

    /// Records the outcome of one category fetch. A failed category
    /// records its error on that shelf alone; siblings keep their
    /// results. The aggregate flag clears once the last outstanding
    /// ticket is applied.
    pub fn apply_category(&mut self, ticket: &CategoryTicket, outcome: Result<Vec<BookSummary>>) {
        let shelf = &mut self.board.shelves[ticket.index];
        match outcome {
            Ok(items) => {
                shelf.items = items;
                shelf.error = None;
            }
            Err(err) => {
                tracing::warn!(shelf = %shelf.label, error = %err, "category fetch failed");
                shelf.items.clear();
                shelf.error = Some(err.to_string());
            }
        }
        shelf.loading = false;

        if self.categories_pending > 0 {
            self.categories_pending -= 1;
        }
        if self.categories_pending == 0 {
            self.board.loading = false;
        }
        self.notify();
    }

    /// Fetches every category shelf, sequentially and throttled, for
    /// callers that own the aggregator exclusively.
    pub async fn load_categories(&mut self) {
        for ticket in self.begin_categories() {
            sleep(CATEGORY_THROTTLE).await;
            let outcome = self.source.search(&ticket.query).await;
            self.apply_category(&ticket, outcome);
        }
    }

    /// Starts a search for an explicitly submitted query. Prior search
    /// results are cleared immediately; a blank query is ignored.
    pub fn begin_search(&mut self, raw: &str) -> Option<SearchTicket> {
        let query = raw.trim();
        if query.is_empty() {
            return None;
        }

        self.search_generation += 1;
        let search = &mut self.board.search;
        search.query = format!("intitle:{query}");
        search.loading = true;
        search.error = None;
        search.items.clear();
        self.notify();

        Some(SearchTicket {
            generation: self.search_generation,
            query: self.board.search.query.clone(),
        })
    }

    /// Records the outcome of a search. Returns false without touching
    /// the board when a newer search has been submitted since the
    /// ticket was issued.
    pub fn apply_search(
        &mut self,
        ticket: &SearchTicket,
        outcome: Result<Vec<BookSummary>>,
    ) -> bool {
        if ticket.generation != self.search_generation {
            tracing::debug!(query = %ticket.query, "discarding superseded search result");
            return false;
        }

        let search = &mut self.board.search;
        match outcome {
            Ok(items) => {
                search.items = items;
                search.error = None;
            }
            Err(err) => {
                tracing::warn!(query = %search.query, error = %err, "search failed");
                search.items.clear();
                search.error = Some(err.to_string());
            }
        }
        search.loading = false;
        self.notify();
        true
    }

    /// Submit, fetch, and apply in one call. Returns false when the
    /// query was blank or the result arrived superseded.
    pub async fn search(&mut self, raw: &str) -> bool {
        let Some(ticket) = self.begin_search(raw) else {
            return false;
        };
        let outcome = self.source.search(&ticket.query).await;
        self.apply_search(&ticket, outcome)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct StubSource {
        responses: HashMap<String, std::result::Result<Vec<BookSummary>, String>>,
    }

    impl StubSource {
        fn new() -> Self {
            Self { responses: HashMap::new() }
        }

        fn ok(mut self, query: &str, ids: &[&str]) -> Self {
            let items = ids.iter().map(|id| summary(id)).collect();
            self.responses.insert(query.to_string(), Ok(items));
            self
        }

        fn fail(mut self, query: &str, message: &str) -> Self {
            self.responses
                .insert(query.to_string(), Err(message.to_string()));
            self
        }
    }

    #[async_trait::async_trait(?Send)]
    impl CatalogSource for StubSource {
        async fn search(&self, query: &str) -> Result<Vec<BookSummary>> {
            match self.responses.get(query) {
                Some(Ok(items)) => Ok(items.clone()),
                Some(Err(message)) => Err(Error::Catalog(message.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    fn summary(id: &str) -> BookSummary {
        BookSummary {
            external_id: id.to_string(),
            title: id.to_string(),
            ..BookSummary::default()
        }
    }

    const TEST_CATEGORIES: &[Category] = &[
        Category { key: "horror", label: "Horror", query: "subject:horror" },
        Category { key: "fiction", label: "Fiction", query: "subject:fiction" },
    ];

    #[actix_web::test]
    async fn failed_category_does_not_block_siblings() {
        let source = StubSource::new()
            .fail("subject:horror", "quota exceeded")
            .ok("subject:fiction", &["f1", "f2"]);
        let mut aggregator = ShelfAggregator::with_categories(source, TEST_CATEGORIES);

        aggregator.load_categories().await;

        let board = aggregator.board();
        let horror = board.shelf("horror").unwrap();
        assert_eq!(horror.error.as_deref(), Some("catalog error: quota exceeded"));
        assert!(horror.items.is_empty());

        let fiction = board.shelf("fiction").unwrap();
        assert_eq!(fiction.error, None);
        assert_eq!(fiction.items.len(), 2);

        assert!(!board.loading);
        assert!(board.shelves.iter().all(|shelf| !shelf.loading));
    }

    #[actix_web::test]
    async fn search_replaces_previous_results() {
        let source = StubSource::new()
            .ok("intitle:dune", &["d1", "d2"])
            .ok("intitle:hobbit", &["h1"]);
        let mut aggregator = ShelfAggregator::with_categories(source, TEST_CATEGORIES);

        assert!(aggregator.search("dune").await);
        assert_eq!(aggregator.board().search.items.len(), 2);

        assert!(aggregator.search("hobbit").await);
        let search = &aggregator.board().search;
        assert_eq!(search.items.len(), 1);
        assert_eq!(search.items[0].external_id, "h1");
    }

    #[test]
    fn search_interleaves_with_category_load() {
        let source = StubSource::new();
        let mut aggregator = ShelfAggregator::with_categories(source, TEST_CATEGORIES);

        let tickets = aggregator.begin_categories();
        assert_eq!(tickets.len(), 2);
        assert!(aggregator.board().loading);

        aggregator.apply_category(&tickets[0], Ok(vec![summary("h1")]));

        // A search submitted mid-load is its own in-flight operation;
        // it resolves while the second shelf is still outstanding.
        let search = aggregator.begin_search("dune").unwrap();
        assert!(aggregator.apply_search(&search, Ok(vec![summary("d1")])));
        assert!(aggregator.board().loading);
        assert!(aggregator.board().shelf("fiction").unwrap().loading);

        aggregator.apply_category(&tickets[1], Ok(vec![summary("f1")]));

        let board = aggregator.board();
        assert!(!board.loading);
        assert_eq!(board.search.items[0].external_id, "d1");
        assert_eq!(board.shelf("horror").unwrap().items[0].external_id, "h1");
        assert_eq!(board.shelf("fiction").unwrap().items[0].external_id, "f1");
    }

    #[test]
    fn superseded_search_is_discarded() {
        let source = StubSource::new();
        let mut aggregator = ShelfAggregator::with_categories(source, TEST_CATEGORIES);

        let asimov = aggregator.begin_search("asimov").unwrap();
        let tolkien = aggregator.begin_search("tolkien").unwrap();

        // The newer search resolves first; the older one arrives late.
        assert!(aggregator.apply_search(&tolkien, Ok(vec![summary("t1")])));
        assert!(!aggregator.apply_search(&asimov, Ok(vec![summary("a1")])));

        let search = &aggregator.board().search;
        assert_eq!(search.items.len(), 1);
        assert_eq!(search.items[0].external_id, "t1");
        assert!(!search.loading);
    }

    #[test]
    fn blank_search_is_ignored() {
        let source = StubSource::new();
        let mut aggregator = ShelfAggregator::with_categories(source, TEST_CATEGORIES);

        assert!(aggregator.begin_search("   ").is_none());
        assert!(!aggregator.board().search.loading);
    }

    #[test]
    fn search_failure_records_error() {
        let source = StubSource::new();
        let mut aggregator = ShelfAggregator::with_categories(source, TEST_CATEGORIES);

        let ticket = aggregator.begin_search("dune").unwrap();
        assert!(aggregator.apply_search(&ticket, Err(Error::Catalog("boom".to_string()))));

        let search = &aggregator.board().search;
        assert_eq!(search.error.as_deref(), Some("catalog error: boom"));
        assert!(search.items.is_empty());
    }

    #[test]
    fn listeners_observe_every_mutation() {
        let source = StubSource::new();
        let mut aggregator = ShelfAggregator::with_categories(source, TEST_CATEGORIES);

        let seen = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&seen);
        aggregator.subscribe(move |board| {
            assert_eq!(board.shelves.len(), 2);
            *counter.borrow_mut() += 1;
        });

        let ticket = aggregator.begin_search("dune").unwrap();
        aggregator.apply_search(&ticket, Ok(Vec::new()));
        assert_eq!(*seen.borrow(), 2);
    }
}
