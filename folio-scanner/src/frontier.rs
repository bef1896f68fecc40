use std::collections::{HashSet, VecDeque};
use url::Url;

/// A page waiting to be crawled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: usize,
}

/// Breadth-first crawl frontier: pending tasks plus the set of visited URLs.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    visit_order: Vec<String>,
    max_depth: usize,
}

pub fn normalize(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

impl Frontier {
    pub fn new(root: Url, max_depth: usize) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            visit_order: Vec::new(),
            max_depth,
        };
        frontier.push(CrawlTask {
            url: root,
            depth: 0,
        });
        frontier
    }

    fn push(&mut self, task: CrawlTask) {
        self.queued.insert(normalize(&task.url));
        self.queue.push_back(task);
    }

    /// Next task in FIFO order, skipping anything already visited or too deep.
    pub fn pop(&mut self) -> Option<CrawlTask> {
        while let Some(task) = self.queue.pop_front() {
            let key = normalize(&task.url);
            self.queued.remove(&key);
            if self.visited.contains(&key) || task.depth > self.max_depth {
                continue;
            }
            return Some(task);
        }
        None
    }

    /// Returns false if the URL had already been visited.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        let key = normalize(url);
        if self.visited.insert(key.clone()) {
            self.visit_order.push(key);
            true
        } else {
            false
        }
    }

    /// Records another address of an already visited page, such as its
    /// redirect target, so links to it are not queued.
    pub fn mark_alias(&mut self, url: &Url) {
        self.visited.insert(normalize(url));
    }

    /// Queues links found on `parent` one level deeper. Returns how many were queued.
    pub fn enqueue_children<I>(&mut self, parent: &CrawlTask, links: I) -> usize
    where
        I: IntoIterator<Item = Url>,
    {
        let depth = parent.depth + 1;
        if depth > self.max_depth {
            return 0;
        }

        let mut enqueued = 0;
        for url in links {
            let key = normalize(&url);
            if self.visited.contains(&key) || self.queued.contains(&key) {
                continue;
            }
            self.push(CrawlTask { url, depth });
            enqueued += 1;
        }
        enqueued
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &CrawlTask> {
        self.queue.iter()
    }

    pub fn visited_count(&self) -> usize {
        self.visit_order.len()
    }

    pub fn into_visited(self) -> Vec<String> {
        self.visit_order
    }
}
