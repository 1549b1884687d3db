use crate::config::TraversalOrder;
use std::collections::VecDeque;

/// URLs discovered but not yet fetched. Callers only push URLs that are new to the page table.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    order: TraversalOrder,
}

impl Frontier {
    pub fn new(order: TraversalOrder) -> Self {
        Self { queue: VecDeque::new(), order }
    }

    pub fn push(&mut self, url: String) { self.queue.push_back(url); }

    pub fn pop(&mut self) -> Option<String> {
        match self.order {
            TraversalOrder::DepthFirst => self.queue.pop_back(),
            TraversalOrder::BreadthFirst => self.queue.pop_front(),
        }
    }

    pub fn len(&self) -> usize { self.queue.len() }

    pub fn is_empty(&self) -> bool { self.queue.is_empty() }
}
