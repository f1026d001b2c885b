//! Editable doubly linked list of query parts.
//!
//! The analyzer rewrites the token sequence in place while it still holds
//! cursors into it. Nodes live in an arena and are addressed by [`NodeId`];
//! removing a node unlinks it but keeps its slot, its stale links and a
//! forward pointer to the node that followed it, so a cursor to a removed
//! node can always be brought back onto the live list with
//! [`TokenList::normalize`].

use crate::ast::QueryPart;

pub type NodeId = usize;

#[derive(Debug)]
struct Node {
    part: QueryPart,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    removed: bool,
    replacement: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct TokenList {
    nodes: Vec<Node>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl TokenList {
    pub fn from_parts(parts: Vec<QueryPart>) -> Self {
        let mut list = TokenList::default();
        for part in parts {
            match list.tail {
                Some(tail) => {
                    list.insert_after(tail, part);
                }
                None => {
                    let id = list.alloc(part, None, None);
                    list.head = Some(id);
                    list.tail = Some(id);
                }
            }
        }
        list
    }

    fn alloc(&mut self, part: QueryPart, prev: Option<NodeId>, next: Option<NodeId>) -> NodeId {
        self.nodes.push(Node {
            part,
            prev,
            next,
            removed: false,
            replacement: None,
        });
        self.nodes.len() - 1
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn part(&self, id: NodeId) -> &QueryPart {
        &self.nodes[id].part
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].next
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].prev
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        self.nodes[id].removed
    }

    /// Follows replacement pointers from a removed node to the first live one.
    pub fn normalize(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        while self.nodes[current].removed {
            current = self.nodes[current].replacement?;
        }
        Some(current)
    }

    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = (self.nodes[id].prev, self.nodes[id].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.nodes[id];
        node.removed = true;
        node.replacement = next;
    }

    /// Removes the node and returns the node that followed it.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeId> {
        let next = self.nodes[id].next;
        self.unlink(id);
        next
    }

    /// Removes the node and returns the node that preceded it.
    pub fn remove_in_reverse(&mut self, id: NodeId) -> Option<NodeId> {
        let prev = self.nodes[id].prev;
        self.unlink(id);
        prev
    }

    pub fn insert_before(&mut self, id: NodeId, part: QueryPart) -> NodeId {
        let prev = self.nodes[id].prev;
        let new = self.alloc(part, prev, Some(id));
        match prev {
            Some(p) => self.nodes[p].next = Some(new),
            None => self.head = Some(new),
        }
        self.nodes[id].prev = Some(new);
        new
    }

    pub fn insert_after(&mut self, id: NodeId, part: QueryPart) -> NodeId {
        let next = self.nodes[id].next;
        let new = self.alloc(part, Some(id), next);
        match next {
            Some(n) => self.nodes[n].prev = Some(new),
            None => self.tail = Some(new),
        }
        self.nodes[id].next = Some(new);
        new
    }

    /// Appends after the current tail, or starts the list again if it is empty.
    pub fn push_back(&mut self, part: QueryPart) -> NodeId {
        match self.tail {
            Some(tail) => self.insert_after(tail, part),
            None => {
                let id = self.alloc(part, None, None);
                self.head = Some(id);
                self.tail = Some(id);
                id
            }
        }
    }

    /// Live parts from head to tail.
    pub fn parts(&self) -> Vec<&QueryPart> {
        let mut out = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            out.push(&self.nodes[id].part);
            cursor = self.nodes[id].next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::TokenKind, lexer::Position};

    fn part(text: &str) -> QueryPart {
        QueryPart::text(TokenKind::Variable, text, Position::new(0, 0))
    }

    fn texts(list: &TokenList) -> Vec<String> {
        list.parts().iter().map(|p| p.render()).collect()
    }

    #[test]
    fn test_remove_keeps_cursor_usable() {
        let mut list = TokenList::from_parts(vec![part("a"), part("b"), part("c")]);
        let a = list.head().unwrap();
        let b = list.next(a).unwrap();

        assert_eq!(list.remove(a), Some(b));
        assert!(list.is_removed(a));
        assert_eq!(list.normalize(a), Some(b));
        assert_eq!(texts(&list), vec!["b", "c"]);

        let c = list.remove(b).unwrap();
        assert_eq!(list.normalize(a), Some(c));
        assert_eq!(list.head(), Some(c));
    }

    #[test]
    fn test_remove_last_normalizes_to_none() {
        let mut list = TokenList::from_parts(vec![part("a"), part("b")]);
        let b = list.tail().unwrap();
        assert_eq!(list.remove_in_reverse(b), list.head());
        assert_eq!(list.normalize(b), None);
        assert_eq!(texts(&list), vec!["a"]);
    }

    #[test]
    fn test_insert_around() {
        let mut list = TokenList::from_parts(vec![part("b")]);
        let b = list.head().unwrap();
        list.insert_before(b, part("a"));
        list.insert_after(b, part("c"));
        list.push_back(part("d"));
        assert_eq!(texts(&list), vec!["a", "b", "c", "d"]);
    }
}
