//! Change notification shared by the model objects (bundle, group, key tree).

/// What happened to the payload. The payload is a borrow of the affected object,
/// so listeners can inspect it but never hold on to it past the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent<T> {
    Added(T),
    Removed(T),
    Modified(T),
}

impl<T> ChangeEvent<T> {
    pub fn payload(&self) -> &T {
        match self {
            ChangeEvent::Added(t) | ChangeEvent::Removed(t) | ChangeEvent::Modified(t) => t,
        }
    }

    pub fn as_ref(&self) -> ChangeEvent<&T> {
        match self {
            ChangeEvent::Added(t) => ChangeEvent::Added(t),
            ChangeEvent::Removed(t) => ChangeEvent::Removed(t),
            ChangeEvent::Modified(t) => ChangeEvent::Modified(t),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ChangeEvent<U> {
        match self {
            ChangeEvent::Added(t) => ChangeEvent::Added(f(t)),
            ChangeEvent::Removed(t) => ChangeEvent::Removed(f(t)),
            ChangeEvent::Modified(t) => ChangeEvent::Modified(f(t)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Added(_) => "added",
            ChangeEvent::Removed(_) => "removed",
            ChangeEvent::Modified(_) => "modified",
        }
    }
}

/// Handle returned when registering a listener; used to unregister it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered list of callbacks. `F` is an unsized `dyn FnMut(..)` type.
///
/// Dispatch is synchronous. Adding or removing listeners is only possible between
/// dispatches, since both need `&mut self`.
pub struct Listeners<F: ?Sized> {
    next_id: u64,
    entries: Vec<(ListenerId, Box<F>)>,
}

impl<F: ?Sized> Listeners<F> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, listener: Box<F>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.entries.iter_mut().map(|(_, f)| f)
    }
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for Listeners<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeEvent, Listeners};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_can_be_removed_between_dispatches() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners: Listeners<dyn FnMut(ChangeEvent<&str>)> = Listeners::new();

        let sink = Rc::clone(&seen);
        let first = listeners.add(Box::new(move |e: ChangeEvent<&str>| {
            sink.borrow_mut().push(format!("1:{}", e.payload()));
        }));
        let sink = Rc::clone(&seen);
        listeners.add(Box::new(move |e: ChangeEvent<&str>| {
            sink.borrow_mut().push(format!("2:{}", e.payload()));
        }));

        for l in listeners.iter_mut() {
            l(ChangeEvent::Added("a"));
        }
        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        for l in listeners.iter_mut() {
            l(ChangeEvent::Removed("b"));
        }

        assert_eq!(*seen.borrow(), vec!["1:a", "2:a", "2:b"]);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn map_keeps_kind() {
        let e = ChangeEvent::Modified(3).map(|n| n * 2);
        assert_eq!(e, ChangeEvent::Modified(6));
        assert_eq!(e.kind(), "modified");
    }
}
