//! Restartable cursor over ordered maps and sets
//!
//! The cursor remembers the last key it returned rather than an index, so it
//! stays meaningful if the collection it walks is reloaded between calls.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::ops::Bound;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Position {
    #[default]
    Start,
    After(String),
    End,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PropertyCursor {
    position: Position,
}

impl PropertyCursor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restart(&mut self) {
        self.position = Position::Start;
    }

    fn lower_bound(&self) -> Option<Bound<&str>> {
        match &self.position {
            Position::Start => Some(Bound::Unbounded),
            Position::After(key) => Some(Bound::Excluded(key.as_str())),
            Position::End => None,
        }
    }

    fn advance(
        &mut self,
        key: Option<&String>,
    ) {
        self.position = match key {
            Some(key) => Position::After(key.clone()),
            None => Position::End,
        };
    }

    /// Next entry in ascending key order. Once the end is reached the cursor
    /// stays there until `from_first` restarts it.
    pub(crate) fn next_entry<'a>(
        &mut self,
        from_first: bool,
        map: &'a BTreeMap<String, String>,
    ) -> Option<(&'a String, &'a String)> {
        if from_first {
            self.restart();
        }
        let lower = self.lower_bound()?;
        let next = map.range::<str, _>((lower, Bound::Unbounded)).next();
        self.advance(next.map(|(k, _)| k));
        next
    }

    pub(crate) fn next_name<'a>(
        &mut self,
        from_first: bool,
        set: &'a BTreeSet<String>,
    ) -> Option<&'a String> {
        if from_first {
            self.restart();
        }
        let lower = self.lower_bound()?;
        let next = set.range::<str, _>((lower, Bound::Unbounded)).next();
        self.advance(next);
        next
    }
}
