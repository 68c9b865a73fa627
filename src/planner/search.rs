//! Search results and their set algebra

use std::collections::BTreeSet;
use std::fmt;

use crate::value::RecordId;

/// Whether the optimizer could classify identities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// No pruning possible; every record must be evaluated
    Evaluate,
    /// The identity sets are authoritative
    Filter,
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchState::Evaluate => write!(f, "EVALUATE"),
            SearchState::Filter => write!(f, "FILTER"),
        }
    }
}

/// A set of identities, or every identity of the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSet {
    All,
    Ids(BTreeSet<RecordId>),
}

impl IdSet {
    pub fn empty() -> Self {
        IdSet::Ids(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, IdSet::All)
    }

    /// The finite identities; `None` for ALL
    pub fn ids(&self) -> Option<&BTreeSet<RecordId>> {
        match self {
            IdSet::All => None,
            IdSet::Ids(ids) => Some(ids),
        }
    }

    pub fn contains(&self, rid: &RecordId) -> bool {
        match self {
            IdSet::All => true,
            IdSet::Ids(ids) => ids.contains(rid),
        }
    }

    pub fn union(&self, other: &IdSet) -> IdSet {
        match (self, other) {
            (IdSet::Ids(a), IdSet::Ids(b)) => IdSet::Ids(a.union(b).copied().collect()),
            _ => IdSet::All,
        }
    }

    pub fn intersection(&self, other: &IdSet) -> IdSet {
        match (self, other) {
            (IdSet::All, x) | (x, IdSet::All) => x.clone(),
            (IdSet::Ids(a), IdSet::Ids(b)) => IdSet::Ids(a.intersection(b).copied().collect()),
        }
    }

    /// Set difference. ALL minus a finite set stays ALL, since there is
    /// no complement representation; callers resolve ALL operands first.
    pub fn difference(&self, other: &IdSet) -> IdSet {
        match (self, other) {
            (_, IdSet::All) => IdSet::empty(),
            (IdSet::All, _) => IdSet::All,
            (IdSet::Ids(a), IdSet::Ids(b)) => IdSet::Ids(a.difference(b).copied().collect()),
        }
    }
}

impl From<BTreeSet<RecordId>> for IdSet {
    fn from(ids: BTreeSet<RecordId>) -> Self {
        IdSet::Ids(ids)
    }
}

fn or_empty(set: Option<&IdSet>) -> IdSet {
    set.cloned().unwrap_or_else(IdSet::empty)
}

/// Outcome of optimizing one predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub state: SearchState,
    pub included: Option<IdSet>,
    pub candidates: Option<IdSet>,
    pub excluded: Option<IdSet>,
}

impl SearchResult {
    /// No optimization available
    pub fn evaluate() -> Self {
        Self {
            state: SearchState::Evaluate,
            included: None,
            candidates: None,
            excluded: None,
        }
    }

    /// Exactly these identities match
    pub fn include(ids: IdSet) -> Self {
        Self {
            state: SearchState::Filter,
            included: Some(ids),
            candidates: None,
            excluded: None,
        }
    }

    /// These identities may match
    pub fn candidates(ids: IdSet) -> Self {
        Self {
            state: SearchState::Filter,
            included: None,
            candidates: Some(ids),
            excluded: None,
        }
    }

    /// These identities never match
    pub fn exclude(ids: IdSet) -> Self {
        Self {
            state: SearchState::Filter,
            included: None,
            candidates: None,
            excluded: Some(ids),
        }
    }

    pub fn is_evaluate(&self) -> bool {
        self.state == SearchState::Evaluate
    }

    pub fn includes_all(&self) -> bool {
        self.included.as_ref().map(IdSet::is_all).unwrap_or(false)
    }

    pub fn excludes_all(&self) -> bool {
        self.excluded.as_ref().map(IdSet::is_all).unwrap_or(false)
    }

    /// Has an included and/or candidates set
    pub fn is_inclusion_style(&self) -> bool {
        self.included.is_some() || self.candidates.is_some()
    }

    /// Every identity that is included or a candidate
    pub fn reachable(&self) -> IdSet {
        or_empty(self.included.as_ref()).union(&or_empty(self.candidates.as_ref()))
    }

    /// Conjunction of two results
    pub fn and(self, other: SearchResult) -> SearchResult {
        // 1. Either side needs evaluation
        if self.is_evaluate() || other.is_evaluate() {
            return SearchResult::evaluate();
        }

        // 2. Nothing can match
        if self.excludes_all() || other.excludes_all() {
            return SearchResult::exclude(IdSet::All);
        }

        // 3. A side without restriction
        if self.includes_all() {
            return other;
        }
        if other.includes_all() {
            return self;
        }

        // 4. Combine by style
        match (self.is_inclusion_style(), other.is_inclusion_style()) {
            (true, true) => {
                let reachable = self.reachable().intersection(&other.reachable());
                let included = reachable
                    .intersection(&or_empty(self.included.as_ref()))
                    .intersection(&or_empty(other.included.as_ref()));
                let candidates = reachable.difference(&included);
                SearchResult {
                    state: SearchState::Filter,
                    included: Some(included),
                    candidates: Some(candidates),
                    excluded: None,
                }
            }
            (true, false) => self.without(&or_empty(other.excluded.as_ref())),
            (false, true) => other.without(&or_empty(self.excluded.as_ref())),
            (false, false) => SearchResult::exclude(
                or_empty(self.excluded.as_ref()).union(&or_empty(other.excluded.as_ref())),
            ),
        }
    }

    /// Disjunction of two inclusion-style results; anything else evaluates
    pub fn or(self, other: SearchResult) -> SearchResult {
        if self.is_evaluate()
            || other.is_evaluate()
            || !self.is_inclusion_style()
            || !other.is_inclusion_style()
        {
            return SearchResult::evaluate();
        }
        let included = or_empty(self.included.as_ref()).union(&or_empty(other.included.as_ref()));
        let candidates = or_empty(self.candidates.as_ref())
            .union(&or_empty(other.candidates.as_ref()))
            .difference(&included);
        SearchResult {
            state: SearchState::Filter,
            included: Some(included),
            candidates: Some(candidates),
            excluded: None,
        }
    }

    fn without(self, excluded: &IdSet) -> SearchResult {
        SearchResult {
            state: SearchState::Filter,
            included: self.included.map(|set| set.difference(excluded)),
            candidates: self.candidates.map(|set| set.difference(excluded)),
            excluded: None,
        }
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn part(f: &mut fmt::Formatter<'_>, label: &str, set: &Option<IdSet>) -> fmt::Result {
            match set {
                None => Ok(()),
                Some(IdSet::All) => write!(f, " {}=ALL", label),
                Some(IdSet::Ids(ids)) => write!(f, " {}={}", label, ids.len()),
            }
        }
        write!(f, "{}", self.state)?;
        part(f, "included", &self.included)?;
        part(f, "candidates", &self.candidates)?;
        part(f, "excluded", &self.excluded)
    }
}
