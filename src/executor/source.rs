//! Record sources
//!
//! A source yields the records a query level reads, one at a time. Sub-query
//! sources pull from the nested stream, so nothing is materialized unless the
//! nested query is itself buffered.

use std::collections::BTreeSet;

use super::stream::SelectStream;
use crate::errors::QueryResult;
use crate::storage::{Record, RecordStore, RidIter};
use crate::value::RecordId;

pub(crate) enum RecordSource<'a> {
    Identities {
        rids: RidIter<'a>,
        store: &'a dyn RecordStore,
    },
    Query(Box<SelectStream<'a>>),
    Empty,
}

impl<'a> RecordSource<'a> {
    /// Explicit identities, in order
    pub(crate) fn records(store: &'a dyn RecordStore, rids: Vec<RecordId>) -> Self {
        RecordSource::Identities {
            rids: Box::new(rids.into_iter().map(Ok)),
            store,
        }
    }

    pub(crate) fn class(store: &'a dyn RecordStore, class: &str) -> QueryResult<Self> {
        Ok(RecordSource::Identities {
            rids: store.browse_class(class)?,
            store,
        })
    }

    /// Every named cluster in turn
    pub(crate) fn clusters(store: &'a dyn RecordStore, clusters: &[String]) -> QueryResult<Self> {
        let iters = clusters
            .iter()
            .map(|cluster| store.browse_cluster(cluster))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(RecordSource::Identities {
            rids: Box::new(iters.into_iter().flatten()),
            store,
        })
    }

    /// Identities bound to dictionary keys; unbound keys are skipped
    pub(crate) fn dictionary(store: &'a dyn RecordStore, keys: &[String]) -> QueryResult<Self> {
        let mut rids = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(rid) = store.dictionary_get(key)? {
                rids.push(rid);
            }
        }
        Ok(Self::records(store, rids))
    }

    pub(crate) fn query(stream: SelectStream<'a>) -> Self {
        RecordSource::Query(Box::new(stream))
    }

    /// Drops identities before they are loaded
    pub(crate) fn without(self, excluded: BTreeSet<RecordId>) -> Self {
        match self {
            RecordSource::Identities { rids, store } => RecordSource::Identities {
                rids: Box::new(rids.filter(move |rid| match rid {
                    Ok(rid) => !excluded.contains(rid),
                    Err(_) => true,
                })),
                store,
            },
            other => other,
        }
    }

    /// Next record; identities that no longer resolve are skipped
    pub(crate) fn next_record(&mut self) -> QueryResult<Option<Record>> {
        match self {
            RecordSource::Identities { rids, store } => {
                for rid in rids.by_ref() {
                    if let Some(record) = store.load(rid?)? {
                        return Ok(Some(record));
                    }
                }
                Ok(None)
            }
            RecordSource::Query(stream) => stream.next().transpose(),
            RecordSource::Empty => Ok(None),
        }
    }
}
