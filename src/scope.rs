//! Ownership-scoped filters.
//!
//! Every query against an owned table goes through one of these filters. A
//! [`ScopedFilter`] cannot exist without an owner, so a lookup, update or
//! delete built from one always carries `user_id = <caller>` in the same
//! statement that touches the row. A row that exists but belongs to someone
//! else is therefore indistinguishable from a row that does not exist.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// A record whose mutation is restricted to the identity that created it.
pub trait OwnedResource {
    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    /// Drafts are only ever visible to their owner.
    fn is_draft(&self) -> bool;
}

/// `user_id = owner AND id = resource`: the only filter single-record reads,
/// updates and deletes accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedFilter {
    id: Uuid,
    owner_id: Uuid,
}

/// Filter targeting exactly one record, and only if `owner_id` owns it.
pub fn scoped_filter(resource_id: Uuid, owner_id: Uuid) -> ScopedFilter {
    ScopedFilter {
        id: resource_id,
        owner_id,
    }
}

impl ScopedFilter {
    /// Appends ` WHERE user_id = $n AND id = $m`.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE user_id = ")
            .push_bind(self.owner_id)
            .push(" AND id = ")
            .push_bind(self.id);
    }

    pub fn matches<R: OwnedResource>(&self, r: &R) -> bool {
        r.owner_id() == self.owner_id && r.id() == self.id
    }
}

/// Every record owned by one identity, drafts included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerFilter {
    owner_id: Uuid,
}

impl OwnerFilter {
    pub fn new(owner_id: Uuid) -> Self {
        Self { owner_id }
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE user_id = ").push_bind(self.owner_id);
    }

    pub fn matches<R: OwnedResource>(&self, r: &R) -> bool {
        r.owner_id() == self.owner_id
    }
}

/// Published records only, optionally narrowed to one author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicFilter {
    author_id: Option<Uuid>,
    id: Option<Uuid>,
}

impl PublicFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_author(author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
            id: None,
        }
    }

    pub fn one(resource_id: Uuid) -> Self {
        Self {
            author_id: None,
            id: Some(resource_id),
        }
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE draft = FALSE");
        if let Some(author_id) = self.author_id {
            qb.push(" AND user_id = ").push_bind(author_id);
        }
        if let Some(id) = self.id {
            qb.push(" AND id = ").push_bind(id);
        }
    }

    pub fn matches<R: OwnedResource>(&self, r: &R) -> bool {
        !r.is_draft()
            && self.author_id.map_or(true, |a| r.owner_id() == a)
            && self.id.map_or(true, |id| r.id() == id)
    }
}
