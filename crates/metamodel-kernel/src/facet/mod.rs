//! Facets, their ranking by precedence, and the holders that own them.
//!
//! Several mechanisms may contribute a facet of the same kind to one
//! holder. Each kind keeps a [`FacetRanking`]: facets bucketed by
//! precedence, insertion-ordered within a bucket. The winner is the first
//! facet of the highest non-empty bucket. Nothing is ever removed; a more
//! authoritative mechanism overrides by installing at a higher precedence.
//!
//! Whether two facets of one kind agree is decided by the kind itself
//! ([`Facet::semantically_equals`]); the ranking never special-cases kinds.

pub mod kinds;

use crate::feature::FeatureId;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Type tag of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FacetKind(pub &'static str);

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How authoritative the mechanism that produced a facet is.
///
/// Fallback < Inferred < Default < High.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// Used when nothing else says anything.
    Fallback,
    /// Derived from naming conventions or declared types.
    Inferred,
    /// Explicitly declared through a marker.
    Default,
    /// Overrides declared through markers.
    High,
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fallback => write!(f, "fallback"),
            Self::Inferred => write!(f, "inferred"),
            Self::Default => write!(f, "default"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A single resolved fact about a model element.
///
/// Facets are immutable once installed.
pub trait Facet: fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> FacetKind;

    fn precedence(&self) -> Precedence;

    /// Whether `other` (of the same kind) configures the same behavior.
    fn semantically_equals(&self, other: &dyn Facet) -> bool;

    /// Short rendering of the facet's value and origin, for messages.
    fn describe(&self) -> String;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Facet {
    pub fn downcast_ref<T: Facet>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A facet type with a statically known kind.
pub trait TypedFacet: Facet + Sized {
    const KIND: FacetKind;
}

/// All facets of one kind installed on one holder, by precedence.
#[derive(Debug, Clone)]
pub struct FacetRanking {
    kind: FacetKind,
    holder: FeatureId,
    ranks: BTreeMap<Precedence, Vec<Arc<dyn Facet>>>,
}

impl FacetRanking {
    pub fn new(kind: FacetKind, holder: FeatureId) -> Self {
        Self {
            kind,
            holder,
            ranks: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> FacetKind {
        self.kind
    }

    /// The holder this ranking belongs to.
    pub fn holder(&self) -> &FeatureId {
        &self.holder
    }

    /// Insert `facet` into the bucket of its precedence. Installing the
    /// same instance twice is a no-op; returns whether it was inserted.
    pub fn add(&mut self, facet: Arc<dyn Facet>) -> bool {
        debug_assert_eq!(facet.kind(), self.kind);
        let bucket = self.ranks.entry(facet.precedence()).or_default();
        if bucket.iter().any(|existing| Arc::ptr_eq(existing, &facet)) {
            return false;
        }
        bucket.push(facet);
        true
    }

    pub fn top_precedence(&self) -> Option<Precedence> {
        self.ranks.keys().next_back().copied()
    }

    /// Every facet tied at the top precedence, in installation order.
    pub fn top_rank(&self) -> &[Arc<dyn Facet>] {
        self.ranks
            .values()
            .next_back()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The facet retrieval returns: first installed at top precedence.
    pub fn winner(&self) -> Option<&Arc<dyn Facet>> {
        self.top_rank().first()
    }

    pub fn rank(&self, precedence: Precedence) -> &[Arc<dyn Facet>] {
        self.ranks
            .get(&precedence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All facets in non-increasing precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Facet>> {
        self.ranks.values().rev().flatten()
    }

    pub fn len(&self) -> usize {
        self.ranks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-rank facets that disagree with the winner, paired with it.
    pub fn conflicts(&self) -> Vec<(&Arc<dyn Facet>, &Arc<dyn Facet>)> {
        let Some((winner, rest)) = self.top_rank().split_first() else {
            return Vec::new();
        };
        rest.iter()
            .filter(|other| !winner.semantically_equals(other.as_ref()))
            .map(|other| (winner, other))
            .collect()
    }
}

/// A model element owning facets.
#[derive(Debug, Clone)]
pub struct FacetHolder {
    id: FeatureId,
    rankings: BTreeMap<FacetKind, FacetRanking>,
}

impl FacetHolder {
    pub fn new(id: FeatureId) -> Self {
        Self {
            id,
            rankings: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    pub fn add_facet(&mut self, facet: impl Facet) -> bool {
        self.add_shared(Arc::new(facet))
    }

    pub fn add_shared(&mut self, facet: Arc<dyn Facet>) -> bool {
        let kind = facet.kind();
        trace!(
            holder = %self.id,
            kind = %kind,
            precedence = %facet.precedence(),
            "installing facet"
        );
        self.rankings
            .entry(kind)
            .or_insert_with(|| FacetRanking::new(kind, self.id.clone()))
            .add(facet)
    }

    /// The winning facet of `kind`.
    pub fn get_facet(&self, kind: FacetKind) -> Option<&Arc<dyn Facet>> {
        self.rankings.get(&kind).and_then(FacetRanking::winner)
    }

    /// The winning facet of `T`'s kind, downcast.
    pub fn get<T: TypedFacet>(&self) -> Option<&T> {
        self.get_facet(T::KIND)
            .and_then(|facet| facet.as_ref().downcast_ref::<T>())
    }

    pub fn contains(&self, kind: FacetKind) -> bool {
        self.rankings.contains_key(&kind)
    }

    pub fn top_rank(&self, kind: FacetKind) -> &[Arc<dyn Facet>] {
        self.rankings
            .get(&kind)
            .map(FacetRanking::top_rank)
            .unwrap_or(&[])
    }

    pub fn ranking(&self, kind: FacetKind) -> Option<&FacetRanking> {
        self.rankings.get(&kind)
    }

    pub fn rankings(&self) -> impl Iterator<Item = &FacetRanking> {
        self.rankings.values()
    }

    pub fn facet_kinds(&self) -> impl Iterator<Item = FacetKind> + '_ {
        self.rankings.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::kinds::{MandatoryFacet, NamedFacet, Optionality};
    use super::*;
    use crate::feature::FeatureKind;

    fn holder() -> FacetHolder {
        FacetHolder::new(FeatureId::member("Customer", "firstName", FeatureKind::Property).unwrap())
    }

    #[test]
    fn empty_holder_has_no_facets() {
        let holder = holder();
        assert!(holder.get_facet(MandatoryFacet::KIND).is_none());
        assert!(holder.top_rank(MandatoryFacet::KIND).is_empty());
        assert!(!holder.contains(MandatoryFacet::KIND));
    }

    #[test]
    fn same_value_twice_keeps_the_first_winner() {
        let mut holder = holder();
        let first: Arc<dyn Facet> = Arc::new(MandatoryFacet::new(Optionality::Mandatory, Precedence::Default, "first"));
        assert!(holder.add_shared(Arc::clone(&first)));
        assert!(!holder.add_shared(Arc::clone(&first)));
        holder.add_facet(MandatoryFacet::new(Optionality::Mandatory, Precedence::Default, "second"));

        let winner = holder.get_facet(MandatoryFacet::KIND).unwrap();
        assert!(Arc::ptr_eq(winner, &first));
        assert_eq!(holder.top_rank(MandatoryFacet::KIND).len(), 2);
    }

    #[test]
    fn higher_precedence_replaces_without_deleting() {
        let mut holder = holder();
        holder.add_facet(MandatoryFacet::new(Optionality::Optional, Precedence::Default, "marker"));
        holder.add_facet(MandatoryFacet::new(Optionality::Mandatory, Precedence::High, "override"));
        holder.add_facet(MandatoryFacet::new(Optionality::Optional, Precedence::Fallback, "fallback"));

        let ranking = holder.ranking(MandatoryFacet::KIND).unwrap();
        assert_eq!(ranking.top_precedence(), Some(Precedence::High));
        assert_eq!(
            holder.get::<MandatoryFacet>().map(|f| f.optionality),
            Some(Optionality::Mandatory)
        );
        assert_eq!(ranking.rank(Precedence::Default).len(), 1);
        assert_eq!(ranking.len(), 3);

        let order: Vec<Precedence> = ranking.iter().map(|f| f.precedence()).collect();
        assert_eq!(order, vec![Precedence::High, Precedence::Default, Precedence::Fallback]);
    }

    #[test]
    fn conflicts_compare_top_rank_against_winner() {
        let mut holder = holder();
        holder.add_facet(MandatoryFacet::new(Optionality::Optional, Precedence::Default, "getter"));
        holder.add_facet(MandatoryFacet::new(Optionality::Optional, Precedence::Default, "field"));
        assert!(holder.ranking(MandatoryFacet::KIND).unwrap().conflicts().is_empty());

        holder.add_facet(MandatoryFacet::new(Optionality::Mandatory, Precedence::Default, "column"));
        holder.add_facet(MandatoryFacet::new(Optionality::Mandatory, Precedence::Fallback, "default"));
        let ranking = holder.ranking(MandatoryFacet::KIND).unwrap();
        let conflicts = ranking.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].1.describe().contains("column"));
    }

    #[test]
    fn kinds_rank_independently() {
        let mut holder = holder();
        holder.add_facet(MandatoryFacet::new(Optionality::Optional, Precedence::Default, "marker"));
        holder.add_facet(NamedFacet::new("Given Name", Precedence::Inferred, "derived"));
        let kinds: Vec<FacetKind> = holder.facet_kinds().collect();
        assert_eq!(kinds.len(), 2);
        assert_eq!(holder.get::<NamedFacet>().map(|f| f.name.as_str()), Some("Given Name"));
        assert!(holder.get::<MandatoryFacet>().is_some());
    }
}
