use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Kind of engagement a user records against a post
///
/// Variants are declared in order of the commitment the action implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Comment,
    Like,
    Bookmark,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 4] = [
        InteractionKind::View,
        InteractionKind::Comment,
        InteractionKind::Like,
        InteractionKind::Bookmark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Comment => "comment",
            InteractionKind::Like => "like",
            InteractionKind::Bookmark => "bookmark",
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WeightTableError {
    #[error("weight for {kind} must be positive and finite, got {weight}")]
    NonPositive { kind: InteractionKind, weight: f64 },

    #[error("weight for {higher} ({higher_weight}) must exceed weight for {lower} ({lower_weight})")]
    OutOfOrder {
        lower: InteractionKind,
        lower_weight: f64,
        higher: InteractionKind,
        higher_weight: f64,
    },
}

/// Relevance weight attached to each interaction kind
///
/// This is the vocabulary shared with the ranking service: the relative order
/// view < comment < like < bookmark is enforced at construction, the absolute
/// values are configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightTable {
    view: f64,
    comment: f64,
    like: f64,
    bookmark: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            view: 1.0,
            comment: 3.0,
            like: 4.0,
            bookmark: 5.0,
        }
    }
}

impl WeightTable {
    pub fn new(view: f64, comment: f64, like: f64, bookmark: f64) -> Result<Self, WeightTableError> {
        let table = Self {
            view,
            comment,
            like,
            bookmark,
        };

        for kind in InteractionKind::ALL {
            let weight = table.weight_of(kind);
            if !weight.is_finite() || weight <= 0.0 {
                return Err(WeightTableError::NonPositive { kind, weight });
            }
        }

        for pair in InteractionKind::ALL.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            let (lower_weight, higher_weight) = (table.weight_of(lower), table.weight_of(higher));
            if higher_weight <= lower_weight {
                return Err(WeightTableError::OutOfOrder {
                    lower,
                    lower_weight,
                    higher,
                    higher_weight,
                });
            }
        }

        Ok(table)
    }

    pub fn weight_of(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::View => self.view,
            InteractionKind::Comment => self.comment,
            InteractionKind::Like => self.like,
            InteractionKind::Bookmark => self.bookmark,
        }
    }

    /// Emits the structured event for an interaction on `slug`
    pub fn record(&self, kind: InteractionKind, slug: &str) {
        tracing::info!(
            slug = %slug,
            kind = %kind,
            weight = self.weight_of(kind),
            "Interaction recorded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let table = WeightTable::default();
        assert_eq!(table.weight_of(InteractionKind::View), 1.0);
        assert_eq!(table.weight_of(InteractionKind::Comment), 3.0);
        assert_eq!(table.weight_of(InteractionKind::Like), 4.0);
        assert_eq!(table.weight_of(InteractionKind::Bookmark), 5.0);
    }

    #[test]
    fn test_default_weights_increase_with_commitment() {
        let table = WeightTable::default();
        for pair in InteractionKind::ALL.windows(2) {
            assert!(table.weight_of(pair[0]) < table.weight_of(pair[1]));
        }
    }

    #[test]
    fn test_rescaled_weights_accepted() {
        let table = WeightTable::new(0.5, 1.5, 2.0, 2.5).unwrap();
        assert_eq!(table.weight_of(InteractionKind::Like), 2.0);
    }

    #[test]
    fn test_out_of_order_weights_rejected() {
        let err = WeightTable::new(1.0, 3.0, 6.0, 5.0).unwrap_err();
        assert_eq!(
            err,
            WeightTableError::OutOfOrder {
                lower: InteractionKind::Like,
                lower_weight: 6.0,
                higher: InteractionKind::Bookmark,
                higher_weight: 5.0,
            }
        );
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let err = WeightTable::new(0.0, 3.0, 4.0, 5.0).unwrap_err();
        assert!(matches!(
            err,
            WeightTableError::NonPositive {
                kind: InteractionKind::View,
                ..
            }
        ));
    }

    #[test]
    fn test_interaction_kind_serialization() {
        let json = serde_json::to_string(&InteractionKind::Bookmark).unwrap();
        assert_eq!(json, "\"bookmark\"");
        assert_eq!(InteractionKind::Comment.to_string(), "comment");
    }
}
