//! The resolves-to relation between writer and reader schemas.
//!
//! [`resolve`] answers, without building a grammar, whether data written
//! under one schema can be read under another, and whether doing so needs a
//! numeric widening. The resolving grammar generator uses it to pick union
//! branches; callers can use it to probe compatibility up front.

use std::sync::Arc;

use super::types::Schema;

/// Outcome of resolving a writer schema against a reader schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reader accepts the writer's values unchanged.
    Full,
    /// Writer values widen to long.
    PromotableToLong,
    /// Writer values widen to float.
    PromotableToFloat,
    /// Writer values widen to double.
    PromotableToDouble,
    /// The schemas cannot be resolved.
    NoMatch,
}

impl Resolution {
    /// True for any outcome other than `NoMatch`.
    pub fn is_compatible(&self) -> bool {
        !matches!(self, Resolution::NoMatch)
    }
}

/// Resolve `writer` against `reader`.
///
/// Rules:
/// - identical primitive types match;
/// - `int -> long`, `{int, long} -> float`, and `{int, long, float} ->
///   double` are promotable;
/// - named types match when their fully qualified names are equal (and,
///   for fixed, the sizes are equal);
/// - arrays and maps resolve by their item and value types;
/// - a union reader matches if any branch matches, a full match beating a
///   promotion and earlier branches beating later ones;
/// - link nodes are dereferenced transparently on both sides, with a
///   broken link treated as `NoMatch`.
pub fn resolve(writer: &Arc<Schema>, reader: &Arc<Schema>) -> Resolution {
    let writer = match Schema::follow(writer) {
        Ok(w) => w,
        Err(_) => return Resolution::NoMatch,
    };
    let reader = match Schema::follow(reader) {
        Ok(r) => r,
        Err(_) => return Resolution::NoMatch,
    };

    // A union reader accepts the best match among its branches. A union
    // writer against a non-union reader is settled per-branch at decode
    // time, so it counts as resolvable here only when the reader is also
    // a union (handled below by the reader-union arm).
    if let Schema::Union(branches) = &*reader {
        let mut best = Resolution::NoMatch;
        for branch in branches {
            match resolve(&writer, branch) {
                Resolution::Full => return Resolution::Full,
                r if r.is_compatible() && !best.is_compatible() => best = r,
                _ => {}
            }
        }
        return best;
    }

    match (&*writer, &*reader) {
        (Schema::Null, Schema::Null)
        | (Schema::Boolean, Schema::Boolean)
        | (Schema::Int, Schema::Int)
        | (Schema::Long, Schema::Long)
        | (Schema::Float, Schema::Float)
        | (Schema::Double, Schema::Double)
        | (Schema::Bytes, Schema::Bytes)
        | (Schema::String, Schema::String) => Resolution::Full,

        (Schema::Int, Schema::Long) => Resolution::PromotableToLong,
        (Schema::Int | Schema::Long, Schema::Float) => Resolution::PromotableToFloat,
        (Schema::Int | Schema::Long | Schema::Float, Schema::Double) => {
            Resolution::PromotableToDouble
        }

        (Schema::Record(w), Schema::Record(r)) => {
            if w.fullname() == r.fullname() {
                Resolution::Full
            } else {
                Resolution::NoMatch
            }
        }
        (Schema::Enum(w), Schema::Enum(r)) => {
            if w.fullname() == r.fullname() {
                Resolution::Full
            } else {
                Resolution::NoMatch
            }
        }
        (Schema::Fixed(w), Schema::Fixed(r)) => {
            if w.fullname() == r.fullname() && w.size == r.size {
                Resolution::Full
            } else {
                Resolution::NoMatch
            }
        }

        (Schema::Array(w), Schema::Array(r)) => resolve(w, r),
        (Schema::Map(w), Schema::Map(r)) => resolve(w, r),

        (Schema::Union(_), _) => {
            // Writer-union data carries a branch tag; whether the chosen
            // branch fits the reader is only known when the tag is read.
            Resolution::NoMatch
        }

        _ => Resolution::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{EnumSchema, FixedSchema};

    fn s(schema: Schema) -> Arc<Schema> {
        Arc::new(schema)
    }

    #[test]
    fn test_same_primitive_matches() {
        assert_eq!(resolve(&s(Schema::Int), &s(Schema::Int)), Resolution::Full);
        assert_eq!(
            resolve(&s(Schema::String), &s(Schema::String)),
            Resolution::Full
        );
    }

    #[test]
    fn test_promotions_are_one_way() {
        assert_eq!(
            resolve(&s(Schema::Int), &s(Schema::Long)),
            Resolution::PromotableToLong
        );
        assert_eq!(
            resolve(&s(Schema::Long), &s(Schema::Float)),
            Resolution::PromotableToFloat
        );
        assert_eq!(
            resolve(&s(Schema::Float), &s(Schema::Double)),
            Resolution::PromotableToDouble
        );
        assert_eq!(
            resolve(&s(Schema::Long), &s(Schema::Int)),
            Resolution::NoMatch
        );
        assert_eq!(
            resolve(&s(Schema::Double), &s(Schema::Float)),
            Resolution::NoMatch
        );
    }

    #[test]
    fn test_fixed_requires_name_and_size() {
        let a = s(Schema::Fixed(FixedSchema::new("F", 4)));
        let b = s(Schema::Fixed(FixedSchema::new("F", 4)));
        let c = s(Schema::Fixed(FixedSchema::new("F", 8)));
        let d = s(Schema::Fixed(FixedSchema::new("G", 4)));
        assert_eq!(resolve(&a, &b), Resolution::Full);
        assert_eq!(resolve(&a, &c), Resolution::NoMatch);
        assert_eq!(resolve(&a, &d), Resolution::NoMatch);
    }

    #[test]
    fn test_array_recurses_on_items() {
        let w = Schema::array(s(Schema::Int));
        let r = Schema::array(s(Schema::Double));
        assert_eq!(resolve(&w, &r), Resolution::PromotableToDouble);
    }

    #[test]
    fn test_reader_union_match_beats_promotion() {
        // A long branch later in the union wins over an earlier float
        // promotion because a full match always wins.
        let reader = Schema::union_of(vec![s(Schema::Float), s(Schema::Long)]);
        assert_eq!(resolve(&s(Schema::Long), &reader), Resolution::Full);
    }

    #[test]
    fn test_reader_union_first_promotable_branch() {
        let reader = Schema::union_of(vec![s(Schema::Float), s(Schema::Double)]);
        assert_eq!(
            resolve(&s(Schema::Int), &reader),
            Resolution::PromotableToFloat
        );
    }

    #[test]
    fn test_enum_name_mismatch() {
        let w = s(Schema::Enum(
            EnumSchema::new("Color", vec!["RED".into()]).unwrap(),
        ));
        let r = s(Schema::Enum(
            EnumSchema::new("Shade", vec!["RED".into()]).unwrap(),
        ));
        assert_eq!(resolve(&w, &r), Resolution::NoMatch);
    }
}
