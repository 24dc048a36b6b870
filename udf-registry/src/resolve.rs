//! Overload resolution
//!
//! Given the overloads registered under one name and the shape of a call
//! (argument count, the actual types that are known, window or projection)
//! this picks the single most specific overload.
//!
//! 1. Overloads that do not allow the call's context are dropped.
//! 2. Overloads whose arity cannot accept the call are dropped.  A variadic
//!    overload accepts any count at least as long as its fixed prefix.
//! 3. Each position is matched against its formal specifier.  A placeholder
//!    formal or an unknown actual matches without scoring.  An exact match
//!    scores 2, a widened match scores 1, anything else eliminates the overload.
//! 4. If any fixed-arity overload still matches, variadic overloads are dropped.
//! 5. Overloads that needed widening only compete when no overload matched
//!    without it.  The highest total score wins.
//! 6. Ties are broken by the longest leading run of known positions, then
//!    (among variadic overloads) the longest fixed prefix and finally the
//!    earliest registration.
//!
//! The outcome depends only on the overload set, the argument types, the
//! context and the library params.
use tracing::{debug, trace};

use crate::builder::types::TypeSpecifier;
use crate::error::{Result, UdfError};
use crate::helpers::types::DataType;
use crate::library::{LibraryParams, OverloadSet, RegisteredOverload};
use crate::util::format_arg_types;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PositionMatch {
    /// The formal is a placeholder
    Placeholder,
    /// The actual's type is not known yet
    Deferred,
    Widened,
    Exact,
}

impl PositionMatch {
    fn specificity(self) -> u32 {
        match self {
            PositionMatch::Placeholder | PositionMatch::Deferred => 0,
            PositionMatch::Widened => 1,
            PositionMatch::Exact => 2,
        }
    }

    fn is_known(self) -> bool {
        matches!(self, PositionMatch::Widened | PositionMatch::Exact)
    }
}

fn match_position(
    formal: &TypeSpecifier,
    actual: Option<&DataType>,
    params: &LibraryParams,
) -> Option<PositionMatch> {
    match (formal, actual) {
        (TypeSpecifier::Any, _) => Some(PositionMatch::Placeholder),
        (TypeSpecifier::Concrete(_), None) => Some(PositionMatch::Deferred),
        (TypeSpecifier::Concrete(expected), Some(actual)) if expected == actual => {
            Some(PositionMatch::Exact)
        }
        (TypeSpecifier::Concrete(expected), Some(actual))
            if params.allow_implicit_widening && actual.can_widen_to(expected) =>
        {
            Some(PositionMatch::Widened)
        }
        _ => None,
    }
}

/// Tracks an overload that survived matching
#[derive(Debug)]
struct Candidate<'a> {
    overload: &'a RegisteredOverload,
    specificity: u32,
    known_prefix: usize,
    widened: bool,
}

impl<'a> Candidate<'a> {
    fn is_variadic(&self) -> bool {
        self.overload.signature().is_variadic()
    }

    fn prefix_len(&self) -> usize {
        self.overload.signature().prefix_len()
    }
}

fn arity_accepts(overload: &RegisteredOverload, num_args: usize) -> bool {
    let signature = overload.signature();
    if signature.is_variadic() {
        num_args >= signature.prefix_len()
    } else {
        num_args == signature.prefix_len()
    }
}

fn assess<'a>(
    overload: &'a RegisteredOverload,
    arg_types: &[Option<DataType>],
    params: &LibraryParams,
) -> Option<Candidate<'a>> {
    let signature = overload.signature();
    let mut specificity = 0;
    let mut known_prefix = 0;
    let mut in_known_run = true;
    let mut widened = false;
    for (position, actual) in arg_types.iter().enumerate() {
        let formal = signature.specifier_at(position)?;
        let matched = match_position(formal, actual.as_ref(), params)?;
        specificity += matched.specificity();
        widened |= matched == PositionMatch::Widened;
        if in_known_run && matched.is_known() {
            known_prefix += 1;
        } else {
            in_known_run = false;
        }
    }
    Some(Candidate {
        overload,
        specificity,
        known_prefix,
        widened,
    })
}

fn retain_max<'a>(candidates: &mut Vec<Candidate<'a>>, key: impl Fn(&Candidate<'a>) -> usize) {
    if let Some(max) = candidates.iter().map(&key).max() {
        candidates.retain(|candidate| key(candidate) == max);
    }
}

/// Picks the overload of `set` that a call with `arg_types` should use
pub(crate) fn select_overload<'a>(
    set: &'a OverloadSet,
    arg_types: &[Option<DataType>],
    windowed: bool,
    params: &LibraryParams,
) -> Result<&'a RegisteredOverload> {
    let mut candidates = set
        .overloads()
        .iter()
        .filter(|overload| overload.accepts_context(windowed))
        .filter(|overload| arity_accepts(overload, arg_types.len()))
        .filter_map(|overload| {
            let candidate = assess(overload, arg_types, params);
            trace!(
                function = set.name(),
                signature = %overload.signature(),
                score = candidate.as_ref().map(|c| c.specificity),
                "assessed overload"
            );
            candidate
        })
        .collect::<Vec<_>>();

    if candidates.is_empty() {
        return Err(UdfError::NoMatch {
            name: set.name().to_string(),
            args: format_arg_types(arg_types.iter().map(|typ| typ.as_ref())),
        });
    }

    if candidates.iter().any(|candidate| !candidate.is_variadic()) {
        candidates.retain(|candidate| !candidate.is_variadic());
    }
    if candidates.iter().any(|candidate| !candidate.widened) {
        candidates.retain(|candidate| !candidate.widened);
    }
    retain_max(&mut candidates, |candidate| candidate.specificity as usize);
    retain_max(&mut candidates, |candidate| candidate.known_prefix);

    if candidates.iter().all(|candidate| candidate.is_variadic()) {
        retain_max(&mut candidates, |candidate| candidate.prefix_len());
        // Candidates are still in registration order
        candidates.truncate(1);
    }

    match candidates.as_slice() {
        [winner] => {
            debug!(
                function = set.name(),
                signature = %winner.overload.signature(),
                "selected overload"
            );
            Ok(winner.overload)
        }
        _ => Err(UdfError::Ambiguous {
            name: set.name().to_string(),
            args: format_arg_types(arg_types.iter().map(|typ| typ.as_ref())),
            candidates: candidates
                .iter()
                .map(|candidate| candidate.overload.signature().to_string())
                .collect::<Vec<_>>()
                .join(" and "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::types::Signature;
    use crate::helpers::types;
    use crate::library::{OverloadKind, RegisteredOverload};

    fn concrete(typ: DataType) -> TypeSpecifier {
        TypeSpecifier::Concrete(typ)
    }

    fn set_of(signatures: Vec<Signature>) -> OverloadSet {
        let mut set = OverloadSet::new("f");
        for signature in signatures {
            set.push(RegisteredOverload::marker("f", signature));
        }
        set
    }

    fn pick(set: &OverloadSet, arg_types: &[Option<DataType>]) -> Result<usize> {
        let winner = select_overload(set, arg_types, false, &LibraryParams::default())?;
        Ok(set
            .overloads()
            .iter()
            .position(|overload| std::ptr::eq(overload, winner))
            .unwrap())
    }

    #[test]
    fn exact_beats_placeholder() {
        let set = set_of(vec![
            Signature::fixed(vec![TypeSpecifier::Any, TypeSpecifier::Any]),
            Signature::fixed(vec![concrete(types::double()), concrete(types::int32())]),
        ]);
        let args = [Some(types::double()), Some(types::int32())];
        assert_eq!(pick(&set, &args).unwrap(), 1);
        assert_eq!(set.overloads()[1].kind(), OverloadKind::External);
    }

    #[test]
    fn widening_only_when_nothing_else_fits() {
        let set = set_of(vec![
            Signature::fixed(vec![TypeSpecifier::Any, TypeSpecifier::Any]),
            Signature::fixed(vec![concrete(types::double()), concrete(types::double())]),
        ]);
        let args = [Some(types::int32()), Some(types::int32())];
        assert_eq!(pick(&set, &args).unwrap(), 0);

        let set = set_of(vec![
            Signature::fixed(vec![concrete(types::double()), concrete(types::double())]),
            Signature::fixed(vec![concrete(types::int64()), concrete(types::int64())]),
        ]);
        // Among widened matches the one with fewer conversions wins
        let args = [Some(types::int64()), Some(types::int32())];
        assert_eq!(pick(&set, &args).unwrap(), 1);
        let args = [Some(types::int32()), Some(types::double())];
        assert_eq!(pick(&set, &args).unwrap(), 0);
    }

    #[test]
    fn narrowing_is_rejected() {
        let set = set_of(vec![Signature::fixed(vec![concrete(types::int32())])]);
        assert!(matches!(
            pick(&set, &[Some(types::double())]),
            Err(UdfError::NoMatch { .. })
        ));
    }

    #[test]
    fn strict_params_disable_widening() {
        let set = set_of(vec![Signature::fixed(vec![concrete(types::double())])]);
        let args = [Some(types::int32())];
        assert!(select_overload(&set, &args, false, &LibraryParams::default()).is_ok());
        assert!(matches!(
            select_overload(&set, &args, false, &LibraryParams::new_strict()),
            Err(UdfError::NoMatch { .. })
        ));
    }

    #[test]
    fn fixed_beats_variadic() {
        let set = set_of(vec![
            Signature::variadic(vec![concrete(types::string())], TypeSpecifier::Any),
            Signature::fixed(vec![concrete(types::string()), TypeSpecifier::Any]),
        ]);
        let args = [Some(types::string()), Some(types::int32())];
        assert_eq!(pick(&set, &args).unwrap(), 1);

        // A better scoring variadic overload still loses
        let set = set_of(vec![
            Signature::fixed(vec![concrete(types::double())]),
            Signature::variadic(vec![], concrete(types::int32())),
        ]);
        assert_eq!(pick(&set, &[Some(types::int32())]).unwrap(), 0);
    }

    #[test]
    fn known_prefix_breaks_ties() {
        let set = set_of(vec![
            Signature::fixed(vec![TypeSpecifier::Any, concrete(types::int32())]),
            Signature::fixed(vec![concrete(types::int32()), TypeSpecifier::Any]),
        ]);
        let args = [Some(types::int32()), Some(types::int32())];
        assert_eq!(pick(&set, &args).unwrap(), 1);
    }

    #[test]
    fn longer_variadic_prefix_then_registration_order() {
        let set = set_of(vec![
            Signature::variadic(vec![], TypeSpecifier::Any),
            Signature::variadic(vec![concrete(types::int32())], TypeSpecifier::Any),
            Signature::variadic(vec![TypeSpecifier::Any], concrete(types::string())),
        ]);
        // Unknown first argument scores nothing anywhere
        assert_eq!(pick(&set, &[None]).unwrap(), 1);
        assert_eq!(pick(&set, &[]).unwrap(), 0);
        assert_eq!(pick(&set, &[Some(types::int32())]).unwrap(), 1);

        let set = set_of(vec![
            Signature::variadic(vec![TypeSpecifier::Any], concrete(types::bool())),
            Signature::variadic(vec![TypeSpecifier::Any], concrete(types::int32())),
        ]);
        assert_eq!(pick(&set, &[Some(types::date()), None]).unwrap(), 0);
    }

    #[test]
    fn unresolvable_ties_are_ambiguous() {
        let set = set_of(vec![
            Signature::fixed(vec![TypeSpecifier::Any, concrete(types::int32())]),
            Signature::fixed(vec![TypeSpecifier::Any, concrete(types::int64())]),
        ]);
        let err = pick(&set, &[None, None]).unwrap_err();
        assert!(matches!(err, UdfError::Ambiguous { .. }));
        assert_eq!(
            err.to_string(),
            "Call f(?, ?) is ambiguous between overloads (any, int32) and (any, int64)"
        );
    }

    #[test]
    fn variadic_tail_is_typed_per_position() {
        let set = set_of(vec![Signature::variadic(
            vec![concrete(types::string())],
            concrete(types::int64()),
        )]);
        let ok = [Some(types::string()), Some(types::int64()), Some(types::int32()), None];
        assert_eq!(pick(&set, &ok).unwrap(), 0);
        let bad = [Some(types::string()), Some(types::int64()), Some(types::bool())];
        assert!(pick(&set, &bad).is_err());
    }

    #[test]
    fn context_flags_filter_before_matching() {
        let mut set = OverloadSet::new("f");
        let mut overload =
            RegisteredOverload::marker("f", Signature::fixed(vec![concrete(types::int32())]));
        overload.allow_window = false;
        set.push(overload);
        let args = [Some(types::int32())];
        let params = LibraryParams::default();
        assert!(select_overload(&set, &args, false, &params).is_ok());
        assert!(matches!(
            select_overload(&set, &args, true, &params),
            Err(UdfError::NoMatch { .. })
        ));
    }
}
