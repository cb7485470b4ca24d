//! Mark phase: computing the set of live keys.

use cairn_core::{Hash, KeySet, LinkResolver, PinRoots};
use tracing::{debug, trace};

use crate::GcError;

/// How [`descendants`] reacts to a node whose links cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Every resolution failure is recorded.
    Strict,
    /// A missing node is skipped silently; other failures are recorded.
    BestEffort,
}

/// Adds every root and all keys reachable from it to `set`.
///
/// A key already in `set` (root or child) is not descended into again, so
/// every key is resolved at most once per run however many roots or parents
/// reach it. Callers must therefore only seed `set` with keys that were
/// expanded by an earlier call.
///
/// Failures do not stop the walk: the failing branch is left unexpanded, the
/// error is pushed to `errors` according to `policy`, and traversal moves on
/// to the remaining keys.
pub async fn descendants<R>(
    resolver: &R,
    policy: Traversal,
    set: &mut KeySet,
    roots: &[Hash],
    errors: &mut Vec<GcError>,
) where
    R: LinkResolver + ?Sized,
{
    let mut stack = Vec::new();
    for root in roots {
        if !set.visit(*root) {
            continue;
        }
        stack.push(*root);

        while let Some(key) = stack.pop() {
            let links = match resolver.resolve_links(&key).await {
                Ok(links) => links,
                Err(e) if policy == Traversal::BestEffort && e.is_not_found() => {
                    trace!(key = %key.fmt_short(), "best-effort node missing, skipped");
                    continue;
                }
                Err(source) => {
                    debug!(key = %key.fmt_short(), error = %source, "could not resolve links");
                    errors.push(GcError::CannotFetchLinks { key, source });
                    continue;
                }
            };
            for child in links {
                if set.visit(child) {
                    stack.push(child);
                }
            }
        }
    }
}

/// Computes the live set for one GC run.
///
/// The set holds recursive pins with their descendants, internal pins with
/// their descendants, whatever is reachable from `best_effort_roots`
/// (missing nodes tolerated) and the direct pins themselves. Strict roots
/// are walked first so a key skipped by the best-effort walk is never
/// mistaken for an expanded one. Direct pins come last since they are not
/// descended into.
///
/// If any key could not be resolved the set is incomplete and must not be
/// swept against; every such failure is returned instead.
pub async fn colored_set<P, R>(
    pins: &P,
    resolver: &R,
    best_effort_roots: &[Hash],
) -> Result<KeySet, Vec<GcError>>
where
    P: PinRoots + ?Sized,
    R: LinkResolver + ?Sized,
{
    let mut set = KeySet::new();
    let mut errors = Vec::new();

    let recursive = pins.recursive_keys().await;
    descendants(resolver, Traversal::Strict, &mut set, &recursive, &mut errors).await;

    let internal = pins.internal_pins().await;
    descendants(resolver, Traversal::Strict, &mut set, &internal, &mut errors).await;

    descendants(
        resolver,
        Traversal::BestEffort,
        &mut set,
        best_effort_roots,
        &mut errors,
    )
    .await;

    set.extend(pins.direct_keys().await);

    if errors.is_empty() {
        Ok(set)
    } else {
        Err(errors)
    }
}
