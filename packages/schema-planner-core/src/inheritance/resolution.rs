//! Resolution bookkeeping: defaults, replacement after removal, and diffs.

use tracing::debug;

use super::conflict::{conflict_group, ColumnConflict};
use crate::schema::{same_name, AttributeScope, Resolution};

/// Picks the resolution that replaces `removed`.
///
/// The first contributor after the removed one (in conflict order) without
/// a resolution wins; failing that, the first contributor without one.
/// `resolutions` must no longer contain `removed`.
///
/// # Returns
/// `None` when the name no longer conflicts or every contributor is
/// already resolved.
pub fn next_resolution(
    resolutions: &[Resolution],
    removed: &Resolution,
    conflicts: &[ColumnConflict],
) -> Option<Resolution> {
    let group = conflict_group(conflicts, &removed.name);
    if group.len() < 2 {
        return None;
    }

    let unresolved =
        |c: &ColumnConflict| !resolutions.iter().any(|r| r.matches(&c.name, &c.class_name));
    let start = group
        .iter()
        .position(|c| same_name(&c.class_name, &removed.class_name))
        .map_or(0, |p| p + 1);

    let next = group[start..]
        .iter()
        .copied()
        .find(|c| unresolved(*c))
        .or_else(|| group.iter().copied().find(|c| unresolved(*c)))?;
    debug!(attribute = %next.name, class = %next.class_name, "Next resolution");
    Some(Resolution::new(
        next.name.clone(),
        next.class_name.clone(),
        removed.scope,
    ))
}

/// Resolutions of `new` that are absent from `old` or carry a different alias.
///
/// Resolutions that disappear need no statement; the server drops unused
/// ones itself.
pub fn resolution_changes(old: &[Resolution], new: &[Resolution]) -> Vec<Resolution> {
    new.iter()
        .filter(|r| {
            !old.iter()
                .any(|o| o.matches(&r.name, &r.class_name) && alias_eq(&o.alias, &r.alias))
        })
        .cloned()
        .collect()
}

fn alias_eq(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_name(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Keeps the resolutions that still match a conflict and adds a default
/// pick for every conflicting name left without one.
///
/// A default is copied from `previous` when it resolved the same name to a
/// class that still contributes; otherwise the first contributor is picked.
pub(crate) fn reconcile_resolutions(
    current: &[Resolution],
    previous: Option<&[Resolution]>,
    conflicts: &[ColumnConflict],
    scope: AttributeScope,
) -> Vec<Resolution> {
    let still_conflicts =
        |r: &Resolution| conflicts.iter().any(|c| r.matches(&c.name, &c.class_name));

    let mut kept: Vec<Resolution> = Vec::new();
    for resolution in current.iter().filter(|r| still_conflicts(*r)) {
        let duplicate_pick = !resolution.is_alias()
            && kept
                .iter()
                .any(|k| !k.is_alias() && same_name(&k.name, &resolution.name));
        if duplicate_pick {
            continue;
        }
        let mut resolution = resolution.clone();
        resolution.scope = scope;
        kept.push(resolution);
    }

    let mut names: Vec<&str> = Vec::new();
    for conflict in conflicts {
        if !names.iter().any(|n| same_name(n, &conflict.name)) {
            names.push(&conflict.name);
        }
    }

    for name in names {
        let resolved = kept
            .iter()
            .any(|r| !r.is_alias() && same_name(&r.name, name));
        if resolved {
            continue;
        }
        let copied = previous.and_then(|p| {
            p.iter()
                .find(|r| !r.is_alias() && same_name(&r.name, name) && still_conflicts(*r))
        });
        let resolution = match copied {
            Some(r) => Resolution::new(r.name.clone(), r.class_name.clone(), scope),
            None => {
                let Some(first) = conflicts.iter().find(|c| same_name(&c.name, name)) else {
                    continue;
                };
                Resolution::new(first.name.clone(), first.class_name.clone(), scope)
            }
        };
        debug!(attribute = %resolution.name, class = %resolution.class_name, "Default resolution");
        kept.push(resolution);
    }
    kept
}
