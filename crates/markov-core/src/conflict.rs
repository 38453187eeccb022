use std::collections::BTreeMap;

use crate::types::{Conflict, FacetCut, FacetCutAction, Selector};

/// Fold cuts (in application order) into the last action per selector.
pub fn selector_actions<'a, I>(cuts: I) -> BTreeMap<Selector, FacetCutAction>
where
    I: IntoIterator<Item = &'a FacetCut>,
{
    let mut map = BTreeMap::new();
    for cut in cuts {
        for selector in &cut.function_selectors {
            map.insert(selector.clone(), cut.action);
        }
    }
    map
}

/// Selectors both sides touched with a different final action, sorted by selector.
/// Selectors touched on only one side never conflict.
pub fn detect<'a, A, B>(source: A, target: B) -> Vec<Conflict>
where
    A: IntoIterator<Item = &'a FacetCut>,
    B: IntoIterator<Item = &'a FacetCut>,
{
    let source = selector_actions(source);
    let target = selector_actions(target);
    source
        .iter()
        .filter_map(|(selector, &source_action)| {
            let &target_action = target.get(selector)?;
            (source_action != target_action).then(|| Conflict {
                selector: selector.clone(),
                source_action,
                target_action,
            })
        })
        .collect()
}
