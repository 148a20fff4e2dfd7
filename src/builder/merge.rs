//! Project/target option ordering.
//!
//! Every option category (include dirs, lib dirs, flags...) combines the
//! project value with the target value the same way; only the relation
//! stored for the category decides the order.

use crate::core::target::OptionsRelation;

/// A value that can be concatenated in order: an option string or a list.
pub trait OptionSet: Clone + Default {
    fn concat(&mut self, other: &Self);
}

impl OptionSet for String {
    fn concat(&mut self, other: &Self) {
        self.push_str(other);
    }
}

impl<T: Clone> OptionSet for Vec<T> {
    fn concat(&mut self, other: &Self) {
        self.extend_from_slice(other);
    }
}

/// Order `project` and `target` values according to `relation`.
pub fn ordered_options<T: OptionSet>(relation: OptionsRelation, project: &T, target: &T) -> T {
    let (first, second) = match relation {
        OptionsRelation::UseParentOnly => return project.clone(),
        OptionsRelation::UseTargetOnly => return target.clone(),
        OptionsRelation::PrependToParent => (target, project),
        OptionsRelation::AppendToParent => (project, target),
    };
    let mut out = first.clone();
    out.concat(second);
    out
}
