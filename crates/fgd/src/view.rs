//! Merged lookups across an entity's inheritance chain.
//!
//! A view borrows the database, so it always reflects the current base graph
//! and is recomputed on every call.

use std::collections::HashSet;

use indexmap::IndexSet;
use thiserror::Error;

use crate::database::Fgd;
use crate::entity::{by_specificity, AttrMap, Base, EntityDef, EntityId};
use crate::keyvalue::{IoDef, KeyValue};
use crate::tags::{match_tags, TagSet};

/// Lookup miss: the name is absent from the chain, or no variant matches the tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no variant of '{name}' matches tags [{tags}]")]
pub struct NotFound {
    pub name: String,
    pub tags: TagSet,
}

pub struct EntityView<'a, T> {
    fgd: &'a Fgd,
    entity: EntityId,
    select: fn(&EntityDef) -> &AttrMap<T>,
}

impl<'a> EntityView<'a, KeyValue> {
    pub(crate) fn keyvalues(fgd: &'a Fgd, entity: EntityId) -> Self {
        Self {
            fgd,
            entity,
            select: |def| &def.keyvalues,
        }
    }
}

impl<'a> EntityView<'a, IoDef> {
    pub(crate) fn inputs(fgd: &'a Fgd, entity: EntityId) -> Self {
        Self {
            fgd,
            entity,
            select: |def| &def.inputs,
        }
    }

    pub(crate) fn outputs(fgd: &'a Fgd, entity: EntityId) -> Self {
        Self {
            fgd,
            entity,
            select: |def| &def.outputs,
        }
    }
}

impl<'a, T: 'a> EntityView<'a, T> {
    /// Untagged lookup.
    pub fn get(&self, name: &str) -> Result<&'a T, NotFound> {
        self.get_tagged(name, &TagSet::new())
    }

    /// Tries each map along the chain that holds `name`, most specific tags
    /// first. A nearer map with no matching variant falls through to its bases.
    pub fn get_tagged(&self, name: &str, query: &TagSet) -> Result<&'a T, NotFound> {
        let folded = name.to_lowercase();
        self.chain()
            .into_iter()
            .filter_map(|id| self.attrs(id)?.get(&folded))
            .find_map(|tag_map| {
                by_specificity(tag_map)
                    .into_iter()
                    .find(|(tags, _)| match_tags(query, tags))
                    .map(|(_, value)| value)
            })
            .ok_or_else(|| NotFound {
                name: name.to_string(),
                tags: query.clone(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        let folded = name.to_lowercase();
        self.chain()
            .into_iter()
            .filter_map(|id| self.attrs(id))
            .any(|attrs| attrs.contains_key(&folded))
    }

    /// Every name visible through the chain, once each, in first-seen order.
    pub fn names(&self) -> Vec<&'a str> {
        let mut seen = IndexSet::<&'a str>::new();
        for attrs in self.chain().into_iter().filter_map(|id| self.attrs(id)) {
            seen.extend(attrs.keys().map(String::as_str));
        }
        seen.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn attrs(&self, id: EntityId) -> Option<&'a AttrMap<T>> {
        self.fgd.entity(id).map(self.select)
    }

    /// Pre-order walk: self, then each base and its own bases, in declared order.
    fn chain(&self) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.walk(self.entity, &mut order, &mut visited);
        order
    }

    fn walk(&self, id: EntityId, order: &mut Vec<EntityId>, visited: &mut HashSet<EntityId>) {
        let Some(def) = self.fgd.entity(id) else {
            return;
        };
        // Guards against cycles that collapse_bases has not rejected yet.
        if !visited.insert(id) {
            return;
        }
        order.push(id);
        for base in &def.bases {
            let base_id = match base {
                Base::Resolved(base_id) => Some(*base_id),
                Base::Unresolved(name) => self.fgd.id_of(name),
            };
            if let Some(base_id) = base_id {
                self.walk(base_id, order, visited);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::filesystem::MemoryFileSystem;
    use crate::parser::ParseOptions;
    use crate::tags::TagSet;
    use crate::entity::EntityId;
    use crate::{Fgd, ValueType};

    const SOURCE: &str = r#"
@BaseClass = Targetname
[
    targetname(target_source) : "Name"
    health[hl2](integer) : "Health" : 50
    input Kill(void) : "Removes the entity."
]

@BaseClass base(Targetname) = Origin
[
    origin(origin) : "Origin"
    health(integer) : "Health" : 10
]

@PointClass base(Origin, Targetname) = info_thing
[
    model(studio) : "Model"
    health[+mapbase](integer) : "Health" : 99
]
"#;

    fn load() -> Fgd {
        let fs = MemoryFileSystem::new().with_file("base.fgd", SOURCE);
        Fgd::parse("base", &fs, &ParseOptions::default()).expect("parse")
    }

    #[test]
    fn unmatched_variants_fall_through_to_bases() {
        let fgd = load();
        let id = fgd.id_of("info_thing").expect("entity");
        let kvs = fgd.keyvalues(id);

        // info_thing holds "health" only under +MAPBASE, so an untagged query
        // continues on to Origin.
        assert_eq!(kvs.get("health").expect("origin health").default, "10");
        let tagged = kvs
            .get_tagged("Health", &TagSet::query(["mapbase"]))
            .expect("mapbase health");
        assert_eq!(tagged.default, "99");
    }

    #[test]
    fn unknown_entity_id_finds_nothing() {
        let fgd = load();
        let kvs = fgd.keyvalues(EntityId(7));
        assert!(kvs.get("health").is_err());
        assert!(kvs.is_empty());
        assert!(!kvs.contains("health"));
    }

    #[test]
    fn more_specific_tag_sets_are_tried_first() {
        let fgd = load();
        let target = fgd.keyvalues(fgd.id_of("targetname").expect("targetname"));
        let err = target.get("health").expect_err("only tagged variant");
        assert_eq!(err.name, "health");
        assert_eq!(
            target
                .get_tagged("health", &TagSet::query(["HL2"]))
                .expect("hl2")
                .value_type,
            ValueType::Int
        );
    }

    #[test]
    fn names_union_in_first_seen_order() {
        let fgd = load();
        let kvs = fgd.keyvalues(fgd.id_of("info_thing").expect("entity"));
        assert_eq!(kvs.names(), vec!["model", "health", "origin", "targetname"]);
        assert_eq!(kvs.len(), 4);
        assert!(kvs.contains("TargetName"));
        assert!(!kvs.contains("missing"));
    }

    #[test]
    fn inputs_are_inherited() {
        let fgd = load();
        let inputs = fgd.inputs(fgd.id_of("info_thing").expect("entity"));
        assert_eq!(inputs.get("kill").expect("kill").desc, "Removes the entity.");
        assert!(fgd.outputs(fgd.id_of("info_thing").expect("entity")).is_empty());
    }

    #[test]
    fn view_follows_unresolved_bases_by_name() {
        let fs = MemoryFileSystem::new().with_file("lazy.fgd", SOURCE);
        let options = ParseOptions {
            eval_bases: false,
            ..ParseOptions::default()
        };
        let fgd = Fgd::parse("lazy.fgd", &fs, &options).expect("parse");
        let kvs = fgd.keyvalues(fgd.id_of("info_thing").expect("entity"));
        assert_eq!(kvs.get("origin").expect("origin").disp_name, "Origin");
    }
}
