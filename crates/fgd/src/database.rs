use std::collections::HashSet;
use std::fmt::Write as _;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::entity::{AttrMap, Base, EntityDef, EntityId};
use crate::error::{ParseError, ParseErrorCode};
use crate::filesystem::FileSystem;
use crate::keyvalue::{IoDef, KeyValue};
use crate::parser::ParseOptions;
use crate::tags::TagSet;
use crate::view::EntityView;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown base '{base}' for {classname}")]
    UnknownBase { base: String, classname: String },
    #[error("base '{base}' of {classname} is unresolved; apply_bases must run first")]
    UnresolvedBase { base: String, classname: String },
    #[error("loop in bases between: {}", classnames.join(", "))]
    BaseCycle { classnames: Vec<String> },
    #[error("a base of {classname} is not an entity of this database")]
    DanglingBase { classname: String },
}

/// A set of entity definitions, possibly assembled from several files.
///
/// Entities live in an arena addressed by [`EntityId`]. The classname index
/// only points at the most recent definition of each name, so an overwritten
/// entity stays alive while something still uses it as a base.
#[derive(Debug, Clone, Default)]
pub struct Fgd {
    entities: Vec<EntityDef>,
    by_name: IndexMap<String, EntityId>,
    pub map_size_min: f64,
    pub map_size_max: f64,
    pub(crate) parse_list: IndexSet<String>,
}

impl Fgd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and everything it includes. A missing `.fgd` suffix is added.
    pub fn parse(
        path: &str,
        fs: &dyn FileSystem,
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let path = with_fgd_suffix(path);
        let file = fs.open(&path).map_err(|source| ParseError {
            code: ParseErrorCode::ReadFile,
            message: format!("failed to open FGD: {source}"),
            file_path: path.clone().into(),
            location: None,
        })?;
        let mut fgd = Self::new();
        fgd.parse_file(fs, file, options)?;
        Ok(fgd)
    }

    /// Registers `def` under its classname, replacing any earlier holder of the name.
    pub fn insert(&mut self, def: EntityDef) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.by_name.insert(def.classname.to_lowercase(), id);
        self.entities.push(def);
        id
    }

    pub fn id_of(&self, classname: &str) -> Option<EntityId> {
        self.by_name.get(&classname.to_lowercase()).copied()
    }

    pub fn get(&self, classname: &str) -> Option<&EntityDef> {
        self.id_of(classname).and_then(|id| self.entity(id))
    }

    pub fn get_mut(&mut self, classname: &str) -> Option<&mut EntityDef> {
        let id = self.id_of(classname)?;
        self.entity_mut(id)
    }

    /// Any entity in the arena, registered or only reachable as a base.
    pub fn entity(&self, id: EntityId) -> Option<&EntityDef> {
        self.entities.get(id.index())
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut EntityDef> {
        self.entities.get_mut(id.index())
    }

    pub fn contains(&self, classname: &str) -> bool {
        self.by_name.contains_key(&classname.to_lowercase())
    }

    /// Number of registered classnames.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered entity ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.by_name.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDef> + '_ {
        self.ids().filter_map(|id| self.entity(id))
    }

    pub fn keyvalues(&self, id: EntityId) -> EntityView<'_, KeyValue> {
        EntityView::keyvalues(self, id)
    }

    pub fn inputs(&self, id: EntityId) -> EntityView<'_, IoDef> {
        EntityView::inputs(self, id)
    }

    pub fn outputs(&self, id: EntityId) -> EntityView<'_, IoDef> {
        EntityView::outputs(self, id)
    }

    /// Classnames of the direct bases of `id`.
    pub fn base_names(&self, id: EntityId) -> Vec<String> {
        let Some(def) = self.entity(id) else {
            return Vec::new();
        };
        def.bases
            .iter()
            .filter_map(|base| match base {
                Base::Resolved(base_id) => self.entity(*base_id).map(|base| base.classname.clone()),
                Base::Unresolved(name) => Some(name.clone()),
            })
            .collect()
    }

    /// Every ancestor of `id` once, depth-first in declared order.
    pub fn iter_bases(&self, id: EntityId) -> Vec<EntityId> {
        let mut done = HashSet::from([id]);
        let mut out = Vec::new();
        self.collect_bases(id, &mut done, &mut out);
        out
    }

    fn collect_bases(&self, id: EntityId, done: &mut HashSet<EntityId>, out: &mut Vec<EntityId>) {
        let Some(def) = self.entity(id) else {
            return;
        };
        for base in &def.bases {
            let base_id = match base {
                Base::Resolved(base_id) => *base_id,
                Base::Unresolved(name) => match self.id_of(name) {
                    Some(base_id) => base_id,
                    None => continue,
                },
            };
            if self.entity(base_id).is_some() && done.insert(base_id) {
                out.push(base_id);
                self.collect_bases(base_id, done, out);
            }
        }
    }

    /// Swaps every base still held by name for the registered entity of that name.
    pub fn apply_bases(&mut self) -> Result<(), ResolveError> {
        let mut resolved_count = 0usize;
        for id in self.ids().collect::<Vec<_>>() {
            let Some(mut bases) = self
                .entity_mut(id)
                .map(|def| std::mem::take(&mut def.bases))
            else {
                continue;
            };
            let mut unknown = None;
            for base in &mut bases {
                if let Base::Unresolved(name) = base {
                    let Some(base_id) = self.id_of(name) else {
                        unknown = Some(name.clone());
                        break;
                    };
                    *base = Base::Resolved(base_id);
                    resolved_count += 1;
                }
            }
            if let Some(def) = self.entity_mut(id) {
                def.bases = bases;
                if let Some(base) = unknown {
                    return Err(ResolveError::UnknownBase {
                        base,
                        classname: def.classname.clone(),
                    });
                }
            }
        }
        debug!(resolved_count, "fgd_bases_applied");
        Ok(())
    }

    /// Merges every base into its children and clears all base lists.
    ///
    /// Entities are processed once all of their bases are done. Bases that are
    /// no longer registered under their own name join the work list when first
    /// seen. A pass that finishes nothing and finds nothing new means the bases
    /// form a loop.
    pub fn collapse_bases(&mut self) -> Result<(), ResolveError> {
        let mut todo = self.ids().collect::<IndexSet<_>>();
        let mut done = HashSet::<EntityId>::new();
        let mut collapsed_count = 0usize;
        while !todo.is_empty() {
            let mut deferred = IndexSet::<EntityId>::new();
            let mut progressed = false;
            for &id in &todo {
                let Some(def) = self.entity(id) else {
                    continue;
                };
                let mut ready = true;
                let mut base_ids = Vec::with_capacity(def.bases.len());
                for base in &def.bases {
                    let base_id = match base {
                        Base::Unresolved(name) => {
                            return Err(ResolveError::UnresolvedBase {
                                base: name.clone(),
                                classname: def.classname.clone(),
                            });
                        }
                        Base::Resolved(base_id) => *base_id,
                    };
                    if self.entity(base_id).is_none() {
                        return Err(ResolveError::DanglingBase {
                            classname: def.classname.clone(),
                        });
                    }
                    if !done.contains(&base_id) {
                        ready = false;
                        if !todo.contains(&base_id) && deferred.insert(base_id) {
                            progressed = true;
                        }
                    }
                    base_ids.push(base_id);
                }
                if !ready {
                    deferred.insert(id);
                    continue;
                }

                if !base_ids.is_empty() {
                    self.merge_bases(id, &base_ids);
                    collapsed_count += 1;
                }
                done.insert(id);
                progressed = true;
            }

            if !progressed {
                return Err(ResolveError::BaseCycle {
                    classnames: deferred
                        .iter()
                        .filter_map(|id| self.entity(*id))
                        .map(|def| def.classname.clone())
                        .collect(),
                });
            }
            todo = deferred;
        }
        info!(collapsed_count, "fgd_bases_collapsed");
        Ok(())
    }

    fn merge_bases(&mut self, id: EntityId, base_ids: &[EntityId]) {
        let Some(mut known) = self
            .entity(id)
            .map(|def| def.kv_order.iter().cloned().collect::<HashSet<_>>())
        else {
            return;
        };
        let mut introduced = Vec::<String>::new();

        for &base_id in base_ids {
            let Some(base) = self.entity(base_id).cloned() else {
                continue;
            };
            let Some(ent) = self.entity_mut(id) else {
                return;
            };
            let mut names = base.keyvalues.keys().collect::<Vec<_>>();
            names.sort_by_key(|name| {
                base.kv_order
                    .iter()
                    .position(|ordered| ordered == *name)
                    .unwrap_or(usize::MAX)
            });
            for name in names {
                let Some(base_map) = base.keyvalues.get(name) else {
                    continue;
                };
                let ent_map = ent.keyvalues.entry(name.clone()).or_default();
                for (tags, kv) in base_map {
                    match ent_map.get_mut(tags) {
                        None => {
                            ent_map.insert(tags.clone(), kv.clone());
                        }
                        // Only identical tag keys merge their lists.
                        Some(existing) => {
                            if let (Some(target), Some(source)) =
                                (existing.values.as_mut(), kv.values.as_ref())
                            {
                                target.union_with(source);
                            }
                        }
                    }
                }
                if known.insert(name.clone()) {
                    introduced.push(name.clone());
                }
            }
            merge_io(&mut ent.inputs, &base.inputs);
            merge_io(&mut ent.outputs, &base.outputs);
        }

        if let Some(ent) = self.entity_mut(id) {
            introduced.append(&mut ent.kv_order);
            ent.kv_order = introduced;
            ent.bases.clear();
        }
    }

    /// Makes every base object addressable by its own classname.
    ///
    /// A base overwritten by a later entity of the same name is renamed to
    /// `<stem>_<n>` and registered under that name.
    pub(crate) fn fix_missing_bases(&mut self, id: EntityId) -> Result<(), ResolveError> {
        let Some(def) = self.entity(id) else {
            return Ok(());
        };
        let classname = def.classname.clone();
        for base in def.bases.clone() {
            let Base::Resolved(base_id) = base else {
                continue;
            };
            let Some(base_def) = self.entity(base_id) else {
                return Err(ResolveError::DanglingBase { classname });
            };
            let base_classname = base_def.classname.clone();
            let folded = base_classname.to_lowercase();
            match self.by_name.get(&folded) {
                Some(&registered) if registered == base_id => continue,
                None => {
                    self.by_name.insert(folded, base_id);
                }
                Some(_) => {
                    let stem = folded
                        .trim_end_matches(|ch: char| ch == '_' || ch.is_ascii_digit())
                        .to_string();
                    let mut num = 1u32;
                    let new_name = loop {
                        let candidate = format!("{stem}_{num}");
                        if !self.by_name.contains_key(&candidate) {
                            break candidate;
                        }
                        num += 1;
                    };
                    info!(
                        classname = %base_classname,
                        new_classname = %new_name,
                        "fgd_base_renamed"
                    );
                    if let Some(base_def) = self.entity_mut(base_id) {
                        base_def.classname = new_name.clone();
                    }
                    self.by_name.insert(new_name, base_id);
                }
            }
            self.fix_missing_bases(base_id)?;
        }
        Ok(())
    }

    /// Applies [`EntityDef::strip_tags`] to every registered entity.
    pub fn strip_tags(&mut self, query: &TagSet) {
        for id in self.ids().collect::<Vec<_>>() {
            if let Some(def) = self.entity_mut(id) {
                def.strip_tags(query);
            }
        }
    }

    /// Renders the database as FGD text.
    pub fn export(&self) -> String {
        let mut out = String::new();
        if self.map_size_min != self.map_size_max {
            let _ = write!(
                out,
                "@mapsize({}, {})\n\n",
                self.map_size_min, self.map_size_max
            );
        }
        for id in self.ids() {
            if let Some(def) = self.entity(id) {
                def.export(&mut out, &self.base_names(id));
            }
        }
        out
    }
}

fn merge_io(target: &mut AttrMap<IoDef>, source: &AttrMap<IoDef>) {
    for (name, source_map) in source {
        let target_map = target.entry(name.clone()).or_default();
        for (tags, io) in source_map {
            if !target_map.contains_key(tags) {
                target_map.insert(tags.clone(), io.clone());
            }
        }
    }
}

pub(crate) fn with_fgd_suffix(path: &str) -> String {
    if path.to_lowercase().ends_with(".fgd") {
        path.to_string()
    } else {
        format!("{path}.fgd")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFileSystem;
    use crate::keyvalue::ValueList;
    use crate::types::{EntityType, ValueType};

    fn parse(source: &str) -> Fgd {
        let fs = MemoryFileSystem::new().with_file("test.fgd", source);
        Fgd::parse("test", &fs, &ParseOptions::default()).expect("parse")
    }

    fn parse_lazy(source: &str) -> Fgd {
        let fs = MemoryFileSystem::new().with_file("test.fgd", source);
        let options = ParseOptions {
            eval_bases: false,
            ..ParseOptions::default()
        };
        Fgd::parse("test", &fs, &options).expect("parse")
    }

    fn base_list(fgd: &Fgd, classname: &str) -> Vec<Base> {
        fgd.get(classname).expect("entity").bases.clone()
    }

    #[test]
    fn collapse_prepends_inherited_names() {
        let mut fgd = parse(
            r#"
@BaseClass = Base1 [ other(string) : "Other" : "x" ]
@PointClass base(Base1) = my_ent : "desc" [ "field"(integer) : "Field" : "5" ]
"#,
        );
        fgd.apply_bases().expect("apply");
        fgd.collapse_bases().expect("collapse");
        let ent = fgd.get("my_ent").expect("my_ent");
        assert_eq!(ent.kv_order, vec!["other".to_string(), "field".to_string()]);
        assert!(ent.bases.is_empty());
        assert_eq!(ent.keyvalues["other"][&TagSet::new()].default, "x");
        assert_eq!(ent.desc, "desc");
    }

    #[test]
    fn collapse_is_idempotent() {
        let mut fgd = parse(
            r#"
@BaseClass = A [ a(string) : "A" ]
@BaseClass base(A) = B [ b(string) : "B" ]
@PointClass base(B) = c [ c(string) : "C" ]
"#,
        );
        fgd.collapse_bases().expect("first");
        let once = fgd.export();
        fgd.collapse_bases().expect("second");
        assert_eq!(fgd.export(), once);
        assert_eq!(
            fgd.get("c").expect("c").kv_order,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn base_cycle_is_an_error_and_leaves_bases_alone() {
        let mut fgd = parse_lazy(
            r#"
@BaseClass base(B) = A [ ]
@BaseClass base(A) = B [ ]
"#,
        );
        fgd.apply_bases().expect("apply");
        let a_before = base_list(&fgd, "a");
        let b_before = base_list(&fgd, "b");
        let err = fgd.collapse_bases().expect_err("cycle");
        let ResolveError::BaseCycle { mut classnames } = err else {
            panic!("expected cycle, got {err:?}");
        };
        classnames.sort();
        assert_eq!(classnames, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(base_list(&fgd, "a"), a_before);
        assert_eq!(base_list(&fgd, "b"), b_before);
    }

    #[test]
    fn collapse_requires_resolved_bases() {
        let mut fgd = parse_lazy("@PointClass base(Later) = thing [ ]\n@BaseClass = Later [ ]");
        assert!(matches!(
            fgd.collapse_bases(),
            Err(ResolveError::UnresolvedBase { .. })
        ));
        fgd.apply_bases().expect("apply");
        fgd.apply_bases().expect("idempotent");
        fgd.collapse_bases().expect("collapse");
        assert!(fgd.get("thing").expect("thing").bases.is_empty());
    }

    #[test]
    fn collapse_reaches_bases_shadowed_by_a_later_entity() {
        let mut fgd = parse(
            r#"
@BaseClass = prop [ old(string) : "Old" ]
@PointClass base(prop) = user [ ]
@PointClass = prop [ ]
"#,
        );
        fgd.collapse_bases().expect("collapse");
        let user = fgd.get("user").expect("user");
        assert!(user.bases.is_empty());
        assert!(user.keyvalues.contains_key("old"));
    }

    #[test]
    fn foreign_base_handle_is_an_error() {
        let mut fgd = Fgd::new();
        let mut thing = EntityDef::new(EntityType::Point, "thing");
        thing.bases.push(Base::Resolved(EntityId(7)));
        let id = fgd.insert(thing);

        assert!(fgd.base_names(id).is_empty());
        assert!(fgd.iter_bases(id).is_empty());
        assert!(matches!(
            fgd.collapse_bases(),
            Err(ResolveError::DanglingBase { .. })
        ));
        assert!(fgd.to_bytes().is_err());
    }

    #[test]
    fn apply_bases_reports_unknown_base() {
        let mut fgd = parse_lazy("@PointClass base(Missing) = thing [ ]");
        let err = fgd.apply_bases().expect_err("unknown");
        assert_eq!(
            err,
            ResolveError::UnknownBase {
                base: "Missing".to_string(),
                classname: "thing".to_string(),
            }
        );
        assert_eq!(
            base_list(&fgd, "thing"),
            vec![Base::Unresolved("Missing".to_string())]
        );
    }

    #[test]
    fn spawnflags_merge_only_on_matching_tags() {
        let mut fgd = parse(
            r#"
@BaseClass = Flags
[
    spawnflags(flags) =
    [
        1 : "Base one" : 1
        2 : "Base two" : 0
    ]
    spawnflags[hl2](flags) =
    [
        8 : "HL2 only" : 0
    ]
]
@PointClass base(Flags) = thing
[
    spawnflags(flags) =
    [
        1 : "Base one" : 1
        4 : "Own" : 0
    ]
]
"#,
        );
        fgd.collapse_bases().expect("collapse");
        let tag_map = &fgd.get("thing").expect("thing").keyvalues["spawnflags"];
        let Some(ValueList::SpawnFlags(flags)) = &tag_map[&TagSet::new()].values else {
            panic!("expected spawnflags");
        };
        assert_eq!(
            flags.iter().map(|flag| flag.bit).collect::<Vec<_>>(),
            vec![1, 4, 2]
        );
        // The tagged variant was absent on the child, so it is copied whole.
        assert_eq!(tag_map.len(), 2);
        // The base keeps its own list.
        let base = &fgd.get("flags").expect("base").keyvalues["spawnflags"][&TagSet::new()];
        assert_eq!(base.values.as_ref().map(ValueList::len), Some(2));
    }

    #[test]
    fn io_merge_keeps_child_definition() {
        let mut fgd = parse(
            r#"
@BaseClass = Base
[
    input Kill(void) : "Base kill"
    output OnUser1(void)
]
@PointClass base(Base) = thing
[
    input Kill(void) : "Own kill"
]
"#,
        );
        fgd.collapse_bases().expect("collapse");
        let ent = fgd.get("thing").expect("thing");
        assert_eq!(ent.inputs["kill"][&TagSet::new()].desc, "Own kill");
        assert!(ent.outputs.contains_key("onuser1"));
    }

    #[test]
    fn iter_bases_yields_each_ancestor_once() {
        let fgd = parse(
            r#"
@BaseClass = Root [ ]
@BaseClass base(Root) = Left [ ]
@BaseClass base(Root) = Right [ ]
@PointClass base(Left, Right) = thing [ ]
"#,
        );
        let names = fgd
            .iter_bases(fgd.id_of("thing").expect("thing"))
            .into_iter()
            .map(|id| fgd.entity(id).expect("base").classname.clone())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Left", "Root", "Right"]);
    }

    #[test]
    fn overwritten_base_is_renamed_for_addressing() {
        let mut fgd = parse(
            r#"
@BaseClass = prop_2 [ old(string) : "Old" ]
@PointClass base(prop_2) = user [ ]
@PointClass = prop_2 [ new(string) : "New" ]
@PointClass = prop_1 [ ]
"#,
        );
        let user = fgd.id_of("user").expect("user");
        let shadowed = match fgd.entity(user).expect("user").bases[0] {
            Base::Resolved(id) => id,
            Base::Unresolved(_) => panic!("bases should be resolved"),
        };
        assert_ne!(Some(shadowed), fgd.id_of("prop_2"));

        fgd.fix_missing_bases(user).expect("fix bases");

        // prop_1 and prop_2 are taken.
        assert_eq!(fgd.entity(shadowed).expect("shadowed").classname, "prop_3");
        assert_eq!(fgd.id_of("prop_3"), Some(shadowed));
        assert_eq!(fgd.base_names(user), vec!["prop_3".to_string()]);
        assert_eq!(fgd.len(), 4);
    }

    #[test]
    fn renamed_base_gets_first_free_suffix() {
        let mut fgd = Fgd::new();
        let old = fgd.insert(EntityDef::new(EntityType::Base, "Prop_3"));
        let mut user = EntityDef::new(EntityType::Point, "user");
        user.bases.push(Base::Resolved(old));
        let user = fgd.insert(user);
        fgd.insert(EntityDef::new(EntityType::Point, "prop_3"));
        fgd.insert(EntityDef::new(EntityType::Point, "prop_1"));

        fgd.fix_missing_bases(user).expect("fix bases");

        assert_eq!(fgd.entity(old).expect("old").classname, "prop_2");
        assert_eq!(fgd.id_of("prop_2"), Some(old));
        assert_eq!(fgd.get("prop_3").expect("real").entity_type, EntityType::Point);
    }

    #[test]
    fn export_writes_mapsize_only_when_bounds_differ() {
        let mut fgd = parse("@PointClass = thing [ health(integer) : \"Health\" : 3 ]");
        assert!(fgd.export().starts_with("\n@PointClass = thing"));
        fgd.map_size_min = -16384.0;
        fgd.map_size_max = 16384.0;
        assert!(fgd.export().starts_with("@mapsize(-16384, 16384)\n\n\n@PointClass"));
    }

    #[test]
    fn strip_tags_applies_to_every_entity() {
        let mut fgd = parse(
            r#"
@PointClass = a
[
    k[hl2](string) : "K"
    k[!hl2](integer) : "K"
]
@PointClass = b [ k[+portal](string) : "K" ]
"#,
        );
        fgd.strip_tags(&TagSet::query(["hl2"]));
        let a = &fgd.get("a").expect("a").keyvalues["k"];
        assert_eq!(a[&TagSet::new()].value_type, ValueType::String);
        assert!(fgd.get("b").expect("b").keyvalues.is_empty());
    }

    #[test]
    fn exported_text_parses_back_to_the_same_definitions() {
        let original = parse(
            r#"
@mapsize(-1024, 1024)
@BaseClass = Targetname
[
    targetname(target_source) : "Name" : : "Used by other entities"
    input Kill(void) : "Removes this entity"
]
@PointClass base(Targetname) studio("models/a.mdl") size(-8 -8 0, 8 8 16) = prop_thing : "A thing"
[
    health(integer) : "Health" : 10
    health[EP2, !HL2](integer) : "Health" : 20
    color(choices) : "Color" : "0" =
    [
        0 : "Red"
        "blue" : "Blue" [+EP2]
    ]
    spawnflags(flags) =
    [
        1 : "Start on" : 1
        4 : "Silent" : 0
    ]
    output OnBreak(void) : "Fired when broken"
]
"#,
        );
        let fs = MemoryFileSystem::new().with_file("exported.fgd", original.export());
        let reparsed = Fgd::parse("exported", &fs, &ParseOptions::default()).expect("reparse");

        assert_eq!(reparsed.map_size_min, -1024.0);
        assert_eq!(reparsed.map_size_max, 1024.0);
        assert_eq!(reparsed.len(), original.len());
        for (before, after) in original.iter().zip(reparsed.iter()) {
            assert_eq!(before.classname, after.classname);
            assert_eq!(before.entity_type, after.entity_type);
            assert_eq!(before.desc, after.desc);
            assert_eq!(before.helpers, after.helpers);
            assert_eq!(before.keyvalues, after.keyvalues);
            assert_eq!(before.inputs, after.inputs);
            assert_eq!(before.outputs, after.outputs);
        }
        let id = reparsed.id_of("prop_thing").expect("prop_thing");
        assert_eq!(reparsed.base_names(id), vec!["Targetname".to_string()]);
    }
}
