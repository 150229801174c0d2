use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::keyvalue::{IoDef, KeyValue, ValueList};
use crate::tags::{match_tags, TagSet};
use crate::types::{EntityType, HelperType};

/// Handle to an entity stored in an [`crate::Fgd`].
///
/// Only a database hands these out. Lookups with an unknown id find nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A base reference: a classname until `apply_bases` swaps in the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Base {
    Unresolved(String),
    Resolved(EntityId),
}

/// Tag set -> record, for one attribute name.
pub type TagMap<T> = IndexMap<TagSet, T>;
/// Case-folded attribute name -> tagged variants.
pub type AttrMap<T> = IndexMap<String, TagMap<T>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Helper {
    pub kind: HelperType,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    pub entity_type: EntityType,
    pub classname: String,
    pub keyvalues: AttrMap<KeyValue>,
    pub inputs: AttrMap<IoDef>,
    pub outputs: AttrMap<IoDef>,
    /// Export order of keyvalue names; names missing here go last.
    pub kv_order: Vec<String>,
    pub bases: Vec<Base>,
    pub helpers: Vec<Helper>,
    pub desc: String,
}

impl EntityDef {
    pub fn new(entity_type: EntityType, classname: impl Into<String>) -> Self {
        Self {
            entity_type,
            classname: classname.into(),
            keyvalues: AttrMap::new(),
            inputs: AttrMap::new(),
            outputs: AttrMap::new(),
            kv_order: Vec::new(),
            bases: Vec::new(),
            helpers: Vec::new(),
            desc: String::new(),
        }
    }

    /// Adds a keyvalue variant, recording the name's first appearance in `kv_order`.
    pub fn insert_keyvalue(&mut self, tags: TagSet, kv: KeyValue) {
        let folded = kv.name.to_lowercase();
        if !self.keyvalues.contains_key(&folded) {
            self.kv_order.push(folded.clone());
        }
        self.keyvalues.entry(folded).or_default().insert(tags, kv);
    }

    pub fn insert_input(&mut self, tags: TagSet, io: IoDef) {
        let folded = io.name.to_lowercase();
        self.inputs.entry(folded).or_default().insert(tags, io);
    }

    pub fn insert_output(&mut self, tags: TagSet, io: IoDef) {
        let folded = io.name.to_lowercase();
        self.outputs.entry(folded).or_default().insert(tags, io);
    }

    /// Reduces every tag map to the single variant `query` selects, stored untagged.
    ///
    /// Names with no matching variant are removed. Choice and spawnflag lists
    /// are filtered by the same query and their entry tags cleared.
    pub fn strip_tags(&mut self, query: &TagSet) {
        strip_map(&mut self.keyvalues, query, |kv| {
            if let Some(values) = kv.values.as_mut() {
                filter_value_list(values, query);
            }
        });
        strip_map(&mut self.inputs, query, |_| {});
        strip_map(&mut self.outputs, query, |_| {});
    }

    /// Writes the entity as FGD text. `base_names` are the classnames of `bases`.
    pub fn export(&self, out: &mut String, base_names: &[String]) {
        let _ = write!(out, "\n@{} ", self.entity_type.display_keyword());
        if !base_names.is_empty() {
            let _ = write!(out, "base({}) ", base_names.join(", "));
        }

        let mut order_by = Vec::<String>::new();
        for helper in &self.helpers {
            let _ = write!(out, "\n\t{}({}) ", helper.kind.name(), helper.args.join(", "));
            if helper.kind == HelperType::OrderBy {
                order_by.extend(helper.args.iter().map(|arg| arg.to_lowercase()));
            }
        }
        if !self.helpers.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "= {}", self.classname);
        if !self.desc.is_empty() {
            let _ = write!(out, " : \"{}\"", self.desc.replace('\n', "\\n"));
        }
        out.push_str("\n\t[\n");

        let order = if order_by.is_empty() {
            &self.kv_order
        } else {
            &order_by
        };
        let mut names = self.keyvalues.keys().collect::<Vec<_>>();
        names.sort_by_key(|name| {
            order
                .iter()
                .position(|ordered| ordered == *name)
                .unwrap_or(usize::MAX)
        });
        for name in names {
            if let Some(tag_map) = self.keyvalues.get(name) {
                for (tags, kv) in tag_map {
                    kv.export(out, tags);
                }
            }
        }

        if !self.inputs.is_empty() {
            out.push_str("\n\t// Inputs\n");
            for (tags, io) in self.inputs.values().flatten() {
                io.export(out, "input", tags);
            }
        }
        if !self.outputs.is_empty() {
            out.push_str("\n\t// Outputs\n");
            for (tags, io) in self.outputs.values().flatten() {
                io.export(out, "output", tags);
            }
        }
        out.push_str("\t]\n");
    }
}

/// Tag map entries, most specific (largest tag set) first. Ties keep insertion order.
pub(crate) fn by_specificity<T>(tag_map: &TagMap<T>) -> Vec<(&TagSet, &T)> {
    let mut entries = tag_map.iter().collect::<Vec<_>>();
    entries.sort_by_key(|(tags, _)| std::cmp::Reverse(tags.len()));
    entries
}

fn strip_map<T: Clone>(map: &mut AttrMap<T>, query: &TagSet, mut fixup: impl FnMut(&mut T)) {
    let names = map.keys().cloned().collect::<Vec<_>>();
    for name in names {
        let chosen = map.get(&name).and_then(|tag_map| {
            by_specificity(tag_map)
                .into_iter()
                .find(|(tags, _)| match_tags(query, tags))
                .map(|(_, value)| value.clone())
        });
        match chosen {
            Some(mut value) => {
                fixup(&mut value);
                let mut stripped = TagMap::new();
                stripped.insert(TagSet::new(), value);
                map.insert(name, stripped);
            }
            None => {
                map.shift_remove(&name);
            }
        }
    }
}

fn filter_value_list(values: &mut ValueList, query: &TagSet) {
    match values {
        ValueList::Choices(choices) => {
            choices.retain(|choice| match_tags(query, &choice.tags));
            for choice in choices.iter_mut() {
                choice.tags = TagSet::new();
            }
        }
        ValueList::SpawnFlags(flags) => {
            flags.retain(|flag| match_tags(query, &flag.tags));
            for flag in flags.iter_mut() {
                flag.tags = TagSet::new();
            }
        }
    }
}
