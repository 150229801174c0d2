use std::fmt::Write as _;

use crate::tags::TagSet;
use crate::types::ValueType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub name: String,
    pub tags: TagSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnFlag {
    /// Always a power of two.
    pub bit: u64,
    pub name: String,
    pub default: bool,
    pub tags: TagSet,
}

/// The `[ ... ]` list attached to choices and spawnflags keyvalues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueList {
    Choices(Vec<Choice>),
    SpawnFlags(Vec<SpawnFlag>),
}

impl ValueList {
    pub fn len(&self) -> usize {
        match self {
            Self::Choices(choices) => choices.len(),
            Self::SpawnFlags(flags) => flags.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends entries of `other` not already present. Lists of different kinds are left alone.
    pub fn union_with(&mut self, other: &ValueList) {
        match (self, other) {
            (Self::Choices(target), Self::Choices(source)) => {
                for choice in source {
                    if !target.contains(choice) {
                        target.push(choice.clone());
                    }
                }
            }
            (Self::SpawnFlags(target), Self::SpawnFlags(source)) => {
                for flag in source {
                    if !target.contains(flag) {
                        target.push(flag.clone());
                    }
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub name: String,
    pub value_type: ValueType,
    pub disp_name: String,
    /// Kept as text for numeric types too.
    pub default: String,
    pub desc: String,
    pub values: Option<ValueList>,
    pub readonly: bool,
}

impl KeyValue {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            disp_name: name.clone(),
            name,
            value_type,
            default: String::new(),
            desc: String::new(),
            values: None,
            readonly: false,
        }
    }

    pub fn export(&self, out: &mut String, tags: &TagSet) {
        let _ = write!(out, "\t{}", self.name);
        if !tags.is_empty() {
            let _ = write!(out, "[{tags}]");
        }
        let _ = write!(out, "({}) ", self.value_type.name());
        if self.readonly {
            out.push_str("readonly ");
        }
        let _ = write!(out, ": \"{}\"", self.disp_name);

        let desc = escape_newlines(&self.desc);
        if !self.default.is_empty() {
            if self.value_type.is_literal() {
                let _ = write!(out, " : {}", self.default);
            } else {
                let _ = write!(out, " : \"{}\"", self.default);
            }
            if !desc.is_empty() {
                let _ = write!(out, " : \"{desc}\"");
            }
        } else if !desc.is_empty() {
            let _ = write!(out, " : : \"{desc}\"");
        }

        if self.value_type.has_list() {
            out.push_str(" =\n\t\t[\n");
            match &self.values {
                Some(ValueList::SpawnFlags(flags)) => {
                    for flag in flags {
                        let _ = write!(
                            out,
                            "\t\t{}: \"{}\" : {}",
                            flag.bit,
                            flag.name,
                            u8::from(flag.default)
                        );
                        write_entry_tags(out, &flag.tags);
                    }
                }
                Some(ValueList::Choices(choices)) => {
                    for choice in choices {
                        // Numbers may stay bare, anything else is quoted.
                        if choice.value.trim().parse::<f64>().is_ok() {
                            let _ = write!(out, "\t\t{}: \"{}\"", choice.value, choice.name);
                        } else {
                            let _ = write!(out, "\t\t\"{}\": \"{}\"", choice.value, choice.name);
                        }
                        write_entry_tags(out, &choice.tags);
                    }
                }
                None => {}
            }
            out.push_str("\t\t]\n");
        }
        out.push('\n');
    }
}

fn write_entry_tags(out: &mut String, tags: &TagSet) {
    if tags.is_empty() {
        out.push('\n');
    } else {
        let _ = writeln!(out, " [{tags}]");
    }
}

fn escape_newlines(text: &str) -> String {
    text.replace('\n', "\\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoDef {
    pub name: String,
    pub value_type: ValueType,
    pub desc: String,
}

impl IoDef {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            desc: String::new(),
        }
    }

    /// `io_kind` is `input` or `output`.
    pub fn export(&self, out: &mut String, io_kind: &str, tags: &TagSet) {
        let _ = write!(out, "\t{io_kind} {}", self.name);
        if !tags.is_empty() {
            let _ = write!(out, "[{tags}]");
        }
        let _ = write!(out, "({})", self.value_type.name());
        if self.desc.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, " : \"{}\"", escape_newlines(&self.desc));
        }
    }
}
