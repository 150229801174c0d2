//! Compact binary form of an [`Fgd`], for caching a parsed database.
//!
//! Layout (multi-byte fields big-endian):
//!
//! ```text
//! "FGD" version:u8 map_min:f64 map_max:f64 entity_count:u32
//! dict_count:u32 (len:u16 utf8)*
//! entity*
//! ```
//!
//! Every string is written as a u16 index into the dictionary. Descriptions,
//! helpers and the tags on choice/spawnflag entries are not stored.

mod string_dict;

use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::info;

use crate::database::Fgd;
use crate::entity::{AttrMap, Base, EntityDef, EntityId};
use crate::keyvalue::{Choice, IoDef, KeyValue, SpawnFlag, ValueList};
use crate::tags::TagSet;
use crate::types::{EntityType, ValueType};

pub use string_dict::MAX_STRINGS;
use string_dict::{StringDict, StringTable};

const MAGIC: &[u8; 3] = b"FGD";
pub const BINARY_FORMAT_VERSION: u8 = 2;

const READONLY_FLAG: u8 = 0x80;
const SPAWNFLAG_DEFAULT: u8 = 0x80;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("binary FGD I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("not a binary FGD (bad magic)")]
    BadMagic,
    #[error("unsupported binary FGD version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },
    #[error("more than {max} distinct strings in binary FGD")]
    DictionaryOverflow { max: usize },
    #[error("binary FGD has invalid format: {message}")]
    InvalidFormat { message: String },
}

impl Fgd {
    /// Writes the binary form. Shadowed base entities are renamed first so
    /// every base is addressable by classname.
    pub fn serialize<W: Write>(&mut self, writer: &mut W) -> Result<(), CodecError> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        for id in self.ids().collect::<Vec<_>>() {
            self.fix_missing_bases(id)
                .map_err(|err| invalid_format(err.to_string()))?;
        }

        let mut dict = StringDict::default();
        let mut entity_data = Vec::<u8>::new();
        for id in self.ids() {
            encode_entity(self, id, &mut dict, &mut entity_data)?;
        }

        let entity_count = u32::try_from(self.len())
            .map_err(|_| invalid_format("too many entities for u32 count"))?;
        let mut bytes = Vec::<u8>::with_capacity(32 + entity_data.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(BINARY_FORMAT_VERSION);
        bytes.extend_from_slice(&self.map_size_min.to_be_bytes());
        bytes.extend_from_slice(&self.map_size_max.to_be_bytes());
        bytes.extend_from_slice(&entity_count.to_be_bytes());
        dict.encode(&mut bytes);
        bytes.extend_from_slice(&entity_data);

        info!(
            entity_count,
            string_count = dict.len(),
            byte_len = bytes.len(),
            "fgd_serialized"
        );
        Ok(bytes)
    }

    /// Reads the binary form. Bases come back resolved; descriptions are empty.
    pub fn unserialize<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.get(..MAGIC.len()) != Some(MAGIC.as_slice()) {
            return Err(CodecError::BadMagic);
        }
        let mut cursor = MAGIC.len();
        let version = read_u8(bytes, &mut cursor)?;
        if version != BINARY_FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion {
                found: version,
                expected: BINARY_FORMAT_VERSION,
            });
        }

        let mut fgd = Fgd::new();
        fgd.map_size_min = read_f64(bytes, &mut cursor)?;
        fgd.map_size_max = read_f64(bytes, &mut cursor)?;
        let entity_count = read_u32(bytes, &mut cursor)?;
        let table = StringTable::decode(bytes, &mut cursor)?;
        for _ in 0..entity_count {
            let def = decode_entity(bytes, &mut cursor, &table)?;
            fgd.insert(def);
        }
        if cursor != bytes.len() {
            return Err(invalid_format("unexpected trailing bytes"));
        }

        fgd.apply_bases()
            .map_err(|err| invalid_format(err.to_string()))?;
        Ok(fgd)
    }
}

type Encoder<T> = fn(&T, &mut StringDict, &mut Vec<u8>) -> Result<(), CodecError>;
type Decoder<T> = fn(&[u8], &mut usize, &StringTable) -> Result<T, CodecError>;

fn encode_entity(
    fgd: &Fgd,
    id: EntityId,
    dict: &mut StringDict,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let Some(def) = fgd.entity(id) else {
        return Err(invalid_format(format!("no entity with id {}", id.0)));
    };
    let base_names = fgd.base_names(id);

    out.push(def.entity_type.ordinal());
    out.push(count_u8(base_names.len(), "bases")?);
    out.push(count_u8(block_count(&def.keyvalues), "keyvalues")?);
    out.push(count_u8(block_count(&def.inputs), "inputs")?);
    out.push(count_u8(block_count(&def.outputs), "outputs")?);
    dict.write_ref(out, &def.classname)?;
    for base in &base_names {
        dict.write_ref(out, base)?;
    }

    encode_blocks(&def.keyvalues, dict, out, encode_keyvalue)?;
    encode_blocks(&def.inputs, dict, out, encode_io)?;
    encode_blocks(&def.outputs, dict, out, encode_io)?;
    Ok(())
}

fn block_count<T>(map: &AttrMap<T>) -> usize {
    map.values().filter(|tag_map| !tag_map.is_empty()).count()
}

fn encode_blocks<T>(
    map: &AttrMap<T>,
    dict: &mut StringDict,
    out: &mut Vec<u8>,
    encode: Encoder<T>,
) -> Result<(), CodecError> {
    for tag_map in map.values().filter(|tag_map| !tag_map.is_empty()) {
        // A lone untagged value is written with a zero tag count.
        if let [(tags, value)] = tag_map.iter().collect::<Vec<_>>().as_slice() {
            if tags.is_empty() {
                out.push(0);
                encode(value, dict, out)?;
                continue;
            }
        }
        out.push(count_u8(tag_map.len(), "tagged variants")?);
        for (tags, value) in tag_map {
            out.push(count_u8(tags.len(), "tags")?);
            for tag in tags.iter() {
                dict.write_ref(out, tag)?;
            }
            encode(value, dict, out)?;
        }
    }
    Ok(())
}

fn encode_keyvalue(
    kv: &KeyValue,
    dict: &mut StringDict,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    dict.write_ref(out, &kv.name)?;
    dict.write_ref(out, &kv.disp_name)?;
    let mut type_byte = kv.value_type.ordinal();
    if kv.readonly {
        type_byte |= READONLY_FLAG;
    }
    out.push(type_byte);

    match kv.value_type {
        ValueType::SpawnFlags => {
            let flags = match &kv.values {
                Some(ValueList::SpawnFlags(flags)) => flags.as_slice(),
                _ => &[],
            };
            out.push(count_u8(flags.len(), "spawnflags")?);
            for flag in flags {
                if !flag.bit.is_power_of_two() {
                    return Err(invalid_format(format!(
                        "spawnflag {} is not a power of two",
                        flag.bit
                    )));
                }
                let mut byte = flag.bit.trailing_zeros() as u8;
                if flag.default {
                    byte |= SPAWNFLAG_DEFAULT;
                }
                out.push(byte);
                dict.write_ref(out, &flag.name)?;
            }
        }
        value_type => {
            dict.write_ref(out, &kv.default)?;
            if value_type == ValueType::Choices {
                let choices = match &kv.values {
                    Some(ValueList::Choices(choices)) => choices.as_slice(),
                    _ => &[],
                };
                let count = u16::try_from(choices.len())
                    .map_err(|_| invalid_format("too many choices for u16 count"))?;
                out.extend_from_slice(&count.to_be_bytes());
                for choice in choices {
                    dict.write_ref(out, &choice.value)?;
                    dict.write_ref(out, &choice.name)?;
                }
            }
        }
    }
    Ok(())
}

fn encode_io(io: &IoDef, dict: &mut StringDict, out: &mut Vec<u8>) -> Result<(), CodecError> {
    dict.write_ref(out, &io.name)?;
    out.push(io.value_type.ordinal());
    Ok(())
}

fn decode_entity(
    bytes: &[u8],
    cursor: &mut usize,
    table: &StringTable,
) -> Result<EntityDef, CodecError> {
    let type_ordinal = read_u8(bytes, cursor)?;
    let entity_type = EntityType::from_ordinal(type_ordinal)
        .ok_or_else(|| invalid_format(format!("unknown entity type ordinal {type_ordinal}")))?;
    let base_count = read_u8(bytes, cursor)?;
    let kv_count = read_u8(bytes, cursor)?;
    let input_count = read_u8(bytes, cursor)?;
    let output_count = read_u8(bytes, cursor)?;

    let mut def = EntityDef::new(entity_type, table.read_ref(bytes, cursor)?);
    for _ in 0..base_count {
        def.bases.push(Base::Unresolved(table.read_ref(bytes, cursor)?));
    }

    for (tags, kv) in decode_blocks(bytes, cursor, table, kv_count, decode_keyvalue)? {
        def.insert_keyvalue(tags, kv);
    }
    for (tags, io) in decode_blocks(bytes, cursor, table, input_count, decode_io)? {
        def.insert_input(tags, io);
    }
    for (tags, io) in decode_blocks(bytes, cursor, table, output_count, decode_io)? {
        def.insert_output(tags, io);
    }
    Ok(def)
}

fn decode_blocks<T>(
    bytes: &[u8],
    cursor: &mut usize,
    table: &StringTable,
    block_count: u8,
    decode: Decoder<T>,
) -> Result<Vec<(TagSet, T)>, CodecError> {
    let mut values = Vec::new();
    for _ in 0..block_count {
        let variant_count = read_u8(bytes, cursor)?;
        if variant_count == 0 {
            values.push((TagSet::new(), decode(bytes, cursor, table)?));
            continue;
        }
        for _ in 0..variant_count {
            let tag_count = read_u8(bytes, cursor)?;
            let mut tags = TagSet::new();
            for _ in 0..tag_count {
                tags.insert_raw(table.read_ref(bytes, cursor)?);
            }
            values.push((tags, decode(bytes, cursor, table)?));
        }
    }
    Ok(values)
}

fn decode_keyvalue(
    bytes: &[u8],
    cursor: &mut usize,
    table: &StringTable,
) -> Result<KeyValue, CodecError> {
    let name = table.read_ref(bytes, cursor)?;
    let disp_name = table.read_ref(bytes, cursor)?;
    let type_byte = read_u8(bytes, cursor)?;
    let value_type = value_type_from(type_byte & !READONLY_FLAG)?;

    let mut kv = KeyValue::new(name, value_type);
    kv.disp_name = disp_name;
    kv.readonly = type_byte & READONLY_FLAG != 0;

    match value_type {
        ValueType::SpawnFlags => {
            let count = read_u8(bytes, cursor)?;
            let mut flags = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let byte = read_u8(bytes, cursor)?;
                let power = byte & !SPAWNFLAG_DEFAULT;
                if power >= 64 {
                    return Err(invalid_format(format!("spawnflag power {power} out of range")));
                }
                flags.push(SpawnFlag {
                    bit: 1u64 << power,
                    name: table.read_ref(bytes, cursor)?,
                    default: byte & SPAWNFLAG_DEFAULT != 0,
                    tags: TagSet::new(),
                });
            }
            kv.values = Some(ValueList::SpawnFlags(flags));
        }
        ValueType::Choices => {
            kv.default = table.read_ref(bytes, cursor)?;
            let count = read_u16(bytes, cursor)?;
            let mut choices = Vec::with_capacity(count as usize);
            for _ in 0..count {
                choices.push(Choice {
                    value: table.read_ref(bytes, cursor)?,
                    name: table.read_ref(bytes, cursor)?,
                    tags: TagSet::new(),
                });
            }
            kv.values = Some(ValueList::Choices(choices));
        }
        _ => kv.default = table.read_ref(bytes, cursor)?,
    }
    Ok(kv)
}

fn decode_io(bytes: &[u8], cursor: &mut usize, table: &StringTable) -> Result<IoDef, CodecError> {
    let name = table.read_ref(bytes, cursor)?;
    let value_type = value_type_from(read_u8(bytes, cursor)?)?;
    Ok(IoDef::new(name, value_type))
}

fn value_type_from(ordinal: u8) -> Result<ValueType, CodecError> {
    ValueType::from_ordinal(ordinal)
        .ok_or_else(|| invalid_format(format!("unknown value type ordinal {ordinal}")))
}

fn count_u8(count: usize, what: &str) -> Result<u8, CodecError> {
    u8::try_from(count).map_err(|_| invalid_format(format!("{count} {what} do not fit a u8 count")))
}

pub(crate) fn read_exact<'a>(
    bytes: &'a [u8],
    cursor: &mut usize,
    len: usize,
) -> Result<&'a [u8], CodecError> {
    let end = cursor.saturating_add(len);
    if end > bytes.len() {
        return Err(invalid_format("unexpected end of file"));
    }
    let out = &bytes[*cursor..end];
    *cursor = end;
    Ok(out)
}

fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8, CodecError> {
    read_exact(bytes, cursor, 1)?
        .first()
        .copied()
        .ok_or_else(|| invalid_format("invalid u8 encoding"))
}

pub(crate) fn read_u16(bytes: &[u8], cursor: &mut usize) -> Result<u16, CodecError> {
    Ok(u16::from_be_bytes(
        read_exact(bytes, cursor, 2)?
            .try_into()
            .map_err(|_| invalid_format("invalid u16 encoding"))?,
    ))
}

pub(crate) fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, CodecError> {
    Ok(u32::from_be_bytes(
        read_exact(bytes, cursor, 4)?
            .try_into()
            .map_err(|_| invalid_format("invalid u32 encoding"))?,
    ))
}

fn read_f64(bytes: &[u8], cursor: &mut usize) -> Result<f64, CodecError> {
    Ok(f64::from_be_bytes(
        read_exact(bytes, cursor, 8)?
            .try_into()
            .map_err(|_| invalid_format("invalid f64 encoding"))?,
    ))
}

pub(crate) fn invalid_format(message: impl Into<String>) -> CodecError {
    CodecError::InvalidFormat {
        message: message.into(),
    }
}
