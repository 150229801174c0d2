//! FGD grammar: top-level directives, entity headers and entity bodies.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::database::{with_fgd_suffix, Fgd};
use crate::entity::{Base, EntityDef, Helper};
use crate::error::{ParseError, ParseErrorCode};
use crate::filesystem::{FileSystem, SourceFile};
use crate::keyvalue::{Choice, IoDef, KeyValue, SpawnFlag, ValueList};
use crate::lexer::{Token, Tokenizer};
use crate::tags::{validate_tags, TagSet};
use crate::types::{EntityType, HelperType, ValueType};

/// Text encoding of FGD sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    /// cp1252, with a UTF-8 byte order mark taking precedence.
    #[default]
    Windows1252,
}

impl SourceEncoding {
    fn decode(self, bytes: &[u8], path: &Path) -> Result<String, ParseError> {
        match self {
            Self::Windows1252 => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()),
            Self::Utf8 => encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(
                    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes),
                )
                .map(|text| text.into_owned())
                .ok_or_else(|| ParseError {
                    code: ParseErrorCode::ReadFile,
                    message: "file is not valid UTF-8".to_string(),
                    file_path: path.to_path_buf(),
                    location: None,
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Resolve `base(...)` names while parsing. Bases must then be defined first.
    pub eval_bases: bool,
    pub encoding: SourceEncoding,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            eval_bases: true,
            encoding: SourceEncoding::default(),
        }
    }
}

impl Fgd {
    /// Parses one file into this database, recursing into `@include`s.
    ///
    /// Files already parsed (by identity) are skipped, which breaks include cycles.
    pub fn parse_file(
        &mut self,
        fs: &dyn FileSystem,
        file: SourceFile,
        options: &ParseOptions,
    ) -> Result<(), ParseError> {
        if !self.parse_list.insert(file.identity.clone()) {
            debug!(file = %file.identity, "fgd_include_skipped");
            return Ok(());
        }

        let path = PathBuf::from(&file.identity);
        let text = options.encoding.decode(&file.bytes, &path)?;
        let mut tok = Tokenizer::new(&text, &path);
        let mut entity_count = 0usize;
        loop {
            let word = match tok.next_token()?.0 {
                Token::Newline => continue,
                Token::Eof => break,
                Token::String(word) => word,
                other => return Err(tok.unexpected(&other, "a keyword")),
            };
            let keyword = word.to_lowercase();
            match keyword.as_str() {
                "@include" => {
                    let include = with_fgd_suffix(&tok.expect_string()?);
                    let included = fs.open(&include).map_err(|source| {
                        tok.error(
                            ParseErrorCode::IncludeNotFound,
                            format!("cannot include \"{include}\": {source}"),
                        )
                    })?;
                    self.parse_file(fs, included, options)?;
                }
                "@mapsize" => self.parse_map_size(&mut tok)?,
                _ => {
                    let Some(type_keyword) = keyword.strip_prefix('@') else {
                        return Err(tok.error(
                            ParseErrorCode::BadKeyword,
                            format!("bad keyword \"{word}\""),
                        ));
                    };
                    let entity_type = EntityType::from_keyword(type_keyword).ok_or_else(|| {
                        tok.error(
                            ParseErrorCode::UnknownEntityType,
                            format!("unknown entity type \"{type_keyword}\""),
                        )
                    })?;
                    parse_entity(self, &mut tok, entity_type, options.eval_bases)?;
                    entity_count += 1;
                }
            }
        }

        info!(file = %file.identity, entity_count, "fgd_file_parsed");
        Ok(())
    }

    fn parse_map_size(&mut self, tok: &mut Tokenizer<'_>) -> Result<(), ParseError> {
        let args = tok.expect_paren_args()?;
        let bounds = args
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>();
        match bounds.as_deref() {
            Ok([min, max]) => {
                self.map_size_min = *min;
                self.map_size_max = *max;
                Ok(())
            }
            _ => Err(tok.error(
                ParseErrorCode::InvalidMapSize,
                format!("invalid @mapsize ({args})"),
            )),
        }
    }
}

fn parse_entity(
    fgd: &mut Fgd,
    tok: &mut Tokenizer<'_>,
    entity_type: EntityType,
    eval_bases: bool,
) -> Result<(), ParseError> {
    let mut def = EntityDef::new(entity_type, String::new());
    parse_header(fgd, tok, &mut def, eval_bases)?;
    def.classname = tok.expect_string()?.trim().to_string();
    def.desc = parse_entity_desc(tok)?;

    // A body error aborts the whole parse, so registering afterwards is
    // equivalent to registering as soon as the classname is known.
    parse_body(tok, &mut def)?;
    fgd.insert(def);
    Ok(())
}

fn parse_header(
    fgd: &Fgd,
    tok: &mut Tokenizer<'_>,
    def: &mut EntityDef,
    eval_bases: bool,
) -> Result<(), ParseError> {
    let mut pending: Option<HelperType> = None;
    loop {
        match tok.next_token()?.0 {
            Token::Newline => {}
            Token::String(name) => {
                if let Some(kind) = pending.take() {
                    push_helper(def, kind, Vec::new());
                }
                pending = Some(HelperType::from_name(&name).ok_or_else(|| {
                    tok.error(
                        ParseErrorCode::UnknownHelper,
                        format!("unknown helper \"{name}\""),
                    )
                })?);
            }
            Token::ParenArgs(raw) => {
                let Some(kind) = pending.take() else {
                    return Err(tok.error(
                        ParseErrorCode::UnexpectedToken,
                        format!("arguments ({raw}) without a helper name"),
                    ));
                };
                let args = split_args(&raw);
                if kind != HelperType::Inherit {
                    push_helper(def, kind, args);
                    continue;
                }
                for name in args {
                    let base = if eval_bases {
                        let base_id = fgd.id_of(&name).ok_or_else(|| {
                            tok.error(
                                ParseErrorCode::UnknownBase,
                                format!("unknown base \"{name}\""),
                            )
                        })?;
                        Base::Resolved(base_id)
                    } else {
                        Base::Unresolved(name)
                    };
                    if !def.bases.contains(&base) {
                        def.bases.push(base);
                    }
                }
            }
            Token::Equals => break,
            other => return Err(tok.unexpected(&other, "a helper or '='")),
        }
    }
    if let Some(kind) = pending {
        push_helper(def, kind, Vec::new());
    }
    Ok(())
}

fn push_helper(def: &mut EntityDef, kind: HelperType, args: Vec<String>) {
    // A bare `base` names nothing.
    if kind != HelperType::Inherit {
        def.helpers.push(Helper { kind, args });
    }
}

fn split_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|arg| arg.trim().to_string()).collect()
}

/// Reads the optional `: "desc" + "more"` up to and including the body's `[`.
fn parse_entity_desc(tok: &mut Tokenizer<'_>) -> Result<String, ParseError> {
    let mut desc: Option<Vec<String>> = None;
    loop {
        match tok.next_token()?.0 {
            Token::Newline => {}
            Token::Colon => {
                if desc.is_some() {
                    return Err(tok.error(
                        ParseErrorCode::UnexpectedToken,
                        "two colons in entity description",
                    ));
                }
                desc = Some(Vec::new());
            }
            Token::String(text) => match desc.as_mut() {
                Some(parts) if parts.is_empty() => parts.push(text),
                _ => return Err(tok.unexpected(&Token::String(text), "':' or '['")),
            },
            Token::Plus => match desc.as_mut() {
                Some(parts) if !parts.is_empty() => parts.push(tok.expect_string()?),
                _ => {
                    return Err(tok.error(
                        ParseErrorCode::UnexpectedToken,
                        "'+' without a string before it",
                    ))
                }
            },
            Token::BrackOpen => return Ok(desc.map(|parts| parts.concat()).unwrap_or_default()),
            other => return Err(tok.unexpected(&other, "':' or '['")),
        }
    }
}

fn parse_body(tok: &mut Tokenizer<'_>, def: &mut EntityDef) -> Result<(), ParseError> {
    loop {
        let word = match tok.next_token()?.0 {
            Token::BrackClose => return Ok(()),
            Token::Newline => continue,
            Token::String(word) => word,
            other => return Err(tok.unexpected(&other, "a keyvalue, input, output or ']'")),
        };
        let closed = match word.to_lowercase().as_str() {
            "input" => parse_io(tok, def, true)?,
            "output" => parse_io(tok, def, false)?,
            _ => parse_keyvalue(tok, def, word)?,
        };
        if closed {
            return Ok(());
        }
    }
}

/// Returns true if the line ended with the entity's closing `]`.
fn parse_io(tok: &mut Tokenizer<'_>, def: &mut EntityDef, is_input: bool) -> Result<bool, ParseError> {
    let name = tok.expect_string()?;
    let (tags, value_type) = read_type(tok)?;
    if value_type.has_list() {
        return Err(tok.error(
            ParseErrorCode::InvalidIoType,
            format!("\"{value_type}\" is not valid for an input or output"),
        ));
    }

    let (attrs, end) = read_colon_list(tok, false)?;
    match end {
        Token::Newline | Token::BrackClose => {}
        other => return Err(tok.unexpected(&other, "end of line")),
    }
    if attrs.len() > 1 {
        return Err(tok.error(
            ParseErrorCode::TooManyAttributes,
            format!("too many values for IO definition \"{name}\""),
        ));
    }

    let mut io = IoDef::new(name, value_type);
    io.desc = attrs.into_iter().next().unwrap_or_default();
    if is_input {
        def.insert_input(tags, io);
    } else {
        def.insert_output(tags, io);
    }
    Ok(end == Token::BrackClose)
}

/// Returns true if the line ended with the entity's closing `]`.
fn parse_keyvalue(
    tok: &mut Tokenizer<'_>,
    def: &mut EntityDef,
    name: String,
) -> Result<bool, ParseError> {
    let (tags, value_type) = read_type(tok)?;

    let mut readonly = false;
    let (attrs, end) = match tok.next_token()?.0 {
        // `readonly`, or a flag such as `report` that only the editor cares about.
        Token::String(flag) => {
            readonly = flag.eq_ignore_ascii_case("readonly");
            read_colon_list(tok, false)?
        }
        Token::Colon => read_colon_list(tok, true)?,
        token @ (Token::Equals | Token::Newline | Token::BrackClose) => (Vec::new(), token),
        other => return Err(tok.unexpected(&other, "':' or '='")),
    };
    if attrs.len() > 3 {
        return Err(tok.error(
            ParseErrorCode::TooManyAttributes,
            format!("too many attributes for keyvalue \"{name}\""),
        ));
    }

    let mut kv = KeyValue::new(name, value_type);
    kv.readonly = readonly;
    let mut attrs = attrs.into_iter();
    if let Some(disp_name) = attrs.next() {
        kv.disp_name = disp_name;
    }
    kv.default = attrs.next().unwrap_or_default();
    kv.desc = attrs.next().unwrap_or_default();

    let mut closed = false;
    match end {
        Token::Equals if value_type.has_list() => {
            kv.values = Some(read_value_list(tok, value_type)?);
        }
        _ if value_type.has_list() => {
            return Err(tok.error(
                ParseErrorCode::MissingList,
                format!("\"{value_type}\" keyvalue \"{}\" needs a '=' list", kv.name),
            ));
        }
        Token::Equals => {
            return Err(tok.error(
                ParseErrorCode::ListOnNonListType,
                format!("\"{value_type}\" keyvalues cannot have lists"),
            ));
        }
        Token::Newline => {}
        Token::BrackClose => closed = true,
        other => return Err(tok.unexpected(&other, "end of line")),
    }

    def.insert_keyvalue(tags, kv);
    Ok(closed)
}

/// `[tags](type)` after a keyvalue or IO name.
fn read_type(tok: &mut Tokenizer<'_>) -> Result<(TagSet, ValueType), ParseError> {
    let mut token = tok.next_token()?.0;
    let tags = if token == Token::BrackOpen {
        let tags = read_tags(tok)?;
        token = tok.next_token()?.0;
        tags
    } else {
        TagSet::new()
    };
    let raw = match token {
        Token::ParenArgs(raw) => raw,
        other => return Err(tok.unexpected(&other, "a parenthesised value type")),
    };
    let name = raw.trim();
    let value_type = ValueType::from_name(name).ok_or_else(|| {
        tok.error(
            ParseErrorCode::UnknownValueType,
            format!("unknown value type \"{name}\""),
        )
    })?;
    Ok((tags, value_type))
}

/// Tag list after an opening `[`, through the closing `]`.
fn read_tags(tok: &mut Tokenizer<'_>) -> Result<TagSet, ParseError> {
    let mut raw = Vec::<String>::new();
    // `+` lexes on its own, so it is glued onto the following tag.
    let mut plus = false;
    loop {
        match tok.next_token()?.0 {
            Token::Plus => plus = true,
            Token::String(words) => raw.extend(
                if std::mem::take(&mut plus) {
                    format!("+{words}")
                } else {
                    words
                }
                .to_lowercase()
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string),
            ),
            Token::BrackClose => break,
            Token::Eof => {
                return Err(tok.error(ParseErrorCode::UnexpectedEof, "unclosed tag list"));
            }
            other => return Err(tok.unexpected(&other, "a tag or ']'")),
        }
    }
    validate_tags(&raw).map_err(|err| tok.error(ParseErrorCode::InvalidTags, err.to_string()))
}

/// Colon-separated strings up to the end of the line; returns them with the
/// token that ended the list. `: :` yields an empty string.
fn read_colon_list(
    tok: &mut Tokenizer<'_>,
    had_colon: bool,
) -> Result<(Vec<String>, Token), ParseError> {
    let mut strings = Vec::<String>::new();
    let mut ready_for_string = had_colon;
    loop {
        match tok.next_token()?.0 {
            Token::String(text) => {
                if !ready_for_string {
                    return Err(tok.error(
                        ParseErrorCode::UnexpectedToken,
                        format!("unexpected string {text:?}, expected ':'"),
                    ));
                }
                strings.push(text);
                ready_for_string = false;
            }
            Token::Colon => {
                if ready_for_string {
                    strings.push(String::new());
                }
                ready_for_string = true;
            }
            Token::Plus => {
                if ready_for_string || strings.is_empty() {
                    return Err(tok.error(
                        ParseErrorCode::UnexpectedToken,
                        "'+' without a string before it",
                    ));
                }
                let more = tok.expect_string()?;
                if let Some(last) = strings.last_mut() {
                    last.push_str(&more);
                }
            }
            Token::Newline if ready_for_string => {}
            Token::Eof => return Err(tok.unexpected(&Token::Eof, "end of line")),
            other => {
                if ready_for_string {
                    return Err(tok.unexpected(&other, "a string"));
                }
                return Ok((strings, other));
            }
        }
    }
}

/// Entries of a choices or spawnflags list, after the `=`.
fn read_value_list(tok: &mut Tokenizer<'_>, value_type: ValueType) -> Result<ValueList, ParseError> {
    tok.expect_brack_open()?;
    let is_spawnflags = value_type == ValueType::SpawnFlags;
    let mut choices = Vec::<Choice>::new();
    let mut flags = Vec::<SpawnFlag>::new();
    loop {
        let value = match tok.next_token()?.0 {
            Token::Newline => continue,
            Token::BrackClose => break,
            Token::String(value) => value,
            Token::Eof => return Err(tok.unexpected(&Token::Eof, "a list entry or ']'")),
            other => return Err(tok.unexpected(&other, "a list entry or ']'")),
        };

        let (vals, end) = read_colon_list(tok, false)?;
        let tags = match &end {
            Token::BrackOpen => read_tags(tok)?,
            Token::Newline | Token::BrackClose => TagSet::new(),
            other => return Err(tok.unexpected(other, "end of list entry")),
        };
        if vals.len() > 2 || (!is_spawnflags && vals.len() > 1) {
            return Err(tok.error(
                ParseErrorCode::TooManyAttributes,
                format!("too many values for list entry \"{value}\""),
            ));
        }
        let mut vals = vals.into_iter();
        let Some(name) = vals.next() else {
            return Err(tok.error(
                ParseErrorCode::UnexpectedToken,
                format!("list entry \"{value}\" has no name"),
            ));
        };

        if is_spawnflags {
            let bit = parse_spawnflag_bit(tok, &value)?;
            let default = vals.next().map_or(true, |raw| raw.trim() == "1");
            flags.push(SpawnFlag {
                bit,
                name,
                default,
                tags,
            });
        } else {
            choices.push(Choice { value, name, tags });
        }

        // `]` right after an entry also closes the list.
        if end == Token::BrackClose {
            break;
        }
    }
    Ok(if is_spawnflags {
        ValueList::SpawnFlags(flags)
    } else {
        ValueList::Choices(choices)
    })
}

fn parse_spawnflag_bit(tok: &Tokenizer<'_>, raw: &str) -> Result<u64, ParseError> {
    match raw.trim().parse::<u64>() {
        Ok(bit) if bit.is_power_of_two() => Ok(bit),
        _ => Err(tok.error(
            ParseErrorCode::InvalidSpawnFlag,
            format!("spawnflags must be powers of two, not \"{raw}\""),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFileSystem;

    fn parse_with(source: &str, options: ParseOptions) -> Result<Fgd, ParseError> {
        let fs = MemoryFileSystem::new().with_file("test.fgd", source);
        Fgd::parse("test.fgd", &fs, &options)
    }

    fn parse(source: &str) -> Fgd {
        parse_with(source, ParseOptions::default()).expect("parse")
    }

    fn parse_err(source: &str) -> ParseError {
        parse_with(source, ParseOptions::default()).expect_err("parse error")
    }

    fn untagged<T>(map: &crate::entity::TagMap<T>) -> &T {
        &map[&TagSet::new()]
    }

    #[test]
    fn parses_header_helpers_and_description() {
        let fgd = parse(
            r#"
@mapsize(-16384, 16384)

@BaseClass = Targetname [ ]
@PointClass base(Targetname, Targetname) halfgridsnap studio("models/x.mdl") sphere()
    iconsprite("editor/x.vmt") = prop_thing : "First " + "second"
[
]
"#,
        );
        assert_eq!(fgd.map_size_min, -16384.0);
        assert_eq!(fgd.map_size_max, 16384.0);

        let ent = fgd.get("PROP_THING").expect("entity");
        assert_eq!(ent.entity_type, EntityType::Point);
        assert_eq!(ent.classname, "prop_thing");
        assert_eq!(ent.desc, "First second");
        assert_eq!(ent.bases.len(), 1);
        let helpers = ent
            .helpers
            .iter()
            .map(|helper| (helper.kind, helper.args.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            helpers,
            vec![
                (HelperType::HalfGridSnap, vec![]),
                (HelperType::Model, vec!["\"models/x.mdl\"".to_string()]),
                (HelperType::Sphere, vec![]),
                (HelperType::Sprite, vec!["\"editor/x.vmt\"".to_string()]),
            ]
        );
    }

    #[test]
    fn parses_keyvalue_attribute_positions() {
        let fgd = parse(
            r#"
@PointClass = thing
[
    bare(string)
    named(string) : "Named"
    health(integer) : "Health" : 10 : "Hit points."
    empty_default(float) : "Scale" : : "Has no default."
    locked[HL2](target_destination) readonly : "Locked"
    joined(string) : "Joined" : "a" + "b"
]
"#,
        );
        let ent = fgd.get("thing").expect("entity");
        assert_eq!(
            ent.kv_order,
            vec!["bare", "named", "health", "empty_default", "locked", "joined"]
        );

        let bare = untagged(&ent.keyvalues["bare"]);
        assert_eq!(bare.disp_name, "bare");
        assert!(bare.default.is_empty());

        let health = untagged(&ent.keyvalues["health"]);
        assert_eq!(health.value_type, ValueType::Int);
        assert_eq!(health.disp_name, "Health");
        assert_eq!(health.default, "10");
        assert_eq!(health.desc, "Hit points.");

        let empty = untagged(&ent.keyvalues["empty_default"]);
        assert_eq!(empty.default, "");
        assert_eq!(empty.desc, "Has no default.");

        let locked = &ent.keyvalues["locked"][&TagSet::query(["hl2"])];
        assert!(locked.readonly);
        assert_eq!(locked.value_type, ValueType::TargetDest);

        assert_eq!(untagged(&ent.keyvalues["joined"]).default, "ab");
    }

    #[test]
    fn parses_value_lists() {
        let fgd = parse(
            r#"
@PointClass = thing
[
    spawnflags(flags) =
    [
        1 : "One" : 1
        2 : "Two" : 0
        4 : "Four" [!episodic]
    ]
    skin[hl2](choices) : "Skin" : 0 =
    [
        0 : "Default"
        "red" : "Red" [+mapbase] ]
]
"#,
        );
        let ent = fgd.get("thing").expect("entity");
        let Some(ValueList::SpawnFlags(flags)) = &untagged(&ent.keyvalues["spawnflags"]).values
        else {
            panic!("expected spawnflags");
        };
        assert_eq!(
            flags
                .iter()
                .map(|flag| (flag.bit, flag.name.as_str(), flag.default))
                .collect::<Vec<_>>(),
            vec![(1, "One", true), (2, "Two", false), (4, "Four", true)]
        );
        assert!(flags[2].tags.contains("!EPISODIC"));

        let skin = &ent.keyvalues["skin"][&TagSet::query(["HL2"])];
        assert_eq!(skin.default, "0");
        let Some(ValueList::Choices(choices)) = &skin.values else {
            panic!("expected choices");
        };
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[1].value, "red");
        assert!(choices[1].tags.contains("+MAPBASE"));
    }

    #[test]
    fn parses_io_definitions() {
        let fgd = parse(
            r#"
@PointClass = thing
[
    input Kill(void) : "Removes the entity."
    input SetHealth[mapbase](integer)
    output OnTrigger(void) : "Fired." ]
"#,
        );
        let ent = fgd.get("thing").expect("entity");
        assert_eq!(untagged(&ent.inputs["kill"]).desc, "Removes the entity.");
        assert_eq!(
            ent.inputs["sethealth"][&TagSet::query(["MAPBASE"])].value_type,
            ValueType::Int
        );
        assert_eq!(untagged(&ent.outputs["ontrigger"]).name, "OnTrigger");
    }

    #[test]
    fn includes_are_parsed_once() {
        let fs = MemoryFileSystem::new()
            .with_file("root.fgd", "@include \"base\"\n@include \"base.fgd\"\n@PointClass base(Shared) = thing [ ]\n")
            .with_file("base.fgd", "@include \"root\"\n@BaseClass = Shared [ ]\n");
        let fgd = Fgd::parse("root", &fs, &ParseOptions::default()).expect("parse");
        assert_eq!(fgd.len(), 2);
        assert_eq!(
            fgd.parse_list.iter().cloned().collect::<Vec<_>>(),
            vec!["root.fgd".to_string(), "base.fgd".to_string()]
        );
    }

    #[test]
    fn missing_include_is_reported() {
        let err = parse_err("@include \"nowhere\"");
        assert_eq!(err.code, ParseErrorCode::IncludeNotFound);
        assert_eq!(err.file_path, Path::new("test.fgd"));
    }

    #[test]
    fn bases_stay_unresolved_without_eval() {
        let fgd = parse_with(
            "@PointClass base(Later) = thing [ ]\n@BaseClass = Later [ ]",
            ParseOptions {
                eval_bases: false,
                ..ParseOptions::default()
            },
        )
        .expect("parse");
        assert_eq!(
            fgd.get("thing").expect("thing").bases,
            vec![Base::Unresolved("Later".to_string())]
        );

        let err = parse_err("@PointClass base(Later) = thing [ ]\n@BaseClass = Later [ ]");
        assert_eq!(err.code, ParseErrorCode::UnknownBase);
    }

    #[test]
    fn decodes_windows_1252_by_default() {
        let bytes = b"@PointClass = thing : \"caf\xe9\" [\n]\n".to_vec();
        let fs = MemoryFileSystem::new().with_file("cp.fgd", bytes);
        let fgd = Fgd::parse("cp", &fs, &ParseOptions::default()).expect("parse");
        assert_eq!(fgd.get("thing").expect("thing").desc, "caf\u{e9}");

        let options = ParseOptions {
            encoding: SourceEncoding::Utf8,
            ..ParseOptions::default()
        };
        let err = Fgd::parse("cp", &fs, &options).expect_err("not utf-8");
        assert_eq!(err.code, ParseErrorCode::ReadFile);
    }

    #[test]
    fn syntax_errors_carry_codes_and_positions() {
        let cases: &[(&str, ParseErrorCode)] = &[
            ("PointClass = x [ ]", ParseErrorCode::BadKeyword),
            ("@WeirdClass = x [ ]", ParseErrorCode::UnknownEntityType),
            ("@PointClass bogus() = x [ ]", ParseErrorCode::UnknownHelper),
            ("@PointClass = x [\n k(nope)\n]", ParseErrorCode::UnknownValueType),
            ("@PointClass = x [\n k[a, !A](string)\n]", ParseErrorCode::InvalidTags),
            (
                "@PointClass = x [\n k(string) : \"a\" : \"b\" : \"c\" : \"d\"\n]",
                ParseErrorCode::TooManyAttributes,
            ),
            (
                "@PointClass = x [\n spawnflags(flags) =\n [\n 3 : \"Three\"\n ]\n]",
                ParseErrorCode::InvalidSpawnFlag,
            ),
            (
                "@PointClass = x [\n spawnflags(flags) =\n [\n 0 : \"Zero\"\n ]\n]",
                ParseErrorCode::InvalidSpawnFlag,
            ),
            ("@PointClass = x [\n k(string) : \"K\" =\n [\n ]\n]", ParseErrorCode::ListOnNonListType),
            ("@PointClass = x [\n k(choices) : \"K\"\n]", ParseErrorCode::MissingList),
            ("@PointClass = x [\n input In(choices)\n]", ParseErrorCode::InvalidIoType),
            ("@mapsize(1)", ParseErrorCode::InvalidMapSize),
            ("@mapsize(a, b)", ParseErrorCode::InvalidMapSize),
            ("@PointClass studio()", ParseErrorCode::UnexpectedEof),
            ("@PointClass = x [\n k(string) : \"K\"\n", ParseErrorCode::UnexpectedEof),
            ("@PointClass = x : : \"d\" [ ]", ParseErrorCode::UnexpectedToken),
        ];
        for (source, code) in cases {
            let err = parse_err(source);
            assert_eq!(err.code, *code, "source: {source:?}, error: {err}");
            assert!(err.location.is_some(), "{source:?} should be located");
        }
    }

    #[test]
    fn error_location_points_at_offending_line() {
        let err = parse_err("@PointClass = x\n[\n    ok(string)\n    bad(nope)\n]");
        assert_eq!(err.code, ParseErrorCode::UnknownValueType);
        assert_eq!(err.location.map(|loc| loc.line), Some(4));
        assert!(err.to_string().starts_with("UnknownValueType: unknown value type \"nope\""));
    }
}
