//! Parser, data model and binary cache for Hammer FGD entity definitions.

mod binary;
mod cache;
mod database;
mod entity;
mod error;
mod filesystem;
mod keyvalue;
mod lexer;
mod parser;
mod tags;
mod types;
mod view;

pub use binary::{CodecError, BINARY_FORMAT_VERSION, MAX_STRINGS};
pub use cache::{build_or_load_fgd, CacheError, CacheRequest};
pub use database::{Fgd, ResolveError};
pub use entity::{AttrMap, Base, EntityDef, EntityId, Helper, TagMap};
pub use error::{FgdError, ParseError, ParseErrorCode, SourceLocation};
pub use filesystem::{DirFileSystem, FileSystem, MemoryFileSystem, SourceFile};
pub use keyvalue::{Choice, IoDef, KeyValue, SpawnFlag, ValueList};
pub use parser::{ParseOptions, SourceEncoding};
pub use tags::{match_tags, validate_tags, TagError, TagSet, WILDCARD_ALL};
pub use types::{EntityType, HelperType, ValueType, ENTITY_TYPE_ORDER, VALUE_TYPE_ORDER};
pub use view::{EntityView, NotFound};
