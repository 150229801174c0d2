use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use fgd::{
    build_or_load_fgd, CacheRequest, DirFileSystem, Fgd, ParseOptions, TagSet,
};
use tracing::info;

pub const CACHE_DIR_ENV_VAR: &str = "FGD_CACHE_DIR";

#[derive(Parser, Debug)]
#[command(name = "fgd")]
#[command(about = "Inspect, convert and cache Hammer FGD entity definitions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Parse a file, resolve bases and report the entity count
    Check { file: PathBuf },
    /// Print the text rendering of a file
    Export {
        file: PathBuf,
        /// Flatten inherited members into each entity
        #[arg(long)]
        collapse: bool,
        /// Keep only the variants matching these comma-separated tags
        #[arg(long, value_name = "TAGS")]
        strip_tags: Option<String>,
    },
    /// Write the binary form of a file
    Pack {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the text rendering of a binary pack
    Unpack { pack: PathBuf },
    /// Resolve one keyvalue or IO definition through the base chain
    Lookup {
        file: PathBuf,
        classname: String,
        key: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, value_enum)]
        io: Option<IoKind>,
    },
    /// Load a file through the on-disk pack cache
    Load {
        dir: PathBuf,
        entry: String,
        #[arg(long, env = CACHE_DIR_ENV_VAR, default_value = ".fgd_cache")]
        cache_dir: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoKind {
    Input,
    Output,
}

impl IoKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

pub fn run<W: Write>(command: Command, stdout: &mut W) -> Result<(), String> {
    match command {
        Command::Check { file } => {
            let fgd = load_source(&file)?;
            info!(file = %file.display(), entity_count = fgd.len(), "fgd_check_ok");
            write_out(stdout, &format!("{}: {} entities\n", file.display(), fgd.len()))
        }
        Command::Export {
            file,
            collapse,
            strip_tags,
        } => {
            let mut fgd = load_source(&file)?;
            if collapse {
                fgd.collapse_bases().map_err(|error| error.to_string())?;
            }
            if let Some(tags) = strip_tags {
                fgd.strip_tags(&TagSet::query(tags.split(',')));
            }
            write_out(stdout, &fgd.export())
        }
        Command::Pack { file, output } => {
            let mut fgd = load_source(&file)?;
            let bytes = fgd.to_bytes().map_err(|error| error.to_string())?;
            fs::write(&output, &bytes)
                .map_err(|error| format!("failed to write {}: {error}", output.display()))?;
            write_out(
                stdout,
                &format!(
                    "wrote {} entities ({} bytes) to {}\n",
                    fgd.len(),
                    bytes.len(),
                    output.display()
                ),
            )
        }
        Command::Unpack { pack } => {
            let bytes = fs::read(&pack)
                .map_err(|error| format!("failed to read {}: {error}", pack.display()))?;
            let fgd = Fgd::from_bytes(&bytes).map_err(|error| error.to_string())?;
            write_out(stdout, &fgd.export())
        }
        Command::Lookup {
            file,
            classname,
            key,
            tags,
            io,
        } => {
            let fgd = load_source(&file)?;
            let id = fgd
                .id_of(&classname)
                .ok_or_else(|| format!("unknown entity '{classname}'"))?;
            let query = TagSet::query(&tags);
            let mut rendered = String::new();
            match io {
                None => fgd
                    .keyvalues(id)
                    .get_tagged(&key, &query)
                    .map_err(|error| error.to_string())?
                    .export(&mut rendered, &TagSet::new()),
                Some(kind) => {
                    let view = match kind {
                        IoKind::Input => fgd.inputs(id),
                        IoKind::Output => fgd.outputs(id),
                    };
                    view.get_tagged(&key, &query)
                        .map_err(|error| error.to_string())?
                        .export(&mut rendered, kind.keyword(), &TagSet::new());
                }
            }
            write_out(stdout, rendered.trim_start_matches('\t'))
        }
        Command::Load {
            dir,
            entry,
            cache_dir,
        } => {
            let fgd = build_or_load_fgd(&dir, &entry, &cache_dir, &CacheRequest::default())
                .map_err(|error| error.to_string())?;
            write_out(stdout, &format!("{entry}: {} entities\n", fgd.len()))
        }
    }
}

/// Parses `file` from its own directory, so includes resolve beside it.
fn load_source(file: &Path) -> Result<Fgd, String> {
    let root = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("invalid FGD path {}", file.display()))?;
    let mut fgd = Fgd::parse(name, &DirFileSystem::new(root), &ParseOptions::default())
        .map_err(|error| error.to_string())?;
    fgd.apply_bases().map_err(|error| error.to_string())?;
    Ok(fgd)
}

fn write_out<W: Write>(stdout: &mut W, text: &str) -> Result<(), String> {
    stdout
        .write_all(text.as_bytes())
        .map_err(|error| format!("failed to write output: {error}"))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const GAME_FGD: &str = "\
@BaseClass = Targetname
[
    targetname(target_source) : \"Name\"
    input Kill(void) : \"Removes this entity\"
]
@PointClass base(Targetname) = info_target : \"A target\"
[
    health(integer) : \"Health\" : 10
    health[EP2](integer) : \"Health\" : 20
]
";

    fn write_game(temp: &TempDir) -> PathBuf {
        let path = temp.path().join("game.fgd");
        fs::write(&path, GAME_FGD).expect("write fgd");
        path
    }

    fn run_to_string(command: Command) -> String {
        let mut out = Vec::new();
        run(command, &mut out).expect("run");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn parses_lookup_arguments() {
        let cli = Cli::try_parse_from([
            "fgd", "lookup", "game.fgd", "info_target", "health", "--tags", "ep2,hl2",
        ])
        .expect("parse");
        assert_eq!(
            cli.command,
            Command::Lookup {
                file: PathBuf::from("game.fgd"),
                classname: "info_target".to_string(),
                key: "health".to_string(),
                tags: vec!["ep2".to_string(), "hl2".to_string()],
                io: None,
            }
        );

        let cli = Cli::try_parse_from(["fgd", "lookup", "a", "b", "kill", "--io", "input"])
            .expect("parse io");
        assert!(matches!(
            cli.command,
            Command::Lookup {
                io: Some(IoKind::Input),
                ..
            }
        ));
    }

    #[test]
    fn pack_requires_output() {
        assert!(Cli::try_parse_from(["fgd", "pack", "game.fgd"]).is_err());
        let cli = Cli::try_parse_from(["fgd", "pack", "game.fgd", "-o", "game.pack"])
            .expect("parse");
        assert!(matches!(cli.command, Command::Pack { .. }));
    }

    #[test]
    fn load_takes_explicit_cache_dir() {
        let cli = Cli::try_parse_from(["fgd", "load", "defs", "game", "--cache-dir", "out"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Load { ref cache_dir, .. } if cache_dir == Path::new("out")
        ));
    }

    #[test]
    fn check_reports_entity_count() {
        let temp = TempDir::new().expect("temp");
        let file = write_game(&temp);
        let out = run_to_string(Command::Check { file });
        assert!(out.ends_with(": 2 entities\n"));
    }

    #[test]
    fn lookup_follows_tags_and_bases() {
        let temp = TempDir::new().expect("temp");
        let file = write_game(&temp);
        let lookup = |key: &str, tags: Vec<String>, io: Option<IoKind>| {
            run_to_string(Command::Lookup {
                file: file.clone(),
                classname: "info_target".to_string(),
                key: key.to_string(),
                tags,
                io,
            })
        };

        assert!(lookup("health", vec![], None).contains(": 10"));
        assert!(lookup("health", vec!["ep2".to_string()], None).contains(": 20"));
        assert!(lookup("targetname", vec![], None).starts_with("targetname(target_source)"));
        assert!(lookup("kill", vec![], Some(IoKind::Input)).starts_with("input Kill(void)"));

        let mut out = Vec::new();
        let err = run(
            Command::Lookup {
                file: file.clone(),
                classname: "info_target".to_string(),
                key: "missing".to_string(),
                tags: vec![],
                io: None,
            },
            &mut out,
        )
        .expect_err("missing key");
        assert!(err.contains("missing"));
    }

    #[test]
    fn export_strips_tags() {
        let temp = TempDir::new().expect("temp");
        let file = write_game(&temp);
        let out = run_to_string(Command::Export {
            file,
            collapse: true,
            strip_tags: Some("ep2".to_string()),
        });
        assert!(out.contains("health(integer) : \"Health\" : 20"));
        assert!(!out.contains(": 10"));
        assert!(!out.contains("base("));
    }

    #[test]
    fn pack_then_unpack() {
        let temp = TempDir::new().expect("temp");
        let file = write_game(&temp);
        let output = temp.path().join("game.pack");
        let packed = run_to_string(Command::Pack {
            file,
            output: output.clone(),
        });
        assert!(packed.starts_with("wrote 2 entities"));

        let unpacked = run_to_string(Command::Unpack { pack: output });
        assert!(unpacked.contains("= info_target"));
        assert!(unpacked.contains("base(Targetname)"));
    }

    #[test]
    fn load_writes_cache() {
        let temp = TempDir::new().expect("temp");
        write_game(&temp);
        let cache_dir = temp.path().join("cache");
        let out = run_to_string(Command::Load {
            dir: temp.path().to_path_buf(),
            entry: "game".to_string(),
            cache_dir: cache_dir.clone(),
        });
        assert_eq!(out, "game: 2 entities\n");
        assert!(cache_dir.join("fgd_packs").join("game.pack").exists());
    }
}
