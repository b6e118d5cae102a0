//! Single-file conversion with recursive `Include` resolution.
//!
//! Source → tokens → blocks → (includes converted and rewritten) → flattened
//! blocks → document → JSON artifact. Included files are converted and written
//! before the file that includes them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use pbrtjson_parser::{Segmented, flatten_blocks, parse_blocks};
use pbrtjson_shared::{Block, ConvertError, ConvertOptions, Diagnostics, Document, Result};

use crate::assembler::{assemble, render, write_document};
use crate::fs::{SceneFs, normalize_path};

/// Result of converting one source file and everything it includes.
#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    /// Artifact written for the requested source.
    pub output: PathBuf,
    /// The requested source's document, include arguments already rewritten.
    pub document: Document,
    /// Unrecognized capitalized tokens across the whole include tree.
    pub diagnostics: Diagnostics,
    /// Every artifact written, included files first, `output` last.
    pub written: Vec<PathBuf>,
}

/// Convert `source` into a JSON artifact at `output`.
///
/// Includes resolve relative to the including file's directory, and their
/// artifacts are mirrored relative to the including artifact's directory.
#[instrument(skip_all, fields(source = %source.display(), output = %output.display()))]
pub fn convert_file(
    fs: &dyn SceneFs,
    options: &ConvertOptions,
    source: &Path,
    output: &Path,
) -> Result<ConvertOutcome> {
    let content = fs.read_to_string(source)?;

    let mut session = Session {
        fs,
        options,
        stack: Vec::new(),
        done: HashSet::new(),
        written: Vec::new(),
        diagnostics: Diagnostics::new(),
    };
    let document = session.convert_source(source, &content, output)?;

    Ok(ConvertOutcome {
        output: output.to_path_buf(),
        document,
        diagnostics: session.diagnostics,
        written: session.written,
    })
}

/// The artifact path for a source file: same name, output extension.
pub fn output_path_for(source: &Path, output_dir: &Path, options: &ConvertOptions) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}.{}", options.output_extension))
}

/// Where an include target's artifact goes, relative to the parent artifact's directory.
///
/// `models/sub.pbrt` becomes `models/sub.json`; a bare `sub.pbrt` becomes `sub.json`.
pub fn rewritten_include(target: &str, options: &ConvertOptions) -> String {
    let (dir, name) = match target.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", target),
    };
    let stem = name
        .strip_suffix(options.source_extension.as_str())
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(name);
    let file = format!("{stem}.{}", options.output_extension);

    let dir = dir.trim_start_matches('/');
    if dir.is_empty() {
        file
    } else {
        format!("{dir}/{file}")
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State for one top-level conversion and its include tree.
struct Session<'a> {
    fs: &'a dyn SceneFs,
    options: &'a ConvertOptions,
    /// Normalized sources currently being converted, outermost first.
    stack: Vec<PathBuf>,
    /// (source, output) pairs already written during this session.
    done: HashSet<(PathBuf, PathBuf)>,
    written: Vec<PathBuf>,
    diagnostics: Diagnostics,
}

impl Session<'_> {
    fn convert_source(&mut self, source: &Path, content: &str, output: &Path) -> Result<Document> {
        let key = normalize_path(source);
        if let Some(pos) = self.stack.iter().position(|p| p == &key) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(key);
            return Err(ConvertError::IncludeCycle { chain });
        }

        self.stack.push(key);
        let result = self
            .convert_content(source, content, output)
            .map_err(|e| e.in_file(source));
        self.stack.pop();
        result
    }

    fn convert_content(&mut self, source: &Path, content: &str, output: &Path) -> Result<Document> {
        let Segmented {
            mut blocks,
            diagnostics,
        } = parse_blocks(content)?;
        diagnostics.report();
        self.diagnostics.merge(&diagnostics);

        let source_dir = source.parent().unwrap_or(Path::new(""));
        let output_dir = output.parent().unwrap_or(Path::new(""));
        for block in &mut blocks {
            self.resolve_include(block, source, source_dir, output_dir)?;
        }

        let document = assemble(flatten_blocks(blocks)?);
        let json = render(
            &document,
            self.fs.file_size(source)?,
            self.options.pretty_threshold_bytes,
        )?;
        write_document(self.fs, output, &json)?;

        self.done
            .insert((normalize_path(source), normalize_path(output)));
        self.written.push(output.to_path_buf());
        info!(
            source = %source.display(),
            output = %output.display(),
            blocks = document.len(),
            "json file saved"
        );

        Ok(document)
    }

    /// Convert an include target and point the block at its artifact.
    fn resolve_include(
        &mut self,
        block: &mut Block,
        source: &Path,
        source_dir: &Path,
        output_dir: &Path,
    ) -> Result<()> {
        let Some(target) = block
            .include_target(&self.options.include_keyword, &self.options.source_extension)
            .map(str::to_string)
        else {
            return Ok(());
        };

        let rewritten = rewritten_include(&target, self.options);
        let child_source = source_dir.join(&target);
        let child_output = output_dir.join(&rewritten);

        let key = (normalize_path(&child_source), normalize_path(&child_output));
        if self.done.contains(&key) {
            debug!(include = %target, "include already converted in this run");
        } else {
            let content = self.fs.read_to_string(&child_source).map_err(|e| {
                ConvertError::Resolution {
                    include: target.clone(),
                    from: source.to_path_buf(),
                    source: Box::new(e),
                }
            })?;
            debug!(include = %target, child = %child_source.display(), "converting include");
            self.convert_source(&child_source, &content, &child_output)?;
        }

        block.set_argument(rewritten);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::load_document;
    use crate::fs::{MemoryFs, OsFs};
    use pbrtjson_shared::Element;

    fn opts() -> ConvertOptions {
        ConvertOptions::default()
    }

    #[test]
    fn converts_single_file() {
        let fs = MemoryFs::new().with_file(
            "scenes/simple.pbrt",
            "LookAt 0 0 5 0 0 0 0 1 0 # eye\nCamera \"perspective\" \"float fov\" [ 45 ]\nWorldBegin\n",
        );
        let outcome = convert_file(
            &fs,
            &opts(),
            Path::new("scenes/simple.pbrt"),
            Path::new("out/simple.json"),
        )
        .unwrap();

        assert_eq!(outcome.document.len(), 3);
        assert_eq!(outcome.written, vec![PathBuf::from("out/simple.json")]);
        assert!(outcome.diagnostics.is_empty());

        let stored = load_document(&fs, Path::new("out/simple.json")).unwrap();
        assert_eq!(stored, outcome.document);
        assert_eq!(
            stored.blocks[1].elements()[3],
            Element::List(vec!["45".into()])
        );
    }

    #[test]
    fn include_is_converted_first_and_rewritten() {
        let fs = MemoryFs::new()
            .with_file("scenes/main.pbrt", "WorldBegin\nInclude \"models/sub.pbrt\"\n")
            .with_file("scenes/models/sub.pbrt", "Shape \"sphere\" \"float radius\" [ 2 ]\n");

        let outcome = convert_file(
            &fs,
            &opts(),
            Path::new("scenes/main.pbrt"),
            Path::new("out/main.json"),
        )
        .unwrap();

        assert_eq!(
            outcome.document.blocks[1],
            Block::from_tokens(["Include", "models/sub.json"])
        );
        assert_eq!(
            fs.write_log(),
            vec![PathBuf::from("out/models/sub.json"), PathBuf::from("out/main.json")]
        );
        assert_eq!(outcome.written, fs.write_log());

        let child = load_document(&fs, Path::new("out/models/sub.json")).unwrap();
        assert_eq!(child.len(), 1);
        assert_eq!(child.blocks[0].keyword(), Some("Shape"));
    }

    #[test]
    fn nested_includes_mirror_directories() {
        let fs = MemoryFs::new()
            .with_file("s/main.pbrt", "Include \"geo/a.pbrt\"")
            .with_file("s/geo/a.pbrt", "Include \"parts/b.pbrt\"")
            .with_file("s/geo/parts/b.pbrt", "Translate 1 2 3");

        let outcome =
            convert_file(&fs, &opts(), Path::new("s/main.pbrt"), Path::new("o/main.json")).unwrap();

        assert_eq!(
            outcome.written,
            vec![
                PathBuf::from("o/geo/parts/b.json"),
                PathBuf::from("o/geo/a.json"),
                PathBuf::from("o/main.json"),
            ]
        );
        let middle = load_document(&fs, Path::new("o/geo/a.json")).unwrap();
        assert_eq!(middle.blocks[0], Block::from_tokens(["Include", "parts/b.json"]));
    }

    #[test]
    fn bare_include_has_no_directory_prefix() {
        let fs = MemoryFs::new()
            .with_file("main.pbrt", "Include \"sub.pbrt\"")
            .with_file("sub.pbrt", "WorldBegin");
        let outcome =
            convert_file(&fs, &opts(), Path::new("main.pbrt"), Path::new("out/main.json")).unwrap();
        assert_eq!(outcome.document.blocks[0], Block::from_tokens(["Include", "sub.json"]));
        assert!(fs.get("out/sub.json").is_some());
    }

    #[test]
    fn non_source_include_is_left_alone() {
        let fs = MemoryFs::new().with_file("main.pbrt", "Include \"mesh.ply\"\nWorldBegin");
        let outcome =
            convert_file(&fs, &opts(), Path::new("main.pbrt"), Path::new("main.json")).unwrap();
        assert_eq!(outcome.document.blocks[0], Block::from_tokens(["Include", "mesh.ply"]));
        assert_eq!(outcome.written.len(), 1);
    }

    #[test]
    fn missing_include_is_resolution_error() {
        let fs = MemoryFs::new().with_file("main.pbrt", "Include \"gone.pbrt\"");
        let err = convert_file(&fs, &opts(), Path::new("main.pbrt"), Path::new("main.json"))
            .unwrap_err();
        match err {
            ConvertError::Resolution { include, from, .. } => {
                assert_eq!(include, "gone.pbrt");
                assert_eq!(from, PathBuf::from("main.pbrt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fs.write_log().is_empty());
    }

    #[test]
    fn include_cycle_is_detected() {
        let fs = MemoryFs::new()
            .with_file("a.pbrt", "Include \"b.pbrt\"")
            .with_file("b.pbrt", "Include \"./a.pbrt\"");
        let err =
            convert_file(&fs, &opts(), Path::new("a.pbrt"), Path::new("a.json")).unwrap_err();
        match err {
            ConvertError::IncludeCycle { chain } => {
                assert_eq!(
                    chain,
                    vec![
                        PathBuf::from("a.pbrt"),
                        PathBuf::from("b.pbrt"),
                        PathBuf::from("a.pbrt"),
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn shared_include_is_converted_once() {
        let fs = MemoryFs::new()
            .with_file("main.pbrt", "Include \"m.pbrt\"\nInclude \"m.pbrt\"")
            .with_file("m.pbrt", "WorldBegin");
        let outcome =
            convert_file(&fs, &opts(), Path::new("main.pbrt"), Path::new("main.json")).unwrap();
        assert_eq!(outcome.written, vec![PathBuf::from("m.json"), PathBuf::from("main.json")]);
        assert_eq!(outcome.document.blocks[1], Block::from_tokens(["Include", "m.json"]));
    }

    #[test]
    fn child_errors_name_the_child() {
        let fs = MemoryFs::new()
            .with_file("main.pbrt", "Include \"bad.pbrt\"")
            .with_file("bad.pbrt", "Shape [ 1 2");
        let err = convert_file(&fs, &opts(), Path::new("main.pbrt"), Path::new("main.json"))
            .unwrap_err();
        match err {
            ConvertError::InFile { path, source } => {
                assert_eq!(path, PathBuf::from("bad.pbrt"));
                assert!(matches!(*source, ConvertError::Structural { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn diagnostics_do_not_change_output() {
        let with_unknown = MemoryFs::new().with_file("a.pbrt", "WorldBegin Foo Bar Foo");
        let outcome =
            convert_file(&with_unknown, &opts(), Path::new("a.pbrt"), Path::new("a.json")).unwrap();
        assert_eq!(outcome.diagnostics.tokens().collect::<Vec<_>>(), vec!["Bar", "Foo"]);
        assert_eq!(
            outcome.document.blocks,
            vec![Block::from_tokens(["WorldBegin", "Foo", "Bar", "Foo"])]
        );
    }

    #[test]
    fn diagnostics_merge_across_includes() {
        let fs = MemoryFs::new()
            .with_file("main.pbrt", "Include \"sub.pbrt\"\nWorldBegin Alpha")
            .with_file("sub.pbrt", "WorldBegin Beta");
        let outcome =
            convert_file(&fs, &opts(), Path::new("main.pbrt"), Path::new("main.json")).unwrap();
        assert_eq!(outcome.diagnostics.tokens().collect::<Vec<_>>(), vec!["Alpha", "Beta"]);
        assert_eq!(outcome.written.len(), 2);
    }

    #[test]
    fn include_with_extra_arguments_is_not_resolved() {
        let fs = MemoryFs::new().with_file("main.pbrt", "Include \"sub.pbrt\" \"extra\"");
        let outcome =
            convert_file(&fs, &opts(), Path::new("main.pbrt"), Path::new("main.json")).unwrap();
        assert_eq!(
            outcome.document.blocks[0],
            Block::from_tokens(["Include", "sub.pbrt", "extra"])
        );
        assert_eq!(outcome.written.len(), 1);
    }

    #[test]
    fn pretty_threshold_follows_options() {
        let fs = MemoryFs::new().with_file("a.pbrt", "WorldBegin");
        let mut options = opts();
        convert_file(&fs, &options, Path::new("a.pbrt"), Path::new("a.json")).unwrap();
        assert!(fs.get("a.json").unwrap().contains('\n'));

        options.pretty_threshold_bytes = 0;
        convert_file(&fs, &options, Path::new("a.pbrt"), Path::new("a.json")).unwrap();
        assert!(!fs.get("a.json").unwrap().contains('\n'));
    }

    #[test]
    fn pretty_threshold_compares_file_bytes() {
        // 13 bytes on disk, 11 characters.
        let fs = MemoryFs::new().with_file("a.pbrt", "Shape \"été\"");
        let mut options = opts();
        options.pretty_threshold_bytes = 13;
        convert_file(&fs, &options, Path::new("a.pbrt"), Path::new("a.json")).unwrap();
        assert!(!fs.get("a.json").unwrap().contains('\n'));

        options.pretty_threshold_bytes = 14;
        convert_file(&fs, &options, Path::new("a.pbrt"), Path::new("a.json")).unwrap();
        assert!(fs.get("a.json").unwrap().contains('\n'));
    }

    #[test]
    fn rewritten_include_paths() {
        let o = opts();
        assert_eq!(rewritten_include("models/sub.pbrt", &o), "models/sub.json");
        assert_eq!(rewritten_include("a/b/c.pbrt", &o), "a/b/c.json");
        assert_eq!(rewritten_include("sub.pbrt", &o), "sub.json");
        assert_eq!(rewritten_include("my.pbrt.pbrt", &o), "my.pbrt.json");
    }

    #[test]
    fn output_path_swaps_extension() {
        let p = output_path_for(Path::new("scenes/killeroos/simple.pbrt"), Path::new("out"), &opts());
        assert_eq!(p, PathBuf::from("out/simple.json"));
    }

    #[test]
    fn converts_fixture_scene_on_disk() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/scenes/demo");
        let tmp = std::env::temp_dir().join(format!("pbrtjson-convert-test-{}", uuid::Uuid::now_v7()));

        let outcome = convert_file(
            &OsFs,
            &opts(),
            &fixtures.join("scene.pbrt"),
            &tmp.join("scene.json"),
        )
        .unwrap();

        assert!(tmp.join("geometry/ground.json").exists());
        assert!(tmp.join("scene.json").exists());
        let include = outcome
            .document
            .blocks
            .iter()
            .find(|b| b.keyword() == Some("Include"))
            .unwrap();
        assert_eq!(include.elements()[1], Element::Token("geometry/ground.json".into()));

        let ground = load_document(&OsFs, &tmp.join("geometry/ground.json")).unwrap();
        assert!(ground.blocks.iter().any(|b| b.keyword() == Some("Shape")));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
