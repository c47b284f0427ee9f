//! Markup documents
//!
//! An `InfoFile` owns one element tree and remembers where it came from.
//! On disk a document is UTF-16LE text behind a `0xFEFF` signature.

use std::path::{Path, PathBuf};

use thunderstorm_common::stream::{
    read_unicode_signature, read_utf16_to_end, write_unicode_signature, write_utf16,
};
use thunderstorm_common::{
    Access, Disposition, Error, FileStream, Result, Stream, StreamCache,
};

use crate::parser::filler_len;
use crate::tree::{ElemId, ElemRef, InfoTree};
use crate::variable::{VarType, Variable};

#[derive(Debug, Clone, Default)]
pub struct InfoFile {
    path: PathBuf,
    title: String,
    tree: InfoTree,
}

impl InfoFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse the document at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut doc = Self::new();
        doc.load(path)?;
        Ok(doc)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut stream = FileStream::open(path, Access::Read, Disposition::OpenExisting)?;
        self.deserialize(&mut stream)
    }

    /// Like `load`, but reads through a whole-file cache
    pub fn load_cached(&mut self, path: impl AsRef<Path>, cache: &mut StreamCache) -> Result<()> {
        let mut stream = cache.open(path)?;
        self.deserialize(&mut stream)
    }

    /// Write to `path` (created or truncated) and adopt it as the document path
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut stream = FileStream::open(path, Access::Write, Disposition::CreateAlways)?;
        self.serialize(&mut stream)?;
        self.set_path(path);
        tracing::debug!("Saved {}", path.display());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Path / title
    // ------------------------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
        self.title = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    // ------------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------------

    pub fn tree(&self) -> &InfoTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut InfoTree {
        &mut self.tree
    }

    pub fn root(&self) -> Option<ElemId> {
        self.tree.root()
    }

    pub fn root_ref(&self) -> Option<ElemRef<'_>> {
        self.tree.root_ref()
    }

    /// Replace the root with a new empty block called `name`
    pub fn create_set_root(&mut self, name: impl Into<String>) -> ElemId {
        self.tree.create_root(name)
    }

    pub fn release_root(&mut self) {
        self.tree.release_root();
    }

    /// `InfoTree::required_child`, reporting this document's path
    pub fn required_child(&self, parent: ElemId, name: &str) -> Result<ElemId> {
        self.tree
            .required_child(parent, name)
            .map_err(|e| e.with_path(&self.path))
    }

    /// `InfoTree::required_value`, reporting this document's path
    pub fn required_value(&self, parent: ElemId, name: &str, kind: VarType) -> Result<&Variable> {
        self.tree
            .required_value(parent, name, kind)
            .map_err(|e| e.with_path(&self.path))
    }

    // ------------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------------

    /// Replace the document contents with the element parsed from `text`.
    ///
    /// On failure the document is left without a root.
    pub fn parse_str(&mut self, text: &str) -> Result<()> {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        let root = self.tree.create_root("");
        match self.tree.parse_into(root, text) {
            Ok(consumed) => {
                let rest = &text[consumed..];
                if filler_len(rest) < rest.len() {
                    tracing::warn!(
                        "Ignoring text after the root element of {}",
                        self.path.display()
                    );
                }
                Ok(())
            }
            Err(e) => {
                self.tree.release_root();
                Err(e.with_path(&self.path))
            }
        }
    }

    /// Markup text of the whole document; empty without a root
    pub fn to_markup_string(&self) -> String {
        self.tree
            .root()
            .map(|root| self.tree.to_markup_string(root))
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Streams
    // ------------------------------------------------------------------------

    /// Load from a stream positioned at the unicode signature
    pub fn deserialize<S: Stream + ?Sized>(&mut self, stream: &mut S) -> Result<()> {
        self.set_path(stream.path());
        self.tree.release_root();

        if !read_unicode_signature(stream)? {
            return Err(Error::FileNotUnicode {
                path: self.path.clone(),
            });
        }

        let result = read_utf16_to_end(stream).and_then(|text| self.parse_str(&text));
        match result {
            Ok(()) => {
                tracing::debug!(
                    "Loaded {} ({} elements)",
                    self.path.display(),
                    self.tree.len()
                );
                Ok(())
            }
            Err(e) => Err(Error::FileDeserialize {
                path: self.path.clone(),
                source: Box::new(e.with_path(&self.path)),
            }),
        }
    }

    /// Write the signature and the document text. Writes nothing without a root.
    pub fn serialize<S: Stream + ?Sized>(&self, stream: &mut S) -> Result<()> {
        let Some(root) = self.tree.root() else {
            return Ok(());
        };
        let text = self.tree.to_markup_string(root);
        let write = |stream: &mut S| -> Result<()> {
            write_unicode_signature(stream)?;
            write_utf16(stream, &text)?;
            stream.flush().map_err(|source| Error::FileWrite {
                path: stream.path().to_path_buf(),
                source,
            })
        };
        write(stream).map_err(|e| Error::FileSerialize {
            path: stream.path().to_path_buf(),
            source: Box::new(e),
        })
    }
}

impl PartialEq for InfoFile {
    /// Documents are equal when their root subtrees are
    fn eq(&self, other: &Self) -> bool {
        match (self.tree.root(), other.tree.root()) {
            (Some(a), Some(b)) => self.tree.subtree_eq(a, &other.tree, b),
            (None, None) => true,
            _ => false,
        }
    }
}
