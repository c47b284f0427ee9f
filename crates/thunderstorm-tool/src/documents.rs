//! Loaded documents, kept in a resource cache so a file named twice on the
//! command line is parsed once

use std::mem;
use std::path::Path;
use std::rc::Rc;

use thunderstorm_common::{EngineContext, Result, StreamCache};
use thunderstorm_markup::InfoFile;
use thunderstorm_resource::{Resource, ResourceBase, ResourceCache};

pub struct Document {
    base: ResourceBase,
    file: InfoFile,
    text_len: usize,
}

impl Document {
    pub fn file(&self) -> &InfoFile {
        &self.file
    }
}

impl Resource for Document {
    fn base(&self) -> &ResourceBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "document"
    }

    fn memory_footprint(&self) -> usize {
        self.base.memory_footprint() + mem::size_of::<InfoFile>() + self.text_len
    }
}

pub struct DocumentStore<'a> {
    ctx: EngineContext<'a>,
    streams: Option<StreamCache>,
    cache: ResourceCache<Document>,
}

impl<'a> DocumentStore<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self {
            ctx,
            streams: ctx.options.stream_cache.then(StreamCache::new),
            cache: ResourceCache::new(),
        }
    }

    /// Shared handle to the parsed document at `path`; release with `close`
    pub fn open(&mut self, path: &Path) -> Result<Rc<Document>> {
        let ctx = self.ctx;
        let streams = &mut self.streams;
        self.cache.acquire(path, || {
            let mut file = InfoFile::new();
            match streams {
                Some(cache) => file.load_cached(path, cache)?,
                None => file.load(path)?,
            }
            let text_len = file.to_markup_string().len();
            Ok(Rc::new(Document {
                base: ResourceBase::new(path, "document", ctx),
                file,
                text_len,
            }))
        })
    }

    pub fn close(&mut self, doc: Rc<Document>) {
        doc.release(self.ctx);
    }

    /// Forget a document so the next `open` rereads it from disk
    pub fn invalidate(&mut self, path: &Path) {
        self.cache.evict(path, true);
        if let Some(streams) = &mut self.streams {
            streams.invalidate(path);
        }
    }

    /// Drop documents idle past their persistence budget
    pub fn sweep(&mut self) -> usize {
        self.cache.update(self.ctx)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn memory_footprint(&self) -> usize {
        self.cache.memory_footprint()
    }
}
