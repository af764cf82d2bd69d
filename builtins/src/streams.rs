//! File streams: `open/4`, `close/1` and `make_directory/1`.
//!
//! All three need the `filesystem` capability, checked before any host
//! resource is touched. Open streams live in a [`StreamTable`] kept in the
//! engine's external data under [`STREAMS_KEY`]; the stream term handed to
//! the program is a host value wrapping the [`Stream`].

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context as _;
use cairn_core::{
    Atom, Capability, Cont, Engine, Fault, HostValue, Next, Signal, Term, Unit,
};

use crate::args::Site;

/// External-data key of the stream table.
pub const STREAMS_KEY: &str = "streams";

const OPEN: Site = Site::new("open", 4);
const CLOSE: Site = Site::new("close", 1);
const MAKE_DIRECTORY: Site = Site::new("make_directory", 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
    Append,
}

impl Mode {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "read" => Some(Mode::Read),
            "write" => Some(Mode::Write),
            "append" => Some(Mode::Append),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Read => "read",
            Mode::Write => "write",
            Mode::Append => "append",
        }
    }

    const fn direction(self) -> &'static str {
        match self {
            Mode::Read => "input",
            Mode::Write | Mode::Append => "output",
        }
    }
}

#[derive(Debug)]
enum Handle {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
}

/// An open file. Closing drops the handle; the `Stream` itself may outlive
/// it as long as some term still refers to it.
#[derive(Debug)]
pub struct Stream {
    path: PathBuf,
    mode: Mode,
    handle: Mutex<Option<Handle>>,
}

impl Stream {
    fn open(path: &Path, mode: Mode) -> std::io::Result<Self> {
        let handle = match mode {
            Mode::Read => Handle::Reader(BufReader::new(File::open(path)?)),
            Mode::Write | Mode::Append => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(mode == Mode::Append)
                    .truncate(mode == Mode::Write)
                    .open(path)?;
                Handle::Writer(BufWriter::new(file))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            mode,
            handle: Mutex::new(Some(handle)),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn handle(&self) -> anyhow::Result<MutexGuard<'_, Option<Handle>>> {
        self.handle
            .lock()
            .map_err(|_| anyhow::anyhow!("stream lock poisoned: {}", self.path.display()))
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle().map(|h| h.is_some()).unwrap_or(false)
    }

    pub fn write_str(&self, text: &str) -> anyhow::Result<()> {
        match self.handle()?.as_mut() {
            Some(Handle::Writer(out)) => out
                .write_all(text.as_bytes())
                .with_context(|| format!("writing {}", self.path.display())),
            Some(Handle::Reader(_)) => anyhow::bail!("{} is an input stream", self.path.display()),
            None => anyhow::bail!("{} is closed", self.path.display()),
        }
    }

    /// Read one line, without the trailing newline. `None` at end of file.
    pub fn read_line(&self) -> anyhow::Result<Option<String>> {
        match self.handle()?.as_mut() {
            Some(Handle::Reader(input)) => {
                let mut line = String::new();
                let read = input
                    .read_line(&mut line)
                    .with_context(|| format!("reading {}", self.path.display()))?;
                if read == 0 {
                    return Ok(None);
                }
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                Ok(Some(line))
            }
            Some(Handle::Writer(_)) => anyhow::bail!("{} is an output stream", self.path.display()),
            None => anyhow::bail!("{} is closed", self.path.display()),
        }
    }

    pub fn read_to_string(&self) -> anyhow::Result<String> {
        match self.handle()?.as_mut() {
            Some(Handle::Reader(input)) => {
                let mut text = String::new();
                input
                    .read_to_string(&mut text)
                    .with_context(|| format!("reading {}", self.path.display()))?;
                Ok(text)
            }
            Some(Handle::Writer(_)) => anyhow::bail!("{} is an output stream", self.path.display()),
            None => anyhow::bail!("{} is closed", self.path.display()),
        }
    }

    /// Flush and drop the handle. Closing twice is a no-op.
    pub fn close(&self) -> anyhow::Result<()> {
        match self.handle()?.take() {
            Some(Handle::Writer(mut out)) => out
                .flush()
                .with_context(|| format!("flushing {}", self.path.display())),
            Some(Handle::Reader(_)) | None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct Streams {
    /// Keyed by host-value identity.
    open: HashMap<usize, (HostValue, Term)>,
    aliases: HashMap<Atom, HostValue>,
}

/// Registry of open streams and their aliases.
#[derive(Debug, Default)]
pub struct StreamTable {
    inner: Mutex<Streams>,
}

impl StreamTable {
    fn lock(&self) -> Result<MutexGuard<'_, Streams>, Fault> {
        self.inner
            .lock()
            .map_err(|_| Fault::internal("stream table lock poisoned"))
    }

    /// The table registered with `engine`, created on first use.
    pub fn of(engine: &mut Engine) -> Result<Arc<Self>, Fault> {
        engine.external_or_insert_with(STREAMS_KEY, StreamTable::default)
    }

    pub fn len(&self) -> Result<usize, Fault> {
        Ok(self.lock()?.open.len())
    }

    pub fn is_empty(&self) -> Result<bool, Fault> {
        Ok(self.lock()?.open.is_empty())
    }

    pub fn resolve_alias(&self, alias: &Atom) -> Result<Option<HostValue>, Fault> {
        Ok(self.lock()?.aliases.get(alias).cloned())
    }

    /// The property list recorded when `stream` was opened.
    pub fn properties(&self, stream: &HostValue) -> Result<Option<Term>, Fault> {
        Ok(self
            .lock()?
            .open
            .get(&stream.identity())
            .map(|(_, props)| props.clone()))
    }

    fn has_alias(&self, alias: &Atom) -> Result<bool, Fault> {
        Ok(self.lock()?.aliases.contains_key(alias))
    }

    fn insert(&self, stream: HostValue, props: Term, alias: Option<Atom>) -> Result<(), Fault> {
        let mut streams = self.lock()?;
        if let Some(alias) = alias {
            streams.aliases.insert(alias, stream.clone());
        }
        streams.open.insert(stream.identity(), (stream, props));
        Ok(())
    }

    /// Forget `stream` and any alias pointing at it. Returns whether it was
    /// registered.
    fn remove(&self, stream: &HostValue) -> Result<bool, Fault> {
        let mut streams = self.lock()?;
        streams.aliases.retain(|_, target| !target.ptr_eq(stream));
        Ok(streams.open.remove(&stream.identity()).is_some())
    }
}

#[derive(Debug, Default)]
struct OpenOptionsTerm {
    alias: Option<Atom>,
    autoclose: bool,
}

fn parse_options(engine: &Engine, options: &Term) -> Result<OpenOptionsTerm, Fault> {
    let mut parsed = OpenOptionsTerm::default();
    let mut rest = engine.deref(options);
    loop {
        let cell = match rest {
            Term::Var(_) => return Err(OPEN.at(4, Fault::instantiation())),
            ref t if t.is_nil() => return Ok(parsed),
            Term::List(cell) => cell,
            other => {
                return Err(OPEN.at(
                    4,
                    Fault::type_error("list", engine.resolve(&other)),
                ));
            }
        };
        let option = OPEN.bound(engine, cell.head(), 4)?;
        let bad_option = || OPEN.at(4, Fault::domain("stream_option", engine.resolve(&option)));
        let Term::Compound(c) = &option else {
            return Err(bad_option());
        };
        if c.arity() == 1 {
            let value = engine.deref(&c.args()[0]);
            match c.name().as_str() {
                "alias" => match value {
                    Term::Atom(alias) => parsed.alias = Some(alias),
                    _ => return Err(bad_option()),
                },
                "autoclose" => match value {
                    Term::Atom(flag) => parsed.autoclose = flag.as_str() == "true",
                    _ => return Err(bad_option()),
                },
                _ => {}
            }
        }
        rest = engine.deref(cell.tail());
    }
}

/// `open(Source, Mode, Stream, Options)`.
///
/// Options: `alias(A)` registers the stream under `A`; `autoclose(true)`
/// closes and unregisters it when execution backtracks past the open.
#[derive(Debug)]
pub struct Open {
    source: Term,
    mode: Term,
    stream: Term,
    options: Term,
    cont: Cont,
}

impl Open {
    #[must_use]
    pub fn new(source: Term, mode: Term, stream: Term, options: Term, cont: Cont) -> Self {
        Self {
            source,
            mode,
            stream,
            options,
            cont,
        }
    }
}

impl Unit for Open {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine
            .require(Capability::Filesystem, &self.source)
            .map_err(|fault| OPEN.at(1, fault))?;

        let stream_var = engine.deref(&self.stream);
        if !stream_var.is_var() {
            return Err(OPEN
                .at(3, Fault::type_error("variable", engine.resolve(&stream_var)))
                .into());
        }
        let source = match OPEN.bound(engine, &self.source, 1)? {
            Term::Atom(name) => name,
            other => {
                return Err(OPEN
                    .at(1, Fault::domain("source_sink", engine.resolve(&other)))
                    .into());
            }
        };
        let mode_name = OPEN.atom(engine, &self.mode, 2)?;
        let mode = Mode::parse(mode_name.as_str()).ok_or_else(|| {
            OPEN.at(2, Fault::domain("io_mode", Term::Atom(mode_name.clone())))
        })?;
        let options = parse_options(engine, &self.options)?;

        let table = StreamTable::of(engine)?;
        if let Some(alias) = &options.alias
            && table.has_alias(alias)?
        {
            return Err(OPEN
                .at(
                    4,
                    Fault::permission(
                        "open",
                        "source_sink",
                        Term::compound("alias", vec![Term::Atom(alias.clone())]),
                        "alias already in use",
                    ),
                )
                .into());
        }

        let path = PathBuf::from(source.as_str());
        if mode == Mode::Read && !path.exists() {
            return Err(OPEN
                .at(1, Fault::existence("source_sink", Term::Atom(source)))
                .into());
        }
        let opened = Stream::open(&path, mode).map_err(|err| {
            tracing::debug!(path = %path.display(), error = %err, "open failed");
            OPEN.at(
                1,
                Fault::permission("open", "source_sink", Term::Atom(source.clone()), err.to_string()),
            )
        })?;
        let handle = HostValue::new(opened);

        let file_name = fs::canonicalize(&path).unwrap_or(path);
        let mut props = vec![
            Term::compound("file_name", vec![Term::atom(file_name.display().to_string())]),
            Term::compound("mode", vec![Term::atom(mode.as_str())]),
            Term::compound("type", vec![Term::atom("text")]),
            Term::atom(mode.direction()),
        ];
        if let Some(alias) = &options.alias {
            props.push(Term::compound("alias", vec![Term::Atom(alias.clone())]));
        }
        table.insert(handle.clone(), Term::list(props), options.alias.clone())?;
        tracing::debug!(path = %source, mode = mode.as_str(), "stream opened");

        if !engine.unify(&stream_var, &Term::host(handle.clone())) {
            return Err(Fault::internal("fresh stream variable refused to bind").into());
        }

        if options.autoclose {
            let table = Arc::clone(&table);
            engine.push_revert(move || {
                table.remove(&handle).map_err(anyhow::Error::from)?;
                match handle.downcast_ref::<Stream>() {
                    Some(stream) => stream.close(),
                    None => Ok(()),
                }
            });
        }
        Ok(self.cont.clone().into())
    }
}

/// Look up a stream term or alias.
fn stream_of(engine: &mut Engine, term: &Term, site: Site) -> Result<(Arc<StreamTable>, HostValue), Fault> {
    let table = StreamTable::of(engine)?;
    let handle = match site.bound(engine, term, 1)? {
        Term::Atom(alias) => table
            .resolve_alias(&alias)?
            .ok_or_else(|| site.at(1, Fault::existence("stream", Term::Atom(alias))))?,
        Term::Host(handle) if handle.is::<Stream>() => handle,
        other => {
            return Err(site.at(1, Fault::domain("stream_or_alias", engine.resolve(&other))));
        }
    };
    Ok((table, handle))
}

/// `close(Stream)`: flush, release the handle and unregister the stream.
#[derive(Debug)]
pub struct Close {
    stream: Term,
    cont: Cont,
}

impl Close {
    #[must_use]
    pub fn new(stream: Term, cont: Cont) -> Self {
        Self { stream, cont }
    }
}

impl Unit for Close {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let (table, handle) = stream_of(engine, &self.stream, CLOSE)?;
        if !table.remove(&handle)? {
            return Err(CLOSE
                .at(1, Fault::existence("stream", Term::host(handle)))
                .into());
        }
        if let Some(stream) = handle.downcast_ref::<Stream>() {
            stream
                .close()
                .map_err(|err| CLOSE.at(1, Fault::host("close failed", err)))?;
        }
        Ok(self.cont.clone().into())
    }
}

/// `make_directory(Dir)`.
#[derive(Debug)]
pub struct MakeDirectory {
    dir: Term,
    cont: Cont,
}

impl MakeDirectory {
    #[must_use]
    pub fn new(dir: Term, cont: Cont) -> Self {
        Self { dir, cont }
    }
}

impl Unit for MakeDirectory {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine
            .require(Capability::Filesystem, &self.dir)
            .map_err(|fault| MAKE_DIRECTORY.at(1, fault))?;
        let dir = match MAKE_DIRECTORY.bound(engine, &self.dir, 1)? {
            Term::Atom(dir) => dir,
            other => {
                return Err(MAKE_DIRECTORY
                    .at(1, Fault::domain("dir", engine.resolve(&other)))
                    .into());
            }
        };
        fs::create_dir(dir.as_str()).map_err(|err| {
            MAKE_DIRECTORY.at(
                1,
                Fault::permission("open", "dir", Term::Atom(dir.clone()), format!("cannot create: {err}")),
            )
        })?;
        Ok(self.cont.clone().into())
    }
}
