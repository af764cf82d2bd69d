//! `log(Package:Level, Format, Arg...)`: emit a `tracing` event.

use std::fmt::Write as _;

use cairn_core::{Cont, Engine, Fault, Next, Signal, Term, Unit};
use tracing::Level;

use crate::args::Site;

/// Map a level name onto a tracing level. Names are case-insensitive;
/// anything unrecognized, including an unbound level, logs at `INFO`.
/// `off` maps to `None`: the call succeeds without emitting anything.
#[must_use]
pub fn level_of(name: &str) -> Option<Level> {
    let level = match name.to_ascii_lowercase().as_str() {
        "off" => return None,
        "severe" => Level::ERROR,
        "warning" => Level::WARN,
        "config" | "fine" => Level::DEBUG,
        "finer" | "finest" | "all" => Level::TRACE,
        _ => Level::INFO,
    };
    Some(level)
}

/// Substitute `args` into `format`.
///
/// `%s` and `%d` take the next argument, `%n` is a newline and `%%` a
/// literal percent sign. A placeholder with no argument left is kept as is.
#[must_use]
pub fn format_message(format: &str, args: &[Term]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => out.push('%'),
            Some('n') => out.push('\n'),
            Some(spec @ ('s' | 'd')) => match args.next() {
                Some(arg) => {
                    let _ = write!(out, "{arg}");
                }
                None => {
                    out.push('%');
                    out.push(spec);
                }
            },
            _ => {
                out.push('%');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// The log builtin. `log/3` passes one argument; the wider forms pass
/// several.
#[derive(Debug)]
pub struct Log {
    package_level: Term,
    format: Term,
    args: Vec<Term>,
    cont: Cont,
}

impl Log {
    #[must_use]
    pub fn new(package_level: Term, format: Term, arg: Term, cont: Cont) -> Self {
        Self::with_args(package_level, format, vec![arg], cont)
    }

    #[must_use]
    pub fn with_args(package_level: Term, format: Term, args: Vec<Term>, cont: Cont) -> Self {
        Self {
            package_level,
            format,
            args,
            cont,
        }
    }

    fn site(&self) -> Site {
        match self.args.len() {
            1 => Site::new("log", 3),
            _ => Site::new("log", 6),
        }
    }
}

impl Unit for Log {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let site = self.site();
        let Term::Compound(pair) = engine.deref(&self.package_level) else {
            return Err(site
                .at(
                    1,
                    Fault::type_error("package:level", engine.resolve(&self.package_level)),
                )
                .into());
        };
        if pair.arity() != 2 {
            return Err(site
                .at(
                    1,
                    Fault::type_error("package:level", engine.resolve(&self.package_level)),
                )
                .into());
        }
        let format = match engine.deref(&self.format) {
            Term::Atom(format) => format,
            other => {
                return Err(site
                    .at(2, Fault::type_error("atom", engine.resolve(&other)))
                    .into());
            }
        };

        let package = engine.resolve(&pair.args()[0]).to_string();
        let level = match engine.deref(&pair.args()[1]) {
            Term::Atom(name) => level_of(name.as_str()),
            _ => Some(Level::INFO),
        };
        let Some(level) = level else {
            return Ok(self.cont.clone().into());
        };
        let args: Vec<Term> = self.args.iter().map(|arg| engine.resolve(arg)).collect();
        let message = format_message(format.as_str(), &args);

        if level == Level::ERROR {
            tracing::error!(package = %package, "{message}");
        } else if level == Level::WARN {
            tracing::warn!(package = %package, "{message}");
        } else if level == Level::INFO {
            tracing::info!(package = %package, "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(package = %package, "{message}");
        } else {
            tracing::trace!(package = %package, "{message}");
        }
        Ok(self.cont.clone().into())
    }
}
