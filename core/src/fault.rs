//! Fault taxonomy and the unit-level error channel.
//!
//! A [`Fault`] is what a unit raises when it cannot proceed. The reduction
//! loop converts catchable faults into exception terms for the innermost
//! active catch; everything else leaves the loop with its kind intact.

use std::fmt;

use cairn_types::{Atom, Capability, FaultKind, Functor, Term};
use thiserror::Error;

/// Where a fault was raised: the goal indicator and the offending argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    goal: Option<Functor>,
    arg: usize,
}

impl Context {
    #[must_use]
    pub fn new(goal: Functor, arg: usize) -> Self {
        Self {
            goal: Some(goal),
            arg,
        }
    }

    #[must_use]
    pub fn goal(&self) -> Option<&Functor> {
        self.goal.as_ref()
    }

    #[must_use]
    pub fn arg(&self) -> usize {
        self.arg
    }

    /// `context(Name/Arity, ArgNo)`, or `context([], 0)` without a goal.
    #[must_use]
    pub fn to_term(&self) -> Term {
        match &self.goal {
            Some(goal) => Term::compound(
                "context",
                vec![
                    Term::compound(
                        "/",
                        vec![
                            Term::Atom(goal.name().clone()),
                            Term::int(goal.arity() as i64),
                        ],
                    ),
                    Term::int(self.arg as i64),
                ],
            ),
            None => Term::compound("context", vec![Term::nil(), Term::int(0)]),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.goal {
            Some(goal) if self.arg > 0 => write!(f, " in {goal} (argument {})", self.arg),
            Some(goal) => write!(f, " in {goal}"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum Fault {
    #[error("instantiation error{context}")]
    Instantiation { context: Context },

    #[error("type error: expected {expected}, found {culprit}{context}")]
    Type {
        expected: Atom,
        culprit: Term,
        context: Context,
    },

    #[error("domain error: {culprit} is not in {domain}{context}")]
    Domain {
        domain: Atom,
        culprit: Term,
        context: Context,
    },

    #[error("existence error: {kind} {culprit} does not exist{context}")]
    Existence {
        kind: Atom,
        culprit: Term,
        context: Context,
    },

    /// Includes use of a disabled capability (`action` is `use`, `kind` the
    /// capability name).
    #[error("permission error: cannot {action} {kind} {culprit}{}{context}", detail(.message))]
    Permission {
        action: Atom,
        kind: Atom,
        culprit: Term,
        message: String,
        context: Context,
    },

    #[error("host error: {message}{context}")]
    HostInterop {
        message: String,
        #[source]
        source: anyhow::Error,
        context: Context,
    },

    /// Engine invariant violation. Never reaches a catch.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("uncaught exception: {0}")]
    Thrown(Term),
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" ({message})")
    }
}

impl Fault {
    #[must_use]
    pub fn instantiation() -> Self {
        Fault::Instantiation {
            context: Context::default(),
        }
    }

    #[must_use]
    pub fn type_error(expected: impl Into<Atom>, culprit: Term) -> Self {
        Fault::Type {
            expected: expected.into(),
            culprit,
            context: Context::default(),
        }
    }

    #[must_use]
    pub fn domain(domain: impl Into<Atom>, culprit: Term) -> Self {
        Fault::Domain {
            domain: domain.into(),
            culprit,
            context: Context::default(),
        }
    }

    #[must_use]
    pub fn existence(kind: impl Into<Atom>, culprit: Term) -> Self {
        Fault::Existence {
            kind: kind.into(),
            culprit,
            context: Context::default(),
        }
    }

    #[must_use]
    pub fn permission(
        action: impl Into<Atom>,
        kind: impl Into<Atom>,
        culprit: Term,
        message: impl Into<String>,
    ) -> Self {
        Fault::Permission {
            action: action.into(),
            kind: kind.into(),
            culprit,
            message: message.into(),
            context: Context::default(),
        }
    }

    /// Permission fault for touching a disabled capability.
    #[must_use]
    pub fn capability_disabled(cap: Capability, culprit: Term) -> Self {
        Self::permission("use", cap.as_str(), culprit, "disabled")
    }

    #[must_use]
    pub fn host(message: impl Into<String>, source: anyhow::Error) -> Self {
        Fault::HostInterop {
            message: message.into(),
            source,
            context: Context::default(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Fault::Internal(message.into())
    }

    /// Attach the goal indicator and argument position.
    #[must_use]
    pub fn in_goal(mut self, goal: Functor, arg: usize) -> Self {
        match &mut self {
            Fault::Instantiation { context }
            | Fault::Type { context, .. }
            | Fault::Domain { context, .. }
            | Fault::Existence { context, .. }
            | Fault::Permission { context, .. }
            | Fault::HostInterop { context, .. } => *context = Context::new(goal, arg),
            Fault::Internal(_) | Fault::Thrown(_) => {}
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Instantiation { .. } => FaultKind::Instantiation,
            Fault::Type { .. } => FaultKind::Type,
            Fault::Domain { .. } => FaultKind::Domain,
            Fault::Existence { .. } => FaultKind::Existence,
            Fault::Permission { .. } => FaultKind::Permission,
            Fault::HostInterop { .. } => FaultKind::HostInterop,
            Fault::Internal(_) => FaultKind::Internal,
            Fault::Thrown(_) => FaultKind::Thrown,
        }
    }

    #[must_use]
    pub fn is_catchable(&self) -> bool {
        !matches!(self, Fault::Internal(_))
    }

    #[must_use]
    pub fn context(&self) -> Option<&Context> {
        match self {
            Fault::Instantiation { context }
            | Fault::Type { context, .. }
            | Fault::Domain { context, .. }
            | Fault::Existence { context, .. }
            | Fault::Permission { context, .. }
            | Fault::HostInterop { context, .. } => Some(context),
            Fault::Internal(_) | Fault::Thrown(_) => None,
        }
    }

    /// The capability a permission fault was raised for, if any.
    #[must_use]
    pub fn capability(&self) -> Option<Capability> {
        match self {
            Fault::Permission { action, kind, .. } if action.as_str() == "use" => {
                kind.as_str().parse().ok()
            }
            _ => None,
        }
    }

    /// The ISO-shaped error term a catch sees.
    #[must_use]
    pub fn to_term(&self) -> Term {
        let error = |formal: Term, context: &Context| {
            Term::compound("error", vec![formal, context.to_term()])
        };
        match self {
            Fault::Instantiation { context } => {
                error(Term::atom("instantiation_error"), context)
            }
            Fault::Type {
                expected,
                culprit,
                context,
            } => error(
                Term::compound(
                    "type_error",
                    vec![Term::Atom(expected.clone()), culprit.clone()],
                ),
                context,
            ),
            Fault::Domain {
                domain,
                culprit,
                context,
            } => error(
                Term::compound(
                    "domain_error",
                    vec![Term::Atom(domain.clone()), culprit.clone()],
                ),
                context,
            ),
            Fault::Existence {
                kind,
                culprit,
                context,
            } => error(
                Term::compound(
                    "existence_error",
                    vec![Term::Atom(kind.clone()), culprit.clone()],
                ),
                context,
            ),
            Fault::Permission {
                action,
                kind,
                culprit,
                message,
                ..
            } => Term::compound(
                "error",
                vec![
                    Term::compound(
                        "permission_error",
                        vec![
                            Term::Atom(action.clone()),
                            Term::Atom(kind.clone()),
                            culprit.clone(),
                        ],
                    ),
                    Term::atom(message.as_str()),
                ],
            ),
            Fault::HostInterop {
                message,
                source,
                context,
            } => error(
                Term::compound(
                    "host_error",
                    vec![Term::atom(format!("{message}: {source}"))],
                ),
                context,
            ),
            Fault::Internal(message) => {
                Term::compound("system_error", vec![Term::atom(message.as_str())])
            }
            Fault::Thrown(ball) => ball.clone(),
        }
    }
}

/// What a unit returns instead of a next step.
#[derive(Debug, Error)]
pub enum Signal {
    #[error(transparent)]
    Fault(#[from] Fault),
    /// Stop the loop with an exit code, bypassing every catch.
    #[error("halt({0})")]
    Halt(i32),
}
