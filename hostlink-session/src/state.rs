// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A tiny declarative state-transition DSL, plus the connection state
//! machine (C4, §4.4) built on top of it.
//!
//! The `event!`/`transition!` macros generate one method per named event;
//! each method matches the current state against its valid set and either
//! performs the transition (logging it at `debug`) or returns an error
//! (`NoOp` if the state is already the target, `InvalidTransition`
//! otherwise). This keeps the legal-transition table in one place next to
//! the states themselves instead of scattered across call sites.

use core::fmt;

pub type Result<T> = core::result::Result<(), Error<T>>;

#[macro_export]
#[doc(hidden)]
macro_rules! __state_transition__ {
    ($state:ident, $valid:pat => $target:expr) => {
        $crate::state::transition!(@build [], _, $state, [$valid => $target])
    };
    (@build [$($targets:expr),*], $event:ident, $state:ident, [$valid:pat => $target:expr] $($remaining:tt)*) => {{
        if matches!($state, $valid) {
            let __event__ = stringify!($event);
            if __event__.is_empty() || __event__ == "_" {
                tracing::debug!(prev = ?$state, next = ?$target);
            } else {
                tracing::debug!(event = %__event__, prev = ?$state, next = ?$target);
            }

            *$state = $target;
            Ok(())
        } else {
            $crate::state::transition!(
                @build [$($targets,)* $target],
                $event,
                $state,
                $($remaining)*
            )
        }
    }};
    (@build [$($targets:expr),*], $event:ident, $state:ident $(,)?) => {{
        let targets = [$($targets),*];

        if targets.len() == 1 && targets[0].eq($state) {
            let current = targets[0].clone();
            Err($crate::state::Error::NoOp { current })
        } else {
            Err($crate::state::Error::InvalidTransition {
                current: $state.clone(),
                event: stringify!($event),
            })
        }
    }};
}

pub use crate::__state_transition__ as transition;

#[macro_export]
#[doc(hidden)]
macro_rules! __state_event__ {
    ($(
        $(#[doc = $doc:literal])*
        $event:ident (
            $(
                $($valid:ident)|* => $target:ident
            ),*
            $(,)?
        );
    )*) => {
        $(
            $(
                #[doc = $doc]
            )*
            #[inline]
            pub fn $event(&mut self) -> $crate::state::Result<Self> {
                $crate::state::transition!(
                    @build [],
                    $event,
                    self,
                    $(
                        [$(Self::$valid)|* => Self::$target]
                    )*
                )
            }
        )*
    }
}

pub use crate::__state_event__ as event;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<T> {
    NoOp { current: T },
    InvalidTransition { current: T, event: &'static str },
}

impl<T: fmt::Debug> fmt::Display for Error<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp { current } => write!(f, "state is already set to {current:?}"),
            Self::InvalidTransition { current, event } => {
                write!(f, "invalid event {event:?} for state {current:?}")
            }
        }
    }
}

impl<T: fmt::Debug> std::error::Error for Error<T> {}

/// Connection lifecycle states (§4.4). `Error` carries a non-empty reason
/// string; all other states carry no payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    Error(String),
    Reconnecting,
}

impl ConnectionState {
    event! {
        /// Disconnected -> Connecting
        connect(Disconnected => Connecting);

        /// Connecting -> Handshaking
        begin_handshake(Connecting => Handshaking);

        /// Handshaking -> Ready
        handshake_complete(Handshaking => Ready);

        /// Ready -> Disconnected
        disconnect(Ready => Disconnected);

        /// Error -> Reconnecting
        begin_reconnect(Error(_) => Reconnecting);

        /// Error -> Disconnected
        give_up(Error(_) => Disconnected);

        /// Reconnecting -> Handshaking
        reconnect_handshake(Reconnecting => Handshaking);
    }

    /// Connecting | Handshaking | Ready -> Error(reason). A separate
    /// method (rather than an `event!` entry) because the target state
    /// carries the reason string, which the macro's fixed `Self::$target`
    /// form can't parameterize.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<Self> {
        let reason = reason.into();
        match self {
            Self::Connecting | Self::Handshaking | Self::Ready | Self::Reconnecting => {
                tracing::debug!(prev = ?self, next = "Error", reason = %reason);
                *self = Self::Error(reason);
                Ok(())
            }
            other => Err(Error::InvalidTransition {
                current: other.clone(),
                event: "fail",
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_terminal_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
