// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

macro_rules! handler_log {
    ($self:expr, $level:ident, $msg:expr; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_HANDLER,
            "peer" => $self.conn.peer(),
            "version" => $self.version_str(),
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $msg:expr, $($args:expr),*; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_HANDLER,
            "peer" => $self.conn.peer(),
            "version" => $self.version_str(),
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $msg:expr) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_HANDLER,
            "peer" => $self.conn.peer(),
            "version" => $self.version_str(),
        )
    };
    ($self:expr, $level:ident, $msg:expr, $($args:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_HANDLER,
            "peer" => $self.conn.peer(),
            "version" => $self.version_str(),
        )
    };
}

// used from the receive loop, which has a logger and a peer but no self
macro_rules! connection_log {
    ($log:expr, $peer:expr, $level:ident, $msg:expr; $($key:expr => $value:expr),*) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_CONNECTION,
            "peer" => $peer,
            $($key => $value),*
        )
    };
    ($log:expr, $peer:expr, $level:ident, $msg:expr, $($args:expr),*; $($key:expr => $value:expr),*) => {
        slog::$level!($log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_CONNECTION,
            "peer" => $peer,
            $($key => $value),*
        )
    };
    ($log:expr, $peer:expr, $level:ident, $msg:expr) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_CONNECTION,
            "peer" => $peer,
        )
    };
    ($log:expr, $peer:expr, $level:ident, $msg:expr, $($args:expr),*) => {
        slog::$level!($log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_CONNECTION,
            "peer" => $peer,
        )
    };
}

macro_rules! dispatcher_log {
    ($self:expr, $level:ident, $msg:expr; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_DISPATCHER,
            "listen" => $self.listen,
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $msg:expr, $($args:expr),*; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_DISPATCHER,
            "listen" => $self.listen,
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $msg:expr) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_DISPATCHER,
            "listen" => $self.listen,
        )
    };
    ($self:expr, $level:ident, $msg:expr, $($args:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => crate::MOD_DISPATCHER,
            "listen" => $self.listen,
        )
    };
}

// store, session manager and refresher all log with a fixed module tag
macro_rules! cache_log {
    ($log:expr, $module:expr, $level:ident, $msg:expr; $($key:expr => $value:expr),*) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => $module,
            $($key => $value),*
        )
    };
    ($log:expr, $module:expr, $level:ident, $msg:expr, $($args:expr),*; $($key:expr => $value:expr),*) => {
        slog::$level!($log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => $module,
            $($key => $value),*
        )
    };
    ($log:expr, $module:expr, $level:ident, $msg:expr) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_RTR,
            "module" => $module,
        )
    };
    ($log:expr, $module:expr, $level:ident, $msg:expr, $($args:expr),*) => {
        slog::$level!($log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_RTR,
            "module" => $module,
        )
    };
}

pub(crate) use {cache_log, connection_log, dispatcher_log, handler_log};
