// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Options of the emitter. Read from the `[emit]` table of the driver's
/// TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitOptions {
    /// Extension of interface artifacts
    pub interface_extension: String,
    /// Extension of implementation artifacts
    pub implementation_extension: String,
    /// Header declaring the runtime support types and macros, included by
    /// every interface
    pub runtime_header: String,
    /// Emit the readable unprefixed name of a type as a `typedef` (or
    /// `#define` for protocols) when a package prefix shortened it
    pub emit_aliases: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            interface_extension: "h".to_string(),
            implementation_extension: "m".to_string(),
            runtime_header: "ORTRuntime.h".to_string(),
            emit_aliases: true,
        }
    }
}
