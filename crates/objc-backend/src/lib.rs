// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! ObjC backend
//!
//! Takes finished translations and renders interface/implementation
//! artifact pairs. No translation decisions are made here.

pub mod artifacts;
pub mod emitter;
pub mod escape;
pub mod options;
pub mod renderer;
pub mod run;

pub use artifacts::{Artifact, ArtifactPair};
pub use emitter::emit;
pub use options::EmitOptions;
pub use run::{run_translation, write_artifacts, RunOutput};
