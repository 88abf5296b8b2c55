// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

pub mod declarations;
pub mod expressions;
pub mod metadata;
pub mod statements;
pub mod types;
