// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared data model and wire primitives for the local-singleton daemon:
//! the runtime directory, frame transport, codec boundary, and session
//! message envelope, plus the error taxonomy and the dispatch contract
//! that stands in for compile-time-unknown method resolution.

pub mod codec;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod exit_codes;
pub mod lock;
pub mod metadata;
pub mod protocol;
pub mod runtime_dir;
pub mod token;
pub mod wire;

pub use codec::{Codec, ErrorDescriptor, JsonCodec, SerializationError};
pub use dispatch::{Dispatch, DispatchError, FnFactory, ObjectFactory};
pub use error::{HandshakeError, SingletonError};
pub use lock::RuntimeLock;
pub use metadata::{MetadataRead, RuntimeMetadata};
pub use protocol::{call, call_with_kwargs, HelloErrReason, Message, PROTOCOL_VERSION};
pub use runtime_dir::RuntimeDir;
pub use token::AuthToken;
pub use wire::{read_frame, write_frame, TransportError, DEFAULT_MAX_FRAME_SIZE};
