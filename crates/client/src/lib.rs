// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The client half of the local-singleton system: find or spawn the daemon
//! for a logical name and hand back a connected, handshaken [`Session`].

mod coordinator;
mod daemon_process;
mod error;
mod session;

pub use coordinator::{connect, connect_or_spawn};
pub use error::ClientError;
pub use session::{PongInfo, Session};
