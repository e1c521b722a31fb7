// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session cache and its collaborators.
//!
//! ```text
//! ┌──────────────┐  async  ┌──────────────┐
//! │ SessionCache │────────►│  SessionApi  │  (REST backend)
//! └──────────────┘         └──────────────┘
//!        │ publish
//!        ▼
//! ┌──────────────┐
//! │   EventBus   │  (SessionEvent → subscribers)
//! └──────────────┘
//! ```

mod api;
mod bus;
mod notify;
mod store;

pub use api::{ApiError, ApiFuture, ApiResult, HttpSessionApi, SessionApi};
pub use bus::{EventBus, SessionEvent, SubscriptionId};
pub use notify::{LogNotifier, Notifier, StderrNotifier};
pub use store::SessionCache;
