// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! courier-store: storage wire format and capability traits for the
//! email campaign agent's external collaborators.

pub mod attr;
pub mod codec;
pub mod command;
pub mod error;
pub mod memory;
pub mod traits;

pub use attr::AttrValue;
pub use codec::{decode, encode, CodecError};
pub use command::{Command, CommandAction};
pub use error::StoreError;
pub use memory::{
    MemoryCredentialStore, MemoryObjectStore, MemoryPushChannel, MemoryQueue, MemoryStore,
    MemoryTemplateService,
};
pub use traits::{
    CommandQueue, CredentialStore, DeliveryStatus, DirectoryStore, ObjectStore, PushChannel,
    QueueMessage, RecipientLog, SmtpCredentials, TemplateService, WorkOrderStore,
};
