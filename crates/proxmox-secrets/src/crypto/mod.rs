//! Cryptography module for the Proxmox secrets broker.
//!
//! Provides the AES-GCM cipher used to seal stored records.

pub mod encryption;

pub use encryption::Encryptor;
